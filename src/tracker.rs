use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

use crate::config::TrackerConfig;
use crate::entity::Entity;
use crate::presence::PresenceNotifier;
use crate::snapshot::{self, SnapshotRecord, SnapshotSink};
use crate::{Frame, Identity};

/// An entity evicted from the live set, kept around for resurrection.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub entity: Entity,
    pub evicted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Lost while touching the border band.
    KillZone,
    /// Missing for more frames than the tolerance allows.
    Timeout,
}

/// Transitions applied by the last [`CarrierTracker::update`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub matched: Vec<Identity>,
    pub created: Vec<Identity>,
    pub resurrected: Vec<Identity>,
    pub departed: Vec<(Identity, Departure)>,
    pub purged: Vec<Identity>,
}

/// Detection indices of one frame, split by whether their identity is live.
/// Every identity appears at most once; the first detection in scan order wins.
struct FrameMapping {
    matched: Vec<(Identity, usize)>,
    unmatched: Vec<(Identity, usize)>,
}

pub struct CarrierTracker {
    config: TrackerConfig,
    live: HashMap<Identity, Entity>,
    history: HashMap<Identity, HistoryRecord>,
    notifier: Box<dyn PresenceNotifier>,
    sink: Option<Box<dyn SnapshotSink>>,
    report: FrameReport,
}

impl CarrierTracker {
    pub fn new(config: TrackerConfig, notifier: Box<dyn PresenceNotifier>) -> Self {
        Self {
            config,
            live: HashMap::with_capacity(64),
            history: HashMap::with_capacity(64),
            notifier,
            sink: None,
            report: FrameReport::default(),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[inline]
    pub fn live(&self) -> &HashMap<Identity, Entity> {
        &self.live
    }

    #[inline]
    pub fn history(&self) -> &HashMap<Identity, HistoryRecord> {
        &self.history
    }

    #[inline]
    pub fn report(&self) -> &FrameReport {
        &self.report
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> Vec<SnapshotRecord> {
        snapshot::build(&self.live, now)
    }

    fn map_detections(&self, frame: &Frame) -> FrameMapping {
        let mut seen = HashSet::new();
        let mut matched = Vec::new();
        let mut unmatched = Vec::new();

        for (idx, det) in frame.iter().enumerate() {
            let id = match det.identity() {
                Some(id) => id,
                None => continue,
            };

            if !seen.insert(id) {
                debug!("Duplicate detection of #{} in one frame ignored", id);
                continue;
            }

            if self.live.contains_key(&id) {
                matched.push((id, idx));
            } else {
                unmatched.push((id, idx));
            }
        }

        FrameMapping { matched, unmatched }
    }

    /// Reconciles one frame's detections with the known carriers and returns
    /// the live set. Calls must be serialized by the owner.
    pub fn update(&mut self, frame: &Frame) -> &HashMap<Identity, Entity> {
        let now = frame.timestamp;
        let retention = self.config.history_retention();
        let mapping = self.map_detections(frame);
        let dets = &frame.detections;
        let mut report = FrameReport::default();

        let mut leftover: HashSet<Identity> = self.live.keys().copied().collect();

        for &(id, j) in &mapping.matched {
            if let Some(entity) = self.live.get_mut(&id) {
                entity.update(&dets[j], now);
                leftover.remove(&id);
                report.matched.push(id);
            }
        }

        for &(id, j) in &mapping.unmatched {
            let det = &dets[j];
            let previous = match self.history.remove(&id) {
                Some(rec) if now - rec.evicted_at <= retention => Some(rec),
                Some(_) => {
                    debug!("Carrier #{} dropped from history", id);
                    report.purged.push(id);
                    None
                }
                None => None,
            };

            let entity = match previous {
                Some(rec) => {
                    info!("Carrier #{} is back, session continues", id);
                    report.resurrected.push(id);
                    Entity::with_session_start(id, det, rec.entity.session_start, now)
                }
                None => {
                    info!("New carrier #{}", id);
                    report.created.push(id);
                    Entity::new(id, det, now)
                }
            };

            self.live.insert(id, entity);
            self.notify_arrival(id, now);
        }

        let mut evicted = Vec::new();

        for id in leftover {
            let entity = match self.live.get_mut(&id) {
                Some(entity) => entity,
                None => continue,
            };
            entity.mark_missing();

            let reason = if entity.bbox.touches_border(frame, self.config.border_margin) {
                Some(Departure::KillZone)
            } else if entity.missing_count > self.config.memory_tolerance {
                Some(Departure::Timeout)
            } else {
                None
            };

            if let Some(reason) = reason {
                match reason {
                    Departure::KillZone => info!("Carrier #{} left through the border", id),
                    Departure::Timeout => info!(
                        "Carrier #{} timed out after {} missing frames",
                        id, entity.missing_count
                    ),
                }
                evicted.push((id, reason));
            }
        }

        for &(id, reason) in &evicted {
            if let Some(entity) = self.live.remove(&id) {
                self.history.insert(
                    id,
                    HistoryRecord {
                        entity,
                        evicted_at: now,
                    },
                );
                self.notify_departure(id, now);
                report.departed.push((id, reason));
            }
        }

        self.history.retain(|&id, rec| {
            let keep = now - rec.evicted_at <= retention;
            if !keep {
                debug!("Carrier #{} dropped from history", id);
                report.purged.push(id);
            }
            keep
        });

        if let Some(sink) = self.sink.as_mut() {
            let records = snapshot::build(&self.live, now);
            if let Err(err) = sink.publish(&records) {
                warn!("Failed to publish snapshot: {}", err);
            }
        }

        self.report = report;

        &self.live
    }

    fn notify_arrival(&self, id: Identity, now: DateTime<Utc>) {
        if let Err(err) = self.notifier.on_arrival(id, now) {
            warn!("Arrival of carrier #{} not recorded: {}", id, err);
        }
    }

    fn notify_departure(&self, id: Identity, now: DateTime<Utc>) {
        if let Err(err) = self.notifier.on_departure(id, now) {
            warn!("Departure of carrier #{} not recorded: {}", id, err);
        }
    }
}
