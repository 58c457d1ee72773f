use chrono::{DateTime, Local, Utc};
use nalgebra as na;

use crate::bbox::{BBox, Ltwh};
use crate::Detection;
use crate::Identity;

/// A carrier currently known to the tracker.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: Identity,
    pub raw_payload: String,
    pub bbox: BBox<Ltwh>,
    pub polygon: Option<Vec<na::Point2<i32>>>,
    pub session_start: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub missing_count: u32,
    pub active: bool,
}

impl Entity {
    /// Starts a new session at `now`.
    pub fn new(id: Identity, det: &Detection, now: DateTime<Utc>) -> Self {
        Self::with_session_start(id, det, now, now)
    }

    /// Re-admits an identity, continuing a session that began at `session_start`.
    pub fn with_session_start(
        id: Identity,
        det: &Detection,
        session_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            raw_payload: det.payload.clone(),
            bbox: det.bbox,
            polygon: det.polygon.clone(),
            session_start,
            last_seen: now,
            missing_count: 0,
            active: true,
        }
    }

    pub fn update(&mut self, det: &Detection, now: DateTime<Utc>) {
        self.raw_payload.clone_from(&det.payload);
        self.bbox = det.bbox;
        self.polygon = det.polygon.clone();
        self.last_seen = now;
        self.missing_count = 0;
        self.active = true;
    }

    pub fn mark_missing(&mut self) {
        self.missing_count += 1;
        self.active = false;
    }

    /// Elapsed session time as `MM:SS`.
    pub fn duration_string(&self, now: DateTime<Utc>) -> String {
        let elapsed = (now - self.session_start).num_seconds().max(0);

        format!("{:02}:{:02}", elapsed / 60, elapsed % 60)
    }

    pub fn first_seen_string(&self) -> String {
        self.session_start
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}
