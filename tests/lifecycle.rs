use carrier_track::bbox::BBox;
use carrier_track::presence::MemoryPresenceStore;
use carrier_track::{
    CarrierTracker, Departure, Detection, Error, Frame, Identity, PresenceLookup,
    PresenceNotifier, TrackerConfig,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Arrival(Identity),
    Departure(Identity),
}

#[derive(Default)]
struct RecordingNotifier {
    calls: Mutex<Vec<Call>>,
}

impl RecordingNotifier {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn departures(&self, id: Identity) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == Call::Departure(id))
            .count()
    }

    fn arrivals(&self, id: Identity) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == Call::Arrival(id))
            .count()
    }
}

impl PresenceNotifier for RecordingNotifier {
    fn on_arrival(&self, id: Identity, _at: DateTime<Utc>) -> Result<(), Error> {
        self.calls.lock().unwrap().push(Call::Arrival(id));
        Ok(())
    }

    fn on_departure(&self, id: Identity, _at: DateTime<Utc>) -> Result<(), Error> {
        self.calls.lock().unwrap().push(Call::Departure(id));
        Ok(())
    }
}

fn t(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::seconds(secs)
}

fn in_view(payload: &str) -> Detection {
    Detection::new(payload, BBox::ltwh(600, 300, 60, 60))
}

fn at_border(payload: &str) -> Detection {
    Detection::new(payload, BBox::ltwh(40, 300, 60, 60))
}

fn frame(dets: Vec<Detection>, ts: DateTime<Utc>) -> Frame {
    Frame::new((1280, 720), dets, ts)
}

fn setup(tolerance: u32, history_secs: f64) -> (CarrierTracker, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let config = TrackerConfig {
        memory_tolerance: tolerance,
        border_margin: 100,
        history_duration: history_secs,
    };
    let tracker = CarrierTracker::new(config, Box::new(Arc::clone(&notifier)));

    (tracker, notifier)
}

fn assert_disjoint(tracker: &CarrierTracker) {
    for id in tracker.live().keys() {
        assert!(
            !tracker.history().contains_key(id),
            "#{} is both live and in history",
            id
        );
    }
}

#[test]
fn test_grace_period_then_timeout() {
    let (mut tr, rec) = setup(3, 10.0);

    tr.update(&frame(vec![in_view("http://host/item/7")], t(0)));
    let e = &tr.live()[&7];
    assert!(e.active);
    assert_eq!(rec.calls(), vec![Call::Arrival(7)]);

    tr.update(&frame(vec![], t(1)));
    let e = &tr.live()[&7];
    assert!(!e.active);
    assert_eq!(e.missing_count, 1);

    tr.update(&frame(vec![], t(2)));
    tr.update(&frame(vec![], t(3)));
    assert_eq!(tr.live()[&7].missing_count, 3);
    assert_eq!(rec.departures(7), 0);

    tr.update(&frame(vec![], t(4)));
    assert!(!tr.live().contains_key(&7));
    assert!(tr.history().contains_key(&7));
    assert_eq!(tr.report().departed, vec![(7, Departure::Timeout)]);
    assert_eq!(rec.departures(7), 1);

    tr.update(&frame(vec![], t(5)));
    assert_eq!(rec.departures(7), 1);
}

#[test]
fn test_grace_tolerance_rematch_resets_missing() {
    let (mut tr, rec) = setup(4, 10.0);

    tr.update(&frame(vec![in_view("3")], t(0)));
    for i in 1..4 {
        tr.update(&frame(vec![], t(i)));
        assert_disjoint(&tr);
    }
    assert_eq!(tr.live()[&3].missing_count, 3);

    tr.update(&frame(vec![in_view("3")], t(4)));
    let e = &tr.live()[&3];
    assert_eq!(e.missing_count, 0);
    assert!(e.active);
    assert_eq!(e.session_start, t(0));
    assert_eq!(rec.calls(), vec![Call::Arrival(3)]);
}

#[test]
fn test_kill_zone_evicts_on_first_missing_frame() {
    let (mut tr, rec) = setup(15, 10.0);

    tr.update(&frame(vec![at_border("11")], t(0)));
    assert!(tr.live()[&11].active);

    tr.update(&frame(vec![], t(1)));
    assert!(!tr.live().contains_key(&11));
    assert_eq!(tr.history()[&11].entity.missing_count, 1);
    assert_eq!(tr.report().departed, vec![(11, Departure::KillZone)]);
    assert_eq!(rec.departures(11), 1);
}

#[test]
fn test_kill_zone_ignored_while_matched() {
    let (mut tr, rec) = setup(15, 10.0);

    for i in 0..5 {
        tr.update(&frame(vec![at_border("11")], t(i)));
    }

    assert!(tr.live()[&11].active);
    assert_eq!(rec.departures(11), 0);
}

#[test]
fn test_resurrection_keeps_session_start() {
    let (mut tr, rec) = setup(0, 10.0);

    tr.update(&frame(vec![in_view("9")], t(-60)));
    tr.update(&frame(vec![], t(0)));
    assert!(tr.history().contains_key(&9));

    tr.update(&frame(vec![], t(2)));
    tr.update(&frame(vec![in_view("9")], t(4)));

    assert_disjoint(&tr);
    let e = &tr.live()[&9];
    assert_eq!(e.session_start, t(-60));
    assert_eq!(e.duration_string(t(4)), "01:04");
    assert_eq!(tr.report().resurrected, vec![9]);
    assert_eq!(rec.arrivals(9), 2);
    assert_eq!(rec.departures(9), 1);

    let snap = tr.snapshot(t(4));
    assert_eq!(snap.len(), 1);
    assert_eq!(snap[0].duration, "01:04");
}

#[test]
fn test_retention_expiry_starts_fresh_session() {
    let (mut tr, rec) = setup(0, 10.0);

    tr.update(&frame(vec![in_view("9")], t(-1)));
    tr.update(&frame(vec![], t(0)));
    assert!(tr.history().contains_key(&9));

    for i in 1..15 {
        tr.update(&frame(vec![], t(i)));
        assert_eq!(tr.history().contains_key(&9), i <= 10);
    }

    tr.update(&frame(vec![in_view("9")], t(15)));
    let e = &tr.live()[&9];
    assert_eq!(e.session_start, t(15));
    assert_eq!(e.duration_string(t(15)), "00:00");
    assert_eq!(tr.report().created, vec![9]);
    assert_eq!(rec.arrivals(9), 2);
}

#[test]
fn test_uniqueness_over_mixed_stream() {
    let (mut tr, _) = setup(2, 3.0);
    let script: Vec<Vec<Detection>> = vec![
        vec![in_view("1"), in_view("2"), at_border("3")],
        vec![in_view("1")],
        vec![in_view("2"), in_view("3")],
        vec![],
        vec![],
        vec![in_view("1"), in_view("x/2")],
        vec![in_view("3"), in_view("3")],
        vec![],
        vec![],
        vec![],
        vec![in_view("1"), in_view("2"), in_view("3")],
    ];

    for (i, dets) in script.into_iter().enumerate() {
        tr.update(&frame(dets, t(i as i64)));
        assert_disjoint(&tr);
        for e in tr.live().values() {
            assert_eq!(e.active, e.missing_count == 0);
        }
    }
}

#[test]
fn test_memory_store_follows_tracker() {
    let store = Arc::new(MemoryPresenceStore::new());
    store.register(7).unwrap();

    let config = TrackerConfig {
        memory_tolerance: 1,
        ..Default::default()
    };
    let mut tr = CarrierTracker::new(config, Box::new(Arc::clone(&store)));

    tr.update(&frame(vec![in_view("7"), in_view("8")], t(0)));
    let rec = store.get(7).unwrap().unwrap();
    assert_eq!(rec.first_seen, Some(t(0)));
    assert!(rec.is_present());

    // #8 is unknown to the store, the tracker keeps it anyway
    assert!(tr.live().contains_key(&8));
    assert_eq!(store.get(8).unwrap(), None);

    tr.update(&frame(vec![], t(1)));
    tr.update(&frame(vec![], t(2)));
    assert_eq!(store.get(7).unwrap().unwrap().departed, Some(t(2)));

    tr.update(&frame(vec![in_view("7")], t(3)));
    let rec = store.get(7).unwrap().unwrap();
    assert_eq!(rec.first_seen, Some(t(0)));
    assert_eq!(rec.departed, None);
}
