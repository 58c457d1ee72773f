//! Presence tracking for labelled carriers seen by a fixed camera.
//!
//! Feed every frame's decoded codes into [`CarrierTracker::update`]; the
//! tracker keeps the set of carriers currently in view, absorbs detector
//! flicker, resumes sessions of carriers that were briefly out of sight and
//! reports arrivals and departures to a [`PresenceNotifier`].

pub mod bbox;
pub mod config;
pub mod db;
pub mod detection;
pub mod entity;
pub mod error;
pub mod frame;
pub mod identity;
pub mod mailbox;
pub mod presence;
pub mod snapshot;
pub mod tracker;

pub use config::{Config, TrackerConfig};
pub use detection::Detection;
pub use entity::Entity;
pub use error::Error;
pub use frame::Frame;
pub use presence::{PresenceLookup, PresenceNotifier, PresenceRecord};
pub use snapshot::{SnapshotRecord, SnapshotSink, Status};
pub use tracker::{CarrierTracker, Departure, FrameReport, HistoryRecord};

/// Carrier identity as printed on its label.
pub type Identity = i64;
