use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::entity::Entity;
use crate::error::Error;
use crate::Identity;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    #[serde(rename = "LIVE")]
    Live,
    #[serde(rename = "MEMORY")]
    Memory,
}

/// Read-only view of one live carrier, as handed to display layers
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub internal_id: Identity,
    pub content: String,
    pub duration: String,
    pub timestamp: String,
    pub status: Status,
}

impl SnapshotRecord {
    pub fn from_entity(entity: &Entity, now: DateTime<Utc>) -> Self {
        Self {
            internal_id: entity.id,
            content: entity.raw_payload.clone(),
            duration: entity.duration_string(now),
            timestamp: entity.first_seen_string(),
            status: if entity.active {
                Status::Live
            } else {
                Status::Memory
            },
        }
    }
}

pub fn build(live: &HashMap<Identity, Entity>, now: DateTime<Utc>) -> Vec<SnapshotRecord> {
    live.values()
        .map(|e| SnapshotRecord::from_entity(e, now))
        .collect()
}

pub trait SnapshotSink: Send {
    fn publish(&mut self, records: &[SnapshotRecord]) -> Result<(), Error>;
}

/// Rewrites a JSON file with the full snapshot every frame. Each snapshot
/// goes to a sibling `.tmp` file first and is renamed over the target, so
/// readers see either the previous snapshot or the new one.
pub struct JsonFileSink {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl JsonFileSink {
    /// Creates the file with an empty list if it does not exist yet, so
    /// readers never hit a missing file.
    pub fn new<P: Into<PathBuf>>(path: P) -> Result<Self, Error> {
        let path = path.into();
        let mut tmp_name = path.clone().into_os_string();
        tmp_name.push(".tmp");

        let mut sink = Self {
            path,
            tmp_path: PathBuf::from(tmp_name),
        };
        if !sink.path.exists() {
            sink.publish(&[])?;
        }

        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSink for JsonFileSink {
    fn publish(&mut self, records: &[SnapshotRecord]) -> Result<(), Error> {
        let serialized = serde_json::to_string_pretty(records)?;
        fs::write(&self.tmp_path, serialized)?;
        fs::rename(&self.tmp_path, &self.path)?;

        Ok(())
    }
}
