//! Presence notification boundary.
//!
//! The tracker reports arrivals and departures through [`PresenceNotifier`];
//! a receiver keeps the durable first-seen / departed timestamps per carrier.
//! Receivers follow the same contract:
//!
//! - arrival sets `first_seen` only if it is empty and always clears `departed`
//! - departure sets `departed` only if it is empty

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::Error;
use crate::Identity;

pub trait PresenceNotifier: Send {
    fn on_arrival(&self, id: Identity, at: DateTime<Utc>) -> Result<(), Error>;
    fn on_departure(&self, id: Identity, at: DateTime<Utc>) -> Result<(), Error>;
}

impl<T: PresenceNotifier + Sync> PresenceNotifier for Arc<T> {
    fn on_arrival(&self, id: Identity, at: DateTime<Utc>) -> Result<(), Error> {
        (**self).on_arrival(id, at)
    }

    fn on_departure(&self, id: Identity, at: DateTime<Utc>) -> Result<(), Error> {
        (**self).on_departure(id, at)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PresenceRecord {
    pub first_seen: Option<DateTime<Utc>>,
    pub departed: Option<DateTime<Utc>>,
}

impl PresenceRecord {
    #[inline]
    pub fn is_present(&self) -> bool {
        self.first_seen.is_some() && self.departed.is_none()
    }

    pub fn arrive(&mut self, at: DateTime<Utc>) {
        if self.first_seen.is_none() {
            self.first_seen = Some(at);
        }
        self.departed = None;
    }

    /// Returns false when a departure was already recorded.
    pub fn depart(&mut self, at: DateTime<Utc>) -> bool {
        if self.departed.is_some() {
            return false;
        }

        self.departed = Some(at);
        true
    }
}

/// Read side of a presence store.
pub trait PresenceLookup {
    fn get(&self, id: Identity) -> Result<Option<PresenceRecord>, Error>;
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl PresenceNotifier for NullNotifier {
    fn on_arrival(&self, _id: Identity, _at: DateTime<Utc>) -> Result<(), Error> {
        Ok(())
    }

    fn on_departure(&self, _id: Identity, _at: DateTime<Utc>) -> Result<(), Error> {
        Ok(())
    }
}

/// In-process store. Carriers have to be registered before notifications
/// for them are accepted.
#[derive(Debug, Default)]
pub struct MemoryPresenceStore {
    records: Mutex<HashMap<Identity, PresenceRecord>>,
}

impl MemoryPresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: Identity) -> Result<(), Error> {
        let mut records = self.records.lock().map_err(|_| Error::Poisoned)?;
        records.entry(id).or_default();

        Ok(())
    }

    fn with_record<T>(
        &self,
        id: Identity,
        f: impl FnOnce(&mut PresenceRecord) -> T,
    ) -> Result<T, Error> {
        let mut records = self.records.lock().map_err(|_| Error::Poisoned)?;
        let record = records.get_mut(&id).ok_or(Error::UnknownCarrier(id))?;

        Ok(f(record))
    }
}

impl PresenceNotifier for MemoryPresenceStore {
    fn on_arrival(&self, id: Identity, at: DateTime<Utc>) -> Result<(), Error> {
        self.with_record(id, |r| r.arrive(at))
    }

    fn on_departure(&self, id: Identity, at: DateTime<Utc>) -> Result<(), Error> {
        let recorded = self.with_record(id, |r| r.depart(at))?;
        if !recorded {
            log::debug!("Carrier #{} already marked as departed", id);
        }

        Ok(())
    }
}

impl PresenceLookup for MemoryPresenceStore {
    fn get(&self, id: Identity) -> Result<Option<PresenceRecord>, Error> {
        let records = self.records.lock().map_err(|_| Error::Poisoned)?;

        Ok(records.get(&id).copied())
    }
}
