use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::Error;
use crate::presence::{PresenceLookup, PresenceNotifier, PresenceRecord};
use crate::Identity;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS carriers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        goods TEXT NOT NULL,
        first_seen TEXT,
        departed TEXT
    );
    CREATE TABLE IF NOT EXISTS movement_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        carrier_id INTEGER NOT NULL,
        x INTEGER NOT NULL,
        y INTEGER NOT NULL,
        timestamp TEXT NOT NULL
    );
";

#[derive(Debug, Clone, PartialEq)]
pub struct Carrier {
    pub id: Identity,
    pub goods: String,
    pub presence: PresenceRecord,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Movement {
    pub carrier_id: Identity,
    pub x: i32,
    pub y: i32,
    pub timestamp: DateTime<Utc>,
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| Error::InvalidTimestamp(value.to_string(), err))
}

fn parse_optional_datetime(value: Option<String>) -> Result<Option<DateTime<Utc>>, Error> {
    value.as_deref().map(parse_datetime).transpose()
}

/// Carrier inventory, presence timestamps and movement log in one SQLite file.
pub struct SqlitePresenceStore {
    conn: Mutex<Connection>,
}

impl SqlitePresenceStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        info!("Presence database opened at {}", path.display());

        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, Error> {
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.conn.lock().map_err(|_| Error::Poisoned)
    }

    /// Adds a carrier to the inventory and returns the identity to print on
    /// its label.
    pub fn register_carrier(&self, goods: &str) -> Result<Identity, Error> {
        let conn = self.conn()?;
        conn.execute("INSERT INTO carriers (goods) VALUES (?1)", params![goods])?;

        Ok(conn.last_insert_rowid())
    }

    pub fn carrier(&self, id: Identity) -> Result<Option<Carrier>, Error> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT goods, first_seen, departed FROM carriers WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((goods, first_seen, departed)) => Ok(Some(Carrier {
                id,
                goods,
                presence: PresenceRecord {
                    first_seen: parse_optional_datetime(first_seen)?,
                    departed: parse_optional_datetime(departed)?,
                },
            })),
            None => Ok(None),
        }
    }

    /// Returns false if no such carrier exists.
    pub fn delete_carrier(&self, id: Identity) -> Result<bool, Error> {
        let conn = self.conn()?;
        let affected = conn.execute("DELETE FROM carriers WHERE id = ?1", params![id])?;

        Ok(affected > 0)
    }

    pub fn log_movement(
        &self,
        id: Identity,
        x: i32,
        y: i32,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO movement_log (carrier_id, x, y, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![id, x, y, at.to_rfc3339()],
        )?;

        Ok(())
    }

    pub fn movements(&self) -> Result<Vec<Movement>, Error> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT carrier_id, x, y, timestamp FROM movement_log ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Identity>(0)?,
                row.get::<_, i32>(1)?,
                row.get::<_, i32>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut movements = Vec::new();
        for row in rows {
            let (carrier_id, x, y, timestamp) = row?;
            movements.push(Movement {
                carrier_id,
                x,
                y,
                timestamp: parse_datetime(&timestamp)?,
            });
        }

        Ok(movements)
    }
}

impl PresenceNotifier for SqlitePresenceStore {
    fn on_arrival(&self, id: Identity, at: DateTime<Utc>) -> Result<(), Error> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let cleared = tx.execute(
            "UPDATE carriers SET departed = NULL WHERE id = ?1",
            params![id],
        )?;
        if cleared == 0 {
            return Err(Error::UnknownCarrier(id));
        }

        let opened = tx.execute(
            "UPDATE carriers SET first_seen = ?1 WHERE id = ?2 AND first_seen IS NULL",
            params![at.to_rfc3339(), id],
        )?;
        tx.commit()?;

        if opened > 0 {
            debug!("Carrier #{} first seen at {}", id, at);
        }

        Ok(())
    }

    fn on_departure(&self, id: Identity, at: DateTime<Utc>) -> Result<(), Error> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE carriers SET departed = ?1 WHERE id = ?2 AND departed IS NULL",
            params![at.to_rfc3339(), id],
        )?;

        if updated == 0 {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT id FROM carriers WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;

            if exists.is_none() {
                return Err(Error::UnknownCarrier(id));
            }

            debug!("Carrier #{} already marked as departed", id);
        }

        Ok(())
    }
}

impl PresenceLookup for SqlitePresenceStore {
    fn get(&self, id: Identity) -> Result<Option<PresenceRecord>, Error> {
        Ok(self.carrier(id)?.map(|c| c.presence))
    }
}
