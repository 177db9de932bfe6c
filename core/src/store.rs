//! SQLite persistence for sessions, event logs and snapshots.
//!
//! RULE: Only store.rs talks to the database.
//! The settlement core never calls it directly; it is reached through the
//! persistence subsystem (as a SnapshotSink) or by the host.

use crate::{
    error::EconomyResult,
    event::EventLogEntry,
    settlement::CycleReport,
    snapshot::{EconomySnapshot, SnapshotSink},
    types::Cycle,
};
use rusqlite::{params, Connection, OptionalExtension};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the economy database at `path`.
    pub fn open(path: &str) -> EconomyResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EconomyResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> EconomyResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Session ────────────────────────────────────────────────

    pub fn insert_session(&self, session_id: &str, seed: u64, version: &str) -> EconomyResult<()> {
        self.conn.execute(
            "INSERT INTO session (session_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, seed as i64, version, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> EconomyResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (session_id, cycle, source, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.session_id,
                entry.cycle as i64,
                entry.source,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    /// Persist every event of a cycle report, in order.
    pub fn append_report(&self, session_id: &str, report: &CycleReport) -> EconomyResult<()> {
        for sourced in &report.events {
            let entry = EventLogEntry::from_event(session_id, report.cycle, &sourced.source, &sourced.event)?;
            self.append_event(&entry)?;
        }
        Ok(())
    }

    pub fn events_for_cycle(&self, session_id: &str, cycle: Cycle) -> EconomyResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, cycle, source, event_type, payload
             FROM event_log WHERE session_id = ?1 AND cycle = ?2
             ORDER BY id ASC"
        )?;
        let entries = stmt.query_map(params![session_id, cycle as i64], |row| {
            Ok(EventLogEntry {
                id:         Some(row.get(0)?),
                session_id: row.get(1)?,
                cycle:      row.get::<_, i64>(2)? as u64,
                source:     row.get(3)?,
                event_type: row.get(4)?,
                payload:    row.get(5)?,
            })
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, session_id: &str, event_type: &str) -> EconomyResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE session_id = ?1 AND event_type = ?2",
            params![session_id, event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ── Snapshot ───────────────────────────────────────────────

    pub fn insert_snapshot(&self, snapshot: &EconomySnapshot) -> EconomyResult<()> {
        self.conn.execute(
            "INSERT INTO snapshot (session_id, cycle, state_json, saved_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                snapshot.session_id,
                snapshot.cycle as i64,
                snapshot.to_json()?,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn latest_snapshot(&self, session_id: &str) -> EconomyResult<Option<EconomySnapshot>> {
        let json: Option<String> = self.conn.query_row(
            "SELECT state_json FROM snapshot
             WHERE session_id = ?1
             ORDER BY cycle DESC, id DESC LIMIT 1",
            params![session_id],
            |row| row.get(0),
        ).optional()?;
        json.map(|j| EconomySnapshot::from_json(&j)).transpose()
    }

    pub fn snapshot_count(&self, session_id: &str) -> EconomyResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM snapshot WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl SnapshotSink for SqliteStore {
    fn save_snapshot(&mut self, snapshot: &EconomySnapshot) -> EconomyResult<()> {
        self.insert_snapshot(snapshot)?;
        log::debug!("Snapshot saved at cycle {}", snapshot.cycle);
        Ok(())
    }
}
