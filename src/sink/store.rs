//! Database writer for SQLite

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::debug;

use super::summary::ChannelSummary;
use crate::frame::FrameRecord;

/// Table holding one row per channel, upserted at shutdown
pub const SUMMARY_TABLE: &str = "sniff_summary";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid table name {0:?}")]
    InvalidTable(String),
}

/// Append-capable frame table plus upsert-by-key summary
pub trait FrameStore: Send {
    /// Start a fresh per-channel frame table
    fn prepare_table(&mut self, table: &str) -> Result<(), StoreError>;

    /// Append one frame record (one transaction)
    fn insert_frame(&mut self, table: &str, record: &FrameRecord) -> Result<(), StoreError>;

    /// Insert or replace the summary row for `summary.channel`
    fn upsert_summary(&mut self, summary: &ChannelSummary) -> Result<(), StoreError>;
}

/// Table names are interpolated into SQL, so only `[A-Za-z0-9_]` is allowed
fn checked_table(table: &str) -> Result<&str, StoreError> {
    if !table.is_empty() && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(table)
    } else {
        Err(StoreError::InvalidTable(table.to_string()))
    }
}

/// SQLite-backed frame store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory database
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {SUMMARY_TABLE} (
                    Channel TEXT PRIMARY KEY,
                    TotalPackets INTEGER,
                    TotalTime_s REAL
                )"
            ),
            [],
        )?;
        Ok(Self { conn })
    }

    /// Number of rows in a frame table
    #[cfg(test)]
    pub fn count_frames(&self, table: &str) -> Result<u64, StoreError> {
        let table = checked_table(table)?;
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Read back the summary row for a channel
    #[cfg(test)]
    pub fn load_summary(&self, channel: &str) -> Result<Option<ChannelSummary>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT Channel, TotalPackets, TotalTime_s FROM {SUMMARY_TABLE} WHERE Channel = ?1"
        ))?;
        let mut rows = stmt.query(params![channel])?;

        match rows.next()? {
            Some(row) => Ok(Some(ChannelSummary {
                channel: row.get(0)?,
                packet_count: row.get::<_, i64>(1)? as u64,
                total_time_seconds: row.get(2)?,
            })),
            None => Ok(None),
        }
    }
}

impl FrameStore for SqliteStore {
    fn prepare_table(&mut self, table: &str) -> Result<(), StoreError> {
        let table = checked_table(table)?;
        debug!("Recreating frame table {}", table);

        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};
             CREATE TABLE {table} (
                Timestamp TEXT,
                SFD TEXT,
                PHR TEXT,
                FrameType TEXT,
                AckRequest INTEGER,
                DestAddrMode TEXT,
                SrcAddrMode TEXT,
                SeqNum TEXT,
                PAN_ID TEXT,
                DestAddr TEXT,
                SrcAddr TEXT,
                PSDU TEXT,
                CRC_16 TEXT,
                CRC_Check INTEGER,
                PacketDuration_ms REAL
             );"
        ))?;
        Ok(())
    }

    fn insert_frame(&mut self, table: &str, record: &FrameRecord) -> Result<(), StoreError> {
        let table = checked_table(table)?;
        let header = &record.header;

        let tx = self.conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO {table} VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                record.timestamp,
                record.sfd,
                record.phr,
                header.frame_type(),
                header.ack_requested(),
                header.dest_addr_mode(),
                header.src_addr_mode(),
                header.sequence_number,
                header.pan_id,
                header.dest_address,
                header.src_address,
                record.psdu,
                record.crc,
                record.crc_valid,
                record.duration_ms,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn upsert_summary(&mut self, summary: &ChannelSummary) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO {SUMMARY_TABLE} (Channel, TotalPackets, TotalTime_s)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(Channel) DO UPDATE SET
                    TotalPackets = excluded.TotalPackets,
                    TotalTime_s = excluded.TotalTime_s"
            ),
            params![
                summary.channel,
                summary.packet_count as i64,
                summary.total_time_seconds,
            ],
        )?;
        Ok(())
    }
}
