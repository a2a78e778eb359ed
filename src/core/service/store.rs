//! Trade persistence port.
//!
//! The engine only requires an append-only writer for trade records and a
//! periodic position snapshot; anything richer (relational stores,
//! dashboards) subscribes to the bus instead.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;
use serde::Serialize;

use crate::core::domain::{MarketRef, Position, TradeRecord};
use crate::error::Result;

/// Append-only trade persistence.
pub trait TradeStore: Send + Sync {
    /// Append a terminal trade record.
    fn append(&self, record: &TradeRecord) -> Result<()>;

    /// Write a point-in-time position snapshot.
    fn snapshot_positions(&self, positions: &[(MarketRef, Position)]) -> Result<()>;
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StoreLine<'a> {
    Trade { record: &'a TradeRecord },
    Positions {
        at: chrono::DateTime<chrono::Utc>,
        positions: &'a [(MarketRef, Position)],
    },
}

/// JSON-lines trade store: one self-describing record per line.
pub struct JsonlTradeStore {
    file: Mutex<File>,
}

impl JsonlTradeStore {
    /// Open (or create) the store file for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    fn write_line(&self, line: &StoreLine<'_>) -> Result<()> {
        let mut encoded = serde_json::to_vec(line)?;
        encoded.push(b'\n');
        let mut file = self.file.lock();
        file.write_all(&encoded)?;
        file.flush()?;
        Ok(())
    }
}

impl TradeStore for JsonlTradeStore {
    fn append(&self, record: &TradeRecord) -> Result<()> {
        self.write_line(&StoreLine::Trade { record })
    }

    fn snapshot_positions(&self, positions: &[(MarketRef, Position)]) -> Result<()> {
        self.write_line(&StoreLine::Positions {
            at: chrono::Utc::now(),
            positions,
        })
    }
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct MemoryTradeStore {
    records: Mutex<Vec<TradeRecord>>,
    snapshots: Mutex<Vec<Vec<(MarketRef, Position)>>>,
}

impl MemoryTradeStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All appended trade records.
    #[must_use]
    pub fn records(&self) -> Vec<TradeRecord> {
        self.records.lock().clone()
    }

    /// Number of position snapshots taken.
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.lock().len()
    }
}

impl TradeStore for MemoryTradeStore {
    fn append(&self, record: &TradeRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn snapshot_positions(&self, positions: &[(MarketRef, Position)]) -> Result<()> {
        self.snapshots.lock().push(positions.to_vec());
        Ok(())
    }
}
