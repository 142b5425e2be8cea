//! Tabular sheet model and the source abstraction the lookup pipeline reads from.

pub mod table;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use table::{strip_whitespace, HeaderMap, SheetTable};

/// Address of one sheet inside the configured spreadsheet.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetRef {
    Name(String),
    Gid(String),
}

impl SheetRef {
    pub fn name(value: impl Into<String>) -> Self {
        Self::Name(value.into())
    }

    pub fn gid(value: impl Into<String>) -> Self {
        Self::Gid(value.into())
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Gid(gid) => write!(f, "gid:{gid}"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SheetFetchError {
    #[error("request for sheet `{sheet}` failed: {message}")]
    Transport { sheet: String, message: String },
    #[error("request for sheet `{sheet}` timed out")]
    Timeout { sheet: String },
    #[error("sheet `{sheet}` returned HTTP {status}")]
    Status { sheet: String, status: u16 },
    #[error("sheet `{sheet}` could not be decoded: {message}")]
    Decode { sheet: String, message: String },
    #[error("sheet client could not be built: {0}")]
    Client(String),
}

#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch(&self, sheet: &SheetRef) -> Result<SheetTable, SheetFetchError>;
}

/// Fixed tables keyed by sheet reference; unknown sheets fail like an
/// unreachable source. Counts fetches so callers can observe that nothing is cached.
#[derive(Default)]
pub struct InMemorySheetSource {
    tables: Mutex<HashMap<SheetRef, SheetTable>>,
    fetches: AtomicUsize,
}

impl InMemorySheetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, sheet: SheetRef, table: SheetTable) -> Self {
        self.insert(sheet, table);
        self
    }

    pub fn insert(&self, sheet: SheetRef, table: SheetTable) {
        match self.tables.lock() {
            Ok(mut tables) => tables.insert(sheet, table),
            Err(poisoned) => poisoned.into_inner().insert(sheet, table),
        };
    }

    pub fn remove(&self, sheet: &SheetRef) {
        match self.tables.lock() {
            Ok(mut tables) => tables.remove(sheet),
            Err(poisoned) => poisoned.into_inner().remove(sheet),
        };
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SheetSource for InMemorySheetSource {
    async fn fetch(&self, sheet: &SheetRef) -> Result<SheetTable, SheetFetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let table = match self.tables.lock() {
            Ok(tables) => tables.get(sheet).cloned(),
            Err(poisoned) => poisoned.into_inner().get(sheet).cloned(),
        };
        table.ok_or_else(|| SheetFetchError::Transport {
            sheet: sheet.to_string(),
            message: "sheet is not available".to_owned(),
        })
    }
}
