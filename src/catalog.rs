//! Item catalog and item selection
//!
//! The catalog is an externally supplied JSON array of item names;
//! item ids are positions in that array. The core only needs the
//! length (iteration range) and the labels for logging.

use std::fs;
use std::ops::Range;

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err)
    }
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(e) => write!(f, "Failed to read item catalog: {}", e),
            CatalogError::Parse(e) => write!(f, "Failed to parse item catalog: {}", e),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Ordered, read-only list of item names; the index is the item id
#[derive(Debug, Clone)]
pub struct ItemCatalog {
    names: Vec<String>,
}

impl ItemCatalog {
    pub fn load(path: &str) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path)?;
        let names: Vec<String> = serde_json::from_str(&json)?;
        Ok(Self { names })
    }

    pub fn from_names(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn label(&self, item_id: u32) -> Option<&str> {
        self.names.get(item_id as usize).map(String::as_str)
    }
}

/// Which items a run covers: the whole catalog or a single id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSelector {
    All,
    Single(u32),
}

impl ItemSelector {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(ItemSelector::All),
            _ => s.parse().ok().map(ItemSelector::Single),
        }
    }

    /// Item id range this selector covers within `catalog`.
    pub fn range(&self, catalog: &ItemCatalog) -> Range<u32> {
        match self {
            ItemSelector::All => 0..catalog.len() as u32,
            ItemSelector::Single(id) => *id..id + 1,
        }
    }
}

impl std::fmt::Display for ItemSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemSelector::All => write!(f, "all"),
            ItemSelector::Single(id) => write!(f, "{}", id),
        }
    }
}
