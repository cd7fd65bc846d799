use crate::catalog::{BuiltinCatalog, CatalogError};
use plantdb_format::StoreLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_YIELD_EVERY: u16 = 20;
pub const DEFAULT_MAX_PAGE: u16 = 32;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid options in {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode options")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `options.json` as stored: every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provision: Option<ProvisionPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<ListPatch>,
    /// Species table replacing the compiled-in one; relative paths resolve
    /// against the store root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisionPatch {
    pub yield_every: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListPatch {
    pub max_page: Option<u16>,
}

/// Options with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreOptions {
    /// Species provisioned between cooperative yields; 0 never yields.
    pub yield_every: u16,
    /// Upper bound on entries returned by one listing call.
    pub max_page: u16,
    pub catalog_path: Option<PathBuf>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            yield_every: DEFAULT_YIELD_EVERY,
            max_page: DEFAULT_MAX_PAGE,
            catalog_path: None,
        }
    }
}

impl StoreOptions {
    /// Reads `<root>/options.json`; defaults when the file does not exist.
    pub fn load(layout: &StoreLayout) -> Result<Self, OptionsError> {
        let path = layout.options_path();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(OptionsError::Read { path, source }),
        };
        let record: OptionsRecord =
            serde_json::from_str(&text).map_err(|source| OptionsError::Parse {
                path: path.clone(),
                source,
            })?;
        Ok(Self::resolve(&record, layout.root()))
    }

    pub fn resolve(record: &OptionsRecord, root: &Path) -> Self {
        let defaults = Self::default();
        Self {
            yield_every: record
                .provision
                .as_ref()
                .and_then(|p| p.yield_every)
                .unwrap_or(defaults.yield_every),
            max_page: record
                .list
                .as_ref()
                .and_then(|l| l.max_page)
                .unwrap_or(defaults.max_page)
                .max(1),
            catalog_path: record.catalog_path.as_ref().map(|p| root.join(p)),
        }
    }

    /// Writes `record` as pretty JSON to `<root>/options.json`.
    pub fn save(layout: &StoreLayout, record: &OptionsRecord) -> Result<(), OptionsError> {
        let path = layout.options_path();
        let mut text = serde_json::to_string_pretty(record)?;
        text.push('\n');
        std::fs::write(&path, text).map_err(|source| OptionsError::Write { path, source })
    }

    /// The configured species table, or the compiled-in one.
    pub fn catalog(&self) -> Result<BuiltinCatalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => BuiltinCatalog::load(path),
            None => BuiltinCatalog::standard(),
        }
    }
}
