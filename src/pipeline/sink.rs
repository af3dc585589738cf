//! Handing results to a persistence layer.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::model::ExtractionResult;

/// Accepts extraction results keyed by a caller-chosen document id.
pub trait ExtractionSink {
    fn store(&self, document_id: &str, result: &ExtractionResult) -> Result<()>;
}

/// Writes each result to `{dir}/{document_id}.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
    pretty: bool,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn path_for(&self, document_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", document_id))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExtractionSink for JsonFileSink {
    fn store(&self, document_id: &str, result: &ExtractionResult) -> Result<()> {
        if document_id.is_empty() || document_id.contains(['/', '\\']) || document_id == ".." {
            return Err(Error::Config(format!("invalid document id {:?}", document_id)));
        }
        fs::create_dir_all(&self.dir)?;

        let json = if self.pretty {
            serde_json::to_vec_pretty(result)?
        } else {
            serde_json::to_vec(result)?
        };

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&json)?;
        tmp.persist(self.path_for(document_id))
            .map_err(|e| Error::Io(e.error))?;
        log::debug!("Stored {} entries for {}", result.entry_count(), document_id);
        Ok(())
    }
}
