// Append-only record store: name -> (identity number, resolved area)
//
// The log file is the source of truth. Every successful insert appends a
// line and only then updates the in-memory map, so a crash between the
// two leaves a log that a reload fully recovers.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::area::{resolve_area, AreaIndex};
use crate::checksum;
use crate::error::{RegistryError, Result};

/// Field separator in the record log. The area name in the third field
/// may itself contain this character, so loading splits at most twice.
const LOG_DELIMITER: char = ',';

/// A stored name-to-identity-number association. Records are created by
/// insert or batch import and never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub id_number: String,
    /// Resolved at insert time and frozen into storage; never
    /// re-resolved on later reads.
    pub area_name: String,
}

/// Outcome of a successful [`RecordStore::insert`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new record was appended to the log and the map.
    Inserted,
    /// The name was already bound to the same number; nothing written.
    AlreadyPresent,
}

/// In-memory map over the append-only log.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    records: HashMap<String, Record>,
}

impl RecordStore {
    /// Loads the store from the log at `path`. A missing file is an
    /// empty store, not an error. Lines with fewer than two fields are
    /// silently skipped; a missing third field loads as an empty area
    /// name (the earliest log format had only two fields).
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut records = HashMap::new();

        if path.exists() {
            let file = File::open(&path)?;
            for line in BufReader::new(file).lines() {
                let line = line?;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let mut fields = line.splitn(3, LOG_DELIMITER);
                let name = fields.next().unwrap_or_default();
                let Some(id_number) = fields.next() else {
                    continue;
                };
                let area_name = fields.next().unwrap_or_default();
                records.insert(
                    name.to_string(),
                    Record {
                        name: name.to_string(),
                        id_number: id_number.to_string(),
                        area_name: area_name.to_string(),
                    },
                );
            }
        }

        Ok(RecordStore { path, records })
    }

    pub fn lookup(&self, name: &str) -> Option<&Record> {
        self.records.get(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validates, conflict-checks, and persists one record.
    ///
    /// A name already bound to the same number is an idempotent no-op;
    /// bound to a different number it is a [`RegistryError::Conflict`]
    /// and nothing is written. The area is resolved once here and frozen
    /// into the stored line.
    pub fn insert(
        &mut self,
        name: &str,
        id_number: &str,
        index: &AreaIndex,
    ) -> Result<InsertOutcome> {
        checksum::check(id_number)?;

        if let Some(existing) = self.records.get(name) {
            if existing.id_number == id_number {
                return Ok(InsertOutcome::AlreadyPresent);
            }
            return Err(RegistryError::Conflict {
                name: name.to_string(),
            });
        }

        let area_name = resolve_area(index, &id_number[..6]);

        // Append before touching the map: on a crash in between, the log
        // still holds the record and a reload recovers it.
        self.append_line(name, id_number, &area_name)?;
        self.records.insert(
            name.to_string(),
            Record {
                name: name.to_string(),
                id_number: id_number.to_string(),
                area_name,
            },
        );

        Ok(InsertOutcome::Inserted)
    }

    fn append_line(&self, name: &str, id_number: &str, area_name: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(
            file,
            "{}{}{}{}{}",
            name, LOG_DELIMITER, id_number, LOG_DELIMITER, area_name
        )?;
        file.flush()?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
