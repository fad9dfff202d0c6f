// Identity Registry - Core Library
// Validates and decodes 18-character identity numbers, resolves their
// administrative-area codes, and keeps name -> number records in an
// append-only log. The UI layer lives outside this crate; it hands in
// raw strings and renders what comes back.

pub mod area;
pub mod batch;
pub mod checksum;
pub mod decoder;
pub mod error;
pub mod store;

// Re-export commonly used types
pub use area::{build_area_index, load_area_index, resolve_area, AreaIndex, AreaNode, UNKNOWN_AREA};
pub use batch::{import_file, import_lines, spawn_import, BatchSummary, ImportEvent};
pub use checksum::{check, validate};
pub use decoder::{decode, Gender, IdentityInfo};
pub use error::{RegistryError, Result, ValidationKind};
pub use store::{InsertOutcome, Record, RecordStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
