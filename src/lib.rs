//! Swiss ledger tooling
//!
//! A library importing Crésus accounting journals into a double-entry
//! record store, and exporting payment orders as SEPA messages.
//!
//! # Components
//!
//! - **Crésus import**: tab-separated journal exports regrouped into balanced moves
//! - **Record store**: lookup/persistence port with an in-memory implementation
//! - **SEPA export**: pain.001.001.03 credit transfer initiation, schema checked
//!
//! # Examples
//!
//! ## Importing a Crésus journal
//!
//! ```no_run
//! use std::fs::{self, File};
//! use ch_ledger::import::{CresusImport, ImportResult};
//! use ch_ledger::store::{Chart, MemoryStore};
//!
//! let chart = Chart::from_read(File::open("chart.json")?)?;
//! let journal = chart.journal("MISC").cloned().expect("journal MISC");
//! let mut store = MemoryStore::new(chart);
//!
//! let mut import = CresusImport::new(journal);
//! match import.import_file(&fs::read("journal.txt")?, &mut store) {
//!     ImportResult::Success(ids) => println!("{} moves imported", ids.len()),
//!     ImportResult::Failure { .. } => eprintln!("{}", import.report().unwrap_or_default()),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod cresus_format;
pub mod error;
pub mod import;
pub mod reconstruct;
pub mod sepa;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use import::{CresusImport, ImportResult, ImportState};
pub use store::{LedgerLookup, LedgerStore, MemoryStore};
pub use types::{Journal, Move, MoveId, MoveLine, RawRow};
