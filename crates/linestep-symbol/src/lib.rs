//! This crate provides the debug information consumed by `linestep`: the
//! linkage type of an ELF file and its DWARF compilation units (line tables
//! and top-level named entries).
//!
//! # Example
//!
//! ```no_run
//! use linestep_symbol::DebugInfo;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let info = DebugInfo::from_path("/usr/bin/ls").await.unwrap();
//!
//!     for unit in info.units().into_iter().flatten() {
//!         for row in unit.line_table().rows() {
//!             println!("{:#x} {}:{}", row.address, row.file, row.line);
//!         }
//!     }
//! }
//! ```

/// Module handling DWARF compilation units.
pub mod dwarf;

/// Module handling the ELF format.
pub mod elf;

mod error;

pub use self::dwarf::{CompilationUnit, DebugEntry, EntryKind, LineRow, LineTable};
pub use self::elf::{DebugInfo, LinkageType};
pub use self::error::{Error, Result};
