/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// File open/read error.
    #[error("{0}: {1}")]
    File(std::path::PathBuf, std::io::Error),

    /// Error from the [goblin] crate.
    #[error(transparent)]
    Goblin(#[from] goblin::error::Error),

    /// Error from the [gimli] crate.
    #[error(transparent)]
    Dwarf(#[from] gimli::Error),

    /// The ELF file carries no DWARF compilation unit.
    #[error("missing .debug_info")]
    MissingDebugInfo,
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;
