use std::sync::Arc;

use linestep_symbol::LineRow;

use super::module::Module;

/// Source location of an instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineEntry {
    /// Address of the line's first instruction, as a module file offset.
    pub address: u64,

    /// Source file path.
    pub file: Arc<str>,

    /// Source line.
    pub line: u32,
}

impl From<&LineRow> for LineEntry {
    fn from(row: &LineRow) -> Self {
        Self {
            address: row.address,
            file: row.file.clone(),
            line: row.line,
        }
    }
}

/// Reason why an address or function could not be resolved.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum LookupError {
    /// The address belongs to no known module.
    #[error("address {0:#x} is not mapped by any module")]
    Unmapped(u64),

    /// The module carries no debug information.
    #[error("no debug information available")]
    NoDebugInfo,

    /// No line table row covers the address.
    #[error("no line information available")]
    NoLineInfo,

    /// No named entry with a start address matches the function.
    #[error("function {0} not found")]
    FunctionNotFound(String),
}

/// Resolves the source line of the given run-time address.
pub fn resolve_line(module: &Module, addr: u64) -> Result<LineEntry, LookupError> {
    let units = module.units().ok_or(LookupError::NoDebugInfo)?;

    let offset = module.to_file_offset(addr);

    let table = units
        .iter()
        .find(|unit| unit.contains(offset))
        .map(|unit| unit.line_table())
        .ok_or(LookupError::NoLineInfo)?;

    table
        .find_address(offset)
        .and_then(|index| table.row(index))
        .map(LineEntry::from)
        .ok_or(LookupError::NoLineInfo)
}

/// Resolves the first source line of a function's body.
///
/// The line table row covering the function's start address belongs to its
/// prologue, so the entry of the next row with a greater address is returned
/// instead.
pub fn resolve_function_entry(module: &Module, name: &str) -> Result<LineEntry, LookupError> {
    let units = module.units().ok_or(LookupError::NoDebugInfo)?;

    let (unit, low_pc) = units
        .iter()
        .find_map(|unit| {
            unit.entries()
                .iter()
                .filter(|entry| entry.name == name)
                .find_map(|entry| entry.low_pc)
                .map(|low_pc| (unit, low_pc))
        })
        .ok_or_else(|| LookupError::FunctionNotFound(name.to_owned()))?;

    let table = unit.line_table();

    let entry = table
        .find_address(low_pc)
        .and_then(|index| table.next_row_after(index))
        .and_then(|index| table.row(index))
        .map(LineEntry::from)
        .ok_or(LookupError::NoLineInfo)?;

    tracing::debug!(
        function = name,
        low_pc = format_args!("{low_pc:#x}"),
        entry = format_args!("{:#x}", entry.address),
        "function entry resolved"
    );

    Ok(entry)
}

/// Returns an iterator over every line table row of the module.
pub fn line_rows(module: &Module) -> impl Iterator<Item = &LineRow> {
    module
        .units()
        .into_iter()
        .flatten()
        .flat_map(|unit| unit.line_table().rows())
}
