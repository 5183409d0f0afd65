use std::fmt;
use std::path::Path;
use std::sync::Arc;

use goblin::elf::Elf;
use goblin::elf::header::{ET_DYN, ET_EXEC};

use crate::dwarf::CompilationUnit;

/// Linkage type of an ELF file.
///
/// It tells how addresses found in the file relate to addresses observed
/// at run-time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkageType {
    /// Statically positioned executable (`ET_EXEC`).
    ///
    /// Link-time addresses are run-time addresses.
    Executable,

    /// Position-independent executable or shared object (`ET_DYN`).
    ///
    /// Addresses are relative to the load base chosen at run-time.
    PositionIndependent,

    /// Any other ELF type, or a file that could not be parsed as ELF.
    Other,
}

impl LinkageType {
    /// Returns the linkage type associated with the given `e_type` value.
    pub const fn from_elf_type(e_type: u16) -> Self {
        match e_type {
            ET_EXEC => Self::Executable,
            ET_DYN => Self::PositionIndependent,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for LinkageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Executable => f.write_str("exec"),
            Self::PositionIndependent => f.write_str("dyn"),
            Self::Other => f.write_str("other"),
        }
    }
}

/// Debug information of an ELF file.
#[derive(Clone, Debug)]
pub struct DebugInfo {
    /// Linkage type of the file.
    linkage: LinkageType,

    /// DWARF compilation units, if the file carries any.
    units: Option<Arc<[CompilationUnit]>>,
}

impl DebugInfo {
    /// Creates debug information from its parts.
    pub fn new(linkage: LinkageType, units: Option<Vec<CompilationUnit>>) -> Self {
        Self {
            linkage,
            units: units.map(Into::into),
        }
    }

    /// Reads and parses the ELF file at the given path.
    ///
    /// Only failing to read the file is an error: a file which is not an ELF,
    /// or which carries no (or broken) DWARF, yields debug information
    /// without compilation units.
    pub async fn from_path(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| crate::Error::File(path.to_path_buf(), e))?;

        let info = Self::parse(&data);

        tracing::debug!(
            path = %path.display(),
            linkage = %info.linkage,
            units = info.units().map(<[_]>::len).unwrap_or_default(),
            "parsed debug info"
        );

        Ok(info)
    }

    /// Parses debug information from the raw content of an ELF file.
    pub fn parse(data: &[u8]) -> Self {
        let elf = match Elf::parse(data) {
            Ok(elf) => elf,
            Err(e) => {
                tracing::debug!(error = %e, "not an ELF file");
                return Self::new(LinkageType::Other, None);
            }
        };

        let linkage = LinkageType::from_elf_type(elf.header.e_type);

        let units = crate::dwarf::parse_compilation_units(&elf, data)
            .inspect_err(|e| tracing::debug!(error = %e, "no usable DWARF"))
            .ok();

        Self::new(linkage, units)
    }

    /// Returns the linkage type of the file.
    pub const fn linkage(&self) -> LinkageType {
        self.linkage
    }

    /// Returns the compilation units of the file, if any.
    pub fn units(&self) -> Option<&[CompilationUnit]> {
        self.units.as_deref()
    }

    /// Returns a shared handle over the compilation units of the file, if any.
    pub fn shared_units(&self) -> Option<Arc<[CompilationUnit]>> {
        self.units.clone()
    }
}

/// Returns the file content of the section with the given name.
pub(crate) fn section_data<'a>(elf: &Elf<'_>, data: &'a [u8], name: &str) -> Option<&'a [u8]> {
    elf.section_headers
        .iter()
        .find(|shdr| elf.shdr_strtab.get_at(shdr.sh_name) == Some(name))
        .and_then(|shdr| shdr.file_range())
        .and_then(|range| data.get(range))
}

#[cfg(test)]
mod tests {
    use goblin::elf::header::{ET_CORE, ET_DYN, ET_EXEC, ET_REL};

    use super::{DebugInfo, LinkageType};

    #[test]
    fn linkage_from_elf_type() {
        assert_eq!(LinkageType::from_elf_type(ET_EXEC), LinkageType::Executable);
        assert_eq!(
            LinkageType::from_elf_type(ET_DYN),
            LinkageType::PositionIndependent
        );
        assert_eq!(LinkageType::from_elf_type(ET_REL), LinkageType::Other);
        assert_eq!(LinkageType::from_elf_type(ET_CORE), LinkageType::Other);
    }

    #[test]
    fn non_elf_data_has_no_units() {
        let info = DebugInfo::parse(b"# locale archive, definitely not an ELF");

        assert_eq!(info.linkage(), LinkageType::Other);
        assert!(info.units().is_none());
    }
}
