use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use gimli::Reader as _;
use goblin::elf::Elf;

type Reader = gimli::EndianArcSlice<gimli::RunTimeEndian>;

/// DWARF compilation unit.
#[derive(Clone, Debug)]
pub struct CompilationUnit {
    name: Option<String>,
    pc_ranges: Vec<Range<u64>>,
    line_table: LineTable,
    entries: Vec<DebugEntry>,
}

impl CompilationUnit {
    /// Creates a compilation unit from its parts.
    pub fn new(
        name: Option<String>,
        pc_ranges: Vec<Range<u64>>,
        line_table: LineTable,
        entries: Vec<DebugEntry>,
    ) -> Self {
        Self {
            name,
            pc_ranges,
            line_table,
            entries,
        }
    }

    /// Returns the name of the unit (usually its primary source file).
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the program-counter ranges covered by the unit.
    pub fn pc_ranges(&self) -> &[Range<u64>] {
        &self.pc_ranges
    }

    /// Returns whether any of the unit's ranges contains the given address.
    pub fn contains(&self, addr: u64) -> bool {
        self.pc_ranges.iter().any(|range| range.contains(&addr))
    }

    /// Returns the line table of the unit.
    pub fn line_table(&self) -> &LineTable {
        &self.line_table
    }

    /// Returns the top-level named entries of the unit.
    pub fn entries(&self) -> &[DebugEntry] {
        &self.entries
    }

    fn parse(dwarf: &gimli::Dwarf<Reader>, unit: &gimli::Unit<Reader>) -> crate::Result<Self> {
        let name = unit
            .name
            .as_ref()
            .map(|name| name.to_string_lossy().map(Cow::into_owned))
            .transpose()?;

        let mut pc_ranges = Vec::new();
        let mut ranges = dwarf.unit_ranges(unit)?;

        while let Some(range) = ranges.next()? {
            if range.begin < range.end {
                pc_ranges.push(range.begin..range.end);
            }
        }

        let line_table = LineTable::parse(dwarf, unit)?;
        let entries = DebugEntry::parse_top_level(dwarf, unit)?;

        Ok(Self::new(name, pc_ranges, line_table, entries))
    }
}

/// Kind of a debug entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Subprogram (`DW_TAG_subprogram`).
    Function,

    /// Variable (`DW_TAG_variable`).
    Variable,

    /// Any other tag (types, namespaces, ...).
    Other,
}

impl From<gimli::DwTag> for EntryKind {
    fn from(tag: gimli::DwTag) -> Self {
        match tag {
            gimli::DW_TAG_subprogram => Self::Function,
            gimli::DW_TAG_variable => Self::Variable,
            _ => Self::Other,
        }
    }
}

/// Top-level named entry of a compilation unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugEntry {
    /// Kind of the entry.
    pub kind: EntryKind,

    /// Name of the entry.
    pub name: String,

    /// Lowest address of the entry, if any.
    pub low_pc: Option<u64>,
}

impl DebugEntry {
    fn parse_top_level(
        dwarf: &gimli::Dwarf<Reader>,
        unit: &gimli::Unit<Reader>,
    ) -> crate::Result<Vec<Self>> {
        let mut entries = Vec::new();

        let mut tree = unit.entries_tree(None)?;
        let root = tree.root()?;
        let mut children = root.children();

        while let Some(child) = children.next()? {
            let entry = child.entry();

            let Some(name) = entry.attr_value(gimli::DW_AT_name)? else {
                continue;
            };

            let name = dwarf.attr_string(unit, name)?.to_string_lossy()?.into_owned();

            let low_pc = match entry.attr_value(gimli::DW_AT_low_pc)? {
                Some(value) => dwarf.attr_address(unit, value)?,
                None => None,
            };

            entries.push(Self {
                kind: entry.tag().into(),
                name,
                low_pc,
            });
        }

        Ok(entries)
    }
}

/// Row of a line table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineRow {
    /// Address of the first instruction of the row.
    pub address: u64,

    /// Source file path.
    pub file: Arc<str>,

    /// Source line (0 when the instruction has no line).
    pub line: u32,

    /// Whether the row terminates a sequence.
    ///
    /// Its address is the first address past the sequence.
    pub end_sequence: bool,
}

/// Line table of a compilation unit, in line-program order.
#[derive(Clone, Debug, Default)]
pub struct LineTable {
    rows: Vec<LineRow>,
}

impl LineTable {
    /// Creates a line table from rows in line-program order.
    pub fn new(rows: Vec<LineRow>) -> Self {
        Self { rows }
    }

    /// Returns all the rows of the table.
    pub fn rows(&self) -> &[LineRow] {
        &self.rows
    }

    /// Returns the row at the given index.
    pub fn row(&self, index: usize) -> Option<&LineRow> {
        self.rows.get(index)
    }

    /// Returns the index of the row covering the given address.
    ///
    /// A row covers the addresses from its own up to (excluding) the address
    /// of the next row of the same sequence.
    pub fn find_address(&self, addr: u64) -> Option<usize> {
        self.rows.windows(2).position(|rows| {
            !rows[0].end_sequence && rows[0].address <= addr && addr < rows[1].address
        })
    }

    /// Returns the index of the first row following `index` in the same
    /// sequence whose address is strictly greater.
    pub fn next_row_after(&self, index: usize) -> Option<usize> {
        let current = self.rows.get(index)?;

        if current.end_sequence {
            return None;
        }

        self.rows
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, row)| row.end_sequence || row.address > current.address)
            .filter(|(_, row)| !row.end_sequence)
            .map(|(i, _)| i)
    }

    fn parse(dwarf: &gimli::Dwarf<Reader>, unit: &gimli::Unit<Reader>) -> crate::Result<Self> {
        let Some(program) = unit.line_program.clone() else {
            return Ok(Self::default());
        };

        let mut rows = Vec::new();
        let mut files = HashMap::<u64, Arc<str>>::new();

        let mut program_rows = program.rows();

        while let Some((header, row)) = program_rows.next_row()? {
            let file = match files.get(&row.file_index()) {
                Some(file) => file.clone(),
                None => {
                    let file: Arc<str> = render_file(dwarf, unit, header, row.file(header))?.into();
                    files.insert(row.file_index(), file.clone());
                    file
                }
            };

            let line = row
                .line()
                .map(|line| u32::try_from(line.get()).unwrap_or(u32::MAX))
                .unwrap_or_default();

            rows.push(LineRow {
                address: row.address(),
                file,
                line,
                end_sequence: row.end_sequence(),
            });
        }

        Ok(Self::new(rows))
    }
}

fn render_file(
    dwarf: &gimli::Dwarf<Reader>,
    unit: &gimli::Unit<Reader>,
    header: &gimli::LineProgramHeader<Reader>,
    file: Option<&gimli::FileEntry<Reader>>,
) -> crate::Result<String> {
    let Some(file) = file else {
        return Ok(String::from("<unknown>"));
    };

    let mut path = match unit.comp_dir {
        Some(ref dir) => dir.to_string_lossy()?.into_owned(),
        None => String::new(),
    };

    if file.directory_index() != 0 {
        if let Some(dir) = file.directory(header) {
            let dir = dwarf.attr_string(unit, dir)?;
            push_path(&mut path, &dir.to_string_lossy()?);
        }
    }

    let name = dwarf.attr_string(unit, file.path_name())?;
    push_path(&mut path, &name.to_string_lossy()?);

    Ok(path)
}

fn push_path(path: &mut String, component: &str) {
    if component.starts_with('/') || path.is_empty() {
        *path = component.to_owned();
    } else {
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(component);
    }
}

/// Parses every compilation unit of the given ELF file.
///
/// Fails with [`MissingDebugInfo`](crate::Error::MissingDebugInfo) if the
/// file carries no `.debug_info`, or if it holds no unit.
pub(crate) fn parse_compilation_units(
    elf: &Elf<'_>,
    data: &[u8],
) -> crate::Result<Vec<CompilationUnit>> {
    if crate::elf::section_data(elf, data, ".debug_info").is_none_or(<[u8]>::is_empty) {
        return Err(crate::Error::MissingDebugInfo);
    }

    let endian = if elf.little_endian {
        gimli::RunTimeEndian::Little
    } else {
        gimli::RunTimeEndian::Big
    };

    let dwarf = gimli::Dwarf::load(|id| {
        let section = crate::elf::section_data(elf, data, id.name()).unwrap_or_default();
        Ok::<_, gimli::Error>(Reader::new(Arc::from(section), endian))
    })?;

    let mut units = Vec::new();
    let mut headers = dwarf.units();

    while let Some(header) = headers.next()? {
        let unit = dwarf.unit(header)?;
        units.push(CompilationUnit::parse(&dwarf, &unit)?);
    }

    if units.is_empty() {
        return Err(crate::Error::MissingDebugInfo);
    }

    Ok(units)
}
