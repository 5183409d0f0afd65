use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use linestep_symbol::{CompilationUnit, DebugInfo, LinkageType};

/// File-backed region of the debuggee's address space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappedRegion {
    /// Run-time address range (half-open).
    pub range: Range<u64>,

    /// Offset within the file of the region's first byte.
    pub offset: u64,

    /// Path of the mapped file.
    pub path: PathBuf,
}

/// Module (binary) mapped in the debuggee's address space.
#[derive(Clone, Debug)]
pub struct Module {
    path: PathBuf,
    range: Range<u64>,
    load_base: u64,
    linkage: LinkageType,
    units: Option<Arc<[CompilationUnit]>>,
}

impl Module {
    /// Creates a new module covering the given address range.
    ///
    /// The load base is the start of the range.
    pub fn new(
        path: impl Into<PathBuf>,
        range: Range<u64>,
        linkage: LinkageType,
        units: Option<Arc<[CompilationUnit]>>,
    ) -> Self {
        Self {
            path: path.into(),
            load_base: range.start,
            range,
            linkage,
            units,
        }
    }

    /// Sets the address at which the module's file was loaded.
    pub const fn with_load_base(mut self, load_base: u64) -> Self {
        self.load_base = load_base;
        self
    }

    fn from_region(region: MappedRegion, info: &DebugInfo) -> Self {
        let load_base = region.range.start.wrapping_sub(region.offset);

        Self::new(region.path, region.range, info.linkage(), info.shared_units())
            .with_load_base(load_base)
    }

    /// Returns the path of the module's file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the run-time address range of the module.
    pub const fn range(&self) -> &Range<u64> {
        &self.range
    }

    /// Returns the address at which the module's file was loaded.
    pub const fn load_base(&self) -> u64 {
        self.load_base
    }

    /// Returns the linkage type of the module's file.
    pub const fn linkage(&self) -> LinkageType {
        self.linkage
    }

    /// Returns the DWARF compilation units of the module, if any.
    pub fn units(&self) -> Option<&[CompilationUnit]> {
        self.units.as_deref()
    }

    /// Returns whether the module carries debug information.
    pub const fn has_debug_info(&self) -> bool {
        self.units.is_some()
    }

    /// Returns whether the given run-time address belongs to the module.
    pub fn contains(&self, addr: u64) -> bool {
        self.range.contains(&addr)
    }
}

/// Reads the debug information of a mapped file, unless it is not a
/// regular file (e.g., a mapped device).
async fn load_debug_info(path: &Path) -> Option<DebugInfo> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => (),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "skipping mapping of a non-regular file");
            return None;
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "skipping mapped file");
            return None;
        }
    }

    DebugInfo::from_path(path)
        .await
        .inspect_err(|err| tracing::warn!(error = %err, "skipping mapped file"))
        .ok()
}

/// Snapshot of the modules mapped in the debuggee.
#[derive(Clone, Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<Module>,
}

impl ModuleRegistry {
    /// Creates a registry from the given modules.
    pub const fn new(modules: Vec<Module>) -> Self {
        Self { modules }
    }

    /// Builds a registry from file-backed regions.
    ///
    /// Every file is read once, and its compilation units are shared by all
    /// of its regions. Regions whose file cannot be read are skipped.
    #[tracing::instrument(name = "ModuleRegistryLoad", skip_all)]
    pub async fn load(regions: impl IntoIterator<Item = MappedRegion>) -> Self {
        let mut infos = HashMap::<PathBuf, Option<DebugInfo>>::new();
        let mut modules = Vec::new();

        for region in regions {
            let info = match infos.entry(region.path.clone()) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let info = load_debug_info(e.key()).await;
                    e.insert(info)
                }
            };

            let Some(info) = info else {
                continue;
            };

            let module = Module::from_region(region, info);

            tracing::debug!(
                path = %module.path.display(),
                start = format_args!("{:#x}", module.range.start),
                end = format_args!("{:#x}", module.range.end),
                linkage = %module.linkage,
                debug_info = module.has_debug_info(),
                "module loaded"
            );

            modules.push(module);
        }

        Self::new(modules)
    }

    /// Returns the first module containing the given run-time address.
    pub fn find(&self, addr: u64) -> Option<&Module> {
        self.modules.iter().find(|module| module.contains(addr))
    }

    /// Returns the first module whose file has the given path.
    pub fn find_by_path(&self, path: &Path) -> Option<&Module> {
        self.modules.iter().find(|module| module.path == path)
    }

    /// Returns an iterator over the modules, in address-space order.
    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// Returns the number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns whether the registry holds no module.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
