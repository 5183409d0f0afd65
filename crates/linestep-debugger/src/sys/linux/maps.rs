use std::ops::Range;
use std::path::PathBuf;

use futures_util::TryStreamExt;
use nix::unistd::Pid;
use tokio::fs::File;
use tokio::io::BufReader;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use crate::{MappedRegion, ModuleRegistry};

/// Builds the module snapshot of the process with the given ID.
#[tracing::instrument(skip_all, fields(pid = pid.as_raw()))]
pub async fn build_module_registry(pid: Pid) -> crate::Result<ModuleRegistry> {
    let regions = read_mapped_regions(pid).await?;

    let registry = ModuleRegistry::load(regions).await;

    tracing::debug!(modules = registry.len(), "module registry built");

    Ok(registry)
}

/// Reads the file-backed regions of the process with the given ID.
///
/// Fails on the first malformed line.
pub async fn read_mapped_regions(pid: Pid) -> crate::Result<Vec<MappedRegion>> {
    let path: PathBuf = format!("/proc/{pid}/maps").into();

    let reader = File::open(&path)
        .await
        .map(BufReader::new)
        .map_err(|e| crate::Error::File(path.clone(), e))?;

    let mut lines = FramedRead::new(reader, LinesCodec::new());

    let mut regions = Vec::new();

    while let Some(line) = lines.try_next().await.map_err(|e| match e {
        LinesCodecError::Io(e) => crate::Error::File(path.clone(), e),
        e => crate::Error::File(path.clone(), std::io::Error::other(e)),
    })? {
        if let Some(region) = MapsEntry::parse(&line)?.into_region() {
            regions.push(region);
        }
    }

    Ok(regions)
}

/// Entry of a `/proc/<pid>/maps` file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapsEntry {
    /// Address range of the region.
    pub range: Range<u64>,

    /// Permission flags (e.g., `r-xp`).
    pub perms: String,

    /// Offset within the mapped file.
    pub offset: u64,

    /// Device (`major:minor`) of the mapped file.
    pub dev: String,

    /// Inode of the mapped file.
    pub inode: u64,

    /// Path of the mapped file, or pseudo-path (e.g., `[heap]`).
    pub path: Option<String>,
}

impl MapsEntry {
    /// Parses a line with the format `start-end perms offset dev inode [path]`.
    pub fn parse(line: &str) -> crate::Result<Self> {
        let malformed = || crate::Error::MalformedMapLine(line.to_owned());

        let mut fields = line.splitn(6, ' ');

        let (start, end) = fields
            .next()
            .and_then(|range| range.split_once('-'))
            .ok_or_else(malformed)?;

        let start = u64::from_str_radix(start, 16).map_err(|_| malformed())?;
        let end = u64::from_str_radix(end, 16).map_err(|_| malformed())?;

        if start > end {
            return Err(malformed());
        }

        let perms = fields
            .next()
            .filter(|perms| perms.len() == 4)
            .ok_or_else(malformed)?;

        let offset = fields
            .next()
            .and_then(|offset| u64::from_str_radix(offset, 16).ok())
            .ok_or_else(malformed)?;

        let dev = fields
            .next()
            .filter(|dev| dev.contains(':'))
            .ok_or_else(malformed)?;

        let inode = fields
            .next()
            .and_then(|inode| inode.parse().ok())
            .ok_or_else(malformed)?;

        let path = fields
            .next()
            .map(str::trim_start)
            .filter(|path| !path.is_empty())
            .map(ToOwned::to_owned);

        Ok(Self {
            range: start..end,
            perms: perms.to_owned(),
            offset,
            dev: dev.to_owned(),
            inode,
            path,
        })
    }

    /// Returns the region if it maps a file.
    pub fn into_region(self) -> Option<MappedRegion> {
        let path = self.path.filter(|path| path.starts_with('/'))?;

        Some(MappedRegion {
            range: self.range,
            offset: self.offset,
            path: path.into(),
        })
    }
}
