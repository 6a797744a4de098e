//! Multi-file scan: run the engine per file and merge into one catalog.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, SegyError};
use crate::pipeline::WorkerPool;
use crate::storage::{list_files, LocalFs, Storage};

use super::engine::{scan_file_with, FileScan};
use super::{ScanConfig, ShotCatalog};

/// Merge per-file scans, given in file order.
///
/// Every file's binary file header must equal the first one's.  Records
/// are concatenated without merging equal shot keys across files, then
/// stably sorted by key, so ties keep file order.
pub(crate) fn merge(scans: Vec<(PathBuf, FileScan)>) -> Result<ShotCatalog> {
    let mut scans = scans.into_iter();
    let (_, first) = scans.next().ok_or_else(SegyError::no_input_files)?;

    let file_header = first.header;
    let mut records = first.records;
    for (path, scan) in scans {
        if let Some((field, expected, found)) = file_header.first_mismatch(&scan.header) {
            return Err(SegyError::HeaderMismatch { path, field: field.name(), expected, found });
        }
        records.extend(scan.records);
    }
    records.sort_by_key(|r| r.shot);

    info!(shots = records.len(), "combined scan");
    Ok(ShotCatalog { file_header, records })
}

/// Scan `files` through `storage` and merge the results.
///
/// Files are scanned on up to `config.concurrency.file_workers` threads,
/// each decoding headers on a shared pool of `header_workers`.  Any
/// single-file failure fails the whole scan.
pub fn scan_with<S: Storage>(storage: &S, files: &[PathBuf], config: &ScanConfig) -> Result<ShotCatalog> {
    if files.is_empty() {
        return Err(SegyError::no_input_files());
    }
    let file_pool = WorkerPool::new(config.concurrency.file_workers.min(files.len()))?;
    let header_pool = WorkerPool::new(config.concurrency.header_workers)?;
    info!(
        files = files.len(),
        file_workers = file_pool.workers(),
        header_workers = header_pool.workers(),
        "scanning"
    );

    let scans = file_pool.map_ordered(files.len(), |i| {
        let scan = scan_file_with(storage, &files[i], config, &header_pool)?;
        info!(path = %files[i].display(), "completed scan");
        Ok((files[i].clone(), scan))
    })?;
    merge(scans)
}

/// [`scan_with`] over the local filesystem.
pub fn scan(files: &[PathBuf], config: &ScanConfig) -> Result<ShotCatalog> {
    scan_with(&LocalFs, files, config)
}

/// Discover files under `path` (see [`list_files`]) and scan them.
pub fn scan_dir_with<S: Storage>(
    storage: &S,
    path:    &Path,
    pattern: Option<&str>,
    config:  &ScanConfig,
) -> Result<ShotCatalog> {
    let files = list_files(storage, path, pattern)?;
    scan_with(storage, &files, config)
}

/// [`scan_dir_with`] over the local filesystem.
pub fn scan_dir(path: impl AsRef<Path>, pattern: Option<&str>, config: &ScanConfig) -> Result<ShotCatalog> {
    scan_dir_with(&LocalFs, path.as_ref(), pattern, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FileHeader;
    use crate::scan::{Segment, ShotKey, ShotRecord};
    use crate::endian::Endianness;

    fn file_scan(path: &str, ns: i32, keys: &[(i32, i32, i32)]) -> (PathBuf, FileScan) {
        let mut header = FileHeader::default();
        header.binary.ns = ns;
        let records = keys
            .iter()
            .enumerate()
            .map(|(i, &k)| {
                let mut r = ShotRecord::new(path.into(), k.into(), &header, Endianness::Big);
                r.segments.push(Segment { offset: 3600 + i as u64 * 244, count: 1 });
                r
            })
            .collect();
        (path.into(), FileScan { header, records, traces: keys.len() as u64 })
    }

    #[test]
    fn equal_keys_from_different_files_stay_separate() {
        let cat = merge(vec![
            file_scan("a", 1, &[(1, 1, 0), (3, 3, 0)]),
            file_scan("b", 1, &[(1, 1, 0), (2, 2, 0)]),
        ])
        .unwrap();
        let shots: Vec<_> = cat.shots();
        assert_eq!(shots, vec![
            ShotKey::new(1, 1, 0), ShotKey::new(1, 1, 0), ShotKey::new(2, 2, 0), ShotKey::new(3, 3, 0),
        ]);
        let paths: Vec<_> = cat.paths().iter().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(paths, ["a", "b", "b", "a"]);
    }

    #[test]
    fn header_mismatch_names_the_field() {
        let err = merge(vec![file_scan("a", 1, &[]), file_scan("b", 2, &[])]).unwrap_err();
        match err {
            SegyError::HeaderMismatch { path, field, expected, found } => {
                assert_eq!(path, PathBuf::from("b"));
                assert_eq!((field, expected, found), ("ns", 1, 2));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn empty_file_set() {
        assert!(matches!(scan(&[], &ScanConfig::default()), Err(SegyError::NoFilesFound { .. })));
    }
}
