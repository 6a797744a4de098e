//! Non-blocking (tokio) drivers for scanning and reading.
//!
//! Blocking file I/O runs on tokio's blocking pool; header decoding runs as
//! one task per header, bounded by a semaphore.  Tasks finish in any order,
//! so decoded headers are placed back into trace order by index before they
//! reach the segmenter.  Results are identical to the blocking API.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{info, info_span, Instrument};

use crate::block::{segy_read, segy_write, SeisBlock};
use crate::endian::Endianness;
use crate::error::{Result, SegyError};
use crate::field::{BinaryTraceHeader, TraceField};
use crate::header::decode_trace_header;
use crate::scan::{merge, read_shot_with, FileScan, HeaderChunks, RawChunk, ScanConfig, Segmenter, ShotCatalog, ShotRecord};
use crate::storage::{list_files, LocalFs, Storage};

use super::WorkerPool;

fn join_error(e: JoinError) -> SegyError {
    SegyError::Task(e.to_string())
}

/// Decode every header of `chunk` as concurrent tasks, at most `limit`
/// running at once, and return them in trace order.
pub(crate) async fn decode_chunk(
    chunk:  Arc<RawChunk>,
    keys:   Arc<[TraceField]>,
    endian: Endianness,
    limit:  Arc<Semaphore>,
) -> Result<Vec<BinaryTraceHeader>> {
    let mut tasks = JoinSet::new();
    for i in 0..chunk.count {
        let (chunk, keys, limit) = (Arc::clone(&chunk), Arc::clone(&keys), Arc::clone(&limit));
        tasks.spawn(async move {
            let _permit = limit.acquire_owned().await.map_err(|e| SegyError::Task(e.to_string()))?;
            decode_trace_header(chunk.header(i), &keys, endian).map(|th| (i, th))
        });
    }

    let mut slots: Vec<Option<BinaryTraceHeader>> = vec![None; chunk.count];
    while let Some(joined) = tasks.join_next().await {
        let (i, th) = joined.map_err(join_error)??;
        slots[i] = Some(th);
    }
    slots
        .into_iter()
        .map(|s| s.ok_or_else(|| SegyError::Task("header decode task produced no result".into())))
        .collect()
}

async fn scan_file_async<S>(
    storage:      Arc<S>,
    path:         PathBuf,
    config:       Arc<ScanConfig>,
    header_limit: Arc<Semaphore>,
) -> Result<FileScan>
where
    S: Storage + 'static,
{
    let run = async {
        let (endian, chunk_size) = (config.endianness, config.chunk_size);
        let (fh, mut chunks) = {
            let (storage, path) = (Arc::clone(&storage), path.clone());
            task::spawn_blocking(move || -> Result<_> {
                let handle = storage.open(&path)?;
                HeaderChunks::open(handle, endian, chunk_size)
            })
            .await
            .map_err(join_error)??
        };
        info!(ns = fh.ns(), dt = fh.dt(), traces = chunks.total(), "file header");

        let keys: Arc<[TraceField]> = config.decode_keys().into();
        let mut segmenter = Segmenter::new(&path, fh, &config);
        loop {
            let (back, next) = task::spawn_blocking(move || {
                let next = chunks.next_chunk();
                (chunks, next)
            })
            .await
            .map_err(join_error)?;
            chunks = back;

            let Some(chunk) = next? else { break };
            let chunk = Arc::new(chunk);
            let headers = decode_chunk(Arc::clone(&chunk), Arc::clone(&keys), endian, Arc::clone(&header_limit)).await?;
            segmenter.push_chunk(&chunk, &headers);
        }

        let scan = segmenter.finish();
        info!(shots = scan.records.len(), "file scanned");
        Ok::<_, SegyError>(scan)
    };
    let span = info_span!("scan_file", path = %path.display());
    run.instrument(span).await.map_err(|e| e.in_file(&path))
}

/// Non-blocking [`crate::scan::scan_with`].
pub async fn scan_async_with<S>(storage: Arc<S>, files: Vec<PathBuf>, config: ScanConfig) -> Result<ShotCatalog>
where
    S: Storage + 'static,
{
    if files.is_empty() {
        return Err(SegyError::no_input_files());
    }
    let config = Arc::new(config);
    let file_limit = Arc::new(Semaphore::new(config.concurrency.file_workers.max(1)));
    let header_limit = Arc::new(Semaphore::new(config.concurrency.header_workers.max(1)));
    info!(files = files.len(), "scanning (async)");

    let mut tasks = JoinSet::new();
    for (i, path) in files.iter().cloned().enumerate() {
        let (storage, config) = (Arc::clone(&storage), Arc::clone(&config));
        let (file_limit, header_limit) = (Arc::clone(&file_limit), Arc::clone(&header_limit));
        tasks.spawn(async move {
            let _permit = file_limit.acquire_owned().await.map_err(|e| SegyError::Task(e.to_string()))?;
            let scan = scan_file_async(storage, path.clone(), config, header_limit).await?;
            Ok::<_, SegyError>((i, path, scan))
        });
    }

    let mut slots: Vec<Option<(PathBuf, FileScan)>> = (0..files.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (i, path, scan) = joined.map_err(join_error)??;
        info!(path = %path.display(), "completed scan");
        slots[i] = Some((path, scan));
    }
    let scans = slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| SegyError::Task("file scan task produced no result".into()))?;
    merge(scans)
}

/// Non-blocking [`crate::scan::scan`].
pub async fn scan_async(files: Vec<PathBuf>, config: ScanConfig) -> Result<ShotCatalog> {
    scan_async_with(Arc::new(LocalFs), files, config).await
}

/// Non-blocking [`crate::scan::scan_dir`].
pub async fn scan_dir_async(path: impl AsRef<Path>, pattern: Option<&str>, config: ScanConfig) -> Result<ShotCatalog> {
    let (path, pattern) = (path.as_ref().to_path_buf(), pattern.map(str::to_string));
    let files = task::spawn_blocking(move || list_files(&LocalFs, &path, pattern.as_deref()))
        .await
        .map_err(join_error)??;
    scan_async(files, config).await
}

/// Non-blocking [`ShotRecord::read`].
pub async fn read_shot_async(record: ShotRecord, keys: Vec<TraceField>) -> Result<SeisBlock> {
    task::spawn_blocking(move || read_shot_with(&LocalFs, &record, &keys, &WorkerPool::sequential()))
        .await
        .map_err(join_error)?
}

/// Non-blocking [`segy_read`].
pub async fn segy_read_async(path: PathBuf, keys: Vec<TraceField>, workers: usize) -> Result<SeisBlock> {
    task::spawn_blocking(move || segy_read(&path, &keys, &WorkerPool::new(workers)?))
        .await
        .map_err(join_error)?
}

/// Non-blocking [`segy_write`].
pub async fn segy_write_async(path: PathBuf, block: SeisBlock) -> Result<()> {
    task::spawn_blocking(move || segy_write(&path, &block))
        .await
        .map_err(join_error)?
}
