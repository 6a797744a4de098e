//! Single-file scan: chunked header streaming and shot segmentation.

use std::collections::HashMap;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span};

use crate::endian::Endianness;
use crate::error::{read_exact_at, Result, SegyError};
use crate::field::{BinaryTraceHeader, FileField, TraceField, FILE_HEADER_SIZE, TRACE_HEADER_SIZE};
use crate::header::{decode_trace_header, read_file_header, FileHeader};
use crate::pipeline::WorkerPool;
use crate::storage::{LocalFs, Storage};

use super::{ScanConfig, Segment, ShotKey, ShotRecord};

/// Read-ahead buffer for header streaming.
const READ_BUFFER_SIZE: usize = 1 << 20;

/// Result of scanning one file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileScan {
    pub header:  FileHeader,
    /// Records sorted by shot key.
    pub records: Vec<ShotRecord>,
    /// Traces seen.
    pub traces:  u64,
}

/// Raw trace headers of up to `chunk_size` consecutive traces.
pub(crate) struct RawChunk {
    /// Byte offset of the first trace in the chunk.
    pub first_offset: u64,
    pub trace_size:   u64,
    pub count:        usize,
    /// `count * 240` bytes, headers back to back.
    pub bytes:        Vec<u8>,
}

impl RawChunk {
    pub fn offset_of(&self, i: usize) -> u64 {
        self.first_offset + i as u64 * self.trace_size
    }

    pub fn header(&self, i: usize) -> &[u8] {
        &self.bytes[i * TRACE_HEADER_SIZE..(i + 1) * TRACE_HEADER_SIZE]
    }

    /// Decode every header of the chunk on `pool`, in trace order.
    pub fn decode(&self, keys: &[TraceField], endian: Endianness, pool: &WorkerPool) -> Result<Vec<BinaryTraceHeader>> {
        pool.map_ordered(self.count, |i| decode_trace_header(self.header(i), keys, endian))
    }
}

/// Streams the trace headers of one file in bounded chunks, skipping the
/// sample payloads.
pub(crate) struct HeaderChunks<R> {
    reader:     BufReader<R>,
    trace_size: u64,
    skip:       i64,
    total:      u64,
    next:       u64,
    chunk_size: usize,
}

impl<R: Read + Seek> HeaderChunks<R> {
    /// Read the file header and size up the trace area.
    pub fn open(handle: R, endian: Endianness, chunk_size: usize) -> Result<(FileHeader, Self)> {
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, handle);
        let fh = read_file_header(&mut reader, FileField::ALL, endian)?;
        let file_size = reader.seek(SeekFrom::End(0))?;
        let total = fh.trace_count(file_size)?;
        reader.seek(SeekFrom::Start(FILE_HEADER_SIZE as u64))?;
        let trace_size = fh.trace_size();
        let chunks = Self {
            reader,
            trace_size,
            skip: (trace_size - TRACE_HEADER_SIZE as u64) as i64,
            total,
            next: 0,
            chunk_size: chunk_size.max(1),
        };
        Ok((fh, chunks))
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn next_chunk(&mut self) -> Result<Option<RawChunk>> {
        if self.next >= self.total {
            return Ok(None);
        }
        let count = (self.total - self.next).min(self.chunk_size as u64) as usize;
        let first_offset = FILE_HEADER_SIZE as u64 + self.next * self.trace_size;
        let mut bytes = vec![0u8; count * TRACE_HEADER_SIZE];
        for (i, hdr) in bytes.chunks_exact_mut(TRACE_HEADER_SIZE).enumerate() {
            read_exact_at(&mut self.reader, hdr, first_offset + i as u64 * self.trace_size)?;
            self.reader.seek_relative(self.skip)?;
        }
        self.next += count as u64;
        Ok(Some(RawChunk { first_offset, trace_size: self.trace_size, count, bytes }))
    }
}

struct OpenSegment {
    key:   ShotKey,
    start: u64,
    count: u64,
}

/// Shot segmentation state machine.
///
/// Headers must be pushed in file order.  While no segment is open the
/// first header opens one; a header with the open segment's key extends it;
/// any other key closes the open segment onto its shot's record and opens a
/// new one.  [`Segmenter::finish`] closes the last segment.
pub(crate) struct Segmenter {
    path:       PathBuf,
    header:     FileHeader,
    endianness: Endianness,
    depth_key:  TraceField,
    keys:       Vec<TraceField>,
    records:    HashMap<ShotKey, ShotRecord>,
    open:       Option<OpenSegment>,
    traces:     u64,
}

impl Segmenter {
    pub fn new(path: &Path, header: FileHeader, config: &ScanConfig) -> Self {
        Self {
            path:       path.to_path_buf(),
            header,
            endianness: config.endianness,
            depth_key:  config.depth_key,
            keys:       config.summary_keys(),
            records:    HashMap::new(),
            open:       None,
            traces:     0,
        }
    }

    pub fn push(&mut self, offset: u64, th: &BinaryTraceHeader) {
        let key = ShotKey::of(th, self.depth_key);
        self.traces += 1;

        let (path, header, endianness) = (&self.path, &self.header, self.endianness);
        self.records
            .entry(key)
            .or_insert_with(|| ShotRecord::new(path.clone(), key, header, endianness))
            .observe(th, &self.keys);

        match self.open.as_mut() {
            Some(seg) if seg.key == key => seg.count += 1,
            _ => {
                let next = OpenSegment { key, start: offset, count: 1 };
                if let Some(prev) = self.open.replace(next) {
                    self.close(prev);
                }
            }
        }
    }

    pub fn push_chunk(&mut self, chunk: &RawChunk, headers: &[BinaryTraceHeader]) {
        for (i, th) in headers.iter().enumerate() {
            self.push(chunk.offset_of(i), th);
        }
    }

    fn close(&mut self, seg: OpenSegment) {
        if let Some(rec) = self.records.get_mut(&seg.key) {
            rec.segments.push(Segment { offset: seg.start, count: seg.count });
        }
    }

    pub fn finish(mut self) -> FileScan {
        if let Some(seg) = self.open.take() {
            self.close(seg);
        }
        let mut records: Vec<ShotRecord> = self.records.into_values().collect();
        records.sort_by_key(|r| r.shot);
        FileScan { header: self.header, records, traces: self.traces }
    }
}

/// Scan one open file.
///
/// `progress`, if given, is called after every chunk with
/// `(traces scanned, total traces)`.
pub fn scan_reader<R, F>(
    handle:       R,
    path:         &Path,
    config:       &ScanConfig,
    pool:         &WorkerPool,
    mut progress: Option<&mut F>,
) -> Result<FileScan>
where
    R: Read + Seek,
    F: FnMut(u64, u64),
{
    let (fh, mut chunks) = HeaderChunks::open(handle, config.endianness, config.chunk_size)?;
    info!(ns = fh.ns(), dt = fh.dt(), traces = chunks.total(), "file header");

    let keys = config.decode_keys();
    let mut segmenter = Segmenter::new(path, fh, config);
    let mut done = 0u64;
    while let Some(chunk) = chunks.next_chunk()? {
        let headers = chunk.decode(&keys, config.endianness, pool)?;
        segmenter.push_chunk(&chunk, &headers);
        done += chunk.count as u64;
        debug!(done, total = chunks.total(), "chunk scanned");
        if let Some(ref mut cb) = progress {
            cb(done, chunks.total());
        }
    }

    let scan = segmenter.finish();
    info!(shots = scan.records.len(), "file scanned");
    Ok(scan)
}

/// Open `path` through `storage` and scan it.  Errors carry the path.
pub fn scan_file_with<S: Storage>(
    storage: &S,
    path:    &Path,
    config:  &ScanConfig,
    pool:    &WorkerPool,
) -> Result<FileScan> {
    let span = info_span!("scan_file", path = %path.display());
    let _enter = span.enter();
    let handle = storage.open(path).map_err(|e| SegyError::from(e).in_file(path))?;
    scan_reader::<_, fn(u64, u64)>(handle, path, config, pool, None).map_err(|e| e.in_file(path))
}

/// Scan one local file with a header-decoding pool sized from `config`.
pub fn scan_file(path: impl AsRef<Path>, config: &ScanConfig) -> Result<FileScan> {
    let pool = WorkerPool::new(config.concurrency.header_workers)?;
    scan_file_with(&LocalFs, path.as_ref(), config, &pool)
}
