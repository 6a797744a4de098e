//! Shot catalogs: which byte ranges of which files hold each shot.
//!
//! A *shot* is identified by its source position
//! `(SourceX, SourceY, SourceDepth)`.  Scanning a file streams its trace
//! headers (never its samples) and records, per shot, every maximal run of
//! consecutive traces as a [`Segment`].  Scanning several files concatenates
//! the per-file records without merging equal keys across files, then sorts
//! by key.  The resulting [`ShotCatalog`] drives later reads of individual
//! shots.

mod engine;
mod merge;

pub use engine::{scan_file, scan_file_with, scan_reader, FileScan};
pub use merge::{scan, scan_dir, scan_dir_with, scan_with};

pub(crate) use engine::{HeaderChunks, RawChunk, Segmenter};
pub(crate) use merge::merge;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::block::{read_traces, sample_format_for, SampleMatrix, SeisBlock};
use crate::endian::Endianness;
use crate::error::{Result, SegyError};
use crate::field::{BinaryTraceHeader, FileField, TraceField, FILE_HEADER_SIZE, TRACE_HEADER_SIZE};
use crate::header::{read_file_header, read_trace_header, FileHeader};
use crate::pipeline::{Concurrency, WorkerPool};
use crate::storage::{LocalFs, Storage};

/// Default number of trace headers read per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Source position identifying a shot.  Orders lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShotKey {
    pub x:     i32,
    pub y:     i32,
    pub depth: i32,
}

impl ShotKey {
    pub fn new(x: i32, y: i32, depth: i32) -> Self {
        Self { x, y, depth }
    }

    pub(crate) fn of(th: &BinaryTraceHeader, depth_key: TraceField) -> Self {
        Self::new(th.source_x, th.source_y, th.get(depth_key))
    }
}

impl From<(i32, i32, i32)> for ShotKey {
    fn from((x, y, depth): (i32, i32, i32)) -> Self {
        Self::new(x, y, depth)
    }
}

impl fmt::Display for ShotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.depth)
    }
}

/// A run of `count` consecutive traces starting at byte `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub offset: u64,
    pub count:  u64,
}

/// Inclusive value range of one header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRange {
    pub min: i32,
    pub max: i32,
}

impl FieldRange {
    fn include(&mut self, v: i32) {
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }
}

/// Everything known about one shot within one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotRecord {
    pub path:       PathBuf,
    pub shot:       ShotKey,
    /// Segments in file order.
    pub segments:   Vec<Segment>,
    /// Field name -> range over every trace of this shot.
    pub summary:    BTreeMap<String, FieldRange>,
    pub ns:         usize,
    pub dt:         i32,
    /// `DataSampleFormat` code of the source file.
    pub format:     i32,
    pub endianness: Endianness,
}

impl ShotRecord {
    pub(crate) fn new(path: PathBuf, shot: ShotKey, fh: &FileHeader, endianness: Endianness) -> Self {
        Self {
            path,
            shot,
            segments: Vec::new(),
            summary: BTreeMap::new(),
            ns: fh.ns(),
            dt: fh.dt(),
            format: fh.binary.data_sample_format,
            endianness,
        }
    }

    pub(crate) fn observe(&mut self, th: &BinaryTraceHeader, keys: &[TraceField]) {
        for &k in keys {
            let v = th.get(k);
            self.summary
                .entry(k.name().to_string())
                .and_modify(|r| r.include(v))
                .or_insert(FieldRange { min: v, max: v });
        }
    }

    pub fn trace_count(&self) -> u64 {
        self.segments.iter().fold(0, |n, s| n.saturating_add(s.count))
    }

    pub fn range(&self, field: TraceField) -> Option<FieldRange> {
        self.summary.get(field.name()).copied()
    }

    /// Read this shot's traces, headers and samples, from the local filesystem.
    pub fn read(&self, keys: &[TraceField]) -> Result<SeisBlock> {
        read_shot_with(&LocalFs, self, keys, &WorkerPool::sequential())
    }

    /// Read only this shot's trace headers from the local filesystem.
    pub fn read_headers(&self, keys: &[TraceField]) -> Result<Vec<BinaryTraceHeader>> {
        read_headers_with(&LocalFs, self, keys)
    }
}

impl fmt::Display for ShotRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ShotRecord:")?;
        writeln!(f, "    path: {}", self.path.display())?;
        writeln!(f, "    source: {}", self.shot)?;
        writeln!(f, "    traces: {}", self.trace_count())?;
        write!(f, "    ns: {}, dt: {}", self.ns, self.dt)?;
        if !self.summary.is_empty() {
            write!(f, "\n    summary:")?;
            for (k, r) in &self.summary {
                write!(f, "\n        {k:30}: {}..{}", r.min, r.max)?;
            }
        }
        Ok(())
    }
}

/// Scan configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Extra fields to summarise per shot.
    pub keys:        Vec<TraceField>,
    /// Trace headers read per chunk.
    pub chunk_size:  usize,
    /// Field used as the shot key's third coordinate.
    pub depth_key:   TraceField,
    pub endianness:  Endianness,
    pub concurrency: Concurrency,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            keys:        Vec::new(),
            chunk_size:  DEFAULT_CHUNK_SIZE,
            depth_key:   TraceField::SourceDepth,
            endianness:  Endianness::Big,
            concurrency: Concurrency::default(),
        }
    }
}

impl ScanConfig {
    pub fn with_keys(mut self, keys: impl IntoIterator<Item = TraceField>) -> Self {
        self.keys = keys.into_iter().collect();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_depth_key(mut self, depth_key: TraceField) -> Self {
        self.depth_key = depth_key;
        self
    }

    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Fields decoded per trace: the shot key fields, then the extra keys,
    /// without duplicates.
    pub(crate) fn decode_keys(&self) -> Vec<TraceField> {
        let mut out = vec![TraceField::SourceX, TraceField::SourceY, self.depth_key];
        for &k in &self.keys {
            if !out.contains(&k) {
                out.push(k);
            }
        }
        out
    }

    /// Extra keys without duplicates, in the order given.
    pub(crate) fn summary_keys(&self) -> Vec<TraceField> {
        let mut out: Vec<TraceField> = Vec::with_capacity(self.keys.len());
        for &k in &self.keys {
            if !out.contains(&k) {
                out.push(k);
            }
        }
        out
    }
}

/// Merged scan of one or more files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotCatalog {
    /// File header shared by every scanned file.
    pub file_header: FileHeader,
    /// Records sorted by shot key.
    pub records:     Vec<ShotRecord>,
}

impl ShotCatalog {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, idx: usize) -> Result<&ShotRecord> {
        self.records.get(idx).ok_or(SegyError::NoSuchShot { index: idx, len: self.records.len() })
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.records.iter().map(|r| r.path.as_path()).collect()
    }

    pub fn shots(&self) -> Vec<ShotKey> {
        self.records.iter().map(|r| r.shot).collect()
    }

    /// Byte offset of each record's first segment.
    pub fn offsets(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.segments.first().map_or(0, |s| s.offset)).collect()
    }

    /// Total trace count of each record.
    pub fn counts(&self) -> Vec<u64> {
        self.records.iter().map(ShotRecord::trace_count).collect()
    }

    pub fn summary(&self, idx: usize) -> Result<&BTreeMap<String, FieldRange>> {
        Ok(&self.record(idx)?.summary)
    }

    pub fn read_shot(&self, idx: usize, keys: &[TraceField]) -> Result<SeisBlock> {
        self.record(idx)?.read(keys)
    }

    pub fn read_headers(&self, idx: usize, keys: &[TraceField]) -> Result<Vec<BinaryTraceHeader>> {
        self.record(idx)?.read_headers(keys)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl fmt::Display for ShotCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ShotCatalog:")?;
        writeln!(f, "    shots: {}", self.records.len())?;
        writeln!(f, "    ns: {}", self.file_header.ns())?;
        write!(f, "    dt: {}", self.file_header.dt())
    }
}

/// Check that `seg` starts on a trace boundary and ends inside a file of
/// `file_size` bytes.  Catalog segments may be stale or hand-edited.
fn check_segment(seg: &Segment, trace_size: u64, file_size: u64) -> Result<()> {
    let start = FILE_HEADER_SIZE as u64;
    let aligned = seg.offset >= start && (seg.offset - start) % trace_size == 0;
    let end = seg.count.checked_mul(trace_size).and_then(|len| len.checked_add(seg.offset));
    match end {
        Some(end) if aligned && end <= file_size => Ok(()),
        _ => Err(SegyError::InvalidSegment { offset: seg.offset, count: seg.count, file_size }),
    }
}

/// Open `record`'s file, read its file header and validate every segment
/// against the file's trace layout before anything is allocated.
fn open_record<S: Storage>(storage: &S, record: &ShotRecord) -> Result<(BufReader<S::Handle>, FileHeader, u64)> {
    let mut reader = BufReader::new(storage.open(&record.path)?);
    let fh = read_file_header(&mut reader, FileField::ALL, record.endianness)?;
    let file_size = reader.seek(SeekFrom::End(0))?;
    let trace_size = fh.trace_size();
    for seg in &record.segments {
        check_segment(seg, trace_size, file_size)?;
    }
    Ok((reader, fh, trace_size))
}

/// Read every trace of `record`, segment by segment, through `storage`.
///
/// Only the record's segments are touched.  Sample columns are concatenated
/// in segment order.  Segments that do not fit the file fail with
/// [`SegyError::InvalidSegment`].
pub fn read_shot_with<S: Storage>(
    storage: &S,
    record:  &ShotRecord,
    keys:    &[TraceField],
    pool:    &WorkerPool,
) -> Result<SeisBlock> {
    let run = || -> Result<SeisBlock> {
        let (mut reader, fh, _) = open_record(storage, record)?;
        let format = sample_format_for(&fh, record.trace_count())?;

        let mut headers = Vec::new();
        let mut data = SampleMatrix::zeros(fh.ns(), 0);
        for seg in &record.segments {
            reader.seek(SeekFrom::Start(seg.offset))?;
            let (h, d) = read_traces(
                &mut reader, fh.ns(), seg.count as usize, format, keys, record.endianness, seg.offset, pool,
            )?;
            headers.extend(h);
            data.append(d)?;
        }
        SeisBlock::new(fh, headers, data)
    };
    run().map_err(|e| e.in_file(&record.path))
}

/// Read only the trace headers of `record`; samples are skipped.
pub fn read_headers_with<S: Storage>(
    storage: &S,
    record:  &ShotRecord,
    keys:    &[TraceField],
) -> Result<Vec<BinaryTraceHeader>> {
    let run = || -> Result<Vec<BinaryTraceHeader>> {
        let (mut reader, _, trace_size) = open_record(storage, record)?;
        let skip = (trace_size - TRACE_HEADER_SIZE as u64) as i64;
        let mut headers = Vec::new();
        for seg in &record.segments {
            reader.seek(SeekFrom::Start(seg.offset))?;
            for i in 0..seg.count {
                let offset = seg.offset + i * trace_size;
                headers.push(read_trace_header(&mut reader, keys, record.endianness, offset)?);
                reader.seek_relative(skip)?;
            }
        }
        Ok(headers)
    };
    run().map_err(|e| e.in_file(&record.path))
}

/// Convenience for [`read_shot_with`] over the local filesystem.
pub fn read_shot(record: &ShotRecord, keys: &[TraceField]) -> Result<SeisBlock> {
    record.read(keys)
}
