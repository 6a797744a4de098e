//! Whole-dataset decode and encode.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::endian::Endianness;
use crate::error::{read_exact_at, Result, SegyError};
use crate::field::{BinaryTraceHeader, FileField, TraceField, FILE_HEADER_SIZE, TRACE_HEADER_SIZE};
use crate::header::{decode_trace_header, read_file_header, write_file_header, write_trace_header, FileHeader};
use crate::pipeline::WorkerPool;
use crate::sample::{decode_samples, encode_samples, SampleFormat, SAMPLE_SIZE};

/// `ns x ntraces` samples.  Storage is trace-major so that one trace's
/// samples are contiguous; element access is `[sample][trace]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "MatrixParts")]
pub struct SampleMatrix {
    ns:      usize,
    ntraces: usize,
    data:    Vec<f64>,
}

#[derive(Deserialize)]
struct MatrixParts {
    ns:      usize,
    ntraces: usize,
    data:    Vec<f64>,
}

impl TryFrom<MatrixParts> for SampleMatrix {
    type Error = SegyError;

    fn try_from(p: MatrixParts) -> Result<Self> {
        if p.ns.checked_mul(p.ntraces) != Some(p.data.len()) {
            return Err(SegyError::InvalidBlock(format!(
                "{} samples cannot fill {} traces of {} samples", p.data.len(), p.ntraces, p.ns
            )));
        }
        Ok(Self { ns: p.ns, ntraces: p.ntraces, data: p.data })
    }
}

impl SampleMatrix {
    pub fn zeros(ns: usize, ntraces: usize) -> Self {
        Self { ns, ntraces, data: vec![0.0; ns * ntraces] }
    }

    /// Build from per-trace sample vectors, each `ns` long.
    pub fn from_traces(ns: usize, traces: Vec<Vec<f64>>) -> Result<Self> {
        let ntraces = traces.len();
        let mut data = Vec::with_capacity(ns * ntraces);
        for (i, t) in traces.into_iter().enumerate() {
            if t.len() != ns {
                return Err(SegyError::InvalidBlock(format!(
                    "trace {i} has {} samples, expected {ns}", t.len()
                )));
            }
            data.extend(t);
        }
        Ok(Self { ns, ntraces, data })
    }

    pub fn ns(&self) -> usize { self.ns }
    pub fn ntraces(&self) -> usize { self.ntraces }

    pub fn get(&self, sample: usize, trace: usize) -> f64 {
        self.data[trace * self.ns + sample]
    }

    pub fn set(&mut self, sample: usize, trace: usize, value: f64) {
        self.data[trace * self.ns + sample] = value;
    }

    /// All samples of trace `i`.
    pub fn trace(&self, i: usize) -> &[f64] {
        &self.data[i * self.ns..(i + 1) * self.ns]
    }

    pub fn trace_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.ns..(i + 1) * self.ns]
    }

    /// Append `other`'s traces after this matrix's traces.
    pub fn append(&mut self, other: SampleMatrix) -> Result<()> {
        if self.ntraces == 0 && self.data.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.ns != self.ns {
            return Err(SegyError::InvalidBlock(format!(
                "cannot append {}-sample traces to {}-sample traces", other.ns, self.ns
            )));
        }
        self.ntraces += other.ntraces;
        self.data.extend(other.data);
        Ok(())
    }
}

/// One file header, its trace headers in file order, and their samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BlockParts")]
pub struct SeisBlock {
    pub file_header:   FileHeader,
    pub trace_headers: Vec<BinaryTraceHeader>,
    pub data:          SampleMatrix,
}

#[derive(Deserialize)]
struct BlockParts {
    file_header:   FileHeader,
    trace_headers: Vec<BinaryTraceHeader>,
    data:          SampleMatrix,
}

impl TryFrom<BlockParts> for SeisBlock {
    type Error = SegyError;

    fn try_from(p: BlockParts) -> Result<Self> {
        SeisBlock::new(p.file_header, p.trace_headers, p.data)
    }
}

impl SeisBlock {
    pub fn new(file_header: FileHeader, trace_headers: Vec<BinaryTraceHeader>, data: SampleMatrix) -> Result<Self> {
        let block = Self { file_header, trace_headers, data };
        block.validate()?;
        Ok(block)
    }

    pub fn ntraces(&self) -> usize {
        self.trace_headers.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.trace_headers.len() != self.data.ntraces() {
            return Err(SegyError::InvalidBlock(format!(
                "{} trace headers but {} sample columns",
                self.trace_headers.len(), self.data.ntraces()
            )));
        }
        if self.data.ntraces() > 0 && self.data.ns() != self.file_header.ns() {
            return Err(SegyError::InvalidBlock(format!(
                "file header ns={} but traces hold {} samples",
                self.file_header.ns(), self.data.ns()
            )));
        }
        Ok(())
    }
}

/// The sample format, required only when there are samples to convert.
pub(crate) fn sample_format_for(fh: &FileHeader, ntraces: u64) -> Result<SampleFormat> {
    match fh.sample_format() {
        Ok(f) => Ok(f),
        Err(_) if ntraces == 0 || fh.ns() == 0 => Ok(SampleFormat::IeeeFloat),
        Err(e) => Err(e),
    }
}

/// Read `ntraces` consecutive traces starting at the current position,
/// which must be byte `offset` of the file.
pub fn read_traces<R: Read>(
    reader:  &mut R,
    ns:      usize,
    ntraces: usize,
    format:  SampleFormat,
    keys:    &[TraceField],
    endian:  Endianness,
    offset:  u64,
    pool:    &WorkerPool,
) -> Result<(Vec<BinaryTraceHeader>, SampleMatrix)> {
    let trace_size = TRACE_HEADER_SIZE + ns * SAMPLE_SIZE;
    let mut raw = vec![0u8; trace_size * ntraces];
    read_exact_at(reader, &mut raw, offset)?;

    let decoded = pool.map_ordered(ntraces, |i| {
        let rec = &raw[i * trace_size..(i + 1) * trace_size];
        let th = decode_trace_header(&rec[..TRACE_HEADER_SIZE], keys, endian)
            .map_err(|e| at_offset(e, offset + (i * trace_size) as u64))?;
        let mut samples = vec![0.0; ns];
        decode_samples(&rec[TRACE_HEADER_SIZE..], format, endian, &mut samples)?;
        Ok((th, samples))
    })?;

    let (headers, traces): (Vec<_>, Vec<_>) = decoded.into_iter().unzip();
    Ok((headers, SampleMatrix::from_traces(ns, traces)?))
}

fn at_offset(e: SegyError, offset: u64) -> SegyError {
    match e {
        SegyError::TruncatedBuffer { needed, .. } => SegyError::TruncatedBuffer { offset, needed },
        e => e,
    }
}

/// Decode an entire file.
pub fn read_file<R: Read + Seek>(
    reader: &mut R,
    keys:   &[TraceField],
    endian: Endianness,
    pool:   &WorkerPool,
) -> Result<SeisBlock> {
    let fh = read_file_header(reader, FileField::ALL, endian)?;
    let file_size = reader.seek(SeekFrom::End(0))?;
    let ntraces = fh.trace_count(file_size)?;
    let format = sample_format_for(&fh, ntraces)?;
    debug!(ns = fh.ns(), ntraces, ?format, "decoding traces");

    reader.seek(SeekFrom::Start(FILE_HEADER_SIZE as u64))?;
    let (trace_headers, data) = read_traces(
        reader, fh.ns(), ntraces as usize, format, keys, endian, FILE_HEADER_SIZE as u64, pool,
    )?;
    SeisBlock::new(fh, trace_headers, data)
}

/// Encode `block`: file header, then each trace header followed by its
/// samples in the file header's `DataSampleFormat`.
pub fn write_block<W: Write>(writer: &mut W, block: &SeisBlock, endian: Endianness) -> Result<()> {
    block.validate()?;
    let format = sample_format_for(&block.file_header, block.ntraces() as u64)?;
    write_file_header(writer, &block.file_header, endian)?;

    let mut samples = Vec::with_capacity(block.data.ns() * SAMPLE_SIZE);
    for (i, th) in block.trace_headers.iter().enumerate() {
        write_trace_header(writer, th, endian)?;
        samples.clear();
        encode_samples(block.data.trace(i), format, endian, &mut samples);
        writer.write_all(&samples)?;
    }
    Ok(())
}

/// Read the big-endian file at `path`.
pub fn segy_read(path: impl AsRef<Path>, keys: &[TraceField], pool: &WorkerPool) -> Result<SeisBlock> {
    let path = path.as_ref();
    info!(path = %path.display(), "reading SEG-Y file");
    let mut reader = BufReader::new(File::open(path).map_err(|e| SegyError::from(e).in_file(path))?);
    let block = read_file(&mut reader, keys, Endianness::Big, pool).map_err(|e| e.in_file(path))?;
    info!(ns = block.file_header.ns(), dt = block.file_header.dt(), ntraces = block.ntraces(), "loaded");
    Ok(block)
}

/// Write `block` to `path` big-endian, replacing any existing file.
pub fn segy_write(path: impl AsRef<Path>, block: &SeisBlock) -> Result<()> {
    let path = path.as_ref();
    info!(path = %path.display(), ntraces = block.ntraces(), "writing SEG-Y file");
    let file = File::create(path).map_err(|e| SegyError::from(e).in_file(path))?;
    let mut writer = BufWriter::new(file);
    write_block(&mut writer, block, Endianness::Big).map_err(|e| e.in_file(path))?;
    writer.flush()?;
    Ok(())
}
