//! Header codec: raw 3600-byte file preambles and 240-byte trace headers to
//! and from their structured forms.
//!
//! Decoding only touches the requested fields; everything else stays at
//! zero.  Encoding always writes every field in the table, so an
//! unset field serialises as zero.

use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, SeekFrom, Write};

use crate::endian::{read_int, write_int, Endianness};
use crate::error::{read_exact_at, Result, SegyError};
use crate::field::{
    BinaryFileHeader, BinaryTraceHeader, FileField, TraceField,
    FILE_HEADER_SIZE, TEXT_HEADER_SIZE, TRACE_HEADER_SIZE,
};
use crate::sample::{SampleFormat, SAMPLE_SIZE};

/// Textual preamble plus binary file header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    /// Opaque textual header.  Padded with spaces / truncated to 3200 bytes
    /// on encode.
    pub text: Vec<u8>,
    pub binary: BinaryFileHeader,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            text: vec![b' '; TEXT_HEADER_SIZE],
            binary: BinaryFileHeader::default(),
        }
    }
}

impl FileHeader {
    /// Samples per trace.  Negative values on disk read as zero.
    pub fn ns(&self) -> usize {
        self.binary.ns.max(0) as usize
    }

    pub fn dt(&self) -> i32 {
        self.binary.dt
    }

    /// Bytes per trace record: header plus samples.
    pub fn trace_size(&self) -> u64 {
        (TRACE_HEADER_SIZE + self.ns() * SAMPLE_SIZE) as u64
    }

    pub fn sample_format(&self) -> Result<SampleFormat> {
        SampleFormat::from_code(self.binary.data_sample_format)
    }

    /// Number of traces in a file of `file_size` bytes with this header.
    ///
    /// Fails with [`SegyError::MalformedFile`] unless the bytes after the
    /// preamble are a whole number of traces.
    pub fn trace_count(&self, file_size: u64) -> Result<u64> {
        let trace_size = self.trace_size();
        let body = file_size.checked_sub(FILE_HEADER_SIZE as u64).ok_or(SegyError::TruncatedBuffer {
            offset: 0,
            needed: FILE_HEADER_SIZE,
        })?;
        if body % trace_size != 0 {
            return Err(SegyError::MalformedFile { file_size, trace_size });
        }
        Ok(body / trace_size)
    }

    /// First binary field whose value differs from `other`'s.
    pub fn first_mismatch(&self, other: &FileHeader) -> Option<(FileField, i32, i32)> {
        FileField::ALL
            .iter()
            .map(|&f| (f, self.binary.get(f), other.binary.get(f)))
            .find(|(_, a, b)| a != b)
    }
}

pub fn decode_file_header(buf: &[u8], keys: &[FileField], endian: Endianness) -> Result<FileHeader> {
    if buf.len() < FILE_HEADER_SIZE {
        return Err(SegyError::TruncatedBuffer {
            offset: 0,
            needed: FILE_HEADER_SIZE,
        });
    }
    let mut binary = BinaryFileHeader::default();
    for &k in keys {
        binary.set(k, read_int(buf, k.offset(), k.width(), endian)?);
    }
    Ok(FileHeader { text: buf[..TEXT_HEADER_SIZE].to_vec(), binary })
}

pub fn encode_file_header(fh: &FileHeader, endian: Endianness) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; FILE_HEADER_SIZE];
    let n = fh.text.len().min(TEXT_HEADER_SIZE);
    buf[..n].copy_from_slice(&fh.text[..n]);
    buf[n..TEXT_HEADER_SIZE].fill(b' ');
    for &k in FileField::ALL {
        write_int(&mut buf, k.offset(), k.width(), fh.binary.get(k), endian)?;
    }
    Ok(buf)
}

pub fn decode_trace_header(buf: &[u8], keys: &[TraceField], endian: Endianness) -> Result<BinaryTraceHeader> {
    if buf.len() < TRACE_HEADER_SIZE {
        return Err(SegyError::TruncatedBuffer {
            offset: 0,
            needed: TRACE_HEADER_SIZE,
        });
    }
    let mut th = BinaryTraceHeader::default();
    for &k in keys {
        th.set(k, read_int(buf, k.offset(), k.width(), endian)?);
    }
    Ok(th)
}

pub fn encode_trace_header(th: &BinaryTraceHeader, endian: Endianness) -> Result<[u8; TRACE_HEADER_SIZE]> {
    let mut buf = [0u8; TRACE_HEADER_SIZE];
    for &k in TraceField::ALL {
        write_int(&mut buf, k.offset(), k.width(), th.get(k), endian)?;
    }
    Ok(buf)
}

/// Read the file header from the start of `reader`, then restore the
/// stream position.
pub fn read_file_header<R: Read + Seek>(reader: &mut R, keys: &[FileField], endian: Endianness) -> Result<FileHeader> {
    let start = reader.stream_position()?;
    reader.seek(SeekFrom::Start(0))?;
    let mut buf = vec![0u8; FILE_HEADER_SIZE];
    read_exact_at(reader, &mut buf, 0)?;
    reader.seek(SeekFrom::Start(start))?;
    decode_file_header(&buf, keys, endian)
}

pub fn write_file_header<W: Write>(writer: &mut W, fh: &FileHeader, endian: Endianness) -> Result<()> {
    writer.write_all(&encode_file_header(fh, endian)?)?;
    Ok(())
}

/// Read one trace header at the current position.  `offset` is only used
/// to report short reads.
pub fn read_trace_header<R: Read>(
    reader: &mut R,
    keys:   &[TraceField],
    endian: Endianness,
    offset: u64,
) -> Result<BinaryTraceHeader> {
    let mut buf = [0u8; TRACE_HEADER_SIZE];
    read_exact_at(reader, &mut buf, offset)?;
    decode_trace_header(&buf, keys, endian)
}

pub fn write_trace_header<W: Write>(writer: &mut W, th: &BinaryTraceHeader, endian: Endianness) -> Result<()> {
    writer.write_all(&encode_trace_header(th, endian)?)?;
    Ok(())
}
