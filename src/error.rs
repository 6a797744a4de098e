use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegyError {
    /// Fewer bytes were available than a fixed-size header or record needs.
    #[error("Truncated buffer at byte {offset}: needed {needed} bytes")]
    TruncatedBuffer { offset: u64, needed: usize },
    /// The trace area is not a whole number of traces.
    #[error("Malformed file: {file_size} bytes is not 3600 + a multiple of the {trace_size}-byte trace size")]
    MalformedFile { file_size: u64, trace_size: u64 },
    #[error("File header mismatch in {}: {field} is {found}, expected {expected}", path.display())]
    HeaderMismatch { path: PathBuf, field: &'static str, expected: i32, found: i32 },
    /// Discovery matched nothing, or an empty file list was given
    /// (empty `location`).
    #[error("{}", no_files_message(location, pattern))]
    NoFilesFound { location: PathBuf, pattern: String },
    #[error("Unsupported data sample format code: {0}")]
    UnsupportedSampleFormat(i32),
    #[error("Unknown header field: {0}")]
    UnknownField(String),
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    /// A catalog segment that does not lie on trace boundaries inside its file.
    #[error("Segment of {count} traces at byte {offset} does not fit a {file_size}-byte file")]
    InvalidSegment { offset: u64, count: u64, file_size: u64 },
    #[error("Shot index {index} out of range for a catalog of {len} shots")]
    NoSuchShot { index: usize, len: usize },
    #[error("{}: {source}", path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<SegyError>,
    },
    #[error("Task failed: {0}")]
    Task(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Catalog serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn no_files_message(location: &Path, pattern: &str) -> String {
    if location.as_os_str().is_empty() {
        "No input files given".to_string()
    } else {
        format!("No files matching '{pattern}' found in {}", location.display())
    }
}

impl SegyError {
    /// Scan called with an empty file list.
    pub fn no_input_files() -> Self {
        SegyError::NoFilesFound { location: PathBuf::new(), pattern: String::new() }
    }

    /// Attach the originating file path. Already-attributed errors are left alone.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            e @ SegyError::InFile { .. } => e,
            e @ SegyError::HeaderMismatch { .. } => e,
            e => SegyError::InFile { path: path.into(), source: Box::new(e) },
        }
    }

    /// The underlying error with any `InFile` wrapping removed.
    pub fn root(&self) -> &SegyError {
        match self {
            SegyError::InFile { source, .. } => source.root(),
            e => e,
        }
    }
}

pub type Result<T> = std::result::Result<T, SegyError>;

/// `read_exact` that reports a short read as [`SegyError::TruncatedBuffer`].
pub(crate) fn read_exact_at<R: io::Read>(reader: &mut R, buf: &mut [u8], offset: u64) -> Result<()> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Err(SegyError::TruncatedBuffer { offset, needed: buf.len() })
        }
        Err(e) => Err(e.into()),
    }
}
