pub mod error;
pub mod field;
pub mod endian;
pub mod sample;
pub mod header;
pub mod block;
pub mod storage;
pub mod pipeline;
pub mod scan;

pub use error::{Result, SegyError};
pub use field::{BinaryFileHeader, BinaryTraceHeader, FileField, TraceField};
pub use endian::Endianness;
pub use sample::SampleFormat;
pub use header::FileHeader;
pub use block::{segy_read, segy_write, SampleMatrix, SeisBlock};
pub use storage::{list_files, LocalFs, Storage};
pub use pipeline::{Concurrency, WorkerPool};
pub use scan::{
    read_shot, scan, scan_dir, scan_file, FieldRange, ScanConfig, Segment, ShotCatalog, ShotKey, ShotRecord,
};
#[cfg(feature = "async")]
pub use pipeline::nonblocking::{read_shot_async, scan_async, scan_dir_async, segy_read_async, segy_write_async};
