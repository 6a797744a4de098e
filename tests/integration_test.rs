use segyscan::block::write_block;
use segyscan::pipeline::WorkerPool;
use segyscan::{
    list_files, scan, scan_dir, segy_read, segy_write, BinaryTraceHeader, Concurrency, Endianness, FileHeader,
    SampleMatrix, ScanConfig, Segment, SegyError, SeisBlock, ShotCatalog, ShotKey, TraceField,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// One trace per `(source_x, source_y, group_x)` tuple; sample `k` of trace
/// `i` is `i + k / 4`.
fn survey(sources: &[(i32, i32, i32)], ns: usize, format: i32) -> SeisBlock {
    let mut fh = FileHeader::default();
    fh.binary.ns = ns as i32;
    fh.binary.dt = 4000;
    fh.binary.data_sample_format = format;
    let headers = sources
        .iter()
        .enumerate()
        .map(|(i, &(x, y, g))| {
            let mut th = BinaryTraceHeader::default();
            th.source_x = x;
            th.source_y = y;
            th.group_x = g;
            th.ns = ns as i32;
            th.trace_num_within_file = i as i32 + 1;
            th
        })
        .collect();
    let traces = (0..sources.len())
        .map(|i| (0..ns).map(|k| i as f64 + k as f64 / 4.0).collect())
        .collect();
    SeisBlock::new(fh, headers, SampleMatrix::from_traces(ns, traces).unwrap()).unwrap()
}

fn write_survey(path: &Path, sources: &[(i32, i32, i32)], ns: usize, format: i32) -> SeisBlock {
    let block = survey(sources, ns, format);
    segy_write(path, &block).unwrap();
    block
}

fn sequential() -> ScanConfig {
    ScanConfig::default().with_concurrency(Concurrency::sequential())
}

#[test]
fn test_write_read_ieee() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ieee.segy");
    let block = write_survey(&path, &[(1, 1, 10), (1, 1, 20), (2, 1, 30)], 8, 5);

    assert_eq!(std::fs::metadata(&path).unwrap().len(), 3600 + 3 * (240 + 8 * 4));
    let read = segy_read(&path, TraceField::ALL, &WorkerPool::sequential()).unwrap();
    assert_eq!(read, block);
}

#[test]
fn test_write_read_ibm() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ibm.segy");
    // Quarter steps over small integers are exact in IBM float.
    let block = write_survey(&path, &[(5, 5, 0), (5, 5, 1)], 16, 1);

    let read = segy_read(&path, TraceField::ALL, &WorkerPool::new(2).unwrap()).unwrap();
    assert_eq!(read.data, block.data);
    assert_eq!(read.trace_headers, block.trace_headers);
}

#[test]
fn test_partial_keys_leave_other_fields_zero() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keys.segy");
    write_survey(&path, &[(7, 8, 9)], 2, 5);

    let read = segy_read(&path, &[TraceField::SourceX], &WorkerPool::sequential()).unwrap();
    assert_eq!(read.trace_headers[0].source_x, 7);
    assert_eq!(read.trace_headers[0].source_y, 0);
    assert_eq!(read.trace_headers[0].group_x, 0);
}

#[test]
fn test_interleaved_shot_segments() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.segy");
    write_survey(&path, &[(1, 1, 0), (2, 2, 0), (1, 1, 0)], 1, 5);

    let cat = scan(&[path.clone()], &sequential()).unwrap();
    assert_eq!(cat.len(), 2);
    assert_eq!(cat.shots(), vec![ShotKey::new(1, 1, 0), ShotKey::new(2, 2, 0)]);
    assert_eq!(cat.offsets(), vec![3600, 3844]);
    assert_eq!(cat.counts(), vec![2, 1]);
    let segs: Vec<_> = cat.records[0].segments.iter().map(|s| (s.offset, s.count)).collect();
    assert_eq!(segs, vec![(3600, 1), (4088, 1)]);
}

#[test]
fn test_summary_spans_all_segments() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.segy");
    write_survey(&path, &[(1, 1, 50), (2, 2, 0), (1, 1, -3), (1, 1, 7)], 1, 5);

    let cfg = sequential().with_keys([TraceField::GroupX]);
    let cat = scan(&[path], &cfg).unwrap();
    let range = cat.records[0].range(TraceField::GroupX).unwrap();
    assert_eq!((range.min, range.max), (-3, 50));
    assert_eq!(cat.summary(1).unwrap()["GroupX"].min, 0);
}

#[test]
fn test_equal_shots_in_two_files_stay_separate() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.segy");
    let b = dir.path().join("b.segy");
    write_survey(&a, &[(1, 1, 0), (3, 3, 0)], 2, 5);
    write_survey(&b, &[(1, 1, 0), (2, 2, 0)], 2, 5);

    let cat = scan(&[a.clone(), b.clone()], &sequential()).unwrap();
    assert_eq!(cat.shots(), vec![
        ShotKey::new(1, 1, 0), ShotKey::new(1, 1, 0), ShotKey::new(2, 2, 0), ShotKey::new(3, 3, 0),
    ]);
    assert_eq!(cat.paths(), vec![a.as_path(), b.as_path(), b.as_path(), a.as_path()]);
}

#[test]
fn test_parallel_scan_matches_sequential() {
    let dir = TempDir::new().unwrap();
    let mut files = Vec::new();
    for f in 0..3 {
        let path = dir.path().join(format!("line{f}.segy"));
        let sources: Vec<_> = (0..200).map(|i| ((i / 9 + f) % 11, f, i)).collect();
        write_survey(&path, &sources, 3, 5);
        files.push(path);
    }

    let base = ScanConfig::default().with_keys([TraceField::GroupX]).with_chunk_size(7);
    let seq = scan(&files, &base.clone().with_concurrency(Concurrency::sequential())).unwrap();
    let par = scan(&files, &base.with_concurrency(Concurrency::threads(4))).unwrap();
    assert_eq!(seq, par);
}

#[test]
fn test_read_shot_concatenates_segments() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.segy");
    let block = write_survey(&path, &[(1, 1, 0), (2, 2, 0), (1, 1, 9)], 4, 1);

    let cat = scan(&[path], &sequential()).unwrap();
    let shot = cat.read_shot(0, TraceField::ALL).unwrap();
    assert_eq!(shot.ntraces(), 2);
    assert_eq!(shot.data.trace(0), block.data.trace(0));
    assert_eq!(shot.data.trace(1), block.data.trace(2));
    assert_eq!(shot.trace_headers[1].group_x, 9);

    let headers = cat.read_headers(0, &[TraceField::GroupX]).unwrap();
    assert_eq!(headers.iter().map(|h| h.group_x).collect::<Vec<_>>(), vec![0, 9]);

    assert!(matches!(cat.read_shot(5, TraceField::ALL), Err(SegyError::NoSuchShot { index: 5, len: 2 })));
}

#[test]
fn test_little_endian_scan_and_read_shot() {
    for format in [1, 5] {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("le.segy");
        let block = survey(&[(1, 1, 0), (2, 2, 0), (1, 1, 3)], 4, format);
        let mut w = BufWriter::new(File::create(&path).unwrap());
        write_block(&mut w, &block, Endianness::Little).unwrap();
        w.flush().unwrap();
        drop(w);

        // Sample 0 of trace 1 is 1.0. IBM samples stay big-endian on disk.
        let bytes = std::fs::read(&path).unwrap();
        let at = 3600 + 256 + 240;
        let expected: [u8; 4] = if format == 1 { [0x41, 0x10, 0x00, 0x00] } else { 1.0f32.to_le_bytes() };
        assert_eq!(bytes[at..at + 4], expected, "format {format}");

        let cfg = sequential().with_endianness(Endianness::Little).with_keys([TraceField::GroupX]);
        let cat = scan(&[path], &cfg).unwrap();
        assert_eq!(cat.shots(), vec![ShotKey::new(1, 1, 0), ShotKey::new(2, 2, 0)]);
        assert_eq!(cat.file_header.binary.ns, 4);
        assert_eq!(cat.records[0].range(TraceField::GroupX).unwrap().max, 3);

        let shot = cat.read_shot(0, TraceField::ALL).unwrap();
        assert_eq!(shot.ntraces(), 2);
        assert_eq!(shot.data.trace(0), block.data.trace(0));
        assert_eq!(shot.data.trace(1), block.data.trace(2));
        assert_eq!(shot.trace_headers[1], block.trace_headers[2]);
    }
}

#[test]
fn test_corrupt_catalog_segments_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.segy");
    write_survey(&path, &[(1, 1, 0), (2, 2, 0)], 2, 5);
    let cat = scan(&[path], &sequential()).unwrap();

    let bad_segments = [
        Segment { offset: 3600, count: u64::MAX / 8 },
        Segment { offset: 3600, count: 3 },
        Segment { offset: 3601, count: 1 },
        Segment { offset: 0, count: 1 },
        Segment { offset: u64::MAX - 10, count: 2 },
    ];
    for seg in bad_segments {
        let mut broken = cat.clone();
        broken.records[0].segments = vec![seg];
        let restored = ShotCatalog::from_bytes(&broken.to_bytes().unwrap()).unwrap();

        let err = restored.read_shot(0, &[]).unwrap_err();
        assert!(matches!(err.root(), SegyError::InvalidSegment { .. }), "{seg:?}: {err}");
        let err = restored.read_headers(0, &[]).unwrap_err();
        assert!(matches!(err.root(), SegyError::InvalidSegment { .. }), "{seg:?}: {err}");
    }

    // The second trace ends exactly at the end of the file.
    let mut edge = cat.clone();
    edge.records[0].segments = vec![Segment { offset: 3600 + 248, count: 1 }];
    assert_eq!(edge.read_shot(0, TraceField::ALL).unwrap().trace_headers[0].source_x, 2);
}

#[test]
fn test_catalog_persists_as_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.segy");
    write_survey(&path, &[(1, 1, 4), (2, 2, 5)], 2, 5);

    let cat = scan(&[path], &sequential().with_keys([TraceField::GroupX])).unwrap();
    let restored = ShotCatalog::from_bytes(&cat.to_bytes().unwrap()).unwrap();
    assert_eq!(restored, cat);
    assert_eq!(restored.read_shot(1, TraceField::ALL).unwrap().trace_headers[0].group_x, 5);
}

#[test]
fn test_header_mismatch() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.segy");
    let b = dir.path().join("b.segy");
    write_survey(&a, &[(1, 1, 0)], 2, 5);
    write_survey(&b, &[(1, 1, 0)], 3, 5);

    match scan(&[a, b.clone()], &sequential()).unwrap_err() {
        SegyError::HeaderMismatch { path, field, expected, found } => {
            assert_eq!(path, b);
            assert_eq!((field, expected, found), ("ns", 2, 3));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_truncated_file_is_malformed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.segy");
    write_survey(&path, &[(1, 1, 0), (1, 1, 1)], 4, 5);
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

    let err = scan(&[path.clone()], &sequential()).unwrap_err();
    assert!(matches!(&err, SegyError::InFile { path: p, .. } if *p == path));
    assert!(matches!(err.root(), SegyError::MalformedFile { .. }));
}

#[test]
fn test_discovery() {
    let dir = TempDir::new().unwrap();
    for name in ["s2.segy", "s1.segy", "notes.txt"] {
        write_survey(&dir.path().join(name), &[(1, 1, 0)], 1, 5);
    }

    let found = list_files(&segyscan::LocalFs, dir.path(), Some("*.segy")).unwrap();
    let names: Vec<_> = found.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
    assert_eq!(names, ["s1.segy", "s2.segy"]);

    let single = dir.path().join("s2.segy");
    assert_eq!(list_files(&segyscan::LocalFs, &single, None).unwrap(), vec![single]);

    let cat = scan_dir(dir.path(), Some("s*.segy"), &sequential()).unwrap();
    assert_eq!(cat.len(), 2);

    let err = scan_dir(dir.path(), Some("*.sgy"), &sequential()).unwrap_err();
    assert!(matches!(err, SegyError::NoFilesFound { .. }));
}

#[test]
fn test_config_from_json() {
    let cfg = ScanConfig::from_json(br#"{"keys": ["GroupX"], "chunk_size": 16}"#).unwrap();
    assert_eq!(cfg.keys, vec![TraceField::GroupX]);
    assert_eq!(cfg.chunk_size, 16);
    assert_eq!(cfg.depth_key, TraceField::SourceDepth);
}

#[cfg(feature = "async")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_async_scan_matches_blocking() {
    let dir = TempDir::new().unwrap();
    let mut files: Vec<PathBuf> = Vec::new();
    for f in 0..2 {
        let path = dir.path().join(format!("line{f}.segy"));
        let sources: Vec<_> = (0..60).map(|i| (i / 5, f, i)).collect();
        write_survey(&path, &sources, 2, 1);
        files.push(path);
    }

    let cfg = ScanConfig::default()
        .with_keys([TraceField::GroupX])
        .with_chunk_size(4)
        .with_concurrency(Concurrency::threads(3));
    let blocking = scan(&files, &cfg).unwrap();
    let nonblocking = segyscan::scan_async(files, cfg).await.unwrap();
    assert_eq!(blocking, nonblocking);

    let record = nonblocking.records[3].clone();
    let a = segyscan::read_shot_async(record.clone(), TraceField::ALL.to_vec()).await.unwrap();
    assert_eq!(a, record.read(TraceField::ALL).unwrap());
}
