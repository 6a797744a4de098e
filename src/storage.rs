//! File discovery and byte-handle access.
//!
//! The scan engine never touches the filesystem directly: it asks a
//! [`Storage`] to enumerate candidate paths and to open a seekable handle per
//! path.  [`LocalFs`] is the local-disk implementation; remote object stores
//! can plug in by implementing the trait.

use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

use crate::error::{Result, SegyError};

pub trait Storage: Send + Sync {
    type Handle: Read + Seek + Send + 'static;

    /// Open `path` for reading.  Each call returns an independent handle.
    fn open(&self, path: &Path) -> io::Result<Self::Handle>;

    /// Entries of `dir` whose file name matches the shell-style `pattern`.
    /// Order is unspecified; [`list_files`] sorts.
    fn list(&self, dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>>;

    fn is_file(&self, path: &Path) -> bool;
}

/// The local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl Storage for LocalFs {
    type Handle = File;

    fn open(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    fn list(&self, dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if fnmatch(&entry.file_name().to_string_lossy(), pattern) {
                out.push(entry.path());
            }
        }
        Ok(out)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Resolve `path` + optional `pattern` to a sorted set of files.
///
/// With no pattern and `path` naming a file, that file alone is returned.
/// Otherwise `path` is a directory and its entries matching `pattern`
/// (default `*`) are returned.  An empty result is
/// [`SegyError::NoFilesFound`].
pub fn list_files<S: Storage>(storage: &S, path: &Path, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = match pattern {
        None if storage.is_file(path) => vec![path.to_path_buf()],
        _ => storage
            .list(path, pattern.unwrap_or("*"))
            .map_err(|e| SegyError::from(e).in_file(path))?,
    };
    if files.is_empty() {
        return Err(SegyError::NoFilesFound {
            location: path.to_path_buf(),
            pattern:  pattern.unwrap_or("*").to_string(),
        });
    }
    files.sort();
    Ok(files)
}

/// Shell-style match of a whole file name: `*`, `?`, `[abc]`, `[a-z]`,
/// `[!abc]`.  No escaping; a `[` without a closing `]` matches literally.
pub fn fnmatch(name: &str, pattern: &str) -> bool {
    let name: Vec<char> = name.chars().collect();
    let pat: Vec<char> = pattern.chars().collect();
    let (mut n, mut p) = (0usize, 0usize);
    // Resume point for the most recent `*`: (pattern index after it, name index).
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        let step = match pat.get(p) {
            Some('*') => {
                star = Some((p + 1, n));
                p += 1;
                continue;
            }
            Some('?') => Some(1),
            Some('[') => match class_match(&pat[p..], name[n]) {
                Some((true, len)) => Some(len),
                Some((false, _)) => None,
                None => (name[n] == '[').then_some(1),
            },
            Some(&c) => (c == name[n]).then_some(1),
            None => None,
        };
        match (step, star) {
            (Some(len), _) => {
                p += len;
                n += 1;
            }
            (None, Some((sp, sn))) => {
                p = sp;
                n = sn + 1;
                star = Some((sp, sn + 1));
            }
            (None, None) => return false,
        }
    }
    pat[p..].iter().all(|&c| c == '*')
}

/// Match `c` against the bracket class at the start of `pat`.  Returns
/// `(matched, class length)` or `None` if the class is unterminated.
fn class_match(pat: &[char], c: char) -> Option<(bool, usize)> {
    let mut i = 1;
    let negate = matches!(pat.get(i), Some('!') | Some('^'));
    if negate {
        i += 1;
    }
    let mut matched = false;
    let mut first = true;
    loop {
        let lo = *pat.get(i)?;
        if lo == ']' && !first {
            return Some((matched != negate, i + 1));
        }
        first = false;
        if pat.get(i + 1) == Some(&'-') && pat.get(i + 2).is_some_and(|&hi| hi != ']') {
            let hi = pat[i + 2];
            matched |= lo <= c && c <= hi;
            i += 3;
        } else {
            matched |= lo == c;
            i += 1;
        }
    }
}
