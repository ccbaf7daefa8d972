// Copyright 2021. shaderpp contributors
// This source code is licensed under GPLv3 or any later version.
use std::io;
use std::path::{Path, PathBuf};

/// Which form of `#include` produced a filename.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncludeKind {
    /// `#include "name"`
    Local,
    /// `#include <name>`
    System,
}

/// Resolves an `#include` target to source text.
///
/// The returned buffer is owned by the pushed source frame and simply
/// dropped when that frame pops; there is no separate close callback to
/// implement, a resolver that needs custom teardown (say, unmapping a
/// memory-mapped file) puts that logic in its buffer type's `Drop` impl.
pub trait IncludeResolver {
    fn open(&mut self, kind: IncludeKind, filename: &str, parent: Option<&str>) -> io::Result<Box<str>>;
}

/// The default filesystem-backed resolver: reads `filename` relative to
/// `parent`'s directory, falling back to the process's current directory
/// for the root file. `kind` does not change resolution; a richer
/// resolver would consult distinct system/local search paths for it.
#[derive(Default)]
pub struct FsIncludeResolver;

impl FsIncludeResolver {
    pub fn new() -> Self {
        FsIncludeResolver
    }
}

impl IncludeResolver for FsIncludeResolver {
    fn open(&mut self, _kind: IncludeKind, filename: &str, parent: Option<&str>) -> io::Result<Box<str>> {
        let path = resolve_path(filename, parent);
        let bytes = std::fs::read(&path)?;
        let text = String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(text.into_boxed_str())
    }
}

fn resolve_path(filename: &str, parent: Option<&str>) -> PathBuf {
    let candidate = Path::new(filename);
    if candidate.is_absolute() {
        return candidate.to_path_buf();
    }
    match parent.and_then(|p| Path::new(p).parent()) {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(candidate),
        _ => candidate.to_path_buf(),
    }
}
