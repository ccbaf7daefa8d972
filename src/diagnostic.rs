// Copyright 2021. shaderpp contributors
// This source code is licensed under GPLv3 or any later version.
use std::rc::Rc;

use codespan_reporting::diagnostic::Severity as CodespanSeverity;

/// The C buffer this mirrors is 256 bytes including the null terminator;
/// latched messages are truncated to the same length.
const LATCH_CAPACITY: usize = 255;

/// How serious a diagnostic is, rendered via `codespan-reporting` when the
/// CLI prints it with a source snippet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Internal,
    Fatal,
    Error,
    Warning,
}

impl From<Severity> for CodespanSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Internal => CodespanSeverity::Bug,
            Severity::Fatal => CodespanSeverity::Error,
            Severity::Error => CodespanSeverity::Error,
            Severity::Warning => CodespanSeverity::Warning,
        }
    }
}

/// A single latched preprocessing error, as surfaced by a
/// `PreprocessingError` token or collected by the pretty-print wrapper.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub filename: Option<Rc<str>>,
    pub line: u32,
}

/// The single-slot failure latch plus the persistent out-of-memory flag.
///
/// Latching is depth-one: a second latch before the first is taken
/// overwrites it. That's intentional upstream of here (directive handlers
/// fail fast, one latch per handler invocation) and not something callers
/// should rely on when two errors occur within the same pump iteration.
#[derive(Default)]
pub struct DiagnosticState {
    latched: Option<String>,
    /// Always false: safe Rust's allocator aborts the process on
    /// allocation failure rather than returning something this type could
    /// latch. Kept for interface parity with the streaming API's
    /// `out_of_memory()` accessor.
    out_of_memory: bool,
}

impl DiagnosticState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latch(&mut self, message: impl Into<String>) {
        let mut message = message.into();
        if message.len() > LATCH_CAPACITY {
            let mut truncate_at = LATCH_CAPACITY;
            while !message.is_char_boundary(truncate_at) {
                truncate_at -= 1;
            }
            message.truncate(truncate_at);
        }
        self.latched = Some(message);
    }

    pub fn take(&mut self) -> Option<String> {
        self.latched.take()
    }

    pub fn out_of_memory(&self) -> bool {
        self.out_of_memory
    }
}
