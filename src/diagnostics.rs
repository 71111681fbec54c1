//! Non-fatal misuse notices
//!
//! Diagnostics never change control flow. A pool forwards every notice to
//! its [`DiagnosticSink`] after counting it; the default sink writes a
//! `log` warning.

use crate::error::MisuseKind;

/// Receiver of diagnostic notices raised on the return path
pub trait DiagnosticSink: Send + Sync {
    /// Called once per detected misuse
    fn report(&self, kind: MisuseKind, length: usize);
}

/// Sink that emits a `log::warn!` record per notice
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn report(&self, kind: MisuseKind, length: usize) {
        log::warn!("array pool misuse: {} (length {})", kind, length);
    }
}

/// Sink that discards every notice
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentDiagnostics;

impl DiagnosticSink for SilentDiagnostics {
    fn report(&self, _kind: MisuseKind, _length: usize) {}
}
