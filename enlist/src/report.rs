//! Process-wide error reporting for suppressed failures.
//!
//! The scoped runner suppresses rollback failures so they cannot mask the
//! unit-of-work error that caused the rollback. Suppressed does not mean
//! lost: every such error is published to the reporters registered here, and
//! falls back to the log when none is installed.
//!
//! The registry has an explicit install/remove lifecycle so tests can attach
//! and detach reporters deterministically per run.

use crate::errors::EnlistError;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receives errors the library suppressed from a caller-visible result.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &EnlistError);
}

/// Handle returned by [`install`], used to [`remove`] the reporter again.
pub struct ReporterRef {
    id: u64,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

static REGISTRY: Lazy<RwLock<Vec<(u64, Arc<dyn ErrorReporter>)>>> =
    Lazy::new(|| RwLock::new(Vec::new()));

/// Installs a process-wide error reporter.
///
/// All reporters installed at the time an error is published receive it, in
/// installation order.
pub fn install(reporter: Arc<dyn ErrorReporter>) -> ReporterRef {
    let id = NEXT_ID.fetch_add(1, Ordering::SeqCst);
    REGISTRY.write().push((id, reporter));
    ReporterRef { id }
}

/// Removes a previously installed reporter. Removing twice is a no-op.
pub fn remove(reporter_ref: ReporterRef) {
    REGISTRY.write().retain(|(id, _)| *id != reporter_ref.id);
}

/// Publishes a suppressed error to all installed reporters, or to the log
/// when none is installed.
pub(crate) fn publish(error: &EnlistError) {
    let registry = REGISTRY.read();
    if registry.is_empty() {
        log::warn!("Suppressed error (no reporter installed): {}", error);
        return;
    }
    for (_, reporter) in registry.iter() {
        reporter.report(error);
    }
}
