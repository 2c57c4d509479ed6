//! Preflight – check that a conversion backend can run before any work is
//! done. Nothing is installed; an unusable backend is reported with a hint.

use crate::backend::{backend_for, PdfBackend};
use crate::config::BackendKind;
use crate::error::Result;

/// Outcome of checking one backend.
#[derive(Debug)]
pub struct PreflightReport {
    pub backend: BackendKind,
    pub result: Result<()>,
}

impl PreflightReport {
    pub fn is_ready(&self) -> bool {
        self.result.is_ok()
    }
}

/// Check a backend instance.
pub fn check(backend: &dyn PdfBackend) -> Result<()> {
    match backend.check() {
        Ok(()) => {
            log::debug!("preflight: {} is available", backend.name());
            Ok(())
        }
        Err(e) => {
            log::warn!("preflight: {e}");
            Err(e)
        }
    }
}

/// Check the backend for `kind`.
pub fn check_backend(kind: BackendKind) -> Result<()> {
    check(backend_for(kind).as_ref())
}

/// Check every known backend, in declaration order.
pub fn check_all() -> Vec<PreflightReport> {
    [
        BackendKind::Native,
        BackendKind::Wkhtmltopdf,
        BackendKind::Weasyprint,
    ]
    .into_iter()
    .map(|backend| PreflightReport {
        backend,
        result: check_backend(backend),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_passes_preflight() {
        assert!(check_backend(BackendKind::Native).is_ok());
    }

    #[test]
    fn check_all_covers_every_backend() {
        let reports = check_all();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].backend, BackendKind::Native);
        assert!(reports[0].is_ready());
    }
}
