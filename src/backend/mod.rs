//! HTML → PDF conversion backends.
//!
//! Every backend takes a complete HTML document and returns the PDF bytes in
//! memory; writing them out is the renderer's job.

pub mod command;
pub mod native;

use crate::config::{BackendKind, PageSetup};
use crate::error::Result;

pub use command::CommandBackend;
pub use native::NativeBackend;

/// An HTML → PDF converter.
pub trait PdfBackend {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Whether the backend can run on this machine. Must not install
    /// anything or touch the filesystem outside a temp dir.
    fn check(&self) -> Result<()>;

    /// Convert a complete HTML document to PDF bytes.
    fn convert(&self, html: &str, page: &PageSetup) -> Result<Vec<u8>>;
}

/// The backend for a configured [`BackendKind`].
pub fn backend_for(kind: BackendKind) -> Box<dyn PdfBackend> {
    match kind {
        BackendKind::Native => Box::new(NativeBackend),
        BackendKind::Wkhtmltopdf => Box::new(CommandBackend::wkhtmltopdf()),
        BackendKind::Weasyprint => Box::new(CommandBackend::weasyprint()),
    }
}
