//! External converters driven through `std::process::Command`.
//!
//! The HTML is written to a scratch directory, the program is run with the
//! input and output paths, and the resulting PDF is read back. The scratch
//! directory is removed when the conversion returns.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::{PageOrientation, PageSetup};
use crate::error::{ForgeError, Result};

/// Which command line a [`CommandBackend`] builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFlavor {
    /// Page geometry is passed as options.
    Wkhtmltopdf,
    /// Page geometry comes from the document's `@page` rule.
    Weasyprint,
}

/// A converter executable.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    flavor: CommandFlavor,
    program: PathBuf,
}

impl CommandBackend {
    pub fn wkhtmltopdf() -> Self {
        Self {
            flavor: CommandFlavor::Wkhtmltopdf,
            program: PathBuf::from("wkhtmltopdf"),
        }
    }

    pub fn weasyprint() -> Self {
        Self {
            flavor: CommandFlavor::Weasyprint,
            program: PathBuf::from("weasyprint"),
        }
    }

    /// Run a different executable with the same command line.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn flavor(&self) -> CommandFlavor {
        self.flavor
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Installation hint shown when the program cannot be run.
    pub fn install_hint(&self) -> &'static str {
        match self.flavor {
            CommandFlavor::Wkhtmltopdf => {
                "install wkhtmltopdf from https://wkhtmltopdf.org/downloads.html \
                 and make sure it is on PATH"
            }
            CommandFlavor::Weasyprint => {
                "install WeasyPrint (`pip install weasyprint`, see \
                 https://doc.courtbouillon.org/weasyprint/stable/first_steps.html) \
                 and make sure it is on PATH"
            }
        }
    }

    /// Arguments for converting `input` to `output`.
    pub fn args(&self, page: &PageSetup, input: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        if self.flavor == CommandFlavor::Wkhtmltopdf {
            let margin = page.margin_css();
            let orientation = match page.orientation {
                PageOrientation::Portrait => "Portrait",
                PageOrientation::Landscape => "Landscape",
            };
            args.extend(
                [
                    "--quiet",
                    "--page-size",
                    page.size.name(),
                    "--orientation",
                    orientation,
                ]
                .map(String::from),
            );
            for side in ["top", "right", "bottom", "left"] {
                args.push(format!("--margin-{side}"));
                args.push(margin.clone());
            }
            args.extend(
                [
                    "--encoding",
                    "UTF-8",
                    "--no-outline",
                    "--enable-local-file-access",
                ]
                .map(String::from),
            );
        }
        args.push(input.display().to_string());
        args.push(output.display().to_string());
        args
    }
}

impl super::PdfBackend for CommandBackend {
    fn name(&self) -> &str {
        match self.flavor {
            CommandFlavor::Wkhtmltopdf => "wkhtmltopdf",
            CommandFlavor::Weasyprint => "weasyprint",
        }
    }

    fn check(&self) -> Result<()> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(s) if s.success() => Ok(()),
            Ok(s) => Err(ForgeError::BackendUnavailable {
                backend: self.name().to_string(),
                hint: format!(
                    "`{} --version` exited with {s}; {}",
                    self.program.display(),
                    self.install_hint()
                ),
            }),
            Err(e) => Err(ForgeError::BackendUnavailable {
                backend: self.name().to_string(),
                hint: format!(
                    "cannot run `{}` ({e}); {}",
                    self.program.display(),
                    self.install_hint()
                ),
            }),
        }
    }

    fn convert(&self, html: &str, page: &PageSetup) -> Result<Vec<u8>> {
        let name = self.name();
        let scratch = tempfile::Builder::new()
            .prefix("report-forge-")
            .tempdir()
            .map_err(|e| ForgeError::conversion(name, format!("cannot create temp dir: {e}")))?;
        let input = scratch.path().join("document.html");
        let output = scratch.path().join("document.pdf");
        fs::write(&input, html)
            .map_err(|e| ForgeError::conversion(name, format!("cannot stage HTML: {e}")))?;

        let args = self.args(page, &input, &output);
        log::debug!("{name}: running {} {}", self.program.display(), args.join(" "));
        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                ForgeError::conversion(
                    name,
                    format!("failed to start `{}`: {e}", self.program.display()),
                )
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ForgeError::conversion(
                name,
                format!("exited with {}: {}", result.status, stderr.trim()),
            ));
        }

        let bytes = fs::read(&output)
            .map_err(|e| ForgeError::conversion(name, format!("no PDF produced: {e}")))?;
        if bytes.is_empty() {
            return Err(ForgeError::conversion(name, "produced an empty PDF"));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::super::PdfBackend;
    use super::*;
    use crate::config::PaperSize;

    #[test]
    fn wkhtmltopdf_args_carry_page_setup() {
        let page = PageSetup {
            size: PaperSize::Letter,
            orientation: PageOrientation::Landscape,
            margin_pt: 54.0,
        };
        let args = CommandBackend::wkhtmltopdf().args(&page, Path::new("in.html"), Path::new("out.pdf"));
        let joined = args.join(" ");
        assert!(joined.starts_with("--quiet --page-size Letter --orientation Landscape"));
        assert!(joined.contains("--margin-left 54pt"));
        assert!(joined.contains("--enable-local-file-access"));
        assert_eq!(&args[args.len() - 2..], ["in.html", "out.pdf"]);
    }

    #[test]
    fn weasyprint_args_are_just_paths() {
        let args =
            CommandBackend::weasyprint().args(&PageSetup::default(), Path::new("a.html"), Path::new("b.pdf"));
        assert_eq!(args, ["a.html", "b.pdf"]);
    }

    #[test]
    fn missing_program_is_unavailable() {
        let backend = CommandBackend::weasyprint().with_program("/nonexistent/report-forge-weasyprint");
        let err = backend.check().unwrap_err();
        assert!(matches!(err, ForgeError::BackendUnavailable { ref backend, .. } if backend == "weasyprint"));
        assert!(err.to_string().contains("pip install weasyprint"));
    }

    #[test]
    fn missing_program_fails_conversion() {
        let backend = CommandBackend::wkhtmltopdf().with_program("/nonexistent/report-forge-wkhtmltopdf");
        let err = backend.convert("<p>x</p>", &PageSetup::default()).unwrap_err();
        assert!(matches!(err, ForgeError::Conversion { .. }));
    }
}
