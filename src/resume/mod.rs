//! Resume ingestion.
//!
//! Plain text and Markdown are read as UTF-8; PDFs go through
//! `pdf-extract` on the blocking pool.  The result is the raw resume text
//! handed to [`crate::session::InterviewSetup`].

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Resume file kinds the loader understands, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    PlainText,
    Markdown,
    Pdf,
}

impl ResumeFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "text" => Some(Self::PlainText),
            "md" | "markdown" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

impl fmt::Display for ResumeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResumeFormat::PlainText => "plain text",
            ResumeFormat::Markdown => "Markdown",
            ResumeFormat::Pdf => "PDF",
        })
    }
}

#[derive(Debug, Error)]
pub enum FileFormatError {
    #[error("Please upload a .pdf, .txt, or .md file.")]
    Unsupported(PathBuf),

    #[error("Failed to read the file: {0}")]
    Read(#[from] std::io::Error),

    #[error("The file is not valid UTF-8 text.")]
    InvalidUtf8,

    #[error("Could not extract text from the PDF: {0}")]
    Pdf(String),

    #[error("The file contains no text.")]
    Empty,
}

/// Read the resume at `path` and return its text, trimmed.
pub async fn load_resume(path: impl AsRef<Path>) -> Result<String, FileFormatError> {
    let path = path.as_ref();
    let format =
        ResumeFormat::from_path(path).ok_or_else(|| FileFormatError::Unsupported(path.to_path_buf()))?;

    let bytes = tokio::fs::read(path).await?;
    let text = match format {
        ResumeFormat::PlainText | ResumeFormat::Markdown => {
            String::from_utf8(bytes).map_err(|_| FileFormatError::InvalidUtf8)?
        }
        ResumeFormat::Pdf => tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| FileFormatError::Pdf(e.to_string()))
        })
        .await
        .map_err(|e| FileFormatError::Pdf(e.to_string()))??,
    };

    let text = normalize(&text);
    if text.is_empty() {
        return Err(FileFormatError::Empty);
    }
    log::info!(
        "resume: loaded {} ({format}, {} chars)",
        path.display(),
        text.len()
    );
    Ok(text)
}

/// Trim each line's trailing whitespace and collapse runs of blank lines;
/// PDF extraction tends to leave both behind.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(contents).unwrap();
        f
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            ResumeFormat::from_path(Path::new("cv.TXT")),
            Some(ResumeFormat::PlainText)
        );
        assert_eq!(
            ResumeFormat::from_path(Path::new("/tmp/me.markdown")),
            Some(ResumeFormat::Markdown)
        );
        assert_eq!(
            ResumeFormat::from_path(Path::new("resume.pdf")),
            Some(ResumeFormat::Pdf)
        );
        assert_eq!(ResumeFormat::from_path(Path::new("resume.docx")), None);
        assert_eq!(ResumeFormat::from_path(Path::new("resume")), None);
    }

    #[tokio::test]
    async fn loads_markdown_trimmed() {
        let f = write_temp(".md", b"\n# Jane Doe\n\n\n\nRust engineer   \n");
        let text = load_resume(f.path()).await.unwrap();
        assert_eq!(text, "# Jane Doe\n\nRust engineer");
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected_before_reading() {
        let err = load_resume("/nonexistent/resume.docx").await.unwrap_err();
        assert!(matches!(err, FileFormatError::Unsupported(_)));
        assert_eq!(err.to_string(), "Please upload a .pdf, .txt, or .md file.");
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let err = load_resume("/nonexistent/resume.txt").await.unwrap_err();
        assert!(matches!(err, FileFormatError::Read(_)));
    }

    #[tokio::test]
    async fn binary_text_file_is_invalid_utf8() {
        let f = write_temp(".txt", &[0xff, 0xfe, 0x00, 0x41]);
        assert!(matches!(
            load_resume(f.path()).await.unwrap_err(),
            FileFormatError::InvalidUtf8
        ));
    }

    #[tokio::test]
    async fn whitespace_only_file_is_empty() {
        let f = write_temp(".txt", b"  \n\t\n");
        assert!(matches!(
            load_resume(f.path()).await.unwrap_err(),
            FileFormatError::Empty
        ));
    }

    #[tokio::test]
    async fn corrupt_pdf_is_a_pdf_error() {
        let f = write_temp(".pdf", b"definitely not a pdf");
        assert!(matches!(
            load_resume(f.path()).await.unwrap_err(),
            FileFormatError::Pdf(_)
        ));
    }
}
