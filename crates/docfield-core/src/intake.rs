//! Upload intake: accepts PDF uploads into the input folder.
//!
//! Rejections come back as an [`ErrorRecord`] value, ready to show to the
//! user, never as a panic or a bubbling error.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use unicode_normalization::UnicodeNormalization;

use crate::models::record::ErrorRecord;
use crate::patterns::{FILENAME_WHITESPACE, UNSAFE_FILENAME_CHARS};

/// The only accepted upload type.
pub const ALLOWED_EXTENSION: &str = "pdf";

/// Shown when an upload is not a PDF.
pub const INVALID_UPLOAD: &str = "Arquivo inválido. Envie um PDF.";

/// Whether a file name carries the allowed extension (any case).
pub fn is_allowed(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(ALLOWED_EXTENSION))
}

/// Reduce an uploaded name to a safe, flat file name.
///
/// Accents are folded to ASCII, path separators and whitespace become `_`,
/// other unsafe characters are dropped, and leading/trailing dots and
/// underscores are trimmed. Returns `None` if nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let ascii: String = name
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = FILENAME_WHITESPACE.replace_all(ascii.trim(), "_");
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(&joined, "");
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');

    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Stores accepted uploads in the input folder.
#[derive(Debug, Clone)]
pub struct Intake {
    input_dir: PathBuf,
}

impl Intake {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Validate and store an upload. Returns the stored path.
    pub fn accept(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, ErrorRecord> {
        if !is_allowed(name) {
            warn!("Rejected upload {:?}: not a PDF", name);
            return Err(ErrorRecord::new(INVALID_UPLOAD));
        }
        // Sanitizing can strip the stem and leave a bare "pdf"
        let Some(safe_name) = sanitize_filename(name).filter(|n| is_allowed(n)) else {
            warn!("Rejected upload {:?}: unusable file name", name);
            return Err(ErrorRecord::new(INVALID_UPLOAD));
        };

        let path = self.input_dir.join(safe_name);
        std::fs::create_dir_all(&self.input_dir)
            .and_then(|_| std::fs::write(&path, bytes))
            .map_err(|e| ErrorRecord::new(format!("failed to store upload: {}", e)))?;

        info!("Stored upload {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Copy a local file in as if uploaded.
    pub fn import(&self, source: &Path) -> Result<PathBuf, ErrorRecord> {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !is_allowed(&name) {
            return Err(ErrorRecord::new(INVALID_UPLOAD));
        }
        let bytes = std::fs::read(source)
            .map_err(|e| ErrorRecord::new(format!("failed to read {}: {}", source.display(), e)))?;
        self.accept(&name, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extension_check_is_case_insensitive() {
        assert!(is_allowed("holerite.pdf"));
        assert!(is_allowed("HOLERITE.PDF"));
        assert!(is_allowed("a.b.Pdf"));
        assert!(!is_allowed("holerite.pdf.exe"));
        assert!(!is_allowed("holerite"));
        assert!(!is_allowed("pdf"));
        assert!(!is_allowed("notes.txt"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Holerite Março 2024.pdf").as_deref(), Some("Holerite_Marco_2024.pdf"));
        assert_eq!(sanitize_filename("../../etc/passwd.pdf").as_deref(), Some("etc_passwd.pdf"));
        assert_eq!(sanitize_filename("C:\\docs\\nota fiscal.pdf").as_deref(), Some("C_docs_nota_fiscal.pdf"));
        assert_eq!(sanitize_filename("  .hidden.pdf").as_deref(), Some("hidden.pdf"));
        assert_eq!(sanitize_filename("***"), None);
    }

    #[test]
    fn test_accept_stores_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let intake = Intake::new(dir.path().join("entrada"));

        let path = intake.accept("Nota Fiscal.PDF", b"%PDF-1.5").unwrap();
        assert_eq!(path, dir.path().join("entrada").join("Nota_Fiscal.PDF"));
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.5");
    }

    #[test]
    fn test_accept_rejects_other_types_with_error_value() {
        let dir = tempfile::tempdir().unwrap();
        let intake = Intake::new(dir.path());

        let err = intake.accept("photo.png", b"...").unwrap_err();
        assert_eq!(err.cause, INVALID_UPLOAD);
        assert_eq!(serde_json::to_value(&err).unwrap()["Erro"], INVALID_UPLOAD);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_accept_rejects_names_without_stem() {
        let dir = tempfile::tempdir().unwrap();
        let intake = Intake::new(dir.path());

        for name in [".pdf", "***.pdf", "../.PDF"] {
            let err = intake.accept(name, b"%PDF").unwrap_err();
            assert_eq!(err.cause, INVALID_UPLOAD, "{name}");
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_import_copies_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan.pdf");
        std::fs::write(&source, b"%PDF").unwrap();

        let intake = Intake::new(dir.path().join("entrada"));
        let stored = intake.import(&source).unwrap();
        assert_eq!(stored.file_name().unwrap(), "scan.pdf");
    }
}
