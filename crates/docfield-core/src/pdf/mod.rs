//! PDF preprocessing: turns page one of a document into prompt content.

mod extractor;
pub mod tables;

pub use extractor::PdfExtractor;
pub use tables::detect_tables;

use std::fmt;
use std::path::Path;

use image::DynamicImage;
use tracing::{debug, warn};

use crate::error::DocumentError;

/// Linear upscale applied to page images (4x pixel area).
pub const RENDER_SCALE: f32 = 2.0;

/// Marker introducing the table section of structured text.
pub const TABLES_MARKER: &str = "TABELAS:";

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Which representation of the page to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Upscaled PNG of the page, for vision models.
    Image,
    /// Page text plus detected tables, for text models.
    StructuredText,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::StructuredText => write!(f, "structured-text"),
        }
    }
}

/// PNG payload of a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// One detected table: ordered rows of optionally-empty cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Rows as `cell1 | cell2 | ...` lines. Rows with no content are skipped.
    pub fn lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|row| {
                row.iter()
                    .any(|cell| cell.as_deref().is_some_and(|c| !c.trim().is_empty()))
            })
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_deref().unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect()
    }
}

/// Page text and the tables found in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredText {
    /// Page text, verbatim.
    pub header: String,
    pub tables: Vec<Table>,
}

impl StructuredText {
    pub fn new(header: impl Into<String>, tables: Vec<Table>) -> Self {
        Self {
            header: header.into(),
            tables,
        }
    }

    /// Single text blob: header, tables marker, then each table's lines.
    pub fn render(&self) -> String {
        let mut out = format!("TEXTO:\n{}\n\n{}\n", self.header, TABLES_MARKER);
        for (i, table) in self.tables.iter().enumerate() {
            out.push_str(&format!("\nTabela {}:\n", i + 1));
            for line in table.lines() {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }

    /// Keep only header lines containing one of `keywords` (case-insensitive).
    /// Tables are kept as they are.
    pub fn filter_lines<S: AsRef<str>>(&self, keywords: &[S]) -> Self {
        let header = self
            .header
            .lines()
            .filter(|line| {
                let upper = line.to_uppercase();
                keywords
                    .iter()
                    .any(|k| upper.contains(&k.as_ref().to_uppercase()))
            })
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            header,
            tables: self.tables.clone(),
        }
    }
}

/// Prompt content derived from a document's first page.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentContent {
    Image(PageImage),
    StructuredText(StructuredText),
}

impl DocumentContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Image(_) => ContentKind::Image,
            Self::StructuredText(_) => ContentKind::StructuredText,
        }
    }
}

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract text from a specific page (1-indexed).
    fn extract_page_text(&self, page: u32) -> Result<String>;

    /// Extract embedded raster images from a specific page (1-indexed).
    fn extract_images(&self, page: u32) -> Result<Vec<DynamicImage>>;

    /// Render a whole page (1-indexed) at `scale` times its size in points.
    fn render_page(&self, page: u32, scale: f32) -> Result<DynamicImage>;
}

/// Encode an image as PNG.
pub fn encode_png(image: &DynamicImage) -> Result<PageImage> {
    let mut png = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)?;

    Ok(PageImage {
        png,
        width: image.width(),
        height: image.height(),
    })
}

/// Resize an image by [`RENDER_SCALE`] in each direction.
pub fn upscale(image: &DynamicImage) -> DynamicImage {
    let width = (image.width() as f32 * RENDER_SCALE).round() as u32;
    let height = (image.height() as f32 * RENDER_SCALE).round() as u32;
    image.resize_exact(width, height, image::imageops::FilterType::Triangle)
}

/// Page one at [`RENDER_SCALE`]. When the renderer rejects the document,
/// the largest embedded raster of the page stands in for it.
fn page_image<P: PdfProcessor>(processor: &P) -> Result<DynamicImage> {
    let reason = match processor.render_page(1, RENDER_SCALE) {
        Ok(image) => return Ok(image),
        Err(DocumentError::Render(reason)) => reason,
        Err(e) => return Err(e),
    };

    warn!("Rendering page 1 failed ({}), using its largest embedded image", reason);
    processor
        .extract_images(1)?
        .into_iter()
        .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
        .map(|img| upscale(&img))
        .ok_or(DocumentError::Render(reason))
}

/// Build content of the requested kind from page one of a loaded PDF.
pub fn page_content<P: PdfProcessor>(processor: &P, kind: ContentKind) -> Result<DocumentContent> {
    if processor.page_count() == 0 {
        return Err(DocumentError::NoPages);
    }

    match kind {
        ContentKind::Image => {
            let image = encode_png(&page_image(processor)?)?;
            debug!("Rendered page 1 to {}x{} PNG ({} bytes)", image.width, image.height, image.png.len());
            Ok(DocumentContent::Image(image))
        }
        ContentKind::StructuredText => {
            let header = processor.extract_page_text(1)?;
            let tables = detect_tables(&header);
            debug!("Extracted {} chars of text and {} tables from page 1", header.len(), tables.len());
            Ok(DocumentContent::StructuredText(StructuredText::new(header, tables)))
        }
    }
}

/// Read a PDF from bytes and build its page-one content.
pub fn preprocess_bytes(data: &[u8], kind: ContentKind) -> Result<DocumentContent> {
    let mut extractor = PdfExtractor::new();
    extractor.load(data)?;
    page_content(&extractor, kind)
}

/// Read a PDF file and build its page-one content.
pub fn preprocess(path: &Path, kind: ContentKind) -> Result<DocumentContent> {
    let data = std::fs::read(path)?;
    preprocess_bytes(&data, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cell(text: &str) -> Option<String> {
        Some(text.to_string())
    }

    #[test]
    fn test_table_lines_skip_empty_rows() {
        let table = Table::new(vec![
            vec![cell("SALARIO"), cell("30,00"), cell("5.000,00")],
            vec![None, cell("  "), None],
            vec![cell("INSS"), None, cell("550,00")],
        ]);
        assert_eq!(table.lines(), vec!["SALARIO | 30,00 | 5.000,00", "INSS |  | 550,00"]);
    }

    #[test]
    fn test_render_layout() {
        let content = StructuredText::new(
            "EMPRESA X\nHOLERITE",
            vec![Table::new(vec![vec![cell("A"), cell("B")]]), Table::new(vec![vec![cell("C"), None]])],
        );
        assert_eq!(
            content.render(),
            "TEXTO:\nEMPRESA X\nHOLERITE\n\nTABELAS:\n\nTabela 1:\nA | B\n\nTabela 2:\nC | \n"
        );
    }

    #[test]
    fn test_render_without_tables_keeps_marker() {
        assert_eq!(StructuredText::new("só texto", vec![]).render(), "TEXTO:\nsó texto\n\nTABELAS:\n");
    }

    #[test]
    fn test_filter_lines_is_case_insensitive() {
        let content = StructuredText::new(
            "Prestador: ACME\nValor do serviço: 1.000,00\nTomador: Foo\nTotal 1.000,00\nqtd. 1",
            vec![Table::new(vec![vec![cell("x"), cell("y")]])],
        );
        let filtered = content.filter_lines(&["TOTAL", "VALOR", "QTD."]);
        assert_eq!(filtered.header, "Valor do serviço: 1.000,00\nTotal 1.000,00\nqtd. 1");
        assert_eq!(filtered.tables, content.tables);
    }

    /// Processor with a fixed render result and fixed embedded images.
    struct StubProcessor {
        rendered: Option<(u32, u32)>,
        embedded: Vec<(u32, u32)>,
    }

    impl PdfProcessor for StubProcessor {
        fn load(&mut self, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        fn page_count(&self) -> u32 {
            1
        }

        fn extract_page_text(&self, _page: u32) -> Result<String> {
            Ok(String::new())
        }

        fn extract_images(&self, _page: u32) -> Result<Vec<DynamicImage>> {
            Ok(self.embedded.iter().map(|&(w, h)| DynamicImage::new_rgb8(w, h)).collect())
        }

        fn render_page(&self, _page: u32, scale: f32) -> Result<DynamicImage> {
            assert_eq!(scale, RENDER_SCALE);
            match self.rendered {
                Some((w, h)) => Ok(DynamicImage::new_rgb8(w, h)),
                None => Err(DocumentError::Render("unsupported PDF".to_string())),
            }
        }
    }

    fn image_size(processor: &StubProcessor) -> Result<(u32, u32)> {
        match page_content(processor, ContentKind::Image)? {
            DocumentContent::Image(page) => Ok((page.width, page.height)),
            DocumentContent::StructuredText(_) => panic!("expected image content"),
        }
    }

    #[test]
    fn test_encode_png_keeps_dimensions() {
        let page = encode_png(&DynamicImage::new_rgb8(3, 5)).unwrap();
        assert_eq!((page.width, page.height), (3, 5));

        let decoded = image::load_from_memory(&page.png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 5));
    }

    #[test]
    fn test_upscale_doubles_dimensions() {
        let scaled = upscale(&DynamicImage::new_rgb8(3, 5));
        assert_eq!((scaled.width(), scaled.height()), (6, 10));
    }

    #[test]
    fn test_image_mode_prefers_rendered_page() {
        let processor = StubProcessor {
            rendered: Some((400, 200)),
            embedded: vec![(10, 10)],
        };
        assert_eq!(image_size(&processor).unwrap(), (400, 200));
    }

    #[test]
    fn test_image_mode_falls_back_to_largest_embedded_image() {
        let processor = StubProcessor {
            rendered: None,
            embedded: vec![(1, 1), (3, 2), (2, 2)],
        };
        assert_eq!(image_size(&processor).unwrap(), (6, 4));
    }

    #[test]
    fn test_image_mode_without_render_or_images_is_render_error() {
        let processor = StubProcessor {
            rendered: None,
            embedded: vec![],
        };
        let err = image_size(&processor).unwrap_err();
        assert!(matches!(err, DocumentError::Render(reason) if reason == "unsupported PDF"));
    }

    #[test]
    fn test_missing_file_is_document_error() {
        let err = preprocess(Path::new("/nonexistent/holerite.pdf"), ContentKind::Image).unwrap_err();
        assert!(matches!(err, DocumentError::Read(_)));
    }
}
