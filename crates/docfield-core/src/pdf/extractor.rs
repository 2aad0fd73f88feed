//! PDF text, image and page rendering using lopdf, pdf-extract and hayro.

use std::sync::Arc;

use hayro::{InterpreterSettings, Pdf, RenderSettings};
use image::{DynamicImage, ImageBuffer, Rgba, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{PdfProcessor, Result};
use crate::error::DocumentError;

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
        }
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| DocumentError::Parse("no document loaded".to_string()))
    }

    fn decode_image(doc: &Document, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }

        let width = Self::dimension(dict, b"Width")?;
        let height = Self::dimension(dict, b"Height")?;
        trace!("Found image object: {}x{}", width, height);

        let filter = dict.get(b"Filter").ok().and_then(|filter| match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        });

        match filter {
            Some(b"DCTDecode") => {
                return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg).ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Skipping image with unsupported filter");
                return None;
            }
            _ => {}
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceRGB");

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8);

        if bits != 8 {
            trace!("Unsupported bits per component: {}", bits);
            return None;
        }

        Self::image_from_raw(&data, width, height, color_space)
    }

    /// Positive image dimension that fits in `u32`.
    fn dimension(dict: &Dictionary, key: &[u8]) -> Option<u32> {
        let value = dict.get(key).ok()?.as_i64().ok()?;
        u32::try_from(value).ok().filter(|v| *v > 0)
    }

    fn image_from_raw(data: &[u8], width: u32, height: u32, color_space: &[u8]) -> Option<DynamicImage> {
        let pixels = (width as usize).checked_mul(height as usize)?;
        if pixels == 0 {
            return None;
        }
        let rgb_len = pixels.checked_mul(3)?;
        let rgba: Vec<u8> = match color_space {
            b"DeviceRGB" | b"RGB" if data.len() >= rgb_len => data[..rgb_len]
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 255])
                .collect(),
            b"DeviceGray" | b"G" if data.len() >= pixels => data[..pixels]
                .iter()
                .flat_map(|&g| [g, g, g, 255])
                .collect(),
            _ => {
                trace!(
                    "Could not decode image: colorspace={:?}, data_len={}",
                    String::from_utf8_lossy(color_space),
                    data.len()
                );
                return None;
            }
        };

        ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
    }

    /// Resources of a page, following `Parent` links for inherited ones.
    fn page_resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
        let Ok(Object::Dictionary(dict)) = doc.get_object(node_id) else {
            return None;
        };

        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
                return Some(res_dict.clone());
            }
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => Self::page_resources(doc, *parent_id),
            _ => None,
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| DocumentError::Parse(e.to_string()))?;

        // Owner-password-only PDFs open with an empty user password
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(DocumentError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| DocumentError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(DocumentError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        let count = self.page_count();
        if page == 0 || page > count {
            return Err(DocumentError::InvalidPage(page));
        }

        let pages = pdf_extract::extract_text_from_mem_by_pages(&self.raw_data)
            .map_err(|e| DocumentError::TextExtraction(e.to_string()))?;

        Ok(pages.into_iter().nth((page - 1) as usize).unwrap_or_default())
    }

    fn extract_images(&self, page: u32) -> Result<Vec<DynamicImage>> {
        let doc = self.document()?;
        let pages = doc.get_pages();
        let page_id = pages.get(&page).ok_or(DocumentError::InvalidPage(page))?;

        let mut images = Vec::new();
        if let Some(resources) = Self::page_resources(doc, *page_id) {
            if let Ok(xobjects) = resources.get(b"XObject") {
                if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                    for (_name, obj_ref) in xobj_dict.iter() {
                        if let Ok((_, obj)) = doc.dereference(obj_ref) {
                            if let Some(img) = Self::decode_image(doc, obj) {
                                images.push(img);
                            }
                        }
                    }
                }
            }
        }

        debug!("Extracted {} images from page {}", images.len(), page);
        Ok(images)
    }

    fn render_page(&self, page: u32, scale: f32) -> Result<DynamicImage> {
        let count = self.page_count();
        if page == 0 || page > count {
            return Err(DocumentError::InvalidPage(page));
        }

        let pdf = Pdf::new(Arc::new(self.raw_data.clone()))
            .map_err(|e| DocumentError::Render(format!("renderer could not load PDF: {:?}", e)))?;
        let pages = pdf.pages();
        let page_ref = pages
            .get((page - 1) as usize)
            .ok_or(DocumentError::InvalidPage(page))?;

        let media_box = page_ref.media_box();
        let (width, height) = (media_box.x1 - media_box.x0, media_box.y1 - media_box.y0);
        if width <= 0.0 || height <= 0.0 {
            return Err(DocumentError::Render(format!("invalid page size: {}x{}", width, height)));
        }

        let settings = RenderSettings {
            x_scale: scale,
            y_scale: scale,
            ..Default::default()
        };
        let pixmap = hayro::render(page_ref, &InterpreterSettings::default(), &settings);

        let rgb: Vec<u8> = pixmap
            .data_as_u8_slice()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        let image = RgbImage::from_raw(u32::from(pixmap.width()), u32::from(pixmap.height()), rgb)
            .ok_or_else(|| DocumentError::Render("pixmap size does not match its data".to_string()))?;

        debug!("Rendered page {} at {}x to {}x{}", page, scale, image.width(), image.height());
        Ok(DynamicImage::ImageRgb8(image))
    }
}
