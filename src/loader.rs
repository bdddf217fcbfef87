//! Document-loading collaborator: turns a PDF file on disk into per-page
//! content-stream bytes and a [`PageResources`] for character widths.
//!
//! This is deliberately the only place `lopdf` is visible: the extraction
//! core never touches object streams, xref tables, or filters directly, it
//! only ever sees the bytes this module hands it.

use std::path::Path;

use lopdf::{Document, Object, ObjectId};
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::core::error::{PDFError, PDFResult};
use crate::core::resources::PageResources;

/// Per-font simple-width table, keyed by the page resource name (e.g. `F1`)
/// under which the content stream references it.
struct FontWidths {
    first_char: u8,
    widths: Vec<f64>,
    missing_width: f64,
}

/// Width lookup backing one page, built once at load time.
pub struct LoadedPageResources {
    fonts: FxHashMap<String, FontWidths>,
}

impl PageResources for LoadedPageResources {
    fn char_width(&self, font_resource_name: &str, byte: u8) -> Option<f64> {
        let font = self.fonts.get(font_resource_name)?;
        if byte < font.first_char {
            return Some(font.missing_width / 1000.0);
        }
        let index = (byte - font.first_char) as usize;
        match font.widths.get(index) {
            Some(&w) => Some(w / 1000.0),
            None => Some(font.missing_width / 1000.0),
        }
    }
}

/// One page's extraction inputs: its content-stream bytes, already
/// decoded/decompressed, and the width table for its font resources.
pub struct LoadedPage {
    pub page_number: u32,
    pub content_stream: Vec<u8>,
    pub resources: LoadedPageResources,
}

/// Opens a PDF file and exposes its pages as extraction-ready inputs.
pub struct PdfLoader {
    document: Document,
    page_ids: Vec<ObjectId>,
}

impl PdfLoader {
    pub fn open(path: impl AsRef<Path>) -> PDFResult<Self> {
        let document = Document::load(path)
            .map_err(|e| PDFError::malformed_stream(format!("failed to load PDF: {}", e)))?;
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        Ok(PdfLoader { document, page_ids })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Loads one page's content stream and font width tables. Pages are
    /// numbered from 1.
    pub fn load_page(&self, page_number: u32) -> PDFResult<LoadedPage> {
        let index = page_number
            .checked_sub(1)
            .and_then(|i| self.page_ids.get(i as usize))
            .ok_or_else(|| PDFError::invalid_operand("page_number", "out of range"))?;

        let content_stream = self
            .document
            .get_page_content(*index)
            .map_err(|e| PDFError::malformed_stream(format!("failed to decode page content: {}", e)))?;

        let resources = self.load_font_widths(*index);

        Ok(LoadedPage {
            page_number,
            content_stream,
            resources: LoadedPageResources { fonts: resources },
        })
    }

    pub fn pages(&self) -> impl Iterator<Item = PDFResult<LoadedPage>> + '_ {
        (1..=self.page_count() as u32).map(move |n| self.load_page(n))
    }

    fn load_font_widths(&self, page_id: ObjectId) -> FxHashMap<String, FontWidths> {
        let mut fonts = FxHashMap::default();

        let font_dict = self
            .document
            .get_page_resources(page_id)
            .0
            .and_then(|dict| dict.get(b"Font").ok())
            .and_then(|obj| obj.as_dict().ok())
            .cloned();

        let Some(font_dict) = font_dict else {
            return fonts;
        };

        for (name, value) in font_dict.iter() {
            let resource_name = String::from_utf8_lossy(name).into_owned();
            let Ok(font_obj) = self.document.dereference(value) else {
                continue;
            };
            let Ok(font) = font_obj.1.as_dict() else {
                continue;
            };

            let first_char = font
                .get(b"FirstChar")
                .ok()
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(0) as u8;

            let missing_width = font
                .get(b"MissingWidth")
                .ok()
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(0) as f64;

            let widths: Vec<f64> = font
                .get(b"Widths")
                .ok()
                .and_then(|o| o.as_array().ok())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|item| number_value(item))
                        .collect()
                })
                .unwrap_or_default();

            if widths.is_empty() {
                warn!(resource_name, "no Widths array, falling back to default advance");
                continue;
            }

            fonts.insert(
                resource_name,
                FontWidths {
                    first_char,
                    widths,
                    missing_width,
                },
            );
        }

        fonts
    }
}

fn number_value(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}
