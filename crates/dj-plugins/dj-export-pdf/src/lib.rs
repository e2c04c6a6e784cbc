//! # dj-export-pdf
//!
//! `DocumentRenderer` backed by Pdfium. [`layout`] decides where everything
//! goes; this module only replays the draw operations into a PDF.

pub mod layout;

use std::path::PathBuf;

use anyhow::anyhow;
use dj_core::document::DocumentBlock;
use dj_core::traits::DocumentRenderer;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use crate::layout::{DrawOp, Rgb, PAGE_HEIGHT, PAGE_WIDTH};

pub struct PdfiumRenderer {
    /// Directory holding the Pdfium shared library. `None` uses the system one.
    library_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    fn bind(&self) -> anyhow::Result<Pdfium> {
        let bindings = match &self.library_path {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| anyhow!("pdfium library unavailable: {e}"))?;
        Ok(Pdfium::new(bindings))
    }
}

fn color(rgb: Rgb) -> PdfColor {
    PdfColor::new(rgb.0, rgb.1, rgb.2, 255)
}

impl DocumentRenderer for PdfiumRenderer {
    fn render(&self, blocks: &[DocumentBlock]) -> anyhow::Result<Vec<u8>> {
        let pages = layout::layout(blocks);
        let pdfium = self.bind()?;
        let mut document = pdfium.create_new_pdf()?;
        let regular = document.fonts_mut().helvetica();
        let bold = document.fonts_mut().helvetica_bold();

        for laid_out in &pages {
            let mut page = document.pages_mut().create_page_at_end(PdfPagePaperSize::from_points(
                PdfPoints::new(PAGE_WIDTH),
                PdfPoints::new(PAGE_HEIGHT),
            ))?;

            for op in &laid_out.ops {
                match op {
                    DrawOp::Rect {
                        x,
                        y,
                        width,
                        height,
                        fill,
                        stroke,
                    } => {
                        page.objects_mut().create_path_object_rect(
                            PdfRect::new_from_values(*y, *x, y + height, x + width),
                            stroke.then(|| color(Rgb::BLACK)),
                            stroke.then(|| PdfPoints::new(1.0)),
                            fill.map(color),
                        )?;
                    }
                    DrawOp::Text {
                        x,
                        y,
                        size,
                        bold: is_bold,
                        color: text_color,
                        text,
                    } => {
                        let font = if *is_bold { bold } else { regular };
                        let mut object = page.objects_mut().create_text_object(
                            PdfPoints::new(*x),
                            PdfPoints::new(*y),
                            text,
                            font,
                            PdfPoints::new(*size),
                        )?;
                        object.set_fill_color(color(*text_color))?;
                    }
                    DrawOp::Image {
                        x,
                        y,
                        width,
                        height,
                        path,
                    } => {
                        // Missing attachments are skipped.
                        let image = match image::open(path) {
                            Ok(image) => image,
                            Err(err) => {
                                warn!(path = %path.display(), error = %err, "skipping unreadable image");
                                continue;
                            }
                        };
                        page.objects_mut().create_image_object(
                            PdfPoints::new(*x),
                            PdfPoints::new(*y),
                            &image,
                            Some(PdfPoints::new(*width)),
                            Some(PdfPoints::new(*height)),
                        )?;
                    }
                }
            }
        }

        let bytes = document.save_to_bytes()?;
        debug!(pages = pages.len(), bytes = bytes.len(), "pdf rendered");
        Ok(bytes)
    }
}
