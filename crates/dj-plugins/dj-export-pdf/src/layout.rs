//! Flows [`DocumentBlock`]s top to bottom onto Letter pages.
//!
//! Pure geometry: the output is a list of positioned draw operations per page,
//! so pagination and wrapping can be tested without a PDF library. All
//! coordinates are PDF points with the origin at the bottom-left corner.

use std::path::PathBuf;

use dj_core::document::DocumentBlock;

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const MARGIN: f32 = 72.0;

const HEADING_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 10.0;
const LEADING: f32 = 1.2;
const CELL_PADDING: f32 = 4.0;
const HEADER_BOTTOM_PADDING: f32 = 12.0;
/// Question column share of the table width.
const FIRST_COLUMN: f32 = 0.4;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const GRAY: Rgb = Rgb(128, 128, 128);
    pub const WHITESMOKE: Rgb = Rgb(245, 245, 245);
    pub const BEIGE: Rgb = Rgb(245, 245, 220);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// `y` is the baseline.
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        color: Rgb,
        text: String,
    },
    /// `y` is the bottom edge.
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<Rgb>,
        stroke: bool,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

pub fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH
}

/// Greedy word wrap. Words longer than a line are split by character.
pub fn wrap(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let max_chars = ((max_width / (size * GLYPH_WIDTH)).floor() as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let word: String = word.into_iter().collect();
            let needed = line.chars().count() + usize::from(!line.is_empty()) + word.chars().count();
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        lines.push(line);
    }
    lines
}

struct Cursor {
    done: Vec<Page>,
    current: Page,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            done: Vec::new(),
            current: Page::default(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn push(&mut self, op: DrawOp) {
        self.current.ops.push(op);
    }

    fn new_page(&mut self) {
        self.done.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn finish(mut self) -> Vec<Page> {
        self.done.push(self.current);
        self.done
    }

    /// Starts a new page when `height` does not fit, unless this page is
    /// still empty (an oversized item would never fit anywhere).
    fn reserve(&mut self, height: f32) {
        if self.y - height < MARGIN && !self.current.ops.is_empty() {
            self.new_page();
        }
    }

    fn lines(&mut self, text: &str, size: f32, bold: bool) {
        let leading = size * LEADING;
        for line in wrap(text, size, PAGE_WIDTH - 2.0 * MARGIN) {
            self.reserve(leading);
            self.y -= leading;
            let baseline = self.y + (leading - size);
            self.push(DrawOp::Text {
                x: MARGIN,
                y: baseline,
                size,
                bold,
                color: Rgb::BLACK,
                text: line,
            });
        }
    }

    fn spacer(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        } else {
            self.y -= height;
        }
    }

    fn table(&mut self, header: &[String], rows: &[Vec<String>]) {
        let content = PAGE_WIDTH - 2.0 * MARGIN;
        let widths = [content * FIRST_COLUMN, content * (1.0 - FIRST_COLUMN)];
        self.row(header, &widths, true);
        for row in rows {
            self.row(row, &widths, false);
        }
    }

    fn row(&mut self, cells: &[String], widths: &[f32; 2], is_header: bool) {
        let leading = BODY_SIZE * LEADING;
        let wrapped: Vec<Vec<String>> = widths
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                wrap(cell, BODY_SIZE, width - 2.0 * CELL_PADDING)
            })
            .collect();
        let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(1) as f32;
        let bottom_padding = if is_header { HEADER_BOTTOM_PADDING } else { CELL_PADDING };
        let height = line_count * leading + CELL_PADDING + bottom_padding;

        self.reserve(height);
        let top = self.y;
        let bottom = top - height;
        let (fill, color) = if is_header {
            (Rgb::GRAY, Rgb::WHITESMOKE)
        } else {
            (Rgb::BEIGE, Rgb::BLACK)
        };

        let mut x = MARGIN;
        for (lines, width) in wrapped.into_iter().zip(widths) {
            self.push(DrawOp::Rect {
                x,
                y: bottom,
                width: *width,
                height,
                fill: Some(fill),
                stroke: true,
            });
            for (i, line) in lines.into_iter().enumerate() {
                let baseline = top - CELL_PADDING - (i as f32 + 1.0) * leading + (leading - BODY_SIZE);
                let centered = x + (width - text_width(&line, BODY_SIZE)) / 2.0;
                self.push(DrawOp::Text {
                    x: centered.max(x + CELL_PADDING),
                    y: baseline,
                    size: BODY_SIZE,
                    bold: is_header,
                    color,
                    text: line,
                });
            }
            x += width;
        }
        self.y = bottom;
    }

    fn image(&mut self, path: &std::path::Path, width: f32, height: f32) {
        self.reserve(height);
        self.y -= height;
        let x = MARGIN + ((PAGE_WIDTH - 2.0 * MARGIN) - width).max(0.0) / 2.0;
        let y = self.y;
        self.push(DrawOp::Image {
            x,
            y,
            width,
            height,
            path: path.to_path_buf(),
        });
    }
}

pub fn layout(blocks: &[DocumentBlock]) -> Vec<Page> {
    let mut cursor = Cursor::new();
    for block in blocks {
        match block {
            DocumentBlock::Heading(text) => cursor.lines(text, HEADING_SIZE, true),
            DocumentBlock::Text(text) => cursor.lines(text, BODY_SIZE, false),
            DocumentBlock::Spacer(height) => cursor.spacer(*height),
            DocumentBlock::Table { header, rows } => cursor.table(header, rows),
            DocumentBlock::Image { path, width, height } => cursor.image(path, *width, *height),
        }
    }
    cursor.finish()
}
