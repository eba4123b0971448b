//! Minimal paginated PDF 1.4 output
//!
//! Uses the standard Helvetica fonts so nothing needs embedding. Text is
//! written in WinAnsi encoding; characters outside Latin-1 become `?`.

use std::fmt::Write as _;

use crate::conversation::{Conversation, Role};

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 28.35;

const TITLE_SIZE: f32 = 16.0;
const TEXT_SIZE: f32 = 10.0;

/// Heights in points (10mm and 5mm rows)
const TALL_ROW: f32 = 28.35;
const SHORT_ROW: f32 = 14.17;

/// Body text wraps at this many characters per line
pub const WRAP_WIDTH: usize = 80;

#[derive(Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Render the conversation as a PDF document
pub fn to_pdf(conversation: &Conversation) -> Vec<u8> {
    let pages = layout(conversation);
    assemble(&pages, &conversation.title)
}

struct PageWriter {
    pages: Vec<Vec<u8>>,
    current: Vec<u8>,
    y: f32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn row(&mut self, text: &str, font: Font, size: f32, height: f32, centered: bool) {
        if self.y - height < MARGIN {
            self.break_page();
        }

        let encoded = encode_text(text);
        let x = if centered {
            let width = text_width(&encoded, font, size);
            ((PAGE_WIDTH - width) / 2.0).max(MARGIN)
        } else {
            MARGIN
        };
        // vertically centred in the row, as a table cell would be
        let baseline = self.y - height / 2.0 - size * 0.3;

        let mut op = String::new();
        let _ = write!(
            op,
            "BT /{} {} Tf {:.2} {:.2} Td (",
            font.resource(),
            size,
            x,
            baseline
        );
        self.current.extend_from_slice(op.as_bytes());
        self.current.extend_from_slice(&escape(&encoded));
        self.current.extend_from_slice(b") Tj ET\n");

        self.y -= height;
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn finish(mut self) -> Vec<Vec<u8>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// One content stream per page
fn layout(conversation: &Conversation) -> Vec<Vec<u8>> {
    let mut writer = PageWriter::new();

    writer.row(&conversation.title, Font::Bold, TITLE_SIZE, TALL_ROW, true);
    writer.gap(TALL_ROW);

    for msg in &conversation.messages {
        let label = match msg.role {
            Role::User => "You:",
            Role::Assistant => "AI:",
        };
        writer.row(label, Font::Bold, TEXT_SIZE, TALL_ROW, false);

        for line in wrap(&msg.content, WRAP_WIDTH) {
            writer.row(&line, Font::Regular, TEXT_SIZE, SHORT_ROW, false);
        }
        writer.gap(SHORT_ROW);
    }

    writer.finish()
}

/// Word-wrap to `width` characters, splitting words longer than a line
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        let mut line_len = 0;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > width {
                if line_len > 0 {
                    lines.push(std::mem::take(&mut line));
                    line_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if line_len == 0 { word.len() } else { line_len + 1 + word.len() };
            if needed > width {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line.extend(word.iter());
            line_len += word.len();
        }

        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x09 => b' ',
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn escape(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        if matches!(b, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out
}

fn text_width(bytes: &[u8], font: Font, size: f32) -> f32 {
    let units: u32 = bytes.iter().map(|&b| glyph_width(b, font)).sum();
    units as f32 * size / 1000.0
}

/// Standard AFM advance widths for printable ASCII
fn glyph_width(byte: u8, font: Font) -> u32 {
    const REGULAR: [u16; 95] = [
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556,
        556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722,
        722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722,
        667, 944, 667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556,
        556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500,
        500, 334, 260, 334, 584,
    ];
    const BOLD: [u16; 95] = [
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556,
        556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, 975, 722, 722, 722,
        722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722,
        667, 944, 667, 667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556, 333, 611,
        611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556,
        500, 389, 280, 389, 584,
    ];

    let table = match font {
        Font::Regular => &REGULAR,
        Font::Bold => &BOLD,
    };
    match byte {
        0x20..=0x7E => table[(byte - 0x20) as usize] as u32,
        _ => 556,
    }
}

/// Serialize objects, cross-reference table and trailer
fn assemble(pages: &[Vec<u8>], title: &str) -> Vec<u8> {
    // 1 catalog, 2 page tree, 3-4 fonts, then a page/content pair per page, info last
    let page_id = |i: usize| 5 + 2 * i;
    let info_id = 5 + 2 * pages.len();

    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(info_id);
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());

    let kids = (0..pages.len())
        .map(|i| format!("{} 0 R", page_id(i)))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, pages.len()).into_bytes());

    for name in ["Helvetica", "Helvetica-Bold"] {
        objects.push(
            format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                name
            )
            .into_bytes(),
        );
    }

    for (i, content) in pages.iter().enumerate() {
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH,
                PAGE_HEIGHT,
                page_id(i) + 1
            )
            .into_bytes(),
        );

        let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream.extend_from_slice(content);
        stream.extend_from_slice(b"\nendstream");
        objects.push(stream);
    }

    let mut info = b"<< /Title (".to_vec();
    info.extend_from_slice(&escape(&encode_text(title)));
    info.extend_from_slice(b") /Producer (aiconverse) >>");
    objects.push(info);

    let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in &offsets {
        let _ = writeln!(xref, "{:010} 00000 n ", offset);
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        info_id,
        xref_offset
    );
    out.extend_from_slice(xref.as_bytes());

    out
}
