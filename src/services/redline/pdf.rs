//! 배치된 페이지를 PDF 1.4 바이트열로 직렬화합니다.
//!
//! 라틴 문자는 PDF 기본 폰트(Helvetica, Helvetica-Bold)를 WinAnsiEncoding으로 참조하고,
//! 그 밖의 문자는 `fonts::RedlineFonts`가 정하는 유니코드 폰트(`F3`)로 씁니다.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::fonts::{font_runs, winansi_byte, RedlineFonts, RunFont};
use super::layout::{Color, DrawOp, Font, Page, PAGE_HEIGHT, PAGE_WIDTH};

pub fn write_pdf(pages: &[Page], fonts: &RedlineFonts<'_>) -> Vec<u8> {
    let mut writer = PdfWriter::default();
    writer.raw(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    // 객체 번호: 1 카탈로그, 2 페이지 트리, 3/4 Helvetica, 이후 페이지마다 (페이지, 콘텐츠),
    // 마지막에 유니코드 폰트 객체들
    let page_ids: Vec<usize> = (0..pages.len()).map(|i| 5 + 2 * i).collect();
    let unicode_font_id = 5 + 2 * pages.len();
    let kids = page_ids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");

    writer.object(1, b"<< /Type /Catalog /Pages 2 0 R >>");
    writer.object(
        2,
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, pages.len()).as_bytes(),
    );
    writer.object(
        3,
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );
    writer.object(
        4,
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
    );

    let mut used_glyphs = BTreeMap::new();
    for (page, page_id) in pages.iter().zip(page_ids) {
        let content_id = page_id + 1;
        writer.object(
            page_id,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R /F3 {} 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH, PAGE_HEIGHT, unicode_font_id, content_id
            )
            .as_bytes(),
        );

        let stream = content_stream(page, fonts, &mut used_glyphs);
        writer.object(content_id, &stream_object(&stream));
    }

    for (id, body) in fonts.unicode_font_objects(unicode_font_id, &used_glyphs) {
        writer.object(id, &body);
    }

    writer.finish()
}

/// `<< /Length n >> stream ... endstream` 객체 본문
pub(super) fn stream_object(data: &[u8]) -> Vec<u8> {
    let mut body = format!("<< /Length {} >>\nstream\n", data.len()).into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(b"\nendstream");
    body
}

#[derive(Default)]
struct PdfWriter {
    buf: Vec<u8>,
    /// 객체 번호(1부터) 순서의 바이트 오프셋
    offsets: Vec<(usize, usize)>,
}

impl PdfWriter {
    fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn object(&mut self, id: usize, body: &[u8]) {
        self.offsets.push((id, self.buf.len()));
        self.raw(format!("{} 0 obj\n", id).as_bytes());
        self.raw(body);
        self.raw(b"\nendobj\n");
    }

    fn finish(mut self) -> Vec<u8> {
        self.offsets.sort_by_key(|(id, _)| *id);
        let xref_offset = self.buf.len();
        let size = self.offsets.len() + 1;

        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", size);
        for (_, offset) in &self.offsets {
            let _ = writeln!(xref, "{:010} 00000 n ", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, xref_offset
        );
        self.raw(xref.as_bytes());
        self.buf
    }
}

fn content_stream(
    page: &Page,
    fonts: &RedlineFonts<'_>,
    used_glyphs: &mut BTreeMap<u16, char>,
) -> Vec<u8> {
    let mut out = Vec::new();
    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                y,
                size,
                font,
                color,
                text,
            } => {
                let latin_font = match font {
                    Font::Regular => "F1",
                    Font::Bold => "F2",
                };
                out.extend_from_slice(
                    format!("BT {} rg {:.2} {:.2} Td", rgb(*color), x, y).as_bytes(),
                );
                // Tj가 글자 폭만큼 위치를 옮기므로 조각마다 폰트만 바꿔 이어 씁니다.
                for (run_font, run) in font_runs(text) {
                    match run_font {
                        RunFont::Latin => {
                            out.extend_from_slice(format!(" /{} {:.2} Tf (", latin_font, size).as_bytes());
                            out.extend_from_slice(&encode_latin(run));
                            out.extend_from_slice(b") Tj");
                        }
                        RunFont::Unicode => {
                            let hex = fonts.encode_unicode(run, used_glyphs);
                            out.extend_from_slice(format!(" /F3 {:.2} Tf <{}> Tj", size, hex).as_bytes());
                        }
                    }
                }
                out.extend_from_slice(b" ET\n");
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                width,
                color,
                ..
            } => {
                out.extend_from_slice(
                    format!(
                        "{} RG {:.2} w {:.2} {:.2} m {:.2} {:.2} l S\n",
                        rgb(*color),
                        width,
                        x1,
                        y1,
                        x2,
                        y2
                    )
                    .as_bytes(),
                );
            }
        }
    }
    out
}

fn rgb(Color(r, g, b): Color) -> String {
    format!("{:.3} {:.3} {:.3}", r, g, b)
}

/// 라틴 조각을 WinAnsi 바이트로 바꾸고 PDF 리터럴 문자열 규칙에 맞게 이스케이프합니다.
/// 조각은 `font_runs`가 나눈 것이므로 모든 문자가 WinAnsi에 있습니다.
pub fn encode_latin(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '(' | ')' | '\\') {
            out.push(b'\\');
        }
        out.push(winansi_byte(ch).unwrap_or(b'?'));
    }
    out
}
