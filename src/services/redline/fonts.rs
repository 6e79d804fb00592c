//! # 레드라인 PDF 폰트
//!
//! WinAnsi로 표현할 수 있는 문자는 PDF 기본 폰트 Helvetica(`F1`, `F2`)로 쓰고,
//! 나머지 문자(한글, 한자, 키릴 문자, 화살표 등)는 유니코드 폰트(`F3`)로 씁니다.
//! 한 줄의 텍스트는 같은 텍스트 객체 안에서 두 폰트를 오가며 이어 그립니다.
//!
//! 유니코드 폰트는 두 가지 중 하나입니다.
//! - 트루타입 파일이 주어지면 파일 전체를 임베드하고(`Identity-H`), 글리프 폭을 폰트에서 읽습니다.
//!   `ToUnicode` CMap을 함께 넣어 PDF에서 텍스트를 복사/검색할 수 있습니다.
//! - 없으면 PDF 뷰어가 제공하는 한국어 CID 폰트(`HYGoThic-Medium`, Adobe-Korea1)를
//!   `UniKS-UCS2-H` 인코딩으로 참조합니다. 폭은 전각(1000)으로 잽니다.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use ttf_parser::{Face, GlyphId};

use super::layout::{Font, TextMeasure};
use super::pdf::stream_object;

const KOREAN_CID_FONT: &str = "HYGoThic-Medium";
const EMBEDDED_FONT_NAME: &str = "RedlineUnicode";

/// Helvetica의 글자 폭 (1000 단위, 코드 32..=126)
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("font file could not be parsed: {0}")]
    Parse(#[from] ttf_parser::FaceParsingError),
    #[error("only fonts with TrueType outlines can be embedded")]
    NotTrueType,
}

/// 텍스트 조각을 그릴 폰트
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunFont {
    /// Helvetica (WinAnsiEncoding)
    Latin,
    /// `F3` 유니코드 폰트
    Unicode,
}

enum UnicodeFont<'a> {
    Embedded(EmbeddedFont<'a>),
    KoreanCid,
}

struct EmbeddedFont<'a> {
    data: &'a [u8],
    face: Face<'a>,
}

impl EmbeddedFont<'_> {
    /// 폰트 단위를 1000 단위로 환산합니다.
    fn scale(&self, value: i16) -> i32 {
        i32::from(value) * 1000 / i32::from(self.face.units_per_em())
    }

    /// cmap에 없는 문자는 `.notdef`(0번 글리프)로 그립니다.
    fn glyph(&self, ch: char) -> GlyphId {
        self.face.glyph_index(ch).unwrap_or(GlyphId(0))
    }

    fn advance(&self, glyph: GlyphId) -> u32 {
        self.face
            .glyph_hor_advance(glyph)
            .map_or(0, |advance| {
                (u32::from(advance) * 1000) / u32::from(self.face.units_per_em())
            })
    }
}

/// 레드라인 한 부에 쓰는 폰트 묶음. 폭 측정(`TextMeasure`)과 PDF 인코딩을 함께 담당합니다.
pub struct RedlineFonts<'a> {
    unicode: UnicodeFont<'a>,
}

impl RedlineFonts<'static> {
    /// 임베드 없이 뷰어 내장 한국어 CID 폰트를 씁니다.
    pub fn builtin() -> Self {
        Self {
            unicode: UnicodeFont::KoreanCid,
        }
    }
}

impl<'a> RedlineFonts<'a> {
    /// 트루타입 폰트 파일을 유니코드 폰트로 씁니다. CFF 윤곽선(OpenType/CFF)은 받지 않습니다.
    pub fn with_truetype(data: &'a [u8]) -> Result<Self, FontError> {
        let face = Face::parse(data, 0)?;
        if face.tables().glyf.is_none() {
            return Err(FontError::NotTrueType);
        }
        Ok(Self {
            unicode: UnicodeFont::Embedded(EmbeddedFont { data, face }),
        })
    }

    fn unicode_units(&self, ch: char) -> u32 {
        match &self.unicode {
            UnicodeFont::Embedded(font) => font.advance(font.glyph(ch)),
            UnicodeFont::KoreanCid => 1000,
        }
    }

    /// `F3`로 그릴 문자열을 16진 문자열 본문으로 인코딩합니다.
    /// 임베드 폰트는 사용한 글리프를 `used`에 기록합니다 (폭 배열과 ToUnicode용).
    pub fn encode_unicode(&self, text: &str, used: &mut BTreeMap<u16, char>) -> String {
        let mut hex = String::with_capacity(text.len() * 4);
        match &self.unicode {
            UnicodeFont::Embedded(font) => {
                for ch in text.chars() {
                    let glyph = font.glyph(ch);
                    if glyph.0 != 0 {
                        used.entry(glyph.0).or_insert(ch);
                    }
                    let _ = write!(hex, "{:04X}", glyph.0);
                }
            }
            UnicodeFont::KoreanCid => {
                // UCS-2: 기본 다국어 평면 밖의 문자는 대체 문자로 그립니다.
                for ch in text.chars() {
                    let code = u16::try_from(u32::from(ch)).unwrap_or(0xFFFD);
                    let _ = write!(hex, "{:04X}", code);
                }
            }
        }
        hex
    }

    /// `F3` 폰트 객체들을 만듭니다. `first_id`가 페이지 리소스에서 참조하는 Type0 폰트입니다.
    pub fn unicode_font_objects(
        &self,
        first_id: usize,
        used: &BTreeMap<u16, char>,
    ) -> Vec<(usize, Vec<u8>)> {
        match &self.unicode {
            UnicodeFont::KoreanCid => korean_cid_objects(first_id),
            UnicodeFont::Embedded(font) => embedded_objects(font, first_id, used),
        }
    }
}

impl TextMeasure for RedlineFonts<'_> {
    fn width(&self, text: &str, font: Font, size: f32) -> f32 {
        // Helvetica-Bold은 평균적으로 약간 넓습니다.
        let bold = match font {
            Font::Regular => 1.0,
            Font::Bold => 1.06,
        };
        let units: f32 = text
            .chars()
            .map(|c| match winansi_byte(c) {
                Some(_) => f32::from(helvetica_units(c)) * bold,
                None => self.unicode_units(c) as f32,
            })
            .sum();
        units * size / 1000.0
    }
}

fn helvetica_units(ch: char) -> u16 {
    match ch {
        ' '..='~' => HELVETICA_WIDTHS[ch as usize - 32],
        '\t' => 4 * 278,
        c if c.is_control() => 278,
        _ => 556,
    }
}

/// WinAnsiEncoding 바이트. 제어 문자는 공백으로 그립니다.
pub fn winansi_byte(ch: char) -> Option<u8> {
    match ch {
        ' '..='~' => Some(ch as u8),
        c if c.is_control() => Some(b' '),
        '\u{A0}'..='\u{FF}' => Some(ch as u32 as u8),
        '\u{20AC}' => Some(0x80),
        '\u{2026}' => Some(0x85),
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201C}' => Some(0x93),
        '\u{201D}' => Some(0x94),
        '\u{2022}' => Some(0x95),
        '\u{2013}' => Some(0x96),
        '\u{2014}' => Some(0x97),
        _ => None,
    }
}

/// 텍스트를 폰트가 같은 연속 조각으로 나눕니다.
pub fn font_runs(text: &str) -> Vec<(RunFont, &str)> {
    let mut runs = Vec::new();
    let mut current: Option<(RunFont, usize)> = None;

    for (i, ch) in text.char_indices() {
        let font = if winansi_byte(ch).is_some() {
            RunFont::Latin
        } else {
            RunFont::Unicode
        };
        match current {
            Some((run_font, _)) if run_font == font => {}
            Some((run_font, start)) => {
                runs.push((run_font, &text[start..i]));
                current = Some((font, i));
            }
            None => current = Some((font, i)),
        }
    }
    if let Some((run_font, start)) = current {
        runs.push((run_font, &text[start..]));
    }
    runs
}

fn korean_cid_objects(first_id: usize) -> Vec<(usize, Vec<u8>)> {
    let cid_font = first_id + 1;
    let descriptor = first_id + 2;
    vec![
        (
            first_id,
            format!(
                "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /UniKS-UCS2-H \
                 /DescendantFonts [{} 0 R] >>",
                KOREAN_CID_FONT, cid_font
            )
            .into_bytes(),
        ),
        (
            cid_font,
            format!(
                "<< /Type /Font /Subtype /CIDFontType0 /BaseFont /{} \
                 /CIDSystemInfo << /Registry (Adobe) /Ordering (Korea1) /Supplement 1 >> \
                 /FontDescriptor {} 0 R /DW 1000 >>",
                KOREAN_CID_FONT, descriptor
            )
            .into_bytes(),
        ),
        (
            descriptor,
            format!(
                "<< /Type /FontDescriptor /FontName /{} /Flags 4 /FontBBox [-6 -145 1003 880] \
                 /ItalicAngle 0 /Ascent 880 /Descent -120 /CapHeight 880 /StemV 93 >>",
                KOREAN_CID_FONT
            )
            .into_bytes(),
        ),
    ]
}

fn embedded_objects(
    font: &EmbeddedFont<'_>,
    first_id: usize,
    used: &BTreeMap<u16, char>,
) -> Vec<(usize, Vec<u8>)> {
    let cid_font = first_id + 1;
    let descriptor = first_id + 2;
    let file = first_id + 3;
    let to_unicode = first_id + 4;

    let face = &font.face;
    let bbox = face.global_bounding_box();
    let ascent = font.scale(face.ascender());
    let descent = font.scale(face.descender());
    let cap_height = face.capital_height().map_or(ascent, |h| font.scale(h));

    let widths = used
        .keys()
        .map(|glyph| format!("{} [{}]", glyph, font.advance(GlyphId(*glyph))))
        .collect::<Vec<_>>()
        .join(" ");

    let mut file_body = format!(
        "<< /Length {} /Length1 {} >>\nstream\n",
        font.data.len(),
        font.data.len()
    )
    .into_bytes();
    file_body.extend_from_slice(font.data);
    file_body.extend_from_slice(b"\nendstream");

    vec![
        (
            first_id,
            format!(
                "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H \
                 /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
                EMBEDDED_FONT_NAME, cid_font, to_unicode
            )
            .into_bytes(),
        ),
        (
            cid_font,
            format!(
                "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
                 /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
                 /FontDescriptor {} 0 R /CIDToGIDMap /Identity /DW 1000 /W [{}] >>",
                EMBEDDED_FONT_NAME, descriptor, widths
            )
            .into_bytes(),
        ),
        (
            descriptor,
            format!(
                "<< /Type /FontDescriptor /FontName /{} /Flags 4 /FontBBox [{} {} {} {}] \
                 /ItalicAngle 0 /Ascent {} /Descent {} /CapHeight {} /StemV 80 /FontFile2 {} 0 R >>",
                EMBEDDED_FONT_NAME,
                font.scale(bbox.x_min),
                font.scale(bbox.y_min),
                font.scale(bbox.x_max),
                font.scale(bbox.y_max),
                ascent,
                descent,
                cap_height,
                file
            )
            .into_bytes(),
        ),
        (file, file_body),
        (to_unicode, stream_object(to_unicode_cmap(used).as_bytes())),
    ]
}

/// 글리프 번호 -> 유니코드 대응표. 한 블록에 최대 100개씩 씁니다.
fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    let entries: Vec<(&u16, &char)> = used.iter().collect();
    for chunk in entries.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for (glyph, ch) in chunk {
            let mut units = [0u16; 2];
            let target: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{:04X}", unit))
                .collect();
            let _ = writeln!(cmap, "<{:04X}> <{}>", glyph, target);
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}
