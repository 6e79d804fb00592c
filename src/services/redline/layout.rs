//! # 레드라인 페이지 레이아웃
//!
//! diff 세그먼트와 변경 요약을 페이지 단위 그리기 명령(`DrawOp`)으로 배치합니다.
//!
//! 출력 포맷(PDF)의 텍스트 그리기에는 취소선이 없으므로,
//! 본문을 직접 줄바꿈하면서 실제로 화면에 나뉜 줄마다
//! 삭제 텍스트의 시작/끝 좌표를 다시 측정해 취소선을 그립니다.
//!
//! 좌표계는 PDF와 같습니다 (원점 좌하단, 단위 pt).

use crate::services::diff::{tokenize, DiffSegment, SegmentKind};
use crate::services::summary::ChangeRecord;

use super::RedlineInput;

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const MARGIN: f32 = 50.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 11.0;
const BODY_LEADING: f32 = 15.0;
const TABLE_SIZE: f32 = 9.0;
const TABLE_LEADING: f32 = 11.0;
const CELL_PADDING: f32 = 4.0;
const MAX_CELL_LINES: usize = 24;

/// 변경 요약 표의 고정 열 (제목, 폭). 폭의 합 = CONTENT_WIDTH
const COLUMNS: [(&str, f32); 5] = [
    ("#", 30.0),
    ("Type", 64.0),
    ("Original Text", 170.0),
    ("New Text", 170.0),
    ("Location", 78.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub f32, pub f32, pub f32);

impl Color {
    pub const BLACK: Color = Color(0.0, 0.0, 0.0);
    pub const GRAY: Color = Color(0.45, 0.45, 0.45);
    pub const REMOVED: Color = Color(0.75, 0.0, 0.0);
    pub const ADDED: Color = Color(0.0, 0.25, 0.7);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Strikethrough,
    Underline,
    Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        font: Font,
        color: Color,
        text: String,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        color: Color,
        kind: LineKind,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

/// 텍스트 폭 측정
pub trait TextMeasure {
    fn width(&self, text: &str, font: Font, size: f32) -> f32;
}

/// 페이지를 순서대로 채워 나가는 캔버스. `y`는 다음 줄의 윗변입니다.
struct Canvas {
    finished: Vec<Page>,
    current: Page,
    y: f32,
}

impl Canvas {
    fn new() -> Self {
        Self {
            finished: Vec::new(),
            current: Page::default(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        self.finished.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn fits(&self, height: f32) -> bool {
        self.y - height >= MARGIN
    }

    fn text(&mut self, x: f32, y: f32, size: f32, font: Font, color: Color, text: impl Into<String>) {
        self.current.ops.push(DrawOp::Text {
            x,
            y,
            size,
            font,
            color,
            text: text.into(),
        });
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Color, kind: LineKind) {
        let width = match kind {
            LineKind::Rule => 0.5,
            LineKind::Strikethrough | LineKind::Underline => 0.8,
        };
        self.current.ops.push(DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            width,
            color,
            kind,
        });
    }

    fn finish(mut self) -> Vec<Page> {
        self.finished.push(self.current);
        self.finished
    }
}

/// 헤더 + 본문 + 변경 요약 표를 배치합니다.
pub fn layout_redline(input: &RedlineInput<'_>, measure: &dyn TextMeasure) -> Vec<Page> {
    let mut canvas = Canvas::new();

    draw_header(&mut canvas, measure, input);
    layout_body(&mut canvas, measure, input.segments);
    layout_summary(&mut canvas, measure, input.summary);

    let mut pages = canvas.finish();
    let total = pages.len();
    for (i, page) in pages.iter_mut().enumerate() {
        let label = format!("Page {} of {}", i + 1, total);
        let x = PAGE_WIDTH - MARGIN - measure.width(&label, Font::Regular, 8.0);
        page.ops.push(DrawOp::Text {
            x,
            y: MARGIN / 2.0,
            size: 8.0,
            font: Font::Regular,
            color: Color::GRAY,
            text: label,
        });
    }
    pages
}

fn draw_header(canvas: &mut Canvas, measure: &dyn TextMeasure, input: &RedlineInput<'_>) {
    let title = format!("Redline: {}", input.document_name);
    for line in wrap_text(&title, CONTENT_WIDTH, measure, Font::Bold, TITLE_SIZE) {
        canvas.y -= TITLE_SIZE + 4.0;
        canvas.text(MARGIN, canvas.y, TITLE_SIZE, Font::Bold, Color::BLACK, line);
    }

    canvas.y -= 18.0;
    canvas.text(
        MARGIN,
        canvas.y,
        11.0,
        Font::Regular,
        Color::GRAY,
        format!("Comparing {} \u{2192} {}", input.label_a, input.label_b),
    );

    // 범례: 삭제 = 취소선, 추가 = 밑줄
    canvas.y -= 18.0;
    let y = canvas.y;
    let mut x = MARGIN;
    canvas.text(x, y, 10.0, Font::Bold, Color::BLACK, "Legend:");
    x += measure.width("Legend: ", Font::Bold, 10.0) + 6.0;

    let removed = "Removed text";
    let removed_width = measure.width(removed, Font::Regular, 10.0);
    canvas.text(x, y, 10.0, Font::Regular, Color::REMOVED, removed);
    canvas.line(x, y + 3.0, x + removed_width, y + 3.0, Color::REMOVED, LineKind::Strikethrough);
    x += removed_width + 18.0;

    let added = "Added text";
    let added_width = measure.width(added, Font::Regular, 10.0);
    canvas.text(x, y, 10.0, Font::Regular, Color::ADDED, added);
    canvas.line(x, y - 1.5, x + added_width, y - 1.5, Color::ADDED, LineKind::Underline);

    canvas.y -= 10.0;
    canvas.line(MARGIN, canvas.y, PAGE_WIDTH - MARGIN, canvas.y, Color::GRAY, LineKind::Rule);
    canvas.y -= 8.0;
}

struct Run {
    kind: SegmentKind,
    text: String,
    x: f32,
}

/// 본문 줄바꿈 흐름. 현재 줄에 쌓인 런(run)을 줄 단위로 내보냅니다.
struct BodyFlow<'m> {
    measure: &'m dyn TextMeasure,
    line: Vec<Run>,
    x: f32,
}

impl<'m> BodyFlow<'m> {
    fn new(measure: &'m dyn TextMeasure) -> Self {
        Self {
            measure,
            line: Vec::new(),
            x: MARGIN,
        }
    }

    fn width(&self, text: &str) -> f32 {
        self.measure.width(text, Font::Regular, BODY_SIZE)
    }

    fn right_edge() -> f32 {
        PAGE_WIDTH - MARGIN
    }

    fn append(&mut self, kind: SegmentKind, text: &str) {
        let width = self.width(text);
        match self.line.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(text),
            _ => self.line.push(Run {
                kind,
                text: text.to_string(),
                x: self.x,
            }),
        }
        self.x += width;
    }

    fn push_space(&mut self, canvas: &mut Canvas, kind: SegmentKind, space: &str) {
        // 줄 첫머리 공백은 버립니다 (줄바꿈 직후 들여쓰기 방지)
        if self.line.is_empty() {
            return;
        }
        let space = space.replace('\t', "    ");
        if self.x + self.width(&space) > Self::right_edge() {
            self.break_line(canvas);
            return;
        }
        self.append(kind, &space);
    }

    fn push_word(&mut self, canvas: &mut Canvas, kind: SegmentKind, word: &str) {
        let width = self.width(word);
        if self.x + width > Self::right_edge() && !self.line.is_empty() {
            self.break_line(canvas);
        }
        if width <= CONTENT_WIDTH {
            self.append(kind, word);
            return;
        }

        // 한 줄보다 긴 단어는 글자 단위로 자릅니다.
        let mut chunk = String::new();
        for ch in word.chars() {
            chunk.push(ch);
            if self.x + self.width(&chunk) > Self::right_edge() && chunk.chars().count() > 1 {
                chunk.pop();
                self.append(kind, &chunk);
                self.break_line(canvas);
                chunk.clear();
                chunk.push(ch);
            }
        }
        if !chunk.is_empty() {
            self.append(kind, &chunk);
        }
    }

    /// 현재 줄을 그리고 다음 줄로 넘어갑니다. 빈 줄이면 줄 간격만 내려갑니다.
    fn break_line(&mut self, canvas: &mut Canvas) {
        if !canvas.fits(BODY_LEADING) {
            canvas.new_page();
        }
        let baseline = canvas.y - BODY_SIZE;

        let last_index = self.line.len().saturating_sub(1);
        for (i, run) in self.line.drain(..).enumerate() {
            // 줄 끝 공백에는 취소선/밑줄이 걸리지 않도록 폭을 다시 잽니다.
            let text = if i == last_index {
                run.text.trim_end()
            } else {
                run.text.as_str()
            };
            if text.is_empty() {
                continue;
            }
            let width = self.measure.width(text, Font::Regular, BODY_SIZE);
            let (color, decoration) = match run.kind {
                SegmentKind::Unchanged => (Color::BLACK, None),
                SegmentKind::Added => (Color::ADDED, Some((LineKind::Underline, -1.5))),
                SegmentKind::Removed => {
                    (Color::REMOVED, Some((LineKind::Strikethrough, BODY_SIZE * 0.3)))
                }
            };
            canvas.text(run.x, baseline, BODY_SIZE, Font::Regular, color, text);
            if let Some((kind, offset)) = decoration {
                let y = baseline + offset;
                canvas.line(run.x, y, run.x + width, y, color, kind);
            }
        }

        self.x = MARGIN;
        canvas.y -= BODY_LEADING;
    }
}

fn layout_body(canvas: &mut Canvas, measure: &dyn TextMeasure, segments: &[DiffSegment]) {
    let mut flow = BodyFlow::new(measure);

    for segment in segments {
        for token in tokenize(&segment.text) {
            if !token.chars().all(char::is_whitespace) {
                flow.push_word(canvas, segment.kind, token);
                continue;
            }
            let newlines = token.matches('\n').count();
            if newlines == 0 {
                flow.push_space(canvas, segment.kind, token);
            } else {
                for _ in 0..newlines {
                    flow.break_line(canvas);
                }
            }
        }
    }

    if !flow.line.is_empty() {
        flow.break_line(canvas);
    }
}

fn layout_summary(canvas: &mut Canvas, measure: &dyn TextMeasure, summary: &[ChangeRecord]) {
    canvas.new_page();
    canvas.y -= 14.0;
    canvas.text(MARGIN, canvas.y, 14.0, Font::Bold, Color::BLACK, "Summary of Changes");
    canvas.y -= 14.0;

    if summary.is_empty() {
        canvas.y -= BODY_LEADING;
        canvas.text(MARGIN, canvas.y, BODY_SIZE, Font::Regular, Color::GRAY, "No changes detected.");
        return;
    }

    draw_table_header(canvas, measure);
    for record in summary {
        let cells = [
            record.index.to_string(),
            record.change_type.as_str().to_string(),
            record.original_text.clone().unwrap_or_else(|| "-".to_string()),
            record.new_text.clone().unwrap_or_else(|| "-".to_string()),
            record.location.clone(),
        ];
        let wrapped: Vec<Vec<String>> = cells
            .iter()
            .zip(COLUMNS.iter())
            .map(|(cell, (_, col_width))| {
                let lines = wrap_text(cell, col_width - 2.0 * CELL_PADDING, measure, Font::Regular, TABLE_SIZE);
                cap_lines(lines, MAX_CELL_LINES)
            })
            .collect();

        let height = row_height(&wrapped);
        // 다음 행이 아래 여백을 넘으면 새 페이지에 머리글부터 다시 그립니다.
        if !canvas.fits(height) {
            canvas.new_page();
            draw_table_header(canvas, measure);
        }
        draw_row(canvas, &wrapped, Font::Regular, height);
    }
}

fn row_height(cells: &[Vec<String>]) -> f32 {
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    lines as f32 * TABLE_LEADING + 2.0 * CELL_PADDING
}

fn draw_table_header(canvas: &mut Canvas, measure: &dyn TextMeasure) {
    let cells: Vec<Vec<String>> = COLUMNS
        .iter()
        .map(|(title, col_width)| {
            wrap_text(title, col_width - 2.0 * CELL_PADDING, measure, Font::Bold, TABLE_SIZE)
        })
        .collect();
    let height = row_height(&cells);
    canvas.line(MARGIN, canvas.y, PAGE_WIDTH - MARGIN, canvas.y, Color::BLACK, LineKind::Rule);
    draw_row(canvas, &cells, Font::Bold, height);
}

fn draw_row(canvas: &mut Canvas, cells: &[Vec<String>], font: Font, height: f32) {
    let top = canvas.y;
    let bottom = top - height;
    let mut x = MARGIN;

    canvas.line(x, top, x, bottom, Color::GRAY, LineKind::Rule);
    for (lines, (_, col_width)) in cells.iter().zip(COLUMNS.iter()) {
        for (k, line) in lines.iter().enumerate() {
            let baseline = top - CELL_PADDING - (k as f32 + 1.0) * TABLE_LEADING + 2.0;
            canvas.text(x + CELL_PADDING, baseline, TABLE_SIZE, font, Color::BLACK, line.clone());
        }
        x += col_width;
        canvas.line(x, top, x, bottom, Color::GRAY, LineKind::Rule);
    }
    canvas.line(MARGIN, bottom, PAGE_WIDTH - MARGIN, bottom, Color::GRAY, LineKind::Rule);

    canvas.y = bottom;
}

/// 주어진 폭에 맞게 단어 단위로 줄을 나눕니다. 폭보다 긴 단어는 글자 단위로 자릅니다.
pub fn wrap_text(text: &str, max_width: f32, measure: &dyn TextMeasure, font: Font, size: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for source_line in text.split('\n') {
        let mut current = String::new();
        for word in source_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if measure.width(&candidate, font, size) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if measure.width(word, font, size) <= max_width {
                current = word.to_string();
                continue;
            }
            for ch in word.chars() {
                current.push(ch);
                if measure.width(&current, font, size) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(ch);
                }
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn cap_lines(mut lines: Vec<String>, max: usize) -> Vec<String> {
    if lines.len() > max {
        lines.truncate(max);
        if let Some(last) = lines.last_mut() {
            last.push_str("...");
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::diff::diff_words;
    use crate::services::redline::fonts::RedlineFonts;
    use crate::services::summary::{summarize_changes, ChangeType};

    fn input<'a>(segments: &'a [DiffSegment], summary: &'a [ChangeRecord]) -> RedlineInput<'a> {
        RedlineInput {
            document_name: "Supply Agreement",
            label_a: "v1",
            label_b: "v2",
            segments,
            summary,
        }
    }

    fn lines_of(pages: &[Page], wanted: LineKind) -> Vec<(f32, f32, f32)> {
        pages
            .iter()
            .flat_map(|p| p.ops.iter())
            .filter_map(|op| match op {
                DrawOp::Line { x1, x2, y1, kind, .. } if *kind == wanted => Some((*x1, *x2, *y1)),
                _ => None,
            })
            .collect()
    }

    fn texts(pages: &[Page]) -> Vec<&str> {
        pages
            .iter()
            .flat_map(|p| p.ops.iter())
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn wrapped_deletion_gets_one_strike_per_visual_line() {
        let removed = "indemnify and hold harmless ".repeat(12);
        let segments = vec![
            DiffSegment::new(SegmentKind::Unchanged, "The Supplier shall "),
            DiffSegment::new(SegmentKind::Removed, removed.clone()),
            DiffSegment::new(SegmentKind::Unchanged, "the Buyer."),
        ];
        let pages = layout_redline(&input(&segments, &[]), &RedlineFonts::builtin());

        let strikes = lines_of(&pages, LineKind::Strikethrough);
        // 범례 1개 + 본문에서 여러 줄
        assert!(strikes.len() >= 3, "expected the deletion to wrap, got {:?}", strikes);

        let red_runs = pages
            .iter()
            .flat_map(|p| p.ops.iter())
            .filter(|op| matches!(op, DrawOp::Text { color, .. } if *color == Color::REMOVED))
            .count();
        assert_eq!(red_runs, strikes.len());

        for (x1, x2, _) in &strikes {
            assert!(x2 > x1);
            assert!(*x2 <= PAGE_WIDTH - MARGIN + 0.01);
        }
        // 서로 다른 줄(y)에 그려집니다.
        let mut ys: Vec<i32> = strikes.iter().map(|(_, _, y)| *y as i32).collect();
        ys.dedup();
        assert_eq!(ys.len(), strikes.len());
    }

    #[test]
    fn additions_are_underlined() {
        let segments = diff_words("Payment is due.", "Payment is due within 30 days.");
        let pages = layout_redline(&input(&segments, &[]), &RedlineFonts::builtin());
        // 범례 1개 + 본문 1개
        assert_eq!(lines_of(&pages, LineKind::Underline).len(), 2);
    }

    #[test]
    fn summary_table_starts_on_its_own_page_and_paginates() {
        let records: Vec<ChangeRecord> = (1..=120)
            .map(|i| ChangeRecord {
                index: i,
                change_type: ChangeType::Modified,
                original_text: Some(format!("original clause text number {} with several words", i)),
                new_text: Some(format!("revised clause text number {} with several more words", i)),
                location: format!("Para {}", i),
            })
            .collect();
        let segments = diff_words("short", "shorter");
        let pages = layout_redline(&input(&segments, &records), &RedlineFonts::builtin());

        assert!(pages.len() >= 4);
        // 첫 페이지(본문)에는 표가 없습니다.
        assert!(!texts(&pages[..1]).contains(&"Summary of Changes"));
        assert!(texts(&pages[1..2]).contains(&"Summary of Changes"));

        // 표가 있는 모든 페이지에 머리글이 반복됩니다.
        for page in &pages[1..] {
            assert!(texts(std::slice::from_ref(page)).contains(&"Original Text"));
        }

        // 페이지 번호를 제외한 모든 내용은 아래 여백 위에 있습니다.
        for page in &pages {
            for op in &page.ops {
                if let DrawOp::Text { y, text, .. } = op {
                    if !text.starts_with("Page ") {
                        assert!(*y >= MARGIN, "{} drawn below the margin at {}", text, y);
                    }
                }
            }
        }
    }

    #[test]
    fn identical_versions_render_empty_summary() {
        let segments = diff_words("Same text.", "Same text.");
        let summary = summarize_changes(&segments);
        let pages = layout_redline(&input(&segments, &summary), &RedlineFonts::builtin());

        assert_eq!(pages.len(), 2);
        let all = texts(&pages);
        assert!(all.contains(&"Redline: Supply Agreement"));
        assert!(all.contains(&"Comparing v1 \u{2192} v2"));
        assert!(all.contains(&"No changes detected."));
        assert!(all.contains(&"Page 2 of 2"));
    }

    #[test]
    fn wrap_text_respects_width() {
        let lines = wrap_text(
            "a fairly long sentence that must wrap across lines",
            60.0,
            &RedlineFonts::builtin(),
            Font::Regular,
            9.0,
        );
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(RedlineFonts::builtin().width(line, Font::Regular, 9.0) <= 60.0);
        }
        assert_eq!(wrap_text("", 60.0, &RedlineFonts::builtin(), Font::Regular, 9.0), vec![String::new()]);
    }
}
