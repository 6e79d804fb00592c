//! # 문단 단위 변경 요약
//!
//! diff 세그먼트를 문단으로 나누고, 문단마다 삭제/추가된 텍스트를 모아
//! `Added` / `Deleted` / `Modified` 레코드를 만듭니다.
//!
//! 문단 경계 판단은 `ParagraphBoundary` 트레이트 뒤에 있습니다.
//! 기본 구현(`BlankLineBoundary`)은 빈 줄("\n\n")을 경계로 보는 단순한 휴리스틱입니다.
//!
//! `Para N`의 N은 레코드를 만든 문단에서만 증가합니다.
//! 따라서 실제 문서의 문단 번호와 다를 수 있습니다.

use serde::{Deserialize, Serialize};

use super::diff::{DiffSegment, SegmentKind};

/// `Modified` 레코드에서 각 쪽 텍스트를 자르는 길이 (문자 수)
pub const MODIFIED_PREVIEW_CHARS: usize = 100;

/// 세그먼트 텍스트를 문단 경계 기준으로 자르는 전략
pub trait ParagraphBoundary: Send + Sync {
    /// 경계로 나눈 조각들을 반환합니다. 조각이 n개면 경계가 n-1개 있다는 뜻입니다.
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str>;
}

/// 빈 줄("\n\n")을 문단 경계로 봅니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlankLineBoundary;

impl ParagraphBoundary for BlankLineBoundary {
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split("\n\n").collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Added,
    Deleted,
    Modified,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Added => "Added",
            ChangeType::Deleted => "Deleted",
            ChangeType::Modified => "Modified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// 1부터 시작하는 순번
    pub index: usize,
    pub change_type: ChangeType,
    pub original_text: Option<String>,
    pub new_text: Option<String>,
    /// `Para N`
    pub location: String,
}

#[derive(Default)]
struct Paragraph {
    removed: Vec<String>,
    added: Vec<String>,
}

impl Paragraph {
    fn push(&mut self, kind: SegmentKind, piece: &str) {
        let piece = piece.trim();
        if piece.is_empty() {
            return;
        }
        match kind {
            SegmentKind::Removed => self.removed.push(piece.to_string()),
            SegmentKind::Added => self.added.push(piece.to_string()),
            SegmentKind::Unchanged => {}
        }
    }
}

struct Summarizer {
    records: Vec<ChangeRecord>,
    paragraph_no: usize,
}

impl Summarizer {
    fn flush(&mut self, paragraph: Paragraph) {
        let removed = paragraph.removed.join(" ");
        let added = paragraph.added.join(" ");

        let (change_type, original_text, new_text) = match (removed.is_empty(), added.is_empty()) {
            (false, false) => (
                ChangeType::Modified,
                Some(preview(&removed)),
                Some(preview(&added)),
            ),
            (false, true) => (ChangeType::Deleted, Some(removed), None),
            (true, false) => (ChangeType::Added, None, Some(added)),
            (true, true) => return,
        };

        self.paragraph_no += 1;
        self.records.push(ChangeRecord {
            index: self.records.len() + 1,
            change_type,
            original_text,
            new_text,
            location: format!("Para {}", self.paragraph_no),
        });
    }
}

/// 기본 문단 경계(빈 줄)로 요약합니다.
pub fn summarize_changes(segments: &[DiffSegment]) -> Vec<ChangeRecord> {
    summarize_with(segments, &BlankLineBoundary)
}

/// 지정한 문단 경계 전략으로 요약합니다.
pub fn summarize_with(segments: &[DiffSegment], boundary: &dyn ParagraphBoundary) -> Vec<ChangeRecord> {
    let mut summarizer = Summarizer {
        records: Vec::new(),
        paragraph_no: 0,
    };
    let mut paragraph = Paragraph::default();

    for segment in segments {
        for (k, piece) in boundary.split(&segment.text).into_iter().enumerate() {
            // 경계 앞부분은 현재 문단, 뒷부분은 다음 문단에 속합니다.
            if k > 0 {
                summarizer.flush(std::mem::take(&mut paragraph));
            }
            paragraph.push(segment.kind, piece);
        }
    }
    summarizer.flush(paragraph);

    summarizer.records
}

fn preview(text: &str) -> String {
    if text.chars().count() > MODIFIED_PREVIEW_CHARS {
        let cut: String = text.chars().take(MODIFIED_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
