//! # 단어 단위 diff
//!
//! 두 문자열을 공백 기준 토큰으로 나누고(공백 덩어리 자체도 토큰으로 보존),
//! 최장 공통 부분 수열(LCS) 표를 만들어 역추적합니다.
//!
//! - 시간/메모리 모두 O(n·m)입니다. 문단/조항 단위 텍스트용이며,
//!   호출하는 쪽에서 입력 크기를 제한해야 합니다 (`versioning::DiffLimits`).
//! - 역추적 중 LCS 값이 같으면 새 쪽 토큰(added)을 먼저 소비합니다.
//!   그래서 출력 순서에서는 같은 위치의 `removed`가 `added`보다 앞에 옵니다.
//! - 같은 종류의 인접 토큰은 하나의 세그먼트로 합칩니다.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Unchanged,
    Added,
    Removed,
}

/// 같은 변경 상태를 가진 연속 토큰 묶음
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSegment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub text: String,
}

impl DiffSegment {
    pub fn new(kind: SegmentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// 비교 결과의 길이 기반 통계 (문자 수)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub chars_added: usize,
    pub chars_removed: usize,
    pub chars_unchanged: usize,
    pub length_a: usize,
    pub length_b: usize,
}

impl DiffStats {
    pub fn from_segments(segments: &[DiffSegment]) -> Self {
        let mut stats = DiffStats::default();
        for segment in segments {
            let len = segment.text.chars().count();
            match segment.kind {
                SegmentKind::Unchanged => {
                    stats.chars_unchanged += len;
                    stats.length_a += len;
                    stats.length_b += len;
                }
                SegmentKind::Added => {
                    stats.chars_added += len;
                    stats.length_b += len;
                }
                SegmentKind::Removed => {
                    stats.chars_removed += len;
                    stats.length_a += len;
                }
            }
        }
        stats
    }
}

/// 공백 덩어리와 비공백 덩어리를 번갈아 잘라냅니다.
/// 모든 토큰을 이어 붙이면 원문과 정확히 같습니다.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (idx, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match in_space {
            Some(prev) if prev != is_space => {
                tokens.push(&text[start..idx]);
                start = idx;
            }
            _ => {}
        }
        in_space = Some(is_space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// `old` → `new` 단어 단위 diff를 계산합니다.
///
/// 두 입력이 같으면 `unchanged` 세그먼트 하나를 반환합니다 (둘 다 비어 있으면 빈 목록).
pub fn diff_words(old: &str, new: &str) -> Vec<DiffSegment> {
    let old_tokens = tokenize(old);
    let new_tokens = tokenize(new);
    let m = old_tokens.len();
    let n = new_tokens.len();

    // LCS 표: lcs[i][j] = old[..i]와 new[..j]의 LCS 길이
    let mut lcs = vec![vec![0u32; n + 1]; m + 1];
    for i in 1..=m {
        for j in 1..=n {
            lcs[i][j] = if old_tokens[i - 1] == new_tokens[j - 1] {
                lcs[i - 1][j - 1] + 1
            } else {
                lcs[i - 1][j].max(lcs[i][j - 1])
            };
        }
    }

    // 끝에서부터 역추적 (뒤집힌 순서로 쌓음)
    let mut reversed: Vec<(SegmentKind, &str)> = Vec::with_capacity(m + n);
    let (mut i, mut j) = (m, n);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && old_tokens[i - 1] == new_tokens[j - 1] {
            reversed.push((SegmentKind::Unchanged, old_tokens[i - 1]));
            i -= 1;
            j -= 1;
        } else if j > 0 && (i == 0 || lcs[i][j - 1] >= lcs[i - 1][j]) {
            reversed.push((SegmentKind::Added, new_tokens[j - 1]));
            j -= 1;
        } else {
            reversed.push((SegmentKind::Removed, old_tokens[i - 1]));
            i -= 1;
        }
    }

    coalesce(reversed.into_iter().rev())
}

fn coalesce<'a>(tokens: impl Iterator<Item = (SegmentKind, &'a str)>) -> Vec<DiffSegment> {
    let mut segments: Vec<DiffSegment> = Vec::new();
    for (kind, text) in tokens {
        match segments.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(text),
            _ => segments.push(DiffSegment::new(kind, text)),
        }
    }
    segments
}
