use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::MainVersionSummary;

/// 브랜치별로 묶은 버전 목록과 전체 타임라인 (둘 다 최신순)
#[derive(Debug, Clone, Serialize)]
pub struct VersionGraph {
    pub branches: BTreeMap<String, Vec<MainVersionSummary>>,
    pub timeline: Vec<MainVersionSummary>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBranchRequest {
    pub branch_name: String,
    pub from_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MergeBranchRequest {
    pub source_branch: String,
    pub target_branch: Option<String>,
}
