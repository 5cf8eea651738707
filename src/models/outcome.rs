//! 单本书的处理结果与整次运行的汇总

use serde::{Deserialize, Serialize};

use crate::error::{FailureKind, ItemError};
use crate::models::book::CatalogMatch;

/// 流程已到达的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Resolved,
    Formatted,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    Success,
    Failure,
}

/// 单本书的终止状态，每本书恰好产生一个
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub sequence_no: usize,
    /// 解析失败时为 `None`
    pub stage_reached: Option<Stage>,
    pub status: ItemStatus,
    pub failure_kind: Option<FailureKind>,
    pub detail: Option<String>,
    /// 解析成功时的目录信息，报告中使用
    pub catalog: Option<CatalogMatch>,
}

impl ItemOutcome {
    pub fn success(sequence_no: usize, stage: Stage, catalog: CatalogMatch) -> Self {
        Self {
            sequence_no,
            stage_reached: Some(stage),
            status: ItemStatus::Success,
            failure_kind: None,
            detail: None,
            catalog: Some(catalog),
        }
    }

    pub fn failure(
        sequence_no: usize,
        stage_reached: Option<Stage>,
        catalog: Option<CatalogMatch>,
        error: &ItemError,
    ) -> Self {
        Self {
            sequence_no,
            stage_reached,
            status: ItemStatus::Failure,
            failure_kind: Some(error.kind()),
            detail: Some(error.to_string()),
            catalog,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ItemStatus::Success
    }
}

/// 一次运行的汇总，构建后不再修改
///
/// `successful + failed == total` 恒成立；`outcomes` 按 `sequence_no` 排序。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    total: usize,
    successful: usize,
    failed: usize,
    outcomes: Vec<ItemOutcome>,
}

impl RunSummary {
    pub(crate) fn new(mut outcomes: Vec<ItemOutcome>) -> Self {
        outcomes.sort_by_key(|o| o.sequence_no);
        let successful = outcomes.iter().filter(|o| o.is_success()).count();
        let total = outcomes.len();
        Self {
            total,
            successful,
            failed: total - successful,
            outcomes,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn successful(&self) -> usize {
        self.successful
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn outcomes(&self) -> &[ItemOutcome] {
        &self.outcomes
    }

    /// 成功率（百分比），没有条目时为 0
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful as f64 / self.total as f64 * 100.0
        }
    }
}
