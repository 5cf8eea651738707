//! 书本处理流程 - 流程层
//!
//! 核心职责：定义"一本书"的完整处理流程
//!
//! 流程顺序：
//! 1. 标题解析 → 目录 ID
//! 2. LLM 格式化 → 结构校验
//! 3. 提交测验
//!
//! 任何一步失败都只终止当前这本书，并产生唯一的结果记录。

use std::future::Future;
use std::sync::Arc;

use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use crate::clients::{CatalogApi, SubmitResponse};
use crate::error::{FormatError, ItemError};
use crate::models::book::{CatalogMatch, RawItem};
use crate::models::outcome::{ItemOutcome, Stage};
use crate::models::quiz::StructuredQuiz;
use crate::services::{QuizFormatter, Resolution, TitleResolver};
use crate::workflow::item_ctx::ItemCtx;

/// 书本处理流程
///
/// - 不持有任何可变状态，多个流程可以并发共享同一个实例
/// - 只依赖业务能力（services / clients）
/// - 没有格式化能力时只执行标题解析（查询检查模式）
pub struct ItemFlow {
    catalog: Arc<dyn CatalogApi>,
    resolver: TitleResolver,
    formatter: Option<Arc<dyn QuizFormatter>>,
}

impl ItemFlow {
    /// 完整流程：解析 → 格式化 → 提交
    pub fn new(catalog: Arc<dyn CatalogApi>, formatter: Arc<dyn QuizFormatter>) -> Self {
        Self {
            resolver: TitleResolver::new(catalog.clone()),
            catalog,
            formatter: Some(formatter),
        }
    }

    /// 只解析标题，成功时停在 `Resolved`
    pub fn resolve_only(catalog: Arc<dyn CatalogApi>) -> Self {
        Self {
            resolver: TitleResolver::new(catalog.clone()),
            catalog,
            formatter: None,
        }
    }

    /// 处理一本书
    ///
    /// `deadline` 之后还未完成的网络阶段按该阶段的失败处理。
    pub async fn run(&self, item: &RawItem, deadline: Instant) -> ItemOutcome {
        let ctx = ItemCtx::for_item(item);
        info!("{} 📖 开始处理: {} (by {})", ctx, item.title, item.author);

        // ========== 阶段 1: 标题解析 ==========
        let catalog = match within(deadline, self.resolver.resolve(&item.title)).await {
            Some(Resolution::Resolved(found)) => {
                info!(
                    "{} ✓ 找到书本 ID: {} ({})",
                    ctx, found.catalog_id, found.canonical_title
                );
                found
            }
            Some(Resolution::Unresolved { detail }) => {
                warn!("{} ❌ 标题解析失败: {}", ctx, detail);
                return ItemOutcome::failure(
                    item.sequence_no,
                    None,
                    None,
                    &ItemError::Resolution(detail),
                );
            }
            None => {
                warn!("{} ❌ 标题解析超时", ctx);
                return ItemOutcome::failure(
                    item.sequence_no,
                    None,
                    None,
                    &ItemError::Resolution("catalog lookup timed out".to_string()),
                );
            }
        };

        let Some(formatter) = &self.formatter else {
            return ItemOutcome::success(item.sequence_no, Stage::Resolved, catalog);
        };

        // ========== 阶段 2: 格式化 ==========
        let quiz = match self.format(formatter.as_ref(), item, &catalog, deadline).await {
            Ok(quiz) => {
                info!("{} ✓ 格式化完成，共 {} 道题", ctx, quiz.questions.len());
                quiz
            }
            Err(e) => {
                error!("{} ❌ 格式化失败: {}", ctx, e);
                return ItemOutcome::failure(
                    item.sequence_no,
                    Some(Stage::Resolved),
                    Some(catalog),
                    &ItemError::Format(e),
                );
            }
        };

        // ========== 阶段 3: 提交 ==========
        info!("{} 📤 正在提交测验...", ctx);
        match self.submit(&quiz, deadline).await {
            Ok(status) => {
                info!("{} ✅ 提交成功 (HTTP {})", ctx, status);
                ItemOutcome::success(item.sequence_no, Stage::Submitted, catalog)
            }
            Err(e) => {
                error!("{} ❌ 提交失败: {}", ctx, e);
                ItemOutcome::failure(item.sequence_no, Some(Stage::Formatted), Some(catalog), &e)
            }
        }
    }

    /// 生成并校验结构化测验
    async fn format(
        &self,
        formatter: &dyn QuizFormatter,
        item: &RawItem,
        catalog: &CatalogMatch,
        deadline: Instant,
    ) -> Result<StructuredQuiz, FormatError> {
        let quiz = within(
            deadline,
            formatter.format(catalog.catalog_id, &catalog.canonical_title, &item.quiz_text),
        )
        .await
        .ok_or(FormatError::Timeout)??;

        quiz.validate().map_err(FormatError::Invalid)?;
        Ok(quiz)
    }

    /// 提交测验，返回被接受时的状态码
    async fn submit(&self, quiz: &StructuredQuiz, deadline: Instant) -> Result<u16, ItemError> {
        let payload = quiz.to_payload();
        let response = within(deadline, self.catalog.create_quiz(&payload))
            .await
            .ok_or_else(|| ItemError::Submission("quiz submission timed out".to_string()))?
            .map_err(|e| ItemError::Submission(format!("quiz submission failed: {}", e)))?;

        match response {
            SubmitResponse::Accepted { status } => Ok(status),
            SubmitResponse::Rejected { status, body } => Err(ItemError::Submission(format!(
                "quiz submission failed: HTTP {} - {}",
                status, body
            ))),
        }
    }
}

/// 在截止时间内执行，超时返回 `None`
async fn within<F: Future>(deadline: Instant, fut: F) -> Option<F::Output> {
    timeout_at(deadline, fut).await.ok()
}
