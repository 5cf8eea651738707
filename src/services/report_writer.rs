//! 结果报告服务 - 业务能力层
//!
//! 汇总每本书的结果并渲染成文本报告；写文件是唯一的副作用，每次运行只写一次。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::fs;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::book::RawItem;
use crate::models::outcome::{ItemOutcome, RunSummary};

/// 报告种类，决定标题、统计文案和文件名前缀
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// 多书文档的完整处理
    MultipleBooks,
    /// 书本目录逐个处理
    SingleBooks,
    /// 只检查标题能否在目录中查到
    LookupCheck,
}

impl ReportKind {
    fn heading(self) -> &'static str {
        match self {
            ReportKind::MultipleBooks => "📚 MULTIPLE BOOK PROCESSING RESULTS",
            ReportKind::SingleBooks => "📘 SINGLE BOOK PROCESSING RESULTS",
            ReportKind::LookupCheck => "📊 BOOK ID LOOKUP TEST RESULTS",
        }
    }

    fn file_prefix(self) -> &'static str {
        match self {
            ReportKind::MultipleBooks => "multiple_book_results",
            ReportKind::SingleBooks => "single_book_results",
            ReportKind::LookupCheck => "book_id_test_results",
        }
    }

    /// (总数, 成功, 失败, 成功小节, 失败小节)
    fn labels(self) -> [&'static str; 5] {
        match self {
            ReportKind::LookupCheck => [
                "Total books tested",
                "Successfully found",
                "Failed to find",
                "✅ SUCCESSFULLY FOUND BOOKS:",
                "❌ FAILED TO FIND BOOKS:",
            ],
            _ => [
                "Total books processed",
                "Successfully processed",
                "Failed to process",
                "✅ SUCCESSFULLY PROCESSED BOOKS:",
                "❌ FAILED BOOKS:",
            ],
        }
    }
}

/// 汇总结果（纯计算）
pub fn summarize(outcomes: Vec<ItemOutcome>) -> RunSummary {
    RunSummary::new(outcomes)
}

/// 渲染报告文本
///
/// 不论成功与否，每本书都按文档顺序出现在对应小节中。
pub fn render(
    summary: &RunSummary,
    items: &[RawItem],
    kind: ReportKind,
    generated_at: &DateTime<Local>,
    location: &Path,
) -> String {
    let [total_label, ok_label, failed_label, ok_section, failed_section] = kind.labels();
    let by_seq: HashMap<usize, &RawItem> = items.iter().map(|i| (i.sequence_no, i)).collect();

    let mut out = String::new();
    out.push_str(&format!("{}\n", "=".repeat(80)));
    out.push_str(&format!("{}\n", kind.heading()));
    out.push_str(&format!("{}\n", "=".repeat(80)));
    out.push_str(&format!(
        "Processing Date: {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("{}: {}\n", total_label, summary.total()));
    out.push_str(&format!("{}: {}\n", ok_label, summary.successful()));
    out.push_str(&format!("{}: {}\n", failed_label, summary.failed()));
    out.push_str(&format!("Success rate: {:.1}%\n\n", summary.success_rate()));

    let (succeeded, failed): (Vec<&ItemOutcome>, Vec<&ItemOutcome>) =
        summary.outcomes().iter().partition(|o| o.is_success());

    if !succeeded.is_empty() {
        out.push_str(&format!("{}\n{}\n", ok_section, "-".repeat(50)));
        for outcome in succeeded {
            push_item_heading(&mut out, outcome, &by_seq);
            if let Some(catalog) = &outcome.catalog {
                out.push_str(&format!("  → Catalog Title: {}\n", catalog.canonical_title));
                out.push_str(&format!("  → Book ID: {}\n", catalog.catalog_id));
            }
            if let Some(stage) = outcome.stage_reached {
                out.push_str(&format!("  → Stage: {:?}\n", stage));
            }
            out.push('\n');
        }
    }

    if !failed.is_empty() {
        out.push_str(&format!("{}\n{}\n", failed_section, "-".repeat(50)));
        for outcome in failed {
            push_item_heading(&mut out, outcome, &by_seq);
            if let Some(catalog) = &outcome.catalog {
                out.push_str(&format!("  → Book ID: {}\n", catalog.catalog_id));
            }
            if let Some(kind) = outcome.failure_kind {
                out.push_str(&format!("  → Failure: {}\n", kind));
            }
            out.push_str(&format!(
                "  → Error: {}\n",
                outcome.detail.as_deref().unwrap_or("unknown error")
            ));
            out.push('\n');
        }
    }

    out.push_str(&format!("{}\n", "=".repeat(80)));
    out.push_str(&format!("FILE LOCATION: {}\n", location.display()));
    out
}

fn push_item_heading(out: &mut String, outcome: &ItemOutcome, by_seq: &HashMap<usize, &RawItem>) {
    match by_seq.get(&outcome.sequence_no) {
        Some(item) => {
            out.push_str(&format!("Book {}: {}\n", item.book_number, item.title));
            if !item.author.is_empty() {
                out.push_str(&format!("  → Author: {}\n", item.author));
            }
        }
        None => out.push_str(&format!("Item #{}\n", outcome.sequence_no)),
    }
}

/// 报告写入服务
pub struct ReportWriter {
    results_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    /// 带时间戳的报告路径
    pub fn report_path(&self, kind: ReportKind, generated_at: &DateTime<Local>) -> PathBuf {
        self.results_dir.join(format!(
            "{}_{}.txt",
            kind.file_prefix(),
            generated_at.format("%Y%m%d_%H%M%S")
        ))
    }

    /// 写入报告，目录不存在时自动创建
    pub async fn write(&self, path: &Path, report: &str) -> AppResult<()> {
        fs::create_dir_all(&self.results_dir)
            .await
            .map_err(|e| AppError::file_write_failed(self.results_dir.display().to_string(), e))?;
        fs::write(path, report)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        info!("📄 Results saved to: {}", path.display());
        Ok(())
    }
}
