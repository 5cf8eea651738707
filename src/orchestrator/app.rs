//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：根据配置创建目录服务客户端和（需要时）LLM 客户端
//! 2. **模式选择**：多书文档 / 书本目录 / 查询检查 / 环境检查
//! 3. **批量处理**：委托 `BatchRunner` 分窗口处理
//! 4. **报告输出**：每次运行写一份带时间戳的报告
//!
//! 只有配置缺失、输入缺失这类问题会以 `Err` 返回；单本书的失败全部体现在报告里。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::{error, info, warn};

use crate::clients::{CatalogApi, CatalogClient, LlmClient};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::book::RawItem;
use crate::models::loaders::{load_book_folder, load_document};
use crate::models::outcome::RunSummary;
use crate::orchestrator::batch_processor::BatchRunner;
use crate::services::report_writer::{self, ReportKind, ReportWriter};
use crate::services::{document_parser, LlmQuizFormatter, QuizFormatter};
use crate::utils::logging::{log_startup, print_final_stats};
use crate::workflow::ItemFlow;

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 处理多书文档：解析 → 格式化 → 提交
    Batch,
    /// 处理书本目录，每个文件一本书
    Single,
    /// 只检查文档里的书名能否查到目录 ID
    Lookup,
    /// 检查配置和输入文件
    Check,
}

impl RunMode {
    fn needs_formatter(self) -> bool {
        matches!(self, RunMode::Batch | RunMode::Single)
    }

    fn label(self) -> &'static str {
        match self {
            RunMode::Batch => "多书文档处理模式",
            RunMode::Single => "书本目录处理模式",
            RunMode::Lookup => "书本 ID 查询检查模式",
            RunMode::Check => "环境检查模式",
        }
    }
}

/// 一次运行的产出
#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    /// 报告写入失败时为 `None`，运行结果本身仍然有效
    pub report_path: Option<PathBuf>,
}

/// 应用主结构
pub struct App {
    config: Config,
    catalog: Arc<dyn CatalogApi>,
    formatter: Option<Arc<dyn QuizFormatter>>,
    writer: ReportWriter,
}

impl App {
    /// 初始化应用
    ///
    /// 需要格式化的模式缺少 LLM key 时直接失败，不会处理任何书本。
    pub fn initialize(config: Config, mode: RunMode) -> AppResult<Self> {
        config.validate_pool();

        let catalog: Arc<dyn CatalogApi> = Arc::new(CatalogClient::new(&config)?);
        let formatter: Option<Arc<dyn QuizFormatter>> = if mode.needs_formatter() {
            let formatter: Arc<dyn QuizFormatter> =
                Arc::new(LlmQuizFormatter::new(LlmClient::new(&config)?));
            Some(formatter)
        } else {
            None
        };

        Ok(Self::with_services(config, catalog, formatter))
    }

    /// 使用现成的服务实现创建应用
    pub fn with_services(
        config: Config,
        catalog: Arc<dyn CatalogApi>,
        formatter: Option<Arc<dyn QuizFormatter>>,
    ) -> Self {
        let writer = ReportWriter::new(&config.results_dir);
        Self {
            config,
            catalog,
            formatter,
            writer,
        }
    }

    /// 运行应用主逻辑
    ///
    /// 环境检查模式不产生报告，返回 `None`。
    pub async fn run(&self, mode: RunMode) -> AppResult<Option<RunReport>> {
        match mode {
            RunMode::Batch => self.run_batch().await.map(Some),
            RunMode::Single => self.run_single().await.map(Some),
            RunMode::Lookup => self.run_lookup().await.map(Some),
            RunMode::Check => self.check().await.map(|_| None),
        }
    }

    async fn run_batch(&self) -> AppResult<RunReport> {
        log_startup(
            RunMode::Batch.label(),
            self.config.window_size,
            self.config.inter_batch_delay.as_millis(),
        );

        let items = self.load_composite().await?;
        let flow = self.full_flow()?;
        Ok(self
            .execute(
                items,
                flow,
                self.config.window_size,
                self.config.inter_batch_delay,
                ReportKind::MultipleBooks,
            )
            .await)
    }

    async fn run_single(&self) -> AppResult<RunReport> {
        log_startup(
            RunMode::Single.label(),
            1,
            self.config.single_item_delay.as_millis(),
        );

        info!("\n📁 正在扫描书本目录: {}", self.config.book_folder);
        let items = load_book_folder(Path::new(&self.config.book_folder)).await?;
        let flow = self.full_flow()?;
        Ok(self
            .execute(
                items,
                flow,
                1,
                self.config.single_item_delay,
                ReportKind::SingleBooks,
            )
            .await)
    }

    async fn run_lookup(&self) -> AppResult<RunReport> {
        log_startup(
            RunMode::Lookup.label(),
            1,
            self.config.lookup_delay.as_millis(),
        );

        let items = self.load_composite().await?;
        let flow = ItemFlow::resolve_only(self.catalog.clone());
        Ok(self
            .execute(
                items,
                flow,
                1,
                self.config.lookup_delay,
                ReportKind::LookupCheck,
            )
            .await)
    }

    /// 检查凭据和输入文件，有缺失时返回错误
    async fn check(&self) -> AppResult<()> {
        info!("{}", "=".repeat(60));
        info!("🔧 环境检查");
        info!("{}", "=".repeat(60));

        let mut problems: Vec<String> = Vec::new();

        info!("✓ AUTH_TOKEN 已配置");
        match self.config.require_llm_key() {
            Ok(_) => info!("✓ LLM API key 已配置 (模型: {})", self.config.llm_model_name),
            Err(e) => {
                warn!("❌ {}", e);
                problems.push(e.to_string());
            }
        }

        match load_document(Path::new(&self.config.input_file)).await {
            Ok(document) => {
                let items = document_parser::parse(&document);
                info!(
                    "✓ {} 中解析出 {} 本书",
                    self.config.input_file,
                    items.len()
                );
            }
            Err(e) => {
                warn!("❌ {}", e);
                problems.push(e.to_string());
            }
        }

        match load_book_folder(Path::new(&self.config.book_folder)).await {
            Ok(items) => {
                info!("✓ {} 中找到 {} 个书本文件:", self.config.book_folder, items.len());
                for item in &items {
                    if item.author.is_empty() {
                        info!("  📄 {}", item.title);
                    } else {
                        info!("  📄 {} (by {})", item.title, item.author);
                    }
                }
            }
            Err(e) => {
                warn!("❌ {}", e);
                problems.push(e.to_string());
            }
        }

        if problems.is_empty() {
            info!("✅ 环境检查通过");
            Ok(())
        } else {
            error!("❌ 环境检查发现 {} 个问题", problems.len());
            Err(AppError::Other(format!(
                "setup check failed: {}",
                problems.join("; ")
            )))
        }
    }

    /// 读取并解析多书文档
    async fn load_composite(&self) -> AppResult<Vec<RawItem>> {
        info!("\n📁 正在读取文档: {}", self.config.input_file);
        let document = load_document(Path::new(&self.config.input_file)).await?;
        let items = document_parser::parse(&document);
        if items.is_empty() {
            warn!("⚠️ 文档中没有识别出任何书本");
        }
        Ok(items)
    }

    fn full_flow(&self) -> AppResult<ItemFlow> {
        let formatter = self
            .formatter
            .clone()
            .ok_or_else(|| AppError::missing_env("LLM_API_KEY"))?;
        Ok(ItemFlow::new(self.catalog.clone(), formatter))
    }

    /// 分窗口处理并写报告
    ///
    /// 所有窗口结束后运行即算完成；报告写入失败只记录错误。
    async fn execute(
        &self,
        items: Vec<RawItem>,
        flow: ItemFlow,
        window_size: usize,
        delay: Duration,
        kind: ReportKind,
    ) -> RunReport {
        let runner = BatchRunner::new(Arc::new(flow), self.config.session_timeout);
        let summary = runner.run(items.clone(), window_size, delay).await;

        let generated_at = Local::now();
        let report_path = self.writer.report_path(kind, &generated_at);
        let report = report_writer::render(&summary, &items, kind, &generated_at, &report_path);
        let report_path = match self.writer.write(&report_path, &report).await {
            Ok(()) => Some(report_path),
            Err(e) => {
                error!("❌ 报告保存失败: {}", e);
                None
            }
        };

        print_final_stats(
            summary.successful(),
            summary.failed(),
            summary.total(),
            report_path.as_deref(),
        );

        RunReport {
            summary,
            report_path,
        }
    }
}
