//! # Book Quiz Submit
//!
//! 把一份多书测验文档批量整理成结构化测验并提交到目录服务的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 网络适配，只暴露能力
//! - `CatalogClient` - 按标题查询书本、创建测验
//! - `LlmClient` - 聊天补全调用
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单本书
//! - `document_parser` - 把文档切成书本
//! - `TitleResolver` - 书名 → 目录 ID
//! - `QuizFormatter` - 原始测验文本 → 结构化测验
//! - `report_writer` - 汇总和报告
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一本书"的完整处理流程
//! - `ItemCtx` - 日志上下文
//! - `ItemFlow` - 流程编排（resolve → format → submit）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 窗口并发、屏障、批次间隔
//! - `orchestrator/app` - 初始化、模式选择、报告输出

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{CatalogApi, LookupResponse, SubmitResponse};
pub use config::Config;
pub use error::{AppError, AppResult, FailureKind, FormatError, ItemError};
pub use models::{CatalogMatch, ItemOutcome, RawItem, RunSummary, Stage, StructuredQuiz};
pub use orchestrator::{App, BatchRunner, RunMode, RunReport};
pub use services::QuizFormatter;
pub use workflow::{ItemCtx, ItemFlow};
