//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 根据配置创建客户端和服务
//! - 选择运行模式，加载书本
//! - 写入运行报告
//!
//! ### `batch_processor` - 批量处理器
//! - 按窗口并发处理书本
//! - 窗口之间等待屏障和批次间隔
//! - 任务 panic 也转换成结果记录
//!
//! ## 层次关系
//!
//! ```text
//! app (加载 Vec<RawItem>，写报告)
//!     ↓
//! batch_processor (窗口调度)
//!     ↓
//! workflow::ItemFlow (处理单本书)
//!     ↓
//! services (能力层：parse / resolve / format / report)
//!     ↓
//! clients (目录服务 / LLM)
//! ```

pub mod app;
pub mod batch_processor;

pub use app::{App, RunMode, RunReport};
pub use batch_processor::BatchRunner;
