//! 日志工具模块
//!
//! 初始化 tracing 订阅者，并提供批次进度和最终统计的输出辅助函数

use std::path::Path;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 默认级别为 info，可通过 `RUST_LOG` 覆盖。重复调用不会报错。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(mode: &str, window_size: usize, inter_batch_delay_ms: u128) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", mode);
    info!(
        "📊 每批 {} 本，批次间隔 {}ms",
        window_size, inter_batch_delay_ms
    );
    info!("{}", "=".repeat(60));
}

/// 记录书本加载信息
pub fn log_items_loaded(total: usize, window_size: usize) {
    info!("✓ 找到 {} 本待处理的书", total);
    info!("📋 将以每批 {} 本的方式处理", window_size);
    info!("💡 每批完成后再开始下一批\n");
}

/// 记录批次开始信息
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批书本: {}-{} / 共 {} 本", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(success: usize, failed: usize, total: usize, report_path: Option<&Path>) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    match report_path {
        Some(path) => info!("\n报告已保存至: {}", path.display()),
        None => warn!("\n⚠️ 报告未能保存"),
    }
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
