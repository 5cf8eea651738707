//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 把书本按文档顺序切成固定大小的窗口：
//!
//! 1. **窗口内并发**：每本书一个 tokio 任务
//! 2. **窗口屏障**：本窗口所有任务结束后才开始下一个窗口
//! 3. **批次间隔**：两个窗口之间等待固定时间，最后一个窗口之后不等待
//! 4. **失败隔离**：单本书的失败（包括任务 panic）只影响它自己的结果
//!
//! 每本书恰好产生一个 `ItemOutcome`。

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{error, info};

use crate::error::ItemError;
use crate::models::book::RawItem;
use crate::models::outcome::{ItemOutcome, RunSummary};
use crate::services::report_writer;
use crate::utils::logging::{log_batch_complete, log_batch_start, log_items_loaded};
use crate::workflow::ItemFlow;

/// 批量处理器
pub struct BatchRunner {
    flow: Arc<ItemFlow>,
    session_timeout: Duration,
}

impl BatchRunner {
    /// `session_timeout` 从 `run` 开始计时，覆盖本次运行的全部网络阶段
    pub fn new(flow: Arc<ItemFlow>, session_timeout: Duration) -> Self {
        Self {
            flow,
            session_timeout,
        }
    }

    /// 分窗口处理全部书本
    pub async fn run(
        &self,
        items: Vec<RawItem>,
        window_size: usize,
        inter_batch_delay: Duration,
    ) -> RunSummary {
        let window_size = window_size.max(1);
        let total = items.len();
        let deadline = Instant::now() + self.session_timeout;

        if total == 0 {
            return report_writer::summarize(Vec::new());
        }

        log_items_loaded(total, window_size);

        let total_batches = total.div_ceil(window_size);
        let mut outcomes = Vec::with_capacity(total);

        for (batch_idx, window) in items.chunks(window_size).enumerate() {
            let batch_num = batch_idx + 1;
            let start = batch_idx * window_size + 1;
            log_batch_start(batch_num, total_batches, start, start + window.len() - 1, total);

            let batch_outcomes = self.run_window(window, deadline).await;
            let success = batch_outcomes.iter().filter(|o| o.is_success()).count();
            log_batch_complete(batch_num, success, batch_outcomes.len());
            outcomes.extend(batch_outcomes);

            if batch_num < total_batches && !inter_batch_delay.is_zero() {
                info!(
                    "⏳ 等待 {}ms 后开始下一批...",
                    inter_batch_delay.as_millis()
                );
                tokio::time::sleep(inter_batch_delay).await;
            }
        }

        report_writer::summarize(outcomes)
    }

    /// 处理单个窗口，全部任务结束后返回
    async fn run_window(&self, window: &[RawItem], deadline: Instant) -> Vec<ItemOutcome> {
        let handles: Vec<_> = window
            .iter()
            .cloned()
            .map(|item| {
                let flow = self.flow.clone();
                let sequence_no = item.sequence_no;
                let handle = tokio::spawn(async move { flow.run(&item, deadline).await });
                (sequence_no, handle)
            })
            .collect();

        let (sequence_nos, handles): (Vec<usize>, Vec<_>) = handles.into_iter().unzip();
        let results = join_all(handles).await;

        sequence_nos
            .into_iter()
            .zip(results)
            .map(|(sequence_no, result)| match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("[#{}] 任务执行失败: {}", sequence_no, e);
                    ItemOutcome::failure(sequence_no, None, None, &ItemError::Aborted(e.to_string()))
                }
            })
            .collect()
    }
}
