//! 改写处理器模块
//!
//! 在一个任务上运行 W 个逻辑 worker，从共享队列里取批次，调用改写服务，
//! 把结果写回文档并报告进度。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;

use crate::rewrite::config::{constants, RewriteConfig};
use crate::rewrite::core::client::SegmentRewriter;
use crate::rewrite::core::invoker::{InvokerStatsSnapshot, RewriteInvoker};
use crate::rewrite::core::outcome::RewriteMode;
use crate::rewrite::pipeline::batch::Batch;
use crate::rewrite::pipeline::heuristic::heuristic_rewrite;
use crate::rewrite::pipeline::whitespace::reconcile_whitespace;

/// 处理器配置
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// 同时在途的请求上限
    pub max_concurrency: usize,
    /// 单次请求超时
    pub request_timeout: Duration,
    /// 整次运行共用的引导语
    pub directive: Option<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: constants::DEFAULT_MAX_CONCURRENCY,
            request_timeout: constants::DEFAULT_REQUEST_TIMEOUT,
            directive: None,
        }
    }
}

impl From<&RewriteConfig> for ProcessorConfig {
    fn from(config: &RewriteConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            request_timeout: config.request_timeout(),
            directive: config.directive.clone(),
        }
    }
}

/// 一次运行的计数结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub total_batches: usize,
    pub completed_batches: usize,
    pub successful_batches: usize,
    pub failed_batches: usize,
    pub rewritten_segments: usize,
    pub fallback_segments: usize,
    pub invoker: InvokerStatsSnapshot,
}

impl RunCounters {
    pub fn mode(&self) -> RewriteMode {
        RewriteMode::classify(self.successful_batches, self.failed_batches)
    }
}

/// 单次改写运行的共享状态
///
/// 批次队列只会被 `fetch_add` 游标消费，每个批次恰好被一个 worker 取到。
/// `total_batches` 在调度前固定，作为进度的分母。
#[derive(Debug)]
pub struct PipelineRun {
    batches: Vec<Batch>,
    cursor: AtomicUsize,
    total_batches: usize,
    completed: AtomicUsize,
    successful: AtomicUsize,
    failed: AtomicUsize,
    rewritten_segments: AtomicUsize,
    fallback_segments: AtomicUsize,
}

impl PipelineRun {
    pub fn new(batches: Vec<Batch>) -> Self {
        let total_batches = batches.len();
        Self {
            batches,
            cursor: AtomicUsize::new(0),
            total_batches,
            completed: AtomicUsize::new(0),
            successful: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            rewritten_segments: AtomicUsize::new(0),
            fallback_segments: AtomicUsize::new(0),
        }
    }

    pub fn total_batches(&self) -> usize {
        self.total_batches
    }

    /// 取下一个批次
    fn next_batch(&self) -> Option<&Batch> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.batches.get(index)
    }

    /// 记录一个批次的结果，返回完成后的进度百分比
    ///
    /// 全部片段由服务改写记为成功，一个都没有记为失败，两者都有时两边各记一次。
    fn record_batch(&self, rewritten: usize, fallback: usize) -> u8 {
        if rewritten > 0 {
            self.successful.fetch_add(1, Ordering::Relaxed);
        }
        if fallback > 0 || rewritten == 0 {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.rewritten_segments
            .fetch_add(rewritten, Ordering::Relaxed);
        self.fallback_segments.fetch_add(fallback, Ordering::Relaxed);

        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        progress_percent(completed, self.total_batches)
    }

    pub fn counters(&self) -> RunCounters {
        RunCounters {
            total_batches: self.total_batches,
            completed_batches: self.completed.load(Ordering::Relaxed),
            successful_batches: self.successful.load(Ordering::Relaxed),
            failed_batches: self.failed.load(Ordering::Relaxed),
            rewritten_segments: self.rewritten_segments.load(Ordering::Relaxed),
            fallback_segments: self.fallback_segments.load(Ordering::Relaxed),
            invoker: InvokerStatsSnapshot::default(),
        }
    }
}

/// floor(completed * 100 / total)
fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (completed.min(total) * 100 / total) as u8
}

/// 改写处理器
pub struct RewriteProcessor<R> {
    backend: R,
    config: ProcessorConfig,
}

impl<R: SegmentRewriter> RewriteProcessor<R> {
    pub fn new(backend: R, config: ProcessorConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &R {
        &self.backend
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// 处理全部批次直到队列清空
    ///
    /// 不会返回错误：每个片段最终要么写入服务的改写结果，要么写入本地兜底结果。
    /// `on_progress` 在每个批次完成后收到一个单调不减的百分比，最后一次为 100。
    pub async fn process_batches<F>(&self, batches: Vec<Batch>, on_progress: F) -> RunCounters
    where
        F: Fn(u8),
    {
        let run = PipelineRun::new(batches);
        if run.total_batches() == 0 {
            tracing::info!("没有批次需要处理");
            return run.counters();
        }

        let workers = self.config.max_concurrency.max(1).min(run.total_batches());
        let invoker = RewriteInvoker::new(
            &self.backend,
            self.config.directive.as_deref(),
            self.config.request_timeout,
        );

        tracing::info!(
            "开始处理 {} 个批次（{} 个 worker）",
            run.total_batches(),
            workers
        );

        let on_progress = &on_progress;
        join_all((0..workers).map(|worker| Self::run_worker(worker, &run, &invoker, on_progress)))
            .await;

        let mut counters = run.counters();
        counters.invoker = invoker.stats().snapshot();

        tracing::info!(
            "批次处理完成: 成功 {}，失败 {}，服务改写 {} 个片段，兜底 {} 个片段",
            counters.successful_batches,
            counters.failed_batches,
            counters.rewritten_segments,
            counters.fallback_segments
        );

        counters
    }

    async fn run_worker<F>(
        worker: usize,
        run: &PipelineRun,
        invoker: &RewriteInvoker<'_, R>,
        on_progress: &F,
    ) where
        F: Fn(u8),
    {
        while let Some(batch) = run.next_batch() {
            tracing::debug!(worker, "{}", batch.summary());

            let results = invoker.rewrite_partial(&batch.texts()).await;

            let mut rewritten = 0;
            for (item, result) in batch.items.iter().zip(results) {
                let value = match result {
                    Some(rewrite) => {
                        rewritten += 1;
                        reconcile_whitespace(&item.text, &rewrite)
                    }
                    None => heuristic_rewrite(&item.text),
                };

                if !item.write(&value) {
                    tracing::debug!("文本节点已不存在，跳过写入");
                }
            }

            let fallback = batch.len() - rewritten;
            if fallback > 0 {
                tracing::debug!(
                    worker,
                    "批次 #{} 有 {} 个片段使用本地兜底",
                    batch.index + 1,
                    fallback
                );
            }

            let percent = run.record_batch(rewritten, fallback);
            on_progress(percent);
        }
    }
}
