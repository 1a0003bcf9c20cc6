//! 改写调用器
//!
//! 向改写服务发送一个批次；失败时从中点二分，分别重试两半，直到单个片段为止。
//! 传输、超时、协议、片段数不一致都被视为同一种失败，只在日志里区分。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture};
use tokio::time::timeout;

use crate::rewrite::core::client::SegmentRewriter;
use crate::rewrite::error::{RewriteError, RewriteResult};

/// 调用统计
#[derive(Debug, Default)]
pub struct InvokerStats {
    requests: AtomicUsize,
    failed_requests: AtomicUsize,
    bisections: AtomicUsize,
}

impl InvokerStats {
    pub fn snapshot(&self) -> InvokerStatsSnapshot {
        InvokerStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            bisections: self.bisections.load(Ordering::Relaxed),
        }
    }
}

/// 调用统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvokerStatsSnapshot {
    /// 发出的请求数
    pub requests: usize,
    /// 失败的请求数
    pub failed_requests: usize,
    /// 二分次数
    pub bisections: usize,
}

/// 改写调用器
///
/// 借用后端与引导语，一次改写运行内共用。
pub struct RewriteInvoker<'a, R: SegmentRewriter> {
    backend: &'a R,
    directive: Option<&'a str>,
    request_timeout: Duration,
    stats: InvokerStats,
}

impl<'a, R: SegmentRewriter> RewriteInvoker<'a, R> {
    pub fn new(backend: &'a R, directive: Option<&'a str>, request_timeout: Duration) -> Self {
        Self {
            backend,
            directive,
            request_timeout,
            stats: InvokerStats::default(),
        }
    }

    pub fn stats(&self) -> &InvokerStats {
        &self.stats
    }

    /// 改写一组片段
    ///
    /// 返回与输入等长、同序的结果；只要有一个片段最终无法改写就返回 `None`。
    pub async fn rewrite(&self, segments: &[String]) -> Option<Vec<String>> {
        self.rewrite_partial(segments).await.into_iter().collect()
    }

    /// 改写一组片段，逐个返回结果
    ///
    /// 结果长度总是等于输入长度。第 i 项为 `None` 表示第 i 个片段在单独请求时仍然失败。
    pub async fn rewrite_partial(&self, segments: &[String]) -> Vec<Option<String>> {
        let mut results = Vec::with_capacity(segments.len());
        if !segments.is_empty() {
            self.bisect_into(segments, 0, &mut results).await;
        }
        debug_assert_eq!(results.len(), segments.len());
        results
    }

    fn bisect_into<'b>(
        &'b self,
        segments: &'b [String],
        depth: usize,
        results: &'b mut Vec<Option<String>>,
    ) -> LocalBoxFuture<'b, ()> {
        async move {
            let error = match self.attempt(segments).await {
                Ok(rewritten) => {
                    results.extend(rewritten.into_iter().map(Some));
                    return;
                }
                Err(error) => error,
            };

            tracing::warn!(
                category = %error.category(),
                depth,
                segments = segments.len(),
                "改写请求失败: {}",
                error
            );

            if segments.len() == 1 {
                results.push(None);
                return;
            }

            self.stats.bisections.fetch_add(1, Ordering::Relaxed);
            let (left, right) = segments.split_at(segments.len() / 2);
            self.bisect_into(left, depth + 1, results).await;
            self.bisect_into(right, depth + 1, results).await;
        }
        .boxed_local()
    }

    /// 单次请求：超时控制 + 片段数检查
    async fn attempt(&self, segments: &[String]) -> RewriteResult<Vec<String>> {
        self.stats.requests.fetch_add(1, Ordering::Relaxed);

        let result = self.request(segments).await;
        if result.is_err() {
            self.stats.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    async fn request(&self, segments: &[String]) -> RewriteResult<Vec<String>> {
        let rewritten = timeout(
            self.request_timeout,
            self.backend.rewrite_segments(segments, self.directive),
        )
        .await??;

        // 数量不一致不做补齐或截断
        if rewritten.len() != segments.len() {
            return Err(RewriteError::ContractError {
                expected: segments.len(),
                actual: rewritten.len(),
            });
        }

        Ok(rewritten)
    }
}
