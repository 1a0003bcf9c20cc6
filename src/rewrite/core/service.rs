//! 改写服务核心实现
//!
//! 本模块是改写子系统的入口，把片段收集、批次切分、并发调度串成一条管道：
//!
//! 文档树 → 收集器 → 有序片段 → 批次管理器 → 批次队列 → 处理器（W 个 worker）
//! → 改写服务或本地兜底 → 空白修复 → 写回原位置 → 结果分级
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use reprose::rewrite::{RewriteConfig, RewriteService};
//!
//! # async fn run() -> reprose::rewrite::RewriteResult<()> {
//! let service = RewriteService::new(RewriteConfig::default())?;
//! let rewritten = service
//!     .rewrite_html_fragment("<p>A very important town.</p>", |p| eprintln!("{p}%"))
//!     .await?;
//! println!("{} ({})", rewritten.html, rewritten.mode);
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use markup5ever_rcdom::{Handle, RcDom};

use crate::parsers::html::dom::{find_element_by_id, html_to_dom_detect, str_to_dom};
use crate::parsers::html::serializer::{serialize_children, serialize_document};
use crate::rewrite::config::{constants, RewriteConfig};
use crate::rewrite::core::client::{HttpRewriteClient, SegmentRewriter};
use crate::rewrite::core::outcome::RewriteMode;
use crate::rewrite::core::processor::{ProcessorConfig, RewriteProcessor, RunCounters};
use crate::rewrite::error::{RewriteError, RewriteResult};
use crate::rewrite::pipeline::batch::{BatchManager, BatchManagerConfig};
use crate::rewrite::pipeline::collector::{CollectorConfig, TextCollector};
use crate::rewrite::pipeline::filters::TextFilter;

/// 片段改写时包裹 HTML 片段的容器 id
const FRAGMENT_CONTAINER_ID: &str = "content";

/// 统一的改写服务
///
/// 每次调用都是一次独立的运行：计数器、批次队列都在调用内部创建，运行之间只共享
/// `ServiceStats` 这类诊断数据。
pub struct RewriteService<R = HttpRewriteClient> {
    config: RewriteConfig,
    collector_config: CollectorConfig,
    filter: TextFilter,
    batch_manager: BatchManager,
    processor: RewriteProcessor<R>,
    stats: ServiceStats,
}

impl RewriteService<HttpRewriteClient> {
    /// 使用 HTTP 改写服务创建实例
    pub fn new(config: RewriteConfig) -> RewriteResult<Self> {
        config.validate()?;
        let client = HttpRewriteClient::from_config(&config)?;
        Ok(Self::with_backend(config, client))
    }

    /// 按默认配置来源（配置文件、环境变量）创建实例
    pub fn create_default(api_url: Option<&str>) -> RewriteResult<Self> {
        Self::new(crate::rewrite::config::load_rewrite_config(api_url))
    }
}

impl<R: SegmentRewriter> RewriteService<R> {
    /// 使用任意改写后端创建实例
    ///
    /// 批次大小超过服务上限时按上限处理。
    pub fn with_backend(mut config: RewriteConfig, backend: R) -> Self {
        if config.batch_size > constants::MAX_SERVICE_SEGMENTS {
            tracing::warn!(
                "批次大小 {} 超过服务上限，改为 {}",
                config.batch_size,
                constants::MAX_SERVICE_SEGMENTS
            );
            config.batch_size = constants::MAX_SERVICE_SEGMENTS;
        }

        let batch_manager = BatchManager::new(BatchManagerConfig::from(&config));
        let processor = RewriteProcessor::new(backend, ProcessorConfig::from(&config));

        Self {
            config,
            collector_config: CollectorConfig::default(),
            filter: TextFilter::default(),
            batch_manager,
            processor,
            stats: ServiceStats::default(),
        }
    }

    /// 替换片段过滤规则
    pub fn with_filter(mut self, filter: TextFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    pub fn backend(&self) -> &R {
        self.processor.backend()
    }

    /// 改写一棵子树内的正文
    ///
    /// 不会因为改写服务失败而出错；最坏情况下所有片段都使用本地兜底。
    pub async fn rewrite_node<F>(&self, root: &Handle, on_progress: F) -> RewriteReport
    where
        F: Fn(u8),
    {
        let start = Instant::now();

        let mut collector = TextCollector::new(self.collector_config.clone(), self.filter.clone());
        let candidates = collector.collect_candidates(root);
        let candidate_count = candidates.len();
        self.stats.add_candidates(candidate_count);

        if candidates.is_empty() {
            tracing::info!("没有找到可改写的文本");
            let report = RewriteReport::from_counters(RunCounters::default(), 0, start.elapsed());
            self.stats.record_run(&report);
            return report;
        }

        let batches = self.batch_manager.create_batches(candidates);
        tracing::info!(
            "收集到 {} 个片段，分为 {} 个批次",
            candidate_count,
            batches.len()
        );

        let counters = self.processor.process_batches(batches, on_progress).await;
        let report = RewriteReport::from_counters(counters, candidate_count, start.elapsed());

        tracing::info!(
            "改写完成: 模式 {}，耗时 {:.2} 秒",
            report.mode,
            report.elapsed.as_secs_f64()
        );
        self.stats.record_run(&report);

        report
    }

    /// 改写整个 DOM
    pub async fn rewrite_dom<F>(&self, dom: RcDom, on_progress: F) -> (RcDom, RewriteReport)
    where
        F: Fn(u8),
    {
        let report = self.rewrite_node(&dom.document, on_progress).await;
        (dom, report)
    }

    /// 改写一段文章 HTML
    ///
    /// 片段被包进 `<article id="content">` 后解析，只改写容器内部，返回容器的 innerHTML。
    /// 没有可改写内容时原样返回输入。
    pub async fn rewrite_html_fragment<F>(
        &self,
        html: &str,
        on_progress: F,
    ) -> RewriteResult<RewrittenDocument>
    where
        F: Fn(u8),
    {
        let wrapped = format!(
            r#"<article id="{}">{}</article>"#,
            FRAGMENT_CONTAINER_ID, html
        );
        let dom = str_to_dom(&wrapped);
        let container = find_element_by_id(&dom.document, FRAGMENT_CONTAINER_ID)
            .ok_or_else(|| RewriteError::ParseError("无法定位文章容器".to_string()))?;

        let report = self.rewrite_node(&container, on_progress).await;
        if report.candidates == 0 {
            return Ok(RewrittenDocument {
                html: html.to_string(),
                mode: report.mode,
                report,
            });
        }

        let html = serialize_children(&container)
            .map_err(|e| RewriteError::SerializationError(format!("序列化片段失败: {}", e)))?;

        Ok(RewrittenDocument {
            html,
            mode: report.mode,
            report,
        })
    }

    /// 改写完整 HTML 文档
    ///
    /// 文档 meta 声明了字符集时按声明解码，否则按 `default_encoding`；输出使用同一编码。
    pub async fn rewrite_html_document<F>(
        &self,
        data: &[u8],
        default_encoding: &str,
        on_progress: F,
    ) -> RewriteResult<(Vec<u8>, RewriteReport)>
    where
        F: Fn(u8),
    {
        let (dom, encoding) = html_to_dom_detect(data, default_encoding);
        let (dom, report) = self.rewrite_dom(dom, on_progress).await;
        let output = serialize_document(&dom, &encoding)
            .map_err(|e| RewriteError::SerializationError(format!("序列化文档失败: {}", e)))?;
        Ok((output, report))
    }

    pub fn get_stats(&self) -> &ServiceStats {
        &self.stats
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

/// 一次改写运行的报告
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteReport {
    pub mode: RewriteMode,
    pub candidates: usize,
    pub batches: usize,
    pub successful_batches: usize,
    pub failed_batches: usize,
    pub rewritten_segments: usize,
    pub fallback_segments: usize,
    pub requests: usize,
    pub failed_requests: usize,
    pub bisections: usize,
    pub elapsed: Duration,
}

impl RewriteReport {
    fn from_counters(counters: RunCounters, candidates: usize, elapsed: Duration) -> Self {
        Self {
            mode: counters.mode(),
            candidates,
            batches: counters.total_batches,
            successful_batches: counters.successful_batches,
            failed_batches: counters.failed_batches,
            rewritten_segments: counters.rewritten_segments,
            fallback_segments: counters.fallback_segments,
            requests: counters.invoker.requests,
            failed_requests: counters.invoker.failed_requests,
            bisections: counters.invoker.bisections,
            elapsed,
        }
    }
}

/// 改写后的 HTML 片段
#[derive(Debug, Clone)]
pub struct RewrittenDocument {
    pub html: String,
    pub mode: RewriteMode,
    pub report: RewriteReport,
}

/// 服务统计信息
///
/// 跨运行累计，只用于诊断。
#[derive(Debug, Default)]
pub struct ServiceStats {
    runs: AtomicUsize,
    candidates_collected: AtomicUsize,
    batches_created: AtomicUsize,
    successful_batches: AtomicUsize,
    failed_batches: AtomicUsize,
    rewritten_segments: AtomicUsize,
    fallback_segments: AtomicUsize,
    /// 处理时间（微秒）
    processing_time: AtomicU64,
}

impl ServiceStats {
    fn add_candidates(&self, count: usize) {
        self.candidates_collected
            .fetch_add(count, Ordering::Relaxed);
    }

    fn record_run(&self, report: &RewriteReport) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.batches_created
            .fetch_add(report.batches, Ordering::Relaxed);
        self.successful_batches
            .fetch_add(report.successful_batches, Ordering::Relaxed);
        self.failed_batches
            .fetch_add(report.failed_batches, Ordering::Relaxed);
        self.rewritten_segments
            .fetch_add(report.rewritten_segments, Ordering::Relaxed);
        self.fallback_segments
            .fetch_add(report.fallback_segments, Ordering::Relaxed);
        self.processing_time
            .fetch_add(report.elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        for counter in [
            &self.runs,
            &self.candidates_collected,
            &self.batches_created,
            &self.successful_batches,
            &self.failed_batches,
            &self.rewritten_segments,
            &self.fallback_segments,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.processing_time.store(0, Ordering::Relaxed);
    }

    /// 获取统计数据快照
    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        ServiceStatsSnapshot {
            runs: self.runs.load(Ordering::Relaxed),
            candidates_collected: self.candidates_collected.load(Ordering::Relaxed),
            batches_created: self.batches_created.load(Ordering::Relaxed),
            successful_batches: self.successful_batches.load(Ordering::Relaxed),
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
            rewritten_segments: self.rewritten_segments.load(Ordering::Relaxed),
            fallback_segments: self.fallback_segments.load(Ordering::Relaxed),
            processing_time: Duration::from_micros(self.processing_time.load(Ordering::Relaxed)),
        }
    }
}

/// 服务统计数据的快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStatsSnapshot {
    pub runs: usize,
    pub candidates_collected: usize,
    pub batches_created: usize,
    pub successful_batches: usize,
    pub failed_batches: usize,
    pub rewritten_segments: usize,
    pub fallback_segments: usize,
    pub processing_time: Duration,
}

impl ServiceStatsSnapshot {
    /// 由改写服务完成的片段占比
    pub fn service_ratio(&self) -> f64 {
        let total = self.rewritten_segments + self.fallback_segments;
        if total == 0 {
            0.0
        } else {
            self.rewritten_segments as f64 / total as f64
        }
    }
}
