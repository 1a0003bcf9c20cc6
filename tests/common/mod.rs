// 集成测试公共模块
//
// 提供 HTML 构造、可编排的假改写服务和断言助手

use std::cell::{Cell, RefCell};
use std::time::Duration;

use markup5ever_rcdom::RcDom;

use reprose::parsers::html::dom::str_to_dom;
use reprose::rewrite::{RewriteConfig, RewriteError, RewriteResult, SegmentRewriter};

/// HTML 测试助手
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    pub fn create_test_dom(html: &str) -> RcDom {
        str_to_dom(html)
    }

    /// n 个段落，每段一个可改写的文本节点
    pub fn paragraphs(n: usize) -> String {
        (0..n)
            .map(|i| format!("<p>Paragraph number {i} text</p>"))
            .collect()
    }

    /// 带链接、引用和代码块的文章片段
    pub fn article() -> String {
        r##"<h2>History</h2>
<p>The river <a href="/wiki/Thames">Thames</a> flows east.<sup class="reference"><a href="#cite-1">[1]</a></sup></p>
<pre>let x = 1;</pre>
<p>Many people live nearby.</p>"##
            .to_string()
    }
}

/// 假改写服务对每个请求的响应方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// 每个片段改写为 "[去掉首尾空白的原文]"
    Bracket,
    /// 每次都返回传输错误
    AlwaysFail,
    /// 返回少一个片段的结果
    DropLast,
}

/// 可编排的假改写服务
///
/// 请求中只要有片段包含 `poison` 子串就永远不返回，交给调用器的超时处理。
pub struct ScriptedRewriter {
    behaviour: Behaviour,
    poison: Option<String>,
    latency: Duration,
    in_flight: Cell<usize>,
    max_in_flight: Cell<usize>,
    requests: RefCell<Vec<Vec<String>>>,
    directives: RefCell<Vec<Option<String>>>,
}

impl ScriptedRewriter {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            poison: None,
            latency: Duration::ZERO,
            in_flight: Cell::new(0),
            max_in_flight: Cell::new(0),
            requests: RefCell::new(Vec::new()),
            directives: RefCell::new(Vec::new()),
        }
    }

    pub fn with_poison(mut self, marker: &str) -> Self {
        self.poison = Some(marker.to_string());
        self
    }

    /// 每个请求的延迟；第 n 个请求等待 latency * (n % 3 + 1)，让批次乱序完成
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.borrow().clone()
    }

    pub fn request_sizes(&self) -> Vec<usize> {
        self.requests.borrow().iter().map(Vec::len).collect()
    }

    pub fn directives(&self) -> Vec<Option<String>> {
        self.directives.borrow().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.get()
    }
}

/// 请求结束（包括被超时丢弃）时减少在途计数
struct InFlightGuard<'a>(&'a Cell<usize>);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl SegmentRewriter for ScriptedRewriter {
    async fn rewrite_segments(
        &self,
        segments: &[String],
        directive: Option<&str>,
    ) -> RewriteResult<Vec<String>> {
        let ordinal = {
            let mut requests = self.requests.borrow_mut();
            requests.push(segments.to_vec());
            requests.len() - 1
        };
        self.directives
            .borrow_mut()
            .push(directive.map(str::to_string));

        self.in_flight.set(self.in_flight.get() + 1);
        self.max_in_flight
            .set(self.max_in_flight.get().max(self.in_flight.get()));
        let _guard = InFlightGuard(&self.in_flight);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency * (ordinal % 3 + 1) as u32).await;
        }

        if let Some(marker) = &self.poison {
            if segments.iter().any(|s| s.contains(marker.as_str())) {
                std::future::pending::<()>().await;
            }
        }

        match self.behaviour {
            Behaviour::Bracket => Ok(segments
                .iter()
                .map(|s| format!("[{}]", s.trim()))
                .collect()),
            Behaviour::AlwaysFail => Err(RewriteError::TransportError(
                "connection refused".to_string(),
            )),
            Behaviour::DropLast => {
                let mut out: Vec<String> = segments.to_vec();
                out.pop();
                Ok(out)
            }
        }
    }
}

/// 测试配置
pub fn test_config(batch_size: usize, max_concurrency: usize) -> RewriteConfig {
    RewriteConfig {
        batch_size,
        max_concurrency,
        ..RewriteConfig::default()
    }
}

/// 断言助手
pub struct AssertionHelper;

impl AssertionHelper {
    /// 进度序列单调不减，且以 100 结尾
    pub fn assert_progress_complete(progress: &[u8]) {
        assert!(!progress.is_empty(), "progress callback never fired");
        assert!(
            progress.windows(2).all(|w| w[0] <= w[1]),
            "progress went backwards: {:?}",
            progress
        );
        assert_eq!(progress.last(), Some(&100), "progress: {:?}", progress);
        assert_eq!(
            progress.iter().filter(|&&p| p == 100).count(),
            1,
            "100 reported before the queue drained: {:?}",
            progress
        );
    }
}
