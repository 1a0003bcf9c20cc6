//! 错误处理集成测试
//!
//! 用 wiremock 模拟改写服务，检查客户端如何把各种异常响应归类，
//! 以及服务层在这些异常下是否仍然给每个片段一个结果

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reprose::rewrite::{
    ErrorCategory, HttpRewriteClient, RewriteConfig, RewriteError, RewriteMode, RewriteService,
    SegmentRewriter,
};

const ENDPOINT: &str = "/api/rewrite";

fn segments(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

async fn client_for(server: &MockServer) -> HttpRewriteClient {
    HttpRewriteClient::new(format!("{}{}", server.uri(), ENDPOINT)).unwrap()
}

fn config_for(server: &MockServer) -> RewriteConfig {
    RewriteConfig {
        api_url: format!("{}{}", server.uri(), ENDPOINT),
        ..RewriteConfig::default()
    }
}

/// 正常响应：请求体包含片段和引导语
#[tokio::test]
async fn test_successful_request_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_json(json!({
            "segments": ["one", "two"],
            "opinion": "calm"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "segments": ["ONE", "TWO"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let out = client
        .rewrite_segments(&segments(&["one", "two"]), Some("calm"))
        .await
        .unwrap();

    assert_eq!(out, vec!["ONE", "TWO"]);
    println!("✅ request carried segments and directive");
}

/// 非 2xx 状态码是协议错误，消息里带状态码和响应体开头
#[tokio::test]
async fn test_server_error_is_protocol_failure() {
    let server = MockServer::start().await;
    let long_body = "x".repeat(1000);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string(long_body))
        .mount(&server)
        .await;

    let error = client_for(&server)
        .await
        .rewrite_segments(&segments(&["one"]), None)
        .await
        .unwrap_err();

    assert_eq!(error.category(), ErrorCategory::Protocol);
    let message = error.to_string();
    assert!(message.contains("500"), "{message}");
    assert!(!message.contains(&"x".repeat(301)), "body preview not truncated");
    println!("✅ 500 -> {}", error.category());
}

/// 响应体不是 JSON、或缺少 segments 数组
#[tokio::test]
async fn test_unparsable_bodies_are_protocol_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/not-json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/no-segments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "ok" })))
        .mount(&server)
        .await;

    for route in ["/not-json", "/no-segments"] {
        let client = HttpRewriteClient::new(format!("{}{}", server.uri(), route)).unwrap();
        let error = client
            .rewrite_segments(&segments(&["one"]), None)
            .await
            .unwrap_err();
        assert!(
            matches!(error, RewriteError::ProtocolError(_)),
            "{route}: {error:?}"
        );
        println!("✅ {route} -> {}", error);
    }
}

/// 数组中的非字符串元素被转成字符串
#[tokio::test]
async fn test_non_string_segments_are_stringified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "segments": ["text", 7, true]
        })))
        .mount(&server)
        .await;

    let out = client_for(&server)
        .await
        .rewrite_segments(&segments(&["a", "b", "c"]), None)
        .await
        .unwrap();
    assert_eq!(out, vec!["text", "7", "true"]);
}

/// 客户端不检查数量；调用器发现不一致后二分，单个片段的请求恰好成功
#[tokio::test]
async fn test_length_mismatch_triggers_bisection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "segments": ["Rewritten words"]
        })))
        .mount(&server)
        .await;

    let raw = client_for(&server)
        .await
        .rewrite_segments(&segments(&["first", "second"]), None)
        .await
        .unwrap();
    assert_eq!(raw.len(), 1);

    let service = RewriteService::new(config_for(&server)).unwrap();
    let rewritten = service
        .rewrite_html_fragment("<p>First words</p><p>Second words</p>", |_| {})
        .await
        .unwrap();

    assert_eq!(rewritten.mode, RewriteMode::Llm);
    assert_eq!(rewritten.report.requests, 3);
    assert_eq!(rewritten.report.failed_requests, 1);
    assert_eq!(rewritten.report.bisections, 1);
    assert_eq!(
        rewritten.html,
        "<p>Rewritten words</p><p>Rewritten words</p>"
    );
    println!("✅ mismatch recovered by bisection");
}

/// 超时的请求被放弃，片段使用本地兜底
#[tokio::test]
async fn test_slow_service_times_out_to_heuristic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "segments": ["too late"] }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = RewriteConfig {
        request_timeout_secs: 1,
        ..config_for(&server)
    };
    let service = RewriteService::new(config).unwrap();
    let rewritten = service
        .rewrite_html_fragment("<p>A very slow answer</p>", |_| {})
        .await
        .unwrap();

    assert_eq!(rewritten.mode, RewriteMode::Heuristic);
    assert_eq!(rewritten.html, "<p>A tremendous slow answer</p>");
    assert_eq!(rewritten.report.failed_requests, 1);
}

/// 连接被拒绝是传输错误；服务层照常完成
#[tokio::test]
async fn test_connection_refused() {
    let url = "http://127.0.0.1:9/api/rewrite";
    let error = HttpRewriteClient::new(url)
        .unwrap()
        .rewrite_segments(&segments(&["one"]), None)
        .await
        .unwrap_err();
    assert_eq!(error.category(), ErrorCategory::Transport);
    assert!(error.is_batch_failure());

    let service = RewriteService::new(RewriteConfig::default_with_api_url(Some(url))).unwrap();
    let rewritten = service
        .rewrite_html_fragment("<p>Important news today</p>", |_| {})
        .await
        .unwrap();
    assert_eq!(rewritten.mode, RewriteMode::Heuristic);
    assert_eq!(
        rewritten.html,
        "<p>very important, believe me news today</p>"
    );
}

/// 非法配置在创建服务时被拒绝
#[test]
fn test_invalid_config_is_rejected() {
    let cases = [
        RewriteConfig {
            batch_size: 0,
            ..RewriteConfig::default()
        },
        RewriteConfig {
            batch_size: 61,
            ..RewriteConfig::default()
        },
        RewriteConfig {
            request_timeout_secs: 301,
            ..RewriteConfig::default()
        },
        RewriteConfig::default_with_api_url(Some("ftp://example.org")),
    ];

    for config in cases {
        let error = RewriteService::new(config).err().unwrap();
        assert_eq!(error.category(), ErrorCategory::Configuration);
    }
}
