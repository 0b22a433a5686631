//! Integration tests for the crawler
//!
//! These tests serve help-center pages from a mock HTTP server and run the
//! real HTTP fetcher and extractor through the coordinator.

use docsearch::config::{CrawlerConfig, SitemapConfig};
use docsearch::crawler::{
    build_http_client, discover_targets, run_crawl, Coordinator, FailureKind, FetchOutcome,
    HtmlExtractor, HttpFetcher, RetryPolicy,
};
use docsearch::storage::{ArticleSink, ArticleStore, SqliteArticleStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn article_page(title: &str, body: &str) -> String {
    format!(
        r#"<html><head><title>{title} – Help Center</title></head><body>
        <h1>How can we help?</h1>
        <header class="article-header"><h3>
            {title}
            Published 2 months ago • Last Updated 3 days ago
        </h3></header>
        <time datetime="2024-01-10T08:00:00Z">January 10</time>
        <time datetime="2024-05-02T16:30:00Z">May 2</time>
        <div class="article-body">{body}</div>
        </body></html>"#
    )
}

async fn mount_page(server: &MockServer, page_path: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn coordinator(max_retries: u32, concurrency: usize) -> Coordinator {
    let client = build_http_client(&CrawlerConfig::default()).expect("client");
    let fetcher = HttpFetcher::new(client, Arc::new(HtmlExtractor::new()));
    Coordinator::with_fetcher(
        Arc::new(fetcher),
        RetryPolicy::immediate(max_retries),
        concurrency,
    )
}

#[tokio::test]
async fn test_partial_failure_does_not_affect_other_targets() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/hc/en-us/articles/1-Alpha",
        article_page("Alpha Guide", "<p>Alpha body</p>"),
    )
    .await;
    mount_page(
        &server,
        "/hc/en-us/articles/3-Gamma",
        article_page("Gamma Guide", "<p>Gamma body</p>"),
    )
    .await;

    // Two retries means exactly three requests for the failing page
    Mock::given(method("GET"))
        .and(path("/hc/en-us/articles/2-Beta"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let targets = vec![
        format!("{}/hc/en-us/articles/1-Alpha", base),
        format!("{}/hc/en-us/articles/2-Beta", base),
        format!("{}/hc/en-us/articles/3-Gamma", base),
    ];

    let outcomes = coordinator(2, 3).crawl(targets).collect().await;
    assert_eq!(outcomes.len(), 3);

    let by_target: HashMap<String, FetchOutcome> = outcomes
        .into_iter()
        .map(|o| (o.target().to_string(), o))
        .collect();

    match &by_target[&format!("{}/hc/en-us/articles/1-Alpha", base)] {
        FetchOutcome::Success {
            article, attempts, ..
        } => {
            assert_eq!(*attempts, 1);
            assert_eq!(article.id, "1");
            assert_eq!(article.title, "Alpha Guide");
            assert_eq!(article.body, "<p>Alpha body</p>");
            assert_eq!(article.created_at.to_rfc3339(), "2024-01-10T08:00:00+00:00");
            assert_eq!(article.updated_at.to_rfc3339(), "2024-05-02T16:30:00+00:00");
        }
        other => panic!("expected success for Alpha, got {:?}", other),
    }

    match &by_target[&format!("{}/hc/en-us/articles/2-Beta", base)] {
        FetchOutcome::Failure {
            kind,
            attempts,
            error,
            ..
        } => {
            assert_eq!(*kind, FailureKind::Transport);
            assert_eq!(*attempts, 3);
            assert!(error.contains("500"), "unexpected error: {}", error);
        }
        other => panic!("expected failure for Beta, got {:?}", other),
    }

    assert!(by_target[&format!("{}/hc/en-us/articles/3-Gamma", base)].is_success());
}

#[tokio::test]
async fn test_placeholder_page_fails_with_no_title() {
    let server = MockServer::start().await;

    // Only the site-wide banner, no article header
    Mock::given(method("GET"))
        .and(path("/hc/en-us/articles/9-Landing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><h1>How can we help?</h1>
            <div class="article-body"><p>Real looking body</p></div></body></html>"#,
        ))
        .expect(2)
        .mount(&server)
        .await;

    let outcomes = coordinator(1, 1)
        .crawl(vec![format!("{}/hc/en-us/articles/9-Landing", server.uri())])
        .collect()
        .await;

    match &outcomes[0] {
        FetchOutcome::Failure { kind, attempts, .. } => {
            assert_eq!(*kind, FailureKind::NoTitle);
            assert_eq!(*attempts, 2);
        }
        other => panic!("expected NoTitle failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transient_failure_recovers_on_retry() {
    let server = MockServer::start().await;
    let page = "/hc/en-us/articles/5-Flaky";

    // First request fails, later ones succeed
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, page, article_page("Flaky Page", "<p>Eventually</p>")).await;

    let outcomes = coordinator(3, 1)
        .crawl(vec![format!("{}{}", server.uri(), page)])
        .collect()
        .await;

    assert!(outcomes[0].is_success());
    assert_eq!(outcomes[0].attempts(), 2);
}

#[tokio::test]
async fn test_sitemap_discovery_filters_articles() {
    let server = MockServer::start().await;
    let base = server.uri();

    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url><loc>{base}/hc/en-us/articles/1-Alpha</loc></url>
          <url><loc>{base}/hc/en-us/articles/2</loc></url>
          <url><loc>{base}/hc/en-us/sections/7-Voice</loc></url>
          <url><loc>{base}/hc/en-us/articles/3-Gamma</loc></url>
        </urlset>"#
    );

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap))
        .mount(&server)
        .await;

    let config = SitemapConfig::new(format!("{}/sitemap.xml", base));
    let client = build_http_client(&CrawlerConfig::default()).unwrap();
    let targets = discover_targets(&client, &config).await.unwrap();

    assert_eq!(
        targets,
        vec![
            format!("{}/hc/en-us/articles/1-Alpha", base),
            format!("{}/hc/en-us/articles/3-Gamma", base),
        ]
    );
}

#[tokio::test]
async fn test_sitemap_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = SitemapConfig::new(format!("{}/sitemap.xml", server.uri()));
    let client = build_http_client(&CrawlerConfig::default()).unwrap();
    let err = discover_targets(&client, &config).await.unwrap_err();

    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_run_crawl_stores_articles_and_reports() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/hc/en-us/articles/1-Alpha",
        article_page("Alpha Guide", "<p>Alpha</p>"),
    )
    .await;
    mount_page(
        &server,
        "/hc/en-us/articles/3-Gamma",
        article_page("Gamma Guide", "<p>Gamma</p>"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/hc/en-us/articles/2-Beta"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = Arc::new(SqliteArticleStore::new_in_memory().unwrap());
    let sinks: Vec<Box<dyn ArticleSink>> = vec![Box::new(store.clone())];

    let targets = vec![
        format!("{}/hc/en-us/articles/1-Alpha", base),
        format!("{}/hc/en-us/articles/2-Beta", base),
        format!("{}/hc/en-us/articles/3-Gamma", base),
        "not a url".to_string(),
    ];

    let report = run_crawl(&coordinator(1, 2), targets, &sinks, CancellationToken::new()).await;

    assert_eq!(report.targets, 4);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(report.failures_by_kind[&FailureKind::Transport], 1);
    assert_eq!(report.failures_by_kind[&FailureKind::Terminal], 1);
    assert_eq!(report.errors.len(), 2);
    assert_eq!(report.sink_errors, 0);
    assert!(report.finished_at.is_some());

    assert_eq!(store.count_articles().unwrap(), 2);
    assert_eq!(store.get_article("3").unwrap().unwrap().title, "Gamma Guide");
}

#[tokio::test]
async fn test_cancelled_crawl_reports_nothing_new() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/hc/en-us/articles/1-Alpha",
        article_page("Alpha Guide", "<p>Alpha</p>"),
    )
    .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = run_crawl(
        &coordinator(0, 1),
        vec![format!("{}/hc/en-us/articles/1-Alpha", server.uri())],
        &[],
        cancel,
    )
    .await;

    assert_eq!(report.succeeded + report.failed, 0);
    assert_eq!(report.skipped(), 1);
}
