use core::time::Duration;
use std::{env, fs, path::PathBuf, process};

use clap::Parser;
use embench::{
    cfg::Config,
    cmd::Cmd,
    corpus::{self, CorpusSource},
    error::CorpusFetchError,
    runtime::Runtime,
    sink::HEADER,
};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn temp_path(name: &str) -> PathBuf {
    env::temp_dir().join(format!("embench-{name}-{}", process::id()))
}

fn config(url: &str, corpus: &str, output: &str, extra: &[&str]) -> Config {
    let mut args = vec![
        "embench", "-c", "2", "-b", "4", "-m", "query", "-u", url, "-M", "bge-m3", "-n", "8", "--corpus", corpus, "-o",
        output,
    ];
    args.extend_from_slice(extra);

    Cmd::try_parse_from(args).unwrap().try_into().unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_html_corpus() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><script>ignored()</script></head><body><p>hello world</p>\n<p>hello &amp; world</p></body></html>",
        ))
        .mount(&server)
        .await;

    let source = CorpusSource::Http(format!("{}/article", server.uri()));
    let corpus = corpus::fetch(&source, 2, Duration::from_secs(5)).await.unwrap();

    assert!(corpus.len() >= 2);
    assert_eq!("hello world hello & world", corpus.concat());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_corpus_bad_status() {
    let server = MockServer::start().await;

    let source = CorpusSource::Http(format!("{}/missing", server.uri()));
    let err = corpus::fetch(&source, 20, Duration::from_secs(5)).await.unwrap_err();

    assert!(matches!(err, CorpusFetchError::Status(status) if status.as_u16() == 404), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_successful_run_appends_csv_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let corpus = temp_path("run-corpus.txt");
    let output = temp_path("run-result.csv");
    fs::write(&corpus, "the quick brown fox jumps over the lazy dog").unwrap();
    _ = fs::remove_file(&output);

    let cfg = config(&server.uri(), corpus.to_str().unwrap(), output.to_str().unwrap(), &[]);
    let result = Runtime::new(cfg).run().await.unwrap();

    let data = fs::read_to_string(&output).unwrap();
    fs::remove_file(&corpus).unwrap();
    fs::remove_file(&output).unwrap();

    assert_eq!(8, result.total_requests);
    assert_eq!(0, result.failed_requests);

    let lines: Vec<&str> = data.lines().collect();
    assert_eq!(2, lines.len());
    assert_eq!(HEADER, lines[0]);
    assert!(lines[1].starts_with("bge-m3,80,4,2,"), "{}", lines[1]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_run_skips_csv() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let corpus = temp_path("failed-corpus.txt");
    let output = temp_path("failed-result.csv");
    fs::write(&corpus, "some text").unwrap();
    _ = fs::remove_file(&output);

    let cfg = config(&server.uri(), corpus.to_str().unwrap(), output.to_str().unwrap(), &["--timeout", "5"]);
    let result = Runtime::new(cfg).run().await.unwrap();
    fs::remove_file(&corpus).unwrap();

    assert_eq!(8, result.total_requests);
    assert_eq!(8, result.failed_requests);
    assert_eq!(100.0, result.fail_rate());
    assert!(!output.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_corpus_fails_before_run() {
    let server = MockServer::start().await;
    let output = temp_path("nocorpus-result.csv");

    let cfg = config(&server.uri(), "/nonexistent/embench/corpus.txt", output.to_str().unwrap(), &[]);
    let err = Runtime::new(cfg).run().await.unwrap_err();

    assert!(err.to_string().contains("failed to read corpus"), "{err}");
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(!output.exists());
}
