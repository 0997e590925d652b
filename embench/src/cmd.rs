use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::{
    corpus::{CorpusSource, DEFAULT_SOURCE},
    engine::http::payload::Mode,
};

/// Closed-loop load generator for HTTP embeddings endpoints.
///
/// Sends the given number of POST requests to "<URL>/v1/embeddings" over a
/// fixed number of connections, each request carrying a random batch of text
/// fragments, and reports latency percentiles and throughput.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Cmd {
    /// Number of concurrent connections.
    ///
    /// This is exactly the number of requests in flight.
    #[clap(short, long)]
    pub concurrency: usize,
    /// Number of text fragments per request.
    #[clap(short, long = "batch-size", visible_alias = "batchSize")]
    pub batch_size: usize,
    /// Kind of input, which also defines the fragment size: 20 tokens for
    /// queries and 300 tokens for passages.
    #[clap(short, long, value_enum)]
    pub mode: Mode,
    /// Base URL of the embeddings service.
    #[clap(short, long, env = "URL_ENDPOINT")]
    pub url: Option<String>,
    /// Model name to put into requests.
    #[clap(short = 'M', long, env = "MODEL_NAME")]
    pub model: Option<String>,
    /// Total number of requests to send.
    #[clap(short, long = "num-requests", visible_alias = "numRequests", default_value_t = 1000)]
    pub num_requests: u64,
    /// Text source: path to a local file or an http(s) URL.
    ///
    /// HTML documents are reduced to their readable text.
    #[clap(long, env = "CORPUS_SOURCE", value_name = "PATH|URL", default_value = DEFAULT_SOURCE)]
    pub corpus: CorpusSource,
    /// Extra request header in "Name: value" form, may be repeated.
    #[clap(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,
    /// Per-request timeout in seconds.
    #[clap(long, default_value_t = 30.0)]
    pub timeout: f64,
    /// Time in seconds given to in-flight requests after interruption.
    #[clap(long, default_value_t = 5.0)]
    pub grace: f64,
    /// Path to the CSV file results are appended to.
    #[clap(short, long, default_value = "result.csv")]
    pub output: PathBuf,
    /// Number of runtime threads.
    #[clap(short, long)]
    pub threads: Option<usize>,
    /// Progress report interval in milliseconds.
    #[clap(long, default_value_t = 1000)]
    pub progress_interval: u64,
    /// Be verbose in terms of logging.
    #[clap(short, action = ArgAction::Count)]
    pub verbose: u8,
}
