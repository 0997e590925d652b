use std::error::Error;

use crate::{
    cfg::Config,
    corpus,
    engine::{http::payload::EmbeddingsPayload, Engine},
    progress::Progress,
    report::BenchmarkResult,
    sink::CsvSink,
};

/// Single benchmark invocation.
#[derive(Debug)]
pub struct Runtime {
    cfg: Config,
}

impl Runtime {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    /// Loads the corpus, runs the engine and reports the results.
    ///
    /// Returns the result even if some requests failed: it is up to the
    /// caller to treat that as a failure.
    pub async fn run(self) -> Result<BenchmarkResult, Box<dyn Error>> {
        let cfg = &self.cfg;

        log::info!("starting benchmark with configuration:");
        log::info!("  URL: {}", cfg.target);
        log::info!("  Model: {}", cfg.model);
        log::info!("  Mode: {}", cfg.mode);
        log::info!("  Batch Size: {}", cfg.batch_size);
        log::info!("  Concurrency: {}", cfg.concurrency);
        log::info!("  Number of Requests: {}", cfg.num_requests);

        let corpus = corpus::fetch(&cfg.corpus, cfg.mode.tokens_per_fragment(), cfg.timeout).await?;
        let payload = EmbeddingsPayload::new(corpus, cfg.model.clone(), cfg.mode, cfg.batch_size);

        let engine = Engine::new(cfg.engine(), payload);
        let stop = engine.stopper();
        let progress = Progress::new(engine.stat(), cfg.num_requests.get());

        let signal = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    log::warn!("interrupted");
                    stop.stop();
                }
                Err(err) => log::error!("failed to listen for interrupt signal: {err}"),
            }
        });
        let progress = tokio::spawn(progress.run(cfg.progress_interval));

        let result = engine.run().await;

        signal.abort();
        progress.abort();

        println!("{}", result.to_text());
        log::debug!("result: {}", serde_json::to_string(&result)?);

        if result.failed_requests > 0 {
            return Ok(result);
        }

        let sink = CsvSink::new(&cfg.output);
        sink.append(&result.to_csv_row(&cfg.workload()))?;
        log::info!("results appended to '{}'", sink.path().display());

        Ok(result)
    }
}
