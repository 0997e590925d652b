use core::time::Duration;
use std::{sync::Arc, time::Instant};

use anyhow::Error;
use bytes::Bytes;
use http::HeaderMap;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1::{self, SendRequest};
use tokio::net::TcpStream;

use super::{cfg::Config, io::TokioIo, Target};
use crate::{
    engine::{
        runtime::SlotPool,
        state::{RunState, Stop},
    },
    error::AttemptError,
    report::BenchmarkResult,
    stat::{Outcome, Response, Stat},
    Produce,
};

/// Closed-loop HTTP load engine.
///
/// Keeps exactly "concurrency" requests in flight by running that many slots,
/// each issuing its next attempt as soon as the previous one completes, until
/// the configured number of attempts has been issued.
#[derive(Debug)]
pub struct Engine<P> {
    cfg: Config,
    payload: Arc<P>,
    stat: Arc<Stat>,
    state: Arc<RunState>,
}

impl<P> Engine<P> {
    pub fn new(cfg: Config, payload: P) -> Self {
        Self {
            cfg,
            payload: Arc::new(payload),
            stat: Arc::new(Stat::default()),
            state: Arc::new(RunState::default()),
        }
    }

    /// Returns live run counters.
    #[inline]
    pub fn stat(&self) -> Arc<Stat> {
        self.stat.clone()
    }

    /// Returns a handle that stops this engine.
    #[inline]
    pub fn stopper(&self) -> Stop {
        Stop::new(self.state.clone())
    }
}

impl<P> Engine<P>
where
    P: Produce<Item = Bytes> + Send + Sync + 'static,
{
    /// Runs the load until all attempts are issued and completed, or until
    /// stopped.
    ///
    /// Per-attempt failures are never returned, they are accounted in the
    /// result instead.
    pub async fn run(self) -> BenchmarkResult {
        let num_requests = self.cfg.num_requests.get();
        let target = Arc::new(self.cfg.target.clone());
        let headers = Arc::new(self.cfg.headers.clone());

        log::info!(
            "sending {} requests to {} over {} connections",
            num_requests,
            target,
            self.cfg.concurrency
        );

        let now = Instant::now();

        let pool = SlotPool::new(self.cfg.concurrency, |idx: usize| {
            let slot = SlotWorker::new(
                idx,
                target.clone(),
                headers.clone(),
                self.payload.clone(),
                self.cfg.timeout,
                self.stat.clone(),
            );

            slot.run(self.state.clone(), num_requests)
        });
        pool.run(&self.state, self.cfg.grace).await;

        let elapsed = now.elapsed();
        self.state.finish();

        let result = BenchmarkResult::new(&self.stat.snapshot(), self.stat.percentiles(), elapsed);
        log::debug!(
            "finished in {:.2?}: {} issued, {} sockets created",
            elapsed,
            self.stat.num_issued(),
            self.stat.num_sock_created()
        );

        result
    }
}

/// Per-slot worker, owning a single keep-alive connection.
#[derive(Debug)]
struct SlotWorker<P> {
    /// Slot index, for logging.
    idx: usize,
    /// Target endpoint.
    target: Arc<Target>,
    /// Fixed extra headers.
    headers: Arc<HeaderMap>,
    /// Request body producer.
    payload: Arc<P>,
    /// Current connection.
    ///
    /// Taken for the duration of an attempt and put back only on success, so
    /// any failure results in reconnection.
    sender: Option<SendRequest<Full<Bytes>>>,
    /// Request timeout.
    timeout: Duration,
    /// Runtime statistics.
    stat: Arc<Stat>,
}

impl<P> SlotWorker<P>
where
    P: Produce<Item = Bytes>,
{
    pub fn new(
        idx: usize,
        target: Arc<Target>,
        headers: Arc<HeaderMap>,
        payload: Arc<P>,
        timeout: Duration,
        stat: Arc<Stat>,
    ) -> Self {
        Self {
            idx,
            target,
            headers,
            payload,
            sender: None,
            timeout,
            stat,
        }
    }

    /// Issues attempts back to back while tickets are available.
    pub async fn run(mut self, state: Arc<RunState>, limit: u64) {
        let mut num_attempts = 0u64;

        while self.stat.try_issue_while(limit, || state.is_running()) {
            let outcome = self.execute().await;
            self.stat.on_outcome(outcome);
            num_attempts += 1;
        }

        log::trace!("slot {} done after {} attempts", self.idx, num_attempts);
    }

    /// Performs a single attempt.
    #[inline]
    async fn execute(&mut self) -> Outcome {
        let body = self.payload.next();
        let timeout = self.timeout;

        match tokio::time::timeout(timeout, self.do_execute(body)).await {
            Ok(Ok(resp)) if resp.status.is_success() => Ok(resp),
            Ok(Ok(Response { status, latency })) => Err(AttemptError::Http { status, latency }),
            Ok(Err(err)) => Err(AttemptError::Transport(err)),
            Err(..) => Err(AttemptError::Timeout(timeout)),
        }
    }

    #[inline]
    async fn do_execute(&mut self, body: Bytes) -> Result<Response, Error> {
        let mut sender = self.curr_sender().await?;
        let req = self.target.request(&self.headers, body);

        let now = Instant::now();
        let mut resp = sender.send_request(req).await?;
        let status = resp.status();
        while let Some(next) = resp.frame().await {
            next?;
        }
        let latency = now.elapsed();

        self.sender = Some(sender);

        Ok(Response { status, latency })
    }

    #[inline]
    async fn curr_sender(&mut self) -> Result<SendRequest<Full<Bytes>>, Error> {
        if let Some(mut sender) = self.sender.take() {
            // The server may have closed the connection since the last
            // response, in that case a fresh one is needed.
            if sender.ready().await.is_ok() {
                return Ok(sender);
            }
        }

        self.reconnect().await
    }

    async fn reconnect(&mut self) -> Result<SendRequest<Full<Bytes>>, Error> {
        let stream = TcpStream::connect((self.target.host(), self.target.port())).await?;
        stream.set_nodelay(true)?;

        let (sender, conn) = http1::handshake(TokioIo::new(stream)).await?;
        let idx = self.idx;
        tokio::task::spawn(async move {
            if let Err(err) = conn.await {
                log::debug!("slot {idx}: connection failed: {err}");
            }
        });
        self.stat.on_sock_created();

        Ok(sender)
    }
}
