//! The message gateway: decodes requests, enforces the single-flight gate
//! and guarantees exactly one terminal response per request.

use crate::engine::Engine;
use crate::error::WorkerError;
use crate::protocol::{decode_request, Response, ResponseBody};
use futures::future::{FutureExt, LocalBoxFuture};
use kiln_common::{InternalError, KilnResult};
use std::any::Any;
use std::fmt::Display;
use std::future::{pending, Future};
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Prefix of every terminal error that is not a compile or fetch failure.
pub const FAILURE_PREFIX: &str = "Error occurred processing message: ";

/// Formats an internal failure as the text of an `error` response.
pub fn failure_text(err: &dyn Display) -> String {
    format!("{FAILURE_PREFIX}{err}")
}

/// The single ordered channel every response leaves through.
#[derive(Debug, Clone)]
pub struct Outbox(UnboundedSender<Response>);

impl Outbox {
    /// Wraps the sending half of the response channel.
    pub fn new(sender: UnboundedSender<Response>) -> Self {
        Self(sender)
    }

    /// Queues `response`. Responses to a reader that has gone away are dropped.
    pub fn send(&self, response: Response) {
        if let Err(err) = self.0.send(response) {
            log::debug!("[{}] response dropped: receiver closed", err.0.id);
        }
    }
}

type Outcome = (Engine, String, Instant, std::thread::Result<Response>);
type Pipeline = LocalBoxFuture<'static, Outcome>;

/// Owns the engine while idle and lends it to at most one pipeline.
pub struct Gateway {
    engine: Option<Engine>,
    outbox: Outbox,
}

impl Gateway {
    /// Creates an idle gateway.
    pub fn new(engine: Engine, outbox: Outbox) -> Self {
        Self {
            engine: Some(engine),
            outbox,
        }
    }

    /// Returns `true` while no request is being processed.
    pub fn is_idle(&self) -> bool {
        self.engine.is_some()
    }

    /// Serves request lines from `inbox` until it closes and the pipeline
    /// in flight, if any, has finished. Returns the engine.
    pub async fn run(mut self, mut inbox: UnboundedReceiver<String>) -> KilnResult<Engine> {
        let mut pipeline: Option<Pipeline> = None;
        let mut open = true;

        while open || pipeline.is_some() {
            tokio::select! {
                biased;
                (engine, id, started, outcome) = wait_for(&mut pipeline), if pipeline.is_some() => {
                    pipeline = None;
                    self.complete(engine, id, started, outcome);
                }
                line = inbox.recv(), if open => match line {
                    Some(line) => {
                        if let Some(started) = self.arrive(&line) {
                            pipeline = Some(started);
                        }
                    }
                    None => {
                        log::debug!("inbox closed");
                        open = false;
                    }
                },
            }
        }

        self.engine
            .take()
            .ok_or_else(|| InternalError::new("gateway stopped without its engine"))
    }

    /// Handles one arriving line. Returns the pipeline to start, if the
    /// line was accepted.
    fn arrive(&mut self, line: &str) -> Option<Pipeline> {
        let request = match decode_request(line) {
            Ok(request) => request,
            Err(failure) => {
                let id = failure.id.unwrap_or_default();
                log::warn!("[{id}] rejected: {}", failure.error);
                self.outbox
                    .send(Response::error(id, failure_text(&failure.error)));
                return None;
            }
        };

        let Some(mut engine) = self.engine.take() else {
            log::info!("[{}] {} rejected: busy", request.id, request.kind());
            self.outbox.send(Response::busy(request.id));
            return None;
        };

        log::info!("[{}] {} accepted", request.id, request.kind());
        let outbox = self.outbox.clone();
        let started = Instant::now();
        Some(
            async move {
                let outcome = AssertUnwindSafe(engine.handle(&request, &outbox))
                    .catch_unwind()
                    .await;
                (engine, request.id, started, outcome)
            }
            .boxed_local(),
        )
    }

    /// Returns the engine and sends the request's terminal response.
    fn complete(
        &mut self,
        engine: Engine,
        id: String,
        started: Instant,
        outcome: std::thread::Result<Response>,
    ) {
        self.engine = Some(engine);
        let response = match outcome {
            Ok(response) => response,
            Err(payload) => {
                let err = WorkerError::Panicked(panic_message(payload.as_ref()));
                log::error!("[{id}] pipeline panicked: {err}");
                Response::error(id.as_str(), failure_text(&err))
            }
        };
        log::info!(
            "[{id}] finished in {} ms ({})",
            started.elapsed().as_millis(),
            if matches!(response.body, ResponseBody::Ok) {
                "ok"
            } else {
                "error"
            }
        );
        self.outbox.send(response);
    }
}

async fn wait_for<F: Future + Unpin>(pipeline: &mut Option<F>) -> F::Output {
    match pipeline {
        Some(future) => future.await,
        None => pending().await,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "pipeline panicked".to_string()
    }
}
