//! Per-request coalescing loader.
//!
//! `load` never suspends: it memoizes the key and parks it in the pending
//! batch. A ticker task owns each dispatch window and fires when the first
//! awaiter flushes, when the idle tick elapses, or when the request is
//! cancelled. Dispatch for one loader is serial.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::mem;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use metrics::{counter, histogram};
use tokio::sync::{Notify, oneshot};
use tracing::{debug, error};

use crate::application::error::LoadError;
use crate::util::locks;

use super::cancel::CancelToken;
use super::fingerprint::Fingerprint;
use super::output::LoadedValue;
use super::registry::{DispatchConfig, LoaderName};

pub type LoadResult = Result<LoadedValue, LoadError>;

const METRIC_BATCHES_TOTAL: &str = "helpgate_loader_batches_total";
const METRIC_BATCH_SIZE: &str = "helpgate_loader_batch_size";

/// What a batch function sees of the request that issued the batch.
#[derive(Debug, Clone, Default)]
pub struct BatchContext {
    cancel: CancelToken,
}

impl BatchContext {
    pub fn new(cancel: CancelToken) -> Self {
        Self { cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Failures observed after cancellation are reported as `Cancelled`.
    pub fn settle(&self, result: LoadResult) -> LoadResult {
        match result {
            Err(_) if self.is_cancelled() => Err(LoadError::cancelled()),
            other => other,
        }
    }
}

/// Resolves a batch of fingerprints. The returned vector is positional.
#[async_trait]
pub trait BatchFn: Send + Sync {
    async fn load_batch(&self, ctx: &BatchContext, keys: &[Fingerprint]) -> Vec<LoadResult>;
}

type SharedResult = Shared<BoxFuture<'static, LoadResult>>;
type Pending = Vec<(Fingerprint, oneshot::Sender<LoadResult>)>;

#[derive(Default)]
struct State {
    memo: HashMap<Fingerprint, SharedResult>,
    pending: Pending,
    window: Option<Arc<Notify>>,
}

struct Inner {
    name: LoaderName,
    function: Arc<dyn BatchFn>,
    dispatch: DispatchConfig,
    context: BatchContext,
    state: Mutex<State>,
    gate: tokio::sync::Mutex<()>,
}

#[derive(Clone)]
pub struct BatchedLoader {
    inner: Arc<Inner>,
}

impl BatchedLoader {
    pub fn new(
        name: LoaderName,
        function: Arc<dyn BatchFn>,
        dispatch: DispatchConfig,
        context: BatchContext,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                function,
                dispatch,
                context,
                state: Mutex::new(State::default()),
                gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn name(&self) -> LoaderName {
        self.inner.name
    }

    /// Enqueue `key` and return a future for its result.
    ///
    /// Must be called inside a Tokio runtime. Repeated keys share one memoized
    /// result for the lifetime of this loader.
    pub fn load(&self, key: Fingerprint) -> impl Future<Output = LoadResult> + Send + use<> {
        let (result, window) = self.enqueue(key);
        let cancel = self.inner.context.cancel_token().clone();
        async move {
            if let Some(window) = window {
                window.notify_one();
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(LoadError::cancelled()),
                result = result => result,
            }
        }
    }

    /// Enqueue every key before awaiting so they share a dispatch window.
    pub async fn load_many(&self, keys: Vec<Fingerprint>) -> Vec<LoadResult> {
        let futures: Vec<_> = keys.into_iter().map(|key| self.load(key)).collect();
        future::join_all(futures).await
    }

    fn enqueue(&self, key: Fingerprint) -> (SharedResult, Option<Arc<Notify>>) {
        let mut state = locks::lock(&self.inner.state, "batched_loader", "enqueue");
        if let Some(existing) = state.memo.get(&key) {
            return (existing.clone(), state.window.clone());
        }

        let (sender, receiver) = oneshot::channel();
        let result = receiver
            .map(|received| received.unwrap_or_else(|_| Err(LoadError::cancelled())))
            .boxed()
            .shared();
        state.memo.insert(key.clone(), result.clone());
        state.pending.push((key, sender));

        let window = match &state.window {
            Some(window) => Arc::clone(window),
            None => {
                let window = Arc::new(Notify::new());
                state.window = Some(Arc::clone(&window));
                tokio::spawn(tick(Arc::clone(&self.inner), Arc::clone(&window)));
                window
            }
        };
        if state.pending.len() >= self.inner.dispatch.max_batch_size.get() {
            window.notify_one();
        }
        (result, Some(window))
    }
}

async fn tick(inner: Arc<Inner>, window: Arc<Notify>) {
    tokio::select! {
        _ = tokio::time::sleep(inner.dispatch.batch_wait) => {}
        _ = window.notified() => {}
        _ = inner.context.cancel_token().cancelled() => {}
    }
    // Let loads issued in the same poll pass join the window.
    tokio::task::yield_now().await;
    inner.dispatch().await;
}

impl Inner {
    async fn dispatch(&self) {
        let _gate = self.gate.lock().await;
        let mut remaining = {
            let mut state = locks::lock(&self.state, "batched_loader", "drain");
            state.window = None;
            mem::take(&mut state.pending)
        };

        let max = self.dispatch.max_batch_size.get();
        while !remaining.is_empty() {
            let rest = if remaining.len() > max {
                remaining.split_off(max)
            } else {
                Vec::new()
            };
            self.run_chunk(remaining).await;
            remaining = rest;
        }
    }

    async fn run_chunk(&self, chunk: Pending) {
        let (keys, senders): (Vec<Fingerprint>, Vec<oneshot::Sender<LoadResult>>) =
            chunk.into_iter().unzip();

        if self.context.is_cancelled() {
            debug!(
                loader = %self.name,
                batch_size = keys.len(),
                "Discarding loader batch for cancelled request"
            );
            for sender in senders {
                let _ = sender.send(Err(LoadError::cancelled()));
            }
            return;
        }

        counter!(METRIC_BATCHES_TOTAL, "loader" => self.name.as_str()).increment(1);
        histogram!(METRIC_BATCH_SIZE, "loader" => self.name.as_str()).record(keys.len() as f64);
        debug!(loader = %self.name, batch_size = keys.len(), "Dispatching loader batch");

        let outcome = AssertUnwindSafe(self.function.load_batch(&self.context, &keys))
            .catch_unwind()
            .await;
        let results = match outcome {
            Ok(results) if results.len() == keys.len() => results,
            Ok(results) => {
                error!(
                    loader = %self.name,
                    expected = keys.len(),
                    actual = results.len(),
                    "Batch function returned a result array of the wrong length"
                );
                let err = LoadError::internal(format!(
                    "loader `{}` returned {} results for {} keys",
                    self.name,
                    results.len(),
                    keys.len()
                ));
                vec![Err(err); keys.len()]
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(loader = %self.name, panic = %message, "Batch function panicked");
                let err = LoadError::internal(format!("loader `{}` panicked: {message}", self.name));
                vec![Err(err); keys.len()]
            }
        };

        let cancelled = self.context.is_cancelled();
        for (sender, result) in senders.into_iter().zip(results) {
            let result = if cancelled {
                Err(LoadError::cancelled())
            } else {
                result
            };
            let _ = sender.send(result);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
