//! 窗口调度模块：按上游目标缓冲请求，在数量或时间阈值触发时划分并分发子批次。
//!
//! # Windowed Scheduling
//!
//! One [`WindowedScheduler`] exists per upstream target. Requests are appended
//! to its window; the window flushes when it holds `wait.queries` items or
//! `wait.millis` after the first item arrived, whichever comes first. A flush
//! hands the window to the target's dispatch task, which partitions it with the
//! configured strategy and starts one upstream call per sub-batch. Calls are
//! started in window order and sub-batch order, then run concurrently, so a
//! slow upstream call never holds up the next window and same-key items reach
//! the upstream in arrival order.
//!
//! Each caller awaits only its own result. Subscriptions never enter a window.
//!
//! ## Failure semantics
//!
//! Co-batched items share their fate: a transport failure or a protocol
//! violation (result count differing from the number of requests sent) is
//! delivered to every caller in the sub-batch, whether or not that caller's
//! own data was affected. Nothing is retried here.

mod dispatch;

pub use dispatch::Dispatcher;

use crate::config::BatchingConfig;
use crate::deadline::{compute_timeout, get_deadline, now_millis};
use crate::types::UpstreamRequest;
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A buffered request and the channel its caller is waiting on.
pub(crate) struct Pending {
    pub(crate) request: UpstreamRequest,
    pub(crate) reply: oneshot::Sender<Result<Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushTrigger {
    Size,
    Timer,
    Manual,
}

impl FlushTrigger {
    fn as_str(&self) -> &'static str {
        match self {
            FlushTrigger::Size => "size",
            FlushTrigger::Timer => "timer",
            FlushTrigger::Manual => "manual",
        }
    }
}

/// One flushed window on its way to the dispatch task.
struct Flush {
    trigger: FlushTrigger,
    items: Vec<Pending>,
}

struct Window {
    pending: Vec<Pending>,
    /// Bumped on every flush so a stale timer cannot flush a newer window.
    generation: u64,
    timer: Option<JoinHandle<()>>,
    /// Held until the first flush starts the dispatch task.
    flushes: Option<mpsc::UnboundedReceiver<Flush>>,
}

impl Window {
    fn take(&mut self) -> Vec<Pending> {
        self.generation = self.generation.wrapping_add(1);
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        std::mem::take(&mut self.pending)
    }
}

struct Inner {
    config: BatchingConfig,
    dispatcher: Arc<Dispatcher>,
    window: Mutex<Window>,
    flushes: mpsc::UnboundedSender<Flush>,
}

#[derive(Clone)]
pub struct WindowedScheduler {
    inner: Arc<Inner>,
}

impl WindowedScheduler {
    pub fn new(config: BatchingConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                config,
                dispatcher,
                window: Mutex::new(Window {
                    pending: Vec::new(),
                    generation: 0,
                    timer: None,
                    flushes: Some(rx),
                }),
                flushes: tx,
            }),
        }
    }

    pub fn config(&self) -> &BatchingConfig {
        &self.inner.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.inner.dispatcher
    }

    /// Number of requests waiting in the current window.
    pub fn pending(&self) -> usize {
        self.inner.lock().map(|w| w.pending.len()).unwrap_or(0)
    }

    /// Queues `request` and resolves once its own result is available.
    ///
    /// Arms the window timer with `tokio::spawn`, so it must run inside a tokio runtime.
    pub async fn schedule(&self, request: UpstreamRequest) -> Result<Value> {
        if request.is_subscription() {
            return self.inner.dispatcher.execute_one(request).await;
        }

        let (reply, rx) = oneshot::channel();
        self.inner.enqueue(Pending { request, reply })?;

        rx.await.map_err(|_| {
            Error::runtime_with_context(
                "batch dispatch ended without a reply",
                ErrorContext::new()
                    .with_details(self.inner.dispatcher.upstream().name.clone())
                    .with_source("windowed_scheduler"),
            )
        })?
    }

    /// Flushes the current window immediately.
    pub fn flush_now(&self) -> Result<()> {
        let mut window = self.inner.lock()?;
        self.inner.submit(&mut window, FlushTrigger::Manual);
        Ok(())
    }
}

impl Inner {
    fn lock(&self) -> Result<MutexGuard<'_, Window>> {
        self.window.lock().map_err(|_| {
            Error::runtime_with_context(
                "scheduler window poisoned",
                ErrorContext::new().with_source("windowed_scheduler"),
            )
        })
    }

    /// Appends to the window, flushing it when the size bound is hit.
    fn enqueue(self: &Arc<Self>, pending: Pending) -> Result<()> {
        let mut window = self.lock()?;
        window.pending.push(pending);

        if window.pending.len() >= self.config.wait.queries {
            self.submit(&mut window, FlushTrigger::Size);
        } else if window.pending.len() == 1 {
            let generation = window.generation;
            let wait = self.config.wait_duration();
            let inner = Arc::clone(self);
            window.timer = Some(tokio::spawn(async move {
                tokio::time::sleep(wait).await;
                inner.flush_expired(generation);
            }));
        }
        Ok(())
    }

    fn flush_expired(&self, generation: u64) {
        if let Ok(mut window) = self.lock() {
            if window.generation == generation {
                // this task is the timer; detach it instead of aborting itself
                window.timer = None;
                self.submit(&mut window, FlushTrigger::Timer);
            }
        }
    }

    /// Empties the window into the dispatch queue. Called with the window
    /// locked, so queue order is flush order.
    fn submit(&self, window: &mut Window, trigger: FlushTrigger) {
        let items = window.take();
        if items.is_empty() {
            return;
        }
        if let Some(flushes) = window.flushes.take() {
            tokio::spawn(drive(flushes, self.config, Arc::clone(&self.dispatcher)));
        }
        if let Err(mpsc::error::SendError(flush)) = self.flushes.send(Flush { trigger, items }) {
            warn!(
                upstream = %self.dispatcher.upstream().name,
                items = flush.items.len(),
                "dispatch task gone, dropping flushed window"
            );
        }
    }
}

/// Dispatch task of one target. Ends when its scheduler is dropped.
async fn drive(
    mut flushes: mpsc::UnboundedReceiver<Flush>,
    config: BatchingConfig,
    dispatcher: Arc<Dispatcher>,
) {
    while let Some(flush) = flushes.recv().await {
        for items in partition_flush(&config, &dispatcher, flush) {
            let dispatcher = Arc::clone(&dispatcher);
            let mut delivery = Box::pin(async move { dispatcher.deliver(items).await });
            // the first poll hands the call to the transport; the next
            // sub-batch is only started after that
            if futures::poll!(&mut delivery).is_pending() {
                tokio::spawn(delivery);
            }
        }
    }
}

fn partition_flush(config: &BatchingConfig, dispatcher: &Dispatcher, flush: Flush) -> Vec<Vec<Pending>> {
    let now = now_millis();
    let padding = dispatcher.deadline_padding_ms();
    let mut live = Vec::with_capacity(flush.items.len());
    for pending in flush.items {
        if pending.reply.is_closed() {
            continue;
        }
        // an item already past its own deadline must not tighten the whole sub-batch
        match compute_timeout(None, get_deadline(&pending.request), now, padding) {
            Ok(_) => live.push(pending),
            Err(e) => {
                let _ = pending.reply.send(Err(e));
            }
        }
    }
    if live.is_empty() {
        return Vec::new();
    }

    let item_count = live.len();
    let batches = config
        .strategy
        .partition(live, config.max_size, |p| &p.request);
    debug!(
        upstream = %dispatcher.upstream().name,
        strategy = config.strategy.as_str(),
        trigger = flush.trigger.as_str(),
        items = item_count,
        sub_batches = batches.len(),
        "flushing batch window"
    );
    batches.into_iter().map(|b| b.into_values()).collect()
}
