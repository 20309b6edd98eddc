use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, warn};

use crate::store::{TelemetryRecord, TelemetryStore};

use super::error::BatcherError;

struct BufferState {
    buffer: VecDeque<TelemetryRecord>,
    flush_in_progress: bool,
    retry_count: u32,
}

struct Inner {
    state: Mutex<BufferState>,
    running: AtomicBool,
    store: TelemetryStore,
    max_buffer_size: usize,
    max_retries: u32,
    flush_interval: Duration,
}

/// Bounded in-memory buffer that accumulates telemetry records and flushes
/// them to the store either on a size trigger or a periodic timer,
/// whichever comes first.
///
/// The buffer swap in [`TelemetryBatcher::flush`] is the single
/// linearization point between submitters and the flusher: submits that
/// land during an in-flight flush go into the now-empty live buffer and
/// are picked up by the next flush, never blocked on the current one.
#[derive(Clone)]
pub struct TelemetryBatcher {
    inner: Arc<Inner>,
}

impl TelemetryBatcher {
    pub fn new(
        store: TelemetryStore,
        max_buffer_size: usize,
        flush_interval: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(BufferState {
                    buffer: VecDeque::new(),
                    flush_in_progress: false,
                    retry_count: 0,
                }),
                running: AtomicBool::new(true),
                store,
                max_buffer_size,
                max_retries,
                flush_interval,
            }),
        }
    }

    pub async fn submit(&self, record: TelemetryRecord) -> Result<(), BatcherError> {
        if !self.inner.running.load(Ordering::SeqCst) {
            return Err(BatcherError::Stopped);
        }
        if record.tenant_id <= 0 {
            return Err(BatcherError::InvalidArgument("tenant_id must be positive".into()));
        }

        let should_flush = {
            let mut state = self.inner.state.lock().expect("batcher state poisoned");
            state.buffer.push_back(record);
            state.buffer.len() >= self.inner.max_buffer_size && !state.flush_in_progress
        };

        if should_flush {
            self.flush().await;
        }
        Ok(())
    }

    /// Idempotent, single-flight. A no-op if a flush is already running or
    /// the buffer is empty.
    pub async fn flush(&self) {
        let batch = {
            let mut state = self.inner.state.lock().expect("batcher state poisoned");
            if state.flush_in_progress || state.buffer.is_empty() {
                return;
            }
            state.flush_in_progress = true;
            std::mem::take(&mut state.buffer).into_iter().collect::<Vec<_>>()
        };

        let store = self.inner.store.clone();
        let batch_for_insert = batch.clone();
        let result =
            tokio::task::spawn_blocking(move || store.insert_batch(&batch_for_insert)).await;

        let mut state = self.inner.state.lock().expect("batcher state poisoned");
        match result {
            Ok(Ok(())) => {
                state.retry_count = 0;
                state.flush_in_progress = false;
                debug!(count = batch.len(), "flushed telemetry batch");
            }
            Ok(Err(err)) => {
                state.retry_count += 1;
                if state.retry_count < self.inner.max_retries {
                    warn!(
                        error = %err,
                        attempt = state.retry_count,
                        count = batch.len(),
                        "telemetry flush failed, will retry"
                    );
                    prepend(&mut state.buffer, batch);
                } else {
                    error!(
                        error = %err,
                        dropped = batch.len(),
                        "telemetry flush exhausted retries, dropping batch"
                    );
                    state.retry_count = 0;
                }
                state.flush_in_progress = false;
            }
            Err(join_err) => {
                state.retry_count += 1;
                error!(error = %join_err, "telemetry flush task panicked");
                if state.retry_count < self.inner.max_retries {
                    prepend(&mut state.buffer, batch);
                } else {
                    state.retry_count = 0;
                }
                state.flush_in_progress = false;
            }
        }
    }

    /// Spawns the periodic flush task. Errors escaping a tick are already
    /// swallowed inside `flush` itself.
    pub fn start(&self) -> JoinHandle<()> {
        let batcher = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(batcher.inner.flush_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !batcher.inner.running.load(Ordering::SeqCst) {
                    return;
                }
                batcher.flush().await;
            }
        })
    }

    /// Marks the batcher stopped and drains the buffer with one final
    /// flush. If that flush itself fails, the ordinary retry/drop envelope
    /// applies — `stop` only ever attempts the one flush.
    pub async fn stop(&self, scheduler: JoinHandle<()>) {
        self.inner.running.store(false, Ordering::SeqCst);
        scheduler.abort();
        self.flush().await;
    }

    #[cfg(test)]
    pub fn buffer_len(&self) -> usize {
        self.inner.state.lock().unwrap().buffer.len()
    }
}

fn prepend(buffer: &mut VecDeque<TelemetryRecord>, batch: Vec<TelemetryRecord>) {
    for record in batch.into_iter().rev() {
        buffer.push_front(record);
    }
}
