//! Symbol routing table.
//! Read-mostly registry, keyed by symbol and created on first sight, that
//! spawns one worker task per symbol and fans bus messages into its mpsc
//! inbox.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::aggregator::worker::{SymbolWorker, WorkerInput};
use crate::bus::{MessageBus, CHANNEL_SIGNALS};
use crate::config::CmsConfig;
use crate::models::TradingSignal;
use crate::store::Store;

const INBOX_CAPACITY: usize = 256;

/// Read-mostly map from symbol to its worker's inbox. Workers are spawned
/// lazily the first time a symbol is seen and then live until `shutdown` is
/// called or the process exits.
pub struct SymbolRouter {
    inboxes: RwLock<HashMap<String, mpsc::Sender<WorkerInput>>>,
    bus: Arc<dyn MessageBus>,
    store: Arc<dyn Store>,
    cms_cfg: CmsConfig,
    shutdown: CancellationToken,
}

impl SymbolRouter {
    pub fn new(bus: Arc<dyn MessageBus>, store: Arc<dyn Store>, cms_cfg: CmsConfig) -> Self {
        Self {
            inboxes: RwLock::new(HashMap::new()),
            bus,
            store,
            cms_cfg,
            shutdown: CancellationToken::new(),
        }
    }

    /// Signals every spawned worker task to drain its inbox and stop. Workers
    /// finish processing whatever is already queued before exiting.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Routes `input` to the named symbol's worker, spawning the worker task
    /// on first sight.
    pub async fn route(&self, symbol: &str, input: WorkerInput) {
        let sender = self.sender_for(symbol).await;
        // The channel only closes if the worker task panicked; dropping the
        // message in that case is the right failure mode, not a crash here.
        let _ = sender.send(input).await;
    }

    async fn sender_for(&self, symbol: &str) -> mpsc::Sender<WorkerInput> {
        if let Some(sender) = self.inboxes.read().await.get(symbol) {
            return sender.clone();
        }
        let mut inboxes = self.inboxes.write().await;
        if let Some(sender) = inboxes.get(symbol) {
            return sender.clone();
        }
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        self.spawn_worker(symbol.to_string(), rx);
        inboxes.insert(symbol.to_string(), tx.clone());
        tx
    }

    fn spawn_worker(&self, symbol: String, mut rx: mpsc::Receiver<WorkerInput>) {
        let bus = self.bus.clone();
        let store = self.store.clone();
        let cms_cfg = self.cms_cfg.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let mut worker = SymbolWorker::new(symbol.clone(), cms_cfg);
            info!(symbol = %symbol, "aggregator worker started");
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        rx.close();
                        while let Ok(input) = rx.try_recv() {
                            if let Some(signal) = worker.apply(input) {
                                publish_signal(&bus, &store, signal).await;
                            }
                        }
                        break;
                    }
                    input = rx.recv() => {
                        match input {
                            Some(input) => {
                                if let Some(signal) = worker.apply(input) {
                                    publish_signal(&bus, &store, signal).await;
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
            info!(symbol = %symbol, "aggregator worker stopped");
        });
    }

    pub async fn known_symbols(&self) -> Vec<String> {
        self.inboxes.read().await.keys().cloned().collect()
    }
}

async fn publish_signal(bus: &Arc<dyn MessageBus>, store: &Arc<dyn Store>, signal: TradingSignal) {
    if let Ok(payload) = serde_json::to_value(&signal) {
        bus.publish(CHANNEL_SIGNALS, payload);
    }
    let _ = store.save_signal(signal).await;
}
