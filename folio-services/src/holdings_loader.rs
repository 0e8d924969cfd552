//! Holdings loader
//!
//! Polls the holdings provider and feeds the result into the portfolio
//! inputs. A network failure marks the portfolio offline; the next
//! successful load clears it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use folio_core::{FolioResult, HoldingsProvider, HoldingsState};

use crate::error::RetryError;
use crate::inputs::InputsHandle;

/// Configuration for the holdings loader
#[derive(Debug, Clone)]
pub struct HoldingsLoaderConfig {
    /// Time between scheduled reloads
    pub refresh_interval: Duration,
}

impl Default for HoldingsLoaderConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(300),
        }
    }
}

pub struct HoldingsLoader {
    provider: Arc<dyn HoldingsProvider>,
    inputs: InputsHandle,
    config: HoldingsLoaderConfig,
}

impl HoldingsLoader {
    pub fn new(
        provider: Arc<dyn HoldingsProvider>,
        inputs: InputsHandle,
        config: HoldingsLoaderConfig,
    ) -> Self {
        Self {
            provider,
            inputs,
            config,
        }
    }

    /// Load holdings once and publish the result.
    ///
    /// Returns the number of assets loaded.
    #[instrument(skip(self))]
    pub async fn load(&self) -> FolioResult<usize> {
        match self.provider.get_holdings().await {
            Ok(exchanges) => {
                let assets: usize = exchanges.iter().map(|e| e.assets.len()).sum();
                info!(
                    "Loaded {} assets on {} exchanges from {}",
                    assets,
                    exchanges.len(),
                    self.provider.name()
                );

                self.inputs.set_offline(false);
                self.inputs.set_holdings(HoldingsState::ready(exchanges));
                Ok(assets)
            }
            Err(e) => {
                warn!("Failed to load holdings from {}: {}", self.provider.name(), e);

                self.inputs.set_offline(e.is_network());
                self.inputs.set_holdings(HoldingsState::Failed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Start the background loop; the first load happens immediately
    pub fn spawn(self) -> HoldingsLoaderHandle {
        let inputs = self.inputs.clone();
        let loader = Arc::new(self);
        let (retry_tx, retry_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(loader.run(retry_rx, shutdown_rx));

        HoldingsLoaderHandle {
            inputs,
            retry_tx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    async fn run(
        self: Arc<Self>,
        mut retry_rx: mpsc::Receiver<()>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        info!(
            "Starting holdings loader with {:?} interval",
            self.config.refresh_interval
        );

        let mut ticker = interval(self.config.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => debug!("Holdings refresh due"),
                Some(()) = retry_rx.recv() => {
                    info!("Retrying holdings load");
                    ticker.reset();
                }
            }

            tokio::select! {
                _ = &mut shutdown_rx => break,
                // Failures are logged and published by `load`
                _ = self.load() => {}
            }
        }

        info!("Holdings loader stopped");
    }
}

/// Owner of a running holdings loader. Dropping it stops the loop.
pub struct HoldingsLoaderHandle {
    inputs: InputsHandle,
    retry_tx: mpsc::Sender<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl HoldingsLoaderHandle {
    /// Reload holdings now. Refused while offline.
    pub fn retry(&self) -> Result<(), RetryError> {
        if self.inputs.current().is_offline {
            return Err(RetryError::Offline);
        }

        match self.retry_tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => Ok(()),
            Err(TrySendError::Closed(())) => Err(RetryError::Stopped),
        }
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Holdings loader task failed: {}", e);
            }
        }
    }
}

impl Drop for HoldingsLoaderHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
