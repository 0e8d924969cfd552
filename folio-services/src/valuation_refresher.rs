//! Valuation refresher
//!
//! Background service that re-prices the portfolio with one batch quote
//! lookup per cycle and publishes the resulting snapshot. Cycles run on
//! activation, on a fixed interval, on demand and whenever the portfolio
//! inputs change. At most one cycle is in flight; anything requested while
//! one runs is folded into it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use folio_core::{
    collect_symbols, resolve_total_value, PortfolioSnapshot, PriceQuoteProvider, ValuationView,
};

use crate::error::RefreshError;
use crate::inputs::PortfolioInputs;

/// Configuration for the valuation refresher
#[derive(Debug, Clone)]
pub struct RefresherConfig {
    /// Time between scheduled cycles
    pub refresh_interval: Duration,
    /// Upper bound on a single batch price request
    pub price_timeout: Duration,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(120),
            price_timeout: Duration::from_secs(15),
        }
    }
}

/// Why a cycle did not touch the price provider or did not publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    NoHoldings,
    InFlight,
    /// The resolved total was zero or negative
    NonPositiveTotal,
    TornDown,
}

/// Result of one valuation cycle
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Published(PortfolioSnapshot),
    Skipped(SkipReason),
    /// The batch request failed; the previous snapshot stays current
    Aborted(RefreshError),
}

impl CycleOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, CycleOutcome::Published(_))
    }
}

/// Marks a cycle as in flight for as long as it lives.
///
/// Dropping it, including when the cycle future is cancelled, clears both
/// the in-flight flag and the updating indicator.
struct CycleGuard<'a> {
    in_flight: &'a AtomicBool,
    view: &'a watch::Sender<ValuationView>,
}

impl<'a> CycleGuard<'a> {
    fn acquire(in_flight: &'a AtomicBool, view: &'a watch::Sender<ValuationView>) -> Option<Self> {
        in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self { in_flight, view })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.view
            .send_if_modified(|view| std::mem::replace(&mut view.is_updating, false));
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Re-prices the portfolio and publishes snapshots
pub struct ValuationRefresher {
    prices: Arc<dyn PriceQuoteProvider>,
    inputs: watch::Receiver<PortfolioInputs>,
    view: watch::Sender<ValuationView>,
    config: RefresherConfig,
    in_flight: AtomicBool,
    torn_down: AtomicBool,
}

impl ValuationRefresher {
    pub fn new(
        prices: Arc<dyn PriceQuoteProvider>,
        inputs: watch::Receiver<PortfolioInputs>,
        config: RefresherConfig,
    ) -> Self {
        let (view, _rx) = watch::channel(ValuationView::default());
        Self {
            prices,
            inputs,
            view,
            config,
            in_flight: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Latest published state
    pub fn view(&self) -> ValuationView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ValuationView> {
        self.view.subscribe()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one valuation cycle.
    ///
    /// Reads the current inputs, makes a single batch price request and
    /// folds the quotes into the holdings. A failed or timed out request
    /// leaves the previous snapshot in place.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> CycleOutcome {
        if self.torn_down.load(Ordering::Acquire) {
            return CycleOutcome::Skipped(SkipReason::TornDown);
        }

        let Some(_guard) = CycleGuard::acquire(&self.in_flight, &self.view) else {
            debug!("Valuation cycle already in flight");
            return CycleOutcome::Skipped(SkipReason::InFlight);
        };

        let inputs = self.inputs.borrow().clone();
        if inputs.is_offline {
            debug!("Offline, skipping valuation cycle");
            return CycleOutcome::Skipped(SkipReason::Offline);
        }

        let Some(exchanges) = inputs.priceable_holdings().cloned() else {
            debug!("No holdings to value, skipping valuation cycle");
            return CycleOutcome::Skipped(SkipReason::NoHoldings);
        };

        self.view.send_modify(|view| view.is_updating = true);

        let symbols = collect_symbols(&exchanges);
        debug!(
            "Requesting {} quotes from {}",
            symbols.len(),
            self.prices.name()
        );

        let prices = match tokio::time::timeout(
            self.config.price_timeout,
            self.prices.get_prices(&symbols),
        )
        .await
        {
            Ok(Ok(prices)) => prices,
            Ok(Err(e)) => return CycleOutcome::Aborted(RefreshError::PriceFetch(e)),
            Err(_) => {
                return CycleOutcome::Aborted(RefreshError::Timeout(self.config.price_timeout))
            }
        };

        let valuation = match resolve_total_value(&exchanges, &prices) {
            Ok(valuation) => valuation,
            Err(e) => return CycleOutcome::Aborted(RefreshError::Overflow(e)),
        };
        for miss in &valuation.misses {
            debug!(
                "Using last known value {} for {} on {} ({:?})",
                miss.fallback_value, miss.symbol, miss.exchange_id, miss.reason
            );
        }

        if valuation.total_value <= Decimal::ZERO {
            return CycleOutcome::Skipped(SkipReason::NonPositiveTotal);
        }

        if self.torn_down.load(Ordering::Acquire) {
            return CycleOutcome::Skipped(SkipReason::TornDown);
        }

        let snapshot =
            PortfolioSnapshot::new(valuation.total_value, inputs.initial_capital, Utc::now());
        self.view
            .send_replace(ValuationView::published(snapshot.clone()));

        info!(
            "Portfolio valued at {} ({} fresh, {} fallback)",
            snapshot.total_value,
            valuation.priced,
            valuation.misses.len()
        );

        CycleOutcome::Published(snapshot)
    }

    /// Start the background loop
    pub fn spawn(self) -> RefresherHandle {
        let refresher = Arc::new(self);
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(refresher.clone().run(trigger_rx, shutdown_rx));

        RefresherHandle {
            refresher,
            trigger_tx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    async fn run(
        self: Arc<Self>,
        mut trigger_rx: mpsc::Receiver<()>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        let period = self.config.refresh_interval;
        info!("Starting valuation refresher with {:?} interval", period);

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut inputs = self.inputs.clone();
        inputs.borrow_and_update();

        // Activation runs a cycle straight away
        let mut due = true;

        loop {
            if !due {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => debug!("Refresh interval elapsed"),
                    Some(()) = trigger_rx.recv() => debug!("Manual refresh requested"),
                    changed = inputs.changed() => {
                        if changed.is_err() {
                            info!("Portfolio inputs closed");
                            break;
                        }
                        debug!("Portfolio inputs changed");
                    }
                }
            }
            due = false;

            // Anything queued so far is served by the cycle about to start.
            // Requests made once it finishes stay queued for the next one.
            while trigger_rx.try_recv().is_ok() {}

            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Discarding in-flight valuation cycle");
                    break;
                }
                outcome = self.run_cycle() => log_outcome(&outcome),
            }

            ticker.reset();
        }

        info!("Valuation refresher stopped");
    }
}

fn log_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Published(_) => {}
        CycleOutcome::Skipped(reason) => debug!("Valuation cycle skipped: {:?}", reason),
        CycleOutcome::Aborted(e) => warn!("Valuation cycle aborted, keeping last snapshot: {}", e),
    }
}

/// Owner of a running refresher. Dropping it stops the loop.
pub struct RefresherHandle {
    refresher: Arc<ValuationRefresher>,
    trigger_tx: mpsc::Sender<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl RefresherHandle {
    /// Ask for a cycle now.
    ///
    /// Returns false when the request was folded into a cycle that is
    /// already running or queued.
    pub fn request_refresh(&self) -> bool {
        if self.refresher.is_in_flight() {
            debug!("Refresh requested while a cycle is in flight");
            return false;
        }

        match self.trigger_tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => false,
            Err(TrySendError::Closed(())) => {
                warn!("Refresh requested after the refresher stopped");
                false
            }
        }
    }

    pub fn view(&self) -> ValuationView {
        self.refresher.view()
    }

    pub fn subscribe(&self) -> watch::Receiver<ValuationView> {
        self.refresher.subscribe()
    }

    /// Stop the loop and wait for it to exit.
    ///
    /// A cycle still waiting on prices is dropped and never publishes.
    pub async fn shutdown(mut self) {
        self.signal_shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Valuation refresher task failed: {}", e);
            }
        }
    }

    fn signal_shutdown(&mut self) {
        self.refresher.torn_down.store(true, Ordering::Release);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for RefresherHandle {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}
