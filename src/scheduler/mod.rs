//! Periodic trade scheduler.
//!
//! Each firing walks a small state machine: pause the trailing-stop
//! collaborator, hold the processing window, wait out a cancellation-polled
//! delay, then either yield to an alert or run the scheduled trade pass.
//! Alerts always win: the webhook path raises the cancel signal and this
//! scheduler observes it within one tick.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

use crate::coordinator::ExecutionCoordinator;
use crate::domain::TradeIntent;
use crate::error::Result;
use crate::exchange::BitgetClient;

/// Trailing-stop collaborator. Pausing its candle-based timer keeps it from
/// acting in the middle of a pending scheduled pass.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrailingStopControl: Send + Sync {
    async fn pause_for_candle(&self);
}

/// The trade work a surviving firing executes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduledPass: Send + Sync {
    async fn run(&self) -> Result<()>;
}

/// Production pass: submits the configured periodic trade through the
/// exchange client, the same path alert-driven execution uses.
pub struct PeriodicTradePass {
    client: Arc<BitgetClient>,
    intent: TradeIntent,
}

impl PeriodicTradePass {
    pub fn new(client: Arc<BitgetClient>, intent: TradeIntent) -> Self {
        Self { client, intent }
    }
}

#[async_trait]
impl ScheduledPass for PeriodicTradePass {
    async fn run(&self) -> Result<()> {
        self.client.place_trade(&self.intent).await.map(|_| ())
    }
}

/// Outcome of a single scheduler firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiringOutcome {
    /// An alert arrived during the delay window; the pass did not run
    Cancelled,
    /// The pass ran to completion
    Completed,
    /// The pass ran and failed; the fault was logged and contained
    Faulted,
}

/// Recurring delayed execution pass
pub struct PeriodicScheduler {
    coordinator: Arc<ExecutionCoordinator>,
    pass: Arc<dyn ScheduledPass>,
    trailing_stop: Option<Arc<dyn TrailingStopControl>>,
    interval: Duration,
    tick: Duration,
    delay_ticks: u32,
}

impl PeriodicScheduler {
    pub fn new(
        coordinator: Arc<ExecutionCoordinator>,
        pass: Arc<dyn ScheduledPass>,
        interval: Duration,
        tick: Duration,
        delay_ticks: u32,
    ) -> Self {
        Self {
            coordinator,
            pass,
            trailing_stop: None,
            interval,
            tick,
            delay_ticks,
        }
    }

    pub fn with_trailing_stop(mut self, trailing_stop: Arc<dyn TrailingStopControl>) -> Self {
        self.trailing_stop = Some(trailing_stop);
        self
    }

    /// Run firings forever, one per interval. The surrounding task is
    /// aborted at shutdown; the processing guard cleans up even then.
    pub async fn run(self: Arc<Self>) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so the first firing
        // happens one full interval after startup.
        interval.tick().await;

        loop {
            interval.tick().await;
            self.fire().await;
        }
    }

    /// Execute one firing of the scheduler state machine.
    pub async fn fire(&self) -> FiringOutcome {
        info!("scheduler firing");

        if let Some(trailing_stop) = &self.trailing_stop {
            trailing_stop.pause_for_candle().await;
        }

        let _guard = self.coordinator.begin_processing();

        // Wait out the delay window, yielding to any incoming alert.
        // Only this loop ever consumes the cancel signal.
        for _ in 0..self.delay_ticks {
            if self.coordinator.take_cancel() {
                info!("scheduled pass cancelled by incoming alert");
                return FiringOutcome::Cancelled;
            }
            time::sleep(self.tick).await;
        }

        match self.pass.run().await {
            Ok(()) => FiringOutcome::Completed,
            Err(e) => {
                error!("Scheduled pass failed: {}", e);
                FiringOutcome::Faulted
            }
        }
        // guard drop resets processing-active on every exit path
    }
}
