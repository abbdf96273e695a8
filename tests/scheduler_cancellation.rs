//! Coordination protocol tests: alert-driven ingestion racing the periodic
//! scheduler over the shared coordinator, without the HTTP layer.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use tvgate::coordinator::ExecutionCoordinator;
use tvgate::ingest::AlertIngestor;
use tvgate::scheduler::{FiringOutcome, PeriodicScheduler, ScheduledPass, TrailingStopControl};

const KEY: &str = "webhook-secret";
const TICK: Duration = Duration::from_millis(5);

#[derive(Default)]
struct CountingPass {
    runs: AtomicU32,
}

#[async_trait]
impl ScheduledPass for CountingPass {
    async fn run(&self) -> tvgate::Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct PauseProbe {
    pauses: AtomicU32,
}

#[async_trait]
impl TrailingStopControl for PauseProbe {
    async fn pause_for_candle(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

fn valid_alert() -> String {
    format!(
        r#"{{"api_key":"{KEY}","symbol":"BTCUSDT","side":"buy","trade_side":"open","size":"0.001"}}"#
    )
}

#[tokio::test]
async fn webhook_alert_preempts_a_pending_scheduled_pass() {
    let coordinator = Arc::new(ExecutionCoordinator::new());
    let ingestor = AlertIngestor::new(KEY.to_string(), coordinator.clone());

    let pass = Arc::new(CountingPass::default());
    let scheduler = Arc::new(PeriodicScheduler::new(
        coordinator.clone(),
        pass.clone(),
        Duration::from_secs(3600),
        TICK,
        1000,
    ));

    let firing = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.fire().await }
    });

    // Let the scheduler settle into its delay window, then deliver the alert
    // through the same path the webhook handler uses
    sleep(TICK * 4).await;
    assert!(coordinator.is_processing());
    ingestor
        .ingest(valid_alert().as_bytes())
        .expect("alert accepted");

    let outcome = timeout(Duration::from_secs(1), firing)
        .await
        .expect("firing must yield within a tick")
        .expect("firing task must not panic");

    assert_eq!(outcome, FiringOutcome::Cancelled);
    assert_eq!(pass.runs.load(Ordering::SeqCst), 0);

    // Edge-triggered: the signal was consumed by the cancelled firing
    assert!(!coordinator.cancel_pending());
    assert!(!coordinator.is_processing());
}

#[tokio::test]
async fn quiet_intervals_keep_executing_passes() {
    let coordinator = Arc::new(ExecutionCoordinator::new());
    let pass = Arc::new(CountingPass::default());
    let scheduler = Arc::new(PeriodicScheduler::new(
        coordinator.clone(),
        pass.clone(),
        Duration::from_millis(20),
        Duration::from_millis(1),
        2,
    ));

    let runner = tokio::spawn(scheduler.run());

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while pass.runs.load(Ordering::SeqCst) < 2 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "scheduler should have fired at least twice"
        );
        sleep(Duration::from_millis(5)).await;
    }

    runner.abort();
    let _ = runner.await;

    // Cleanup holds even when the task is torn down mid-cycle
    sleep(Duration::from_millis(10)).await;
    assert!(!coordinator.is_processing());
}

#[tokio::test]
async fn trailing_stop_pause_happens_once_per_firing() {
    let coordinator = Arc::new(ExecutionCoordinator::new());
    let pass = Arc::new(CountingPass::default());
    let probe = Arc::new(PauseProbe::default());

    let scheduler = Arc::new(
        PeriodicScheduler::new(
            coordinator,
            pass.clone(),
            Duration::from_secs(3600),
            Duration::from_millis(1),
            1,
        )
        .with_trailing_stop(probe.clone()),
    );

    assert_eq!(scheduler.fire().await, FiringOutcome::Completed);
    assert_eq!(scheduler.fire().await, FiringOutcome::Completed);

    assert_eq!(probe.pauses.load(Ordering::SeqCst), 2);
    assert_eq!(pass.runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn alerts_arriving_between_firings_cancel_only_the_next_one() {
    let coordinator = Arc::new(ExecutionCoordinator::new());
    let ingestor = AlertIngestor::new(KEY.to_string(), coordinator.clone());
    let pass = Arc::new(CountingPass::default());
    let scheduler = Arc::new(PeriodicScheduler::new(
        coordinator.clone(),
        pass.clone(),
        Duration::from_secs(3600),
        Duration::from_millis(1),
        2,
    ));

    ingestor
        .ingest(valid_alert().as_bytes())
        .expect("alert accepted");

    // First firing consumes the pending signal and yields
    assert_eq!(scheduler.fire().await, FiringOutcome::Cancelled);
    // The next quiet firing proceeds normally
    assert_eq!(scheduler.fire().await, FiringOutcome::Completed);
    assert_eq!(pass.runs.load(Ordering::SeqCst), 1);
}
