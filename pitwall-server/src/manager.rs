//! Race session manager
//!
//! This module handles:
//! - Starting and pausing the telemetry and strategy timers
//! - Switching the selected driver
//! - Resetting the session
//!
//! Both timers run under one cancellation token. Pausing or switching
//! drivers cancels it, so no tick from an old session runs after the call
//! returns. Transitions hold the `racing` write guard for their whole
//! duration, so timers are only ever spawned while it reads true.

use crate::state::AppState;
use crate::strategy::StrategyOrigin;
use pitwall_core::{fallback_strategy, DriverProfile};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown driver: {0}")]
    UnknownDriver(String),
}

/// Start streaming. Returns false if the session was already racing.
pub async fn start(state: &AppState) -> bool {
    let mut racing = state.racing.write().await;
    if *racing {
        return false;
    }
    *racing = true;

    spawn_timers(state).await;
    info!("Race started");
    true
}

/// Stop both timers
pub async fn pause(state: &AppState) {
    let mut racing = state.racing.write().await;
    *racing = false;
    cancel_timers(state).await;
    info!("Race paused");
}

/// Switch the streamed car. Timers are stopped before the old streamer is
/// dropped and restarted afterwards if the session was racing. Strategy
/// requests still in flight for the previous car are voided.
pub async fn select_driver(state: &AppState, driver_id: &str) -> Result<DriverProfile, SessionError> {
    let driver = state
        .drivers
        .iter()
        .find(|d| d.id == driver_id)
        .cloned()
        .ok_or_else(|| SessionError::UnknownDriver(driver_id.to_string()))?;

    let racing = state.racing.write().await;
    cancel_timers(state).await;
    state.orchestrator.lock().await.select_driver(driver.clone());
    state.strategy.invalidate();

    if *racing {
        spawn_timers(state).await;
    }

    Ok(driver)
}

/// Rewind the recording and clear the telemetry history
pub async fn reset(state: &AppState) {
    state.orchestrator.lock().await.reset();
    info!("Race reset");
}

pub async fn is_racing(state: &AppState) -> bool {
    *state.racing.read().await
}

async fn cancel_timers(state: &AppState) {
    let mut cancel = state.race_cancel.write().await;
    if let Some(token) = cancel.take() {
        token.cancel();
    }
}

async fn spawn_timers(state: &AppState) {
    let token = CancellationToken::new();
    {
        let mut cancel = state.race_cancel.write().await;
        if let Some(old) = cancel.replace(token.clone()) {
            old.cancel();
        }
    }

    tokio::spawn(telemetry_loop(state.clone(), token.clone()));
    tokio::spawn(strategy_loop(state.clone(), token));
}

async fn telemetry_loop(state: AppState, token: CancellationToken) {
    let period = Duration::from_millis(state.config.telemetry_interval_ms.max(1));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!("Telemetry loop started");

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let point = {
            let mut orchestrator = state.orchestrator.lock().await;
            // A driver switch may have happened while waiting for the lock
            if token.is_cancelled() {
                break;
            }
            orchestrator.tick(chrono::Utc::now().timestamp_millis())
        };

        if let Some(point) = point {
            // No receivers is fine, they get the next point
            let _ = state.telemetry_tx.send(point);

            // First recommendation as soon as there is enough history
            if state.strategy.awaiting_first() {
                let _ = request_strategy(&state).await;
            }
        }
    }

    debug!("Telemetry loop ended");
}

async fn strategy_loop(state: AppState, token: CancellationToken) {
    let period = Duration::from_millis(state.config.strategy_interval_ms.max(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!("Strategy loop started");

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // In-flight requests are left running; stale ones are discarded
        let _ = request_strategy(&state).await;
    }

    debug!("Strategy loop ended");
}

/// Take a strategy ticket and request a recommendation in the background.
/// Returns `None` without requesting when there is not enough telemetry yet.
pub async fn request_strategy(state: &AppState) -> Option<JoinHandle<()>> {
    let (metrics, latest, driver_name) = {
        let orchestrator = state.orchestrator.lock().await;
        if orchestrator.history_len() < state.config.min_history_for_strategy {
            return None;
        }
        let metrics = orchestrator.metrics()?;
        let latest = orchestrator.latest()?.clone();
        (metrics, latest, orchestrator.driver().name.clone())
    };

    let ticket = state.strategy.issue();
    let provider = state.provider.clone();
    let board = state.strategy.clone();

    Some(tokio::spawn(async move {
        let (insight, origin) = match provider
            .request_strategy(&metrics, &latest, &driver_name)
            .await
        {
            Ok(insight) => (insight, StrategyOrigin::Llm),
            Err(e) => {
                warn!("Strategy from {} failed, using rule-based call: {}", provider.name(), e);
                (fallback_strategy(&metrics), StrategyOrigin::Fallback)
            }
        };

        if board.apply(ticket, insight, origin) {
            info!(
                "Strategy #{} for {} applied ({:?})",
                ticket.generation(),
                driver_name,
                origin
            );
        }
    }))
}
