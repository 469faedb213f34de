//! Application state management

use crate::config::ServerConfig;
use crate::orchestrator::StreamOrchestrator;
use crate::strategy::{StrategyBoard, StrategyProvider};
use pitwall_core::{DriverProfile, TelemetryPoint};
use pitwall_sources::{DataStore, FrameSourceLoader};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,

    /// Selectable drivers; the first one is selected at startup
    pub drivers: Arc<Vec<DriverProfile>>,

    /// Owns the streamer of the selected driver and the telemetry history
    pub orchestrator: Arc<Mutex<StreamOrchestrator>>,

    /// Broadcast channel for telemetry points
    /// Multiple consumers can subscribe to receive points
    pub telemetry_tx: broadcast::Sender<TelemetryPoint>,

    pub strategy: Arc<StrategyBoard>,

    pub provider: Arc<dyn StrategyProvider>,

    pub racing: Arc<RwLock<bool>>,

    /// Cancellation token for the telemetry and strategy timers
    pub race_cancel: Arc<RwLock<Option<CancellationToken>>>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        store: impl DataStore + 'static,
        provider: Arc<dyn StrategyProvider>,
    ) -> Self {
        let loader = Arc::new(FrameSourceLoader::new(store));
        let drivers = roster(&config, &loader);
        let first = drivers
            .first()
            .cloned()
            .unwrap_or_else(|| crate::config::default_drivers().remove(0));

        let orchestrator = StreamOrchestrator::new(
            loader.clone(),
            first,
            config.history_capacity,
            config.fuel_capacity_kg,
        );

        // Create broadcast channel with capacity for 100 points
        let (telemetry_tx, _) = broadcast::channel(100);

        Self {
            config: Arc::new(config),
            drivers: Arc::new(drivers),
            orchestrator: Arc::new(Mutex::new(orchestrator)),
            telemetry_tx,
            strategy: Arc::new(StrategyBoard::new()),
            provider,
            racing: Arc::new(RwLock::new(false)),
            race_cancel: Arc::new(RwLock::new(None)),
        }
    }

    /// Subscribe to telemetry points
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryPoint> {
        self.telemetry_tx.subscribe()
    }
}

/// Drivers from the precomputed metrics if there are any, else the configured roster
fn roster(config: &ServerConfig, loader: &FrameSourceLoader) -> Vec<DriverProfile> {
    let precomputed = loader.load_precomputed_metrics();
    if precomputed.is_empty() {
        return config.drivers.clone();
    }

    info!("Using {} drivers from precomputed metrics", precomputed.len());
    precomputed.iter().map(|m| m.driver_profile()).collect()
}
