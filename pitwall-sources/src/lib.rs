//! Telemetry sources for Pitwall
//!
//! Data access, recorded-frame replay with physical-state estimation, and
//! synthetic frame generation for vehicles without recordings.

pub mod estimator;
pub mod loader;
pub mod store;
pub mod streamer;
pub mod synthetic;

pub use estimator::{Estimator, FrameReadings, PhysicalState};
pub use loader::FrameSourceLoader;
pub use store::{DataStore, DirectoryStore, MemoryStore, StoreError};
pub use streamer::{FrameStreamer, StreamerState, StreamerStatus};
pub use synthetic::SyntheticGenerator;
