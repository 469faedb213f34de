//! Pitwall Server Library
//!
//! Exposes server components for integration testing.

pub mod api;
pub mod config;
pub mod history;
pub mod manager;
pub mod orchestrator;
pub mod state;
pub mod strategy;
