//! Bounded telemetry history

use pitwall_core::TelemetryPoint;
use std::collections::VecDeque;

/// Most recent telemetry points, oldest first. Pushing past capacity drops
/// the oldest point.
#[derive(Debug, Clone)]
pub struct TelemetryHistory {
    capacity: usize,
    points: VecDeque<TelemetryPoint>,
}

impl TelemetryHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: TelemetryPoint) {
        while self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn latest(&self) -> Option<&TelemetryPoint> {
        self.points.back()
    }

    /// The history as one ordered slice
    pub fn window(&mut self) -> &[TelemetryPoint] {
        self.points.make_contiguous()
    }

    pub fn to_vec(&self) -> Vec<TelemetryPoint> {
        self.points.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
