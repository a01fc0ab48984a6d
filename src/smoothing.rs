//! Exponential smoothing of sensor readings

use crate::config::MonitoringConfig;
use crate::sensors::{SensorClass, Temperature};
use std::collections::VecDeque;

/// Extra damping applied to the noisy CPU and GPU sensors.
pub const CPU_GPU_DAMPING: f64 = 0.5;

/// Per-class exponential moving average with a bounded history.
///
/// Only the control loop thread touches it.
#[derive(Debug, Clone)]
pub struct SmoothingFilter {
    factor: f64,
    history_size: usize,
    histories: [VecDeque<Temperature>; 4],
}

impl SmoothingFilter {
    /// `history_size` comes from a validated config and is at least 1.
    pub fn new(factor: f64, history_size: usize) -> Self {
        Self {
            factor,
            history_size,
            histories: Default::default(),
        }
    }

    pub fn from_config(monitoring: &MonitoringConfig) -> Self {
        Self::new(monitoring.smoothing_factor, monitoring.history_size)
    }

    /// α for a class: CPU and GPU get α × [`CPU_GPU_DAMPING`].
    pub fn effective_factor(&self, class: SensorClass) -> f64 {
        match class {
            SensorClass::Cpu | SensorClass::Gpu => self.factor * CPU_GPU_DAMPING,
            SensorClass::Coolant | SensorClass::Motherboard => self.factor,
        }
    }

    /// Smooth a raw reading and record the result.
    ///
    /// The first reading of a class is returned as-is and seeds its history.
    pub fn smooth(&mut self, class: SensorClass, raw: Temperature) -> Temperature {
        let alpha = self.effective_factor(class);
        let history = &mut self.histories[class.index()];

        let Some(&previous) = history.back() else {
            history.push_back(raw);
            return raw;
        };

        let smoothed = alpha * raw + (1.0 - alpha) * previous;
        if history.len() >= self.history_size {
            history.pop_front();
        }
        history.push_back(smoothed);
        smoothed
    }

    /// Smoothed values for a class, oldest first.
    pub fn history(&self, class: SensorClass) -> &VecDeque<Temperature> {
        &self.histories[class.index()]
    }

    pub fn latest(&self, class: SensorClass) -> Option<Temperature> {
        self.history(class).back().copied()
    }
}
