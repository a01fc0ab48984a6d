//! The control loop: read, smooth, interpolate, actuate, sleep
//!
//! Runs on one logical thread. A fault inside an iteration is logged and
//! followed by [`RECOVERY_INTERVAL`] instead of the configured interval; the
//! loop only stops when asked to, and releases the hardware exactly once.

use crate::actuators::Actuator;
use crate::config::MonitorConfig;
use crate::curve::{self, DutyPercent};
use crate::devices::Hardware;
use crate::errors::{MonitorError, Result};
use crate::sensors::{self, Readings, SensorClass, Temperature};
use crate::smoothing::SmoothingFilter;
use futures_util::FutureExt;
use log::{debug, error, info, warn};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

/// Pause after an iteration that faulted.
pub const RECOVERY_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// Terminal once cleanup has run
    Stopping,
}

/// One actuator command issued during an iteration
#[derive(Debug, Clone, PartialEq)]
pub struct Actuation {
    pub actuator: Actuator,
    pub temperature: Temperature,
    pub duty: DutyPercent,
    /// False when the controller rejected the command
    pub applied: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IterationReport {
    /// Smoothed values; `None` for classes that produced nothing
    pub readings: Readings,
    pub actuations: Vec<Actuation>,
}

pub struct ControlLoop {
    config: MonitorConfig,
    filter: SmoothingFilter,
    hardware: Hardware,
    state: LoopState,
    cleaned_up: bool,
}

impl ControlLoop {
    pub fn new(config: MonitorConfig, hardware: Hardware) -> Self {
        let filter = SmoothingFilter::from_config(&config.monitoring);
        Self {
            config,
            filter,
            hardware,
            state: LoopState::Running,
            cleaned_up: false,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn filter(&self) -> &SmoothingFilter {
        &self.filter
    }

    pub fn hardware(&self) -> &Hardware {
        &self.hardware
    }

    /// Run until `shutdown` turns true, then clean up.
    ///
    /// The flag is checked between iterations; it also cuts the sleep short.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting temperature monitoring");

        while self.state == LoopState::Running {
            if *shutdown.borrow() {
                break;
            }

            let pause = match self.step().await {
                Ok(_) => self.config.monitoring.interval_duration(),
                Err(e) => {
                    error!("Error in monitoring loop: {}", e);
                    RECOVERY_INTERVAL
                }
            };
            Self::pause(pause, &mut shutdown).await;
        }

        self.shutdown();
    }

    async fn pause(duration: Duration, shutdown: &mut watch::Receiver<bool>) {
        let timer = sleep(duration);
        tokio::pin!(timer);

        tokio::select! {
            _ = &mut timer => {}
            changed = shutdown.changed() => {
                // Sender gone: nobody can ask us to stop early any more
                if changed.is_err() {
                    timer.await;
                }
            }
        }
    }

    /// One iteration with panics converted to [`MonitorError::LoopFault`].
    pub async fn step(&mut self) -> Result<IterationReport> {
        AssertUnwindSafe(self.run_iteration())
            .catch_unwind()
            .await
            .map_err(|panic| MonitorError::LoopFault(panic_message(panic.as_ref())))
    }

    /// Read every sensor, smooth what was read, log it, and drive each
    /// actuator whose inputs are present.
    pub async fn run_iteration(&mut self) -> IterationReport {
        let mut raw = Readings::default();
        for class in SensorClass::ALL {
            match sensors::read(class, &mut self.hardware).await {
                Ok(temp) => raw.set(class, Some(temp)),
                Err(e) if e.is_unavailable() => debug!("{}", e),
                Err(e) => error!("Error getting {} temperature: {}", class, e),
            }
        }

        let mut readings = Readings::default();
        for class in SensorClass::ALL {
            if let Some(temp) = raw.get(class) {
                readings.set(class, Some(self.filter.smooth(class, temp)));
            }
        }

        info!("Temps - {}", readings);
        self.check_limits(&readings);

        let mut actuations = Vec::new();
        for actuator in Actuator::ALL {
            let Some(temperature) = actuator.demand(&readings) else {
                continue;
            };
            if !actuator.is_connected(&self.hardware) {
                debug!("No controller for {}, skipping", actuator);
                continue;
            }
            actuations.push(self.actuate(actuator, temperature).await);
        }

        IterationReport {
            readings,
            actuations,
        }
    }

    async fn actuate(&mut self, actuator: Actuator, temperature: Temperature) -> Actuation {
        let duty = curve::interpolate_or_safe(
            temperature,
            actuator.profile(&self.config),
            actuator.curve_name(),
        );

        let applied = match actuator.set_speed(duty, &mut self.hardware).await {
            Ok(()) => {
                info!("Set {} to {}% for {:.1}°C", actuator, duty, temperature);
                true
            }
            Err(e) => {
                warn!("Error setting {} speed: {}", actuator, e);
                false
            }
        };

        Actuation {
            actuator,
            temperature,
            duty,
            applied,
        }
    }

    fn check_limits(&self, readings: &Readings) {
        for class in SensorClass::ALL {
            let Some(temp) = readings.get(class) else {
                continue;
            };
            let limit = self.config.temperature_limits.limit_for(class);
            if temp > limit {
                warn!("{} temperature {:.1}°C exceeds limit {:.1}°C", class, temp, limit);
            }
        }
    }

    /// Move to [`LoopState::Stopping`] and release the hardware.
    ///
    /// Safe to call more than once; cleanup only happens the first time.
    pub fn shutdown(&mut self) {
        self.state = LoopState::Stopping;
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;
        self.hardware.release();
        info!("Cleanup completed");
    }
}

impl Drop for ControlLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
