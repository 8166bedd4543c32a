use std::time::Duration;

use super::ConfigError;

/// Constant arrival rate scenario.
///
/// `rate` iterations are started per `time_unit` for the given `duration`,
/// using a pool of virtual users (VUs) that starts with `pre_allocated_vus`
/// and can grow up to `max_vus` when iterations take longer than the
/// inter-arrival interval.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    rate: u32,
    time_unit: Duration,
    duration: Duration,
    pre_allocated_vus: u32,
    max_vus: u32,
    graceful_stop: Duration,
}

impl ScenarioConfig {
    pub const DEFAULT_RATE: u32 = 1000;
    pub const DEFAULT_DURATION: Duration = Duration::from_secs(30);
    pub const DEFAULT_PRE_ALLOCATED_VUS: u32 = 200;
    pub const DEFAULT_MAX_VUS: u32 = 400;
    pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

    /// The rate is always expressed per second.
    pub const TIME_UNIT: Duration = Duration::from_secs(1);

    pub fn try_new(
        rate: u32,
        duration: Duration,
        pre_allocated_vus: u32,
        max_vus: u32,
    ) -> Result<Self, ConfigError> {
        if rate == 0 {
            return Err(ConfigError::ZeroRate);
        }
        if duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if max_vus == 0 {
            return Err(ConfigError::ZeroMaxVus);
        }
        if pre_allocated_vus > max_vus {
            return Err(ConfigError::PreAllocatedVusExceedMax {
                pre_allocated: pre_allocated_vus,
                max: max_vus,
            });
        }

        Ok(Self {
            rate,
            time_unit: Self::TIME_UNIT,
            duration,
            pre_allocated_vus,
            max_vus,
            graceful_stop: Self::DEFAULT_GRACEFUL_STOP,
        })
    }

    /// Maximum time in-flight iterations are awaited once `duration` elapsed.
    pub fn with_graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.graceful_stop = graceful_stop;
        self
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn time_unit(&self) -> Duration {
        self.time_unit
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn pre_allocated_vus(&self) -> u32 {
        self.pre_allocated_vus
    }

    pub fn max_vus(&self) -> u32 {
        self.max_vus
    }

    pub fn graceful_stop(&self) -> Duration {
        self.graceful_stop
    }

    /// Time between two consecutive arrivals.
    pub fn arrival_interval(&self) -> Duration {
        self.time_unit / self.rate
    }

    /// Number of iterations started when no arrival is dropped.
    pub fn expected_iterations(&self) -> u64 {
        let arrivals = self.duration.as_nanos() * u128::from(self.rate);
        arrivals.div_ceil(self.time_unit.as_nanos()) as u64
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            rate: Self::DEFAULT_RATE,
            time_unit: Self::TIME_UNIT,
            duration: Self::DEFAULT_DURATION,
            pre_allocated_vus: Self::DEFAULT_PRE_ALLOCATED_VUS,
            max_vus: Self::DEFAULT_MAX_VUS,
            graceful_stop: Self::DEFAULT_GRACEFUL_STOP,
        }
    }
}
