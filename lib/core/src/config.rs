use crate::memoize::MemoPolicy;
use crate::pace::Pace;
use crate::throttle::MAX_CONCURRENCY;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine configuration.
///
/// Durations are milliseconds. For `expire`, `throttle` and `timeout` a value
/// of `0` or absent disables the feature. For `wait`, absent disables pacing
/// and `0` yields to the scheduler between steps without sleeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JaccardConfig {
    /// Cache TTL for loaded logs and computed scores.
    pub expire: Option<u64>,
    /// Maximum concurrent loader / scorer invocations.
    pub throttle: Option<usize>,
    /// Caller-facing timeout per call; the call itself runs on in the background.
    pub timeout: Option<u64>,
    /// Treat (source, target) and (target, source) as distinct comparisons.
    pub direction: bool,
    /// Pause between enumeration steps.
    pub wait: Option<u64>,
    /// Share in-flight loads even when the cache is disabled.
    pub coalesce: bool,
}

impl JaccardConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: JaccardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(throttle) = self.throttle {
            if throttle > MAX_CONCURRENCY {
                return Err(Error::InvalidConfig(format!(
                    "throttle {} exceeds the maximum of {}",
                    throttle, MAX_CONCURRENCY
                )));
            }
        }
        Ok(())
    }

    pub fn expire(&self) -> Option<Duration> {
        millis(self.expire)
    }

    pub fn timeout(&self) -> Option<Duration> {
        millis(self.timeout)
    }

    /// Effective concurrency; `0` means unbounded.
    pub fn concurrency(&self) -> usize {
        self.throttle.unwrap_or(0)
    }

    pub fn pace(&self) -> Pace {
        Pace::from_millis(self.wait)
    }

    pub fn memo_policy(&self) -> MemoPolicy {
        MemoPolicy::new(self.expire(), self.coalesce)
    }
}

fn millis(value: Option<u64>) -> Option<Duration> {
    value.filter(|&ms| ms > 0).map(Duration::from_millis)
}
