// Cooperative pacing between enumeration steps
use std::time::Duration;

/// What the engine does after each (source, target) step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pace {
    /// Continue immediately.
    #[default]
    Off,
    /// Hand control back to the scheduler once.
    Yield,
    /// Sleep for the given duration.
    Sleep(Duration),
}

impl Pace {
    /// `None` disables pacing, `Some(0)` yields, anything else sleeps.
    pub fn from_millis(wait: Option<u64>) -> Self {
        match wait {
            None => Pace::Off,
            Some(0) => Pace::Yield,
            Some(ms) => Pace::Sleep(Duration::from_millis(ms)),
        }
    }

    pub async fn pause(self) {
        match self {
            Pace::Off => {}
            Pace::Yield => tokio::task::yield_now().await,
            Pace::Sleep(duration) => tokio::time::sleep(duration).await,
        }
    }
}
