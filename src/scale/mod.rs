// src/scale/mod.rs
//
// Weighing device abstraction. The process owns one reader for its whole
// lifetime; handlers only see the `WeightReader` contract and a failed read
// surfaces as DeviceUnavailable upstream.

mod tcp;

pub use tcp::TcpScale;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

#[derive(Debug)]
pub enum ScaleError {
    Timeout,
    Io(std::io::Error),
    Malformed(String),
}

impl fmt::Display for ScaleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleError::Timeout => write!(f, "Scale did not respond in time"),
            ScaleError::Io(e) => write!(f, "Scale communication failed: {}", e),
            ScaleError::Malformed(raw) => write!(f, "Unreadable scale response: {}", raw),
        }
    }
}

impl From<std::io::Error> for ScaleError {
    fn from(err: std::io::Error) -> Self {
        ScaleError::Io(err)
    }
}

/// Instantaneous net weight sample from the device.
#[async_trait]
pub trait WeightReader: Send + Sync {
    async fn read_net_weight(&self) -> Result<f64, ScaleError>;
}

/// Fixed-value reader used when no device is configured, and by tests.
#[derive(Debug)]
pub struct SimulatedScale {
    weight: f64,
}

impl SimulatedScale {
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }
}

#[async_trait]
impl WeightReader for SimulatedScale {
    async fn read_net_weight(&self) -> Result<f64, ScaleError> {
        Ok(self.weight)
    }
}

/// Builds the process-wide reader: a TCP client when SCALE_ADDR is set,
/// otherwise a simulated scale (SCALE_SIMULATED_WEIGHT, default 0.0).
pub fn reader_from_env() -> Arc<dyn WeightReader> {
    match std::env::var("SCALE_ADDR") {
        Ok(addr) => {
            let timeout_ms = std::env::var("SCALE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(3000);
            tracing::info!(%addr, timeout_ms, "using TCP scale");
            Arc::new(TcpScale::new(addr, std::time::Duration::from_millis(timeout_ms)))
        }
        Err(_) => {
            let weight = std::env::var("SCALE_SIMULATED_WEIGHT")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(0.0);
            tracing::warn!(weight, "SCALE_ADDR not set, using simulated scale");
            Arc::new(SimulatedScale::new(weight))
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Reader that always fails, for exercising device-failure paths.
    pub struct FailingScale;

    #[async_trait]
    impl WeightReader for FailingScale {
        async fn read_net_weight(&self) -> Result<f64, ScaleError> {
            Err(ScaleError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FailingScale;
    use super::*;

    #[tokio::test]
    async fn simulated_scale_returns_configured_weight() {
        let scale = SimulatedScale::new(100.05);
        assert_eq!(scale.read_net_weight().await.unwrap(), 100.05);
    }

    #[tokio::test]
    async fn failing_scale_maps_to_device_unavailable() {
        let err = FailingScale.read_net_weight().await.unwrap_err();
        let app: crate::error::AppError = err.into();
        assert!(matches!(app, crate::error::AppError::DeviceUnavailable(_)));
    }
}
