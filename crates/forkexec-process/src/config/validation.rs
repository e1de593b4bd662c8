use super::*;
use anyhow::{anyhow, Result};

/// Validate the complete configuration
pub fn validate_config(config: &ExecutorConfig) -> Result<()> {
    if !config.backend.is_supported() {
        return Err(anyhow!(
            "Launch backend '{}' is not supported on this platform",
            config.backend
        ));
    }

    if let Some(timeout) = config.wait_timeout {
        if timeout.is_zero() {
            return Err(anyhow!("Wait timeout must be greater than 0"));
        }
    }

    if config.kill_grace_period.is_zero() {
        return Err(anyhow!("Kill grace period must be greater than 0"));
    }

    Ok(())
}
