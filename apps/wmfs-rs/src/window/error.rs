use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::{error, warn};

/// Conditions the manager cannot continue from.
#[derive(Error, Debug)]
pub enum WmError {
    #[error("no screen available")]
    NoScreen,

    #[error("display connection lost: {0}")]
    ConnectionLost(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] wmfs_rs_config::ConfigError),
}

/// Counts of non-fatal failures, by where they happened
pub struct ErrorTracker {
    display_errors: AtomicU64,
    grab_errors: AtomicU64,
    window_errors: AtomicU64,
}

impl ErrorTracker {
    pub fn new() -> Self {
        Self {
            display_errors: AtomicU64::new(0),
            grab_errors: AtomicU64::new(0),
            window_errors: AtomicU64::new(0),
        }
    }

    pub fn record_display_error(&self, operation: &str, error: impl std::fmt::Display) {
        self.display_errors.fetch_add(1, Ordering::Relaxed);
        error!("Display error in {}: {}", operation, error);
    }

    pub fn record_grab_error(&self, operation: &str, error: impl std::fmt::Display) {
        self.grab_errors.fetch_add(1, Ordering::Relaxed);
        warn!("Grab failed in {}: {}", operation, error);
    }

    pub fn record_window_error(&self, operation: &str, error: impl std::fmt::Display) {
        self.window_errors.fetch_add(1, Ordering::Relaxed);
        error!("Window management error in {}: {}", operation, error);
    }

    pub fn warn_if_failed<T, E: std::fmt::Display>(
        &self,
        result: Result<T, E>,
        operation: &str,
        category: ErrorCategory,
    ) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                match category {
                    ErrorCategory::Display => self.record_display_error(operation, e),
                    ErrorCategory::Grab => self.record_grab_error(operation, e),
                    ErrorCategory::Window => self.record_window_error(operation, e),
                }
                None
            }
        }
    }

    pub fn health_check(&self) -> HealthStatus {
        let display = self.display_errors.load(Ordering::Relaxed);
        let grab = self.grab_errors.load(Ordering::Relaxed);
        let window = self.window_errors.load(Ordering::Relaxed);

        HealthStatus {
            display_errors: display,
            grab_errors: grab,
            window_errors: window,
            is_healthy: display < 10 && grab < 20 && window < 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Display,
    Grab,
    Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthStatus {
    pub display_errors: u64,
    pub grab_errors: u64,
    pub window_errors: u64,
    pub is_healthy: bool,
}

impl Default for ErrorTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Log warning for non-critical errors
pub fn log_warn<T, E: std::fmt::Display>(result: Result<T, E>, operation: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Warning in {}: {}", operation, e);
            None
        }
    }
}
