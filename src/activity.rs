//! Activity log collaborator
//!
//! Hosts usually have their own operator-visible activity log. The relay
//! never writes to it directly; it reports through this injected interface,
//! and defaults to forwarding into `tracing`.

use std::fmt;

/// Severity of an activity-log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Sink for operator-facing status lines
pub trait ActivityLog: Send + Sync {
    /// Record one activity line
    fn log(&self, level: LogLevel, message: &str);
}

/// Default [`ActivityLog`] that forwards into `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActivityLog;

impl ActivityLog for TracingActivityLog {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
    }
}
