// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::fmt;

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Background component driven by an external scheduler or timer.
pub trait Engine: Send + Sync {
    fn start(&self) -> EngineResult<()>;
    fn stop(&self) -> EngineResult<()>;
    fn health(&self) -> EngineHealth;
    fn describe(&self) -> &'static str;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthStatus {
    Starting,
    Ready,
    Degraded,
    Stopped,
}

#[derive(Clone, Debug)]
pub struct EngineHealth {
    pub status: HealthStatus,
    pub detail: Option<String>,
}

impl EngineHealth {
    pub fn new(status: HealthStatus, detail: Option<String>) -> Self {
        Self { status, detail }
    }
}

impl Default for EngineHealth {
    fn default() -> Self {
        Self {
            status: HealthStatus::Stopped,
            detail: None,
        }
    }
}

impl fmt::Display for EngineHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{:?} ({detail})", self.status),
            None => write!(f, "{:?}", self.status),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine already running")]
    AlreadyRunning,
    #[error("engine is not running")]
    NotRunning,
    #[error("engine encountered an error: {source}")]
    Failure {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
