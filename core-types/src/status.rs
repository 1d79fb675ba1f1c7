// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::{fmt, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Discrete health level exposed by each component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    Ok,
    #[default]
    Warn,
    Crit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusGauge {
    pub label: String,
    pub value: f64,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ServiceStatus {
    overall: OverallStatus,
    warnings: Vec<String>,
    errors: Vec<String>,
    gauges: Vec<StatusGauge>,
}

/// Immutable snapshot handed to loggers and reporting sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatusSnapshot {
    pub name: String,
    pub overall: OverallStatus,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub gauges: Vec<StatusGauge>,
}

impl fmt::Display for ServiceStatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.name, self.overall)?;
        for gauge in &self.gauges {
            write!(f, " {}={}", gauge.label, gauge.value)?;
        }
        if !self.warnings.is_empty() {
            write!(f, " warnings=[{}]", self.warnings.join("; "))?;
        }
        if !self.errors.is_empty() {
            write!(f, " errors=[{}]", self.errors.join("; "))?;
        }
        Ok(())
    }
}

pub trait ServiceStatusReporter: Send + Sync {
    fn service_name(&self) -> &'static str;
    fn status(&self) -> ServiceStatusSnapshot;
}

/// Shared handle so a component can mutate its own status from any thread.
#[derive(Clone)]
pub struct ServiceStatusHandle {
    name: &'static str,
    inner: Arc<RwLock<ServiceStatus>>,
}

impl ServiceStatusHandle {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Arc::new(RwLock::new(ServiceStatus::default())),
        }
    }

    pub fn service_name(&self) -> &'static str {
        self.name
    }

    fn update<F>(&self, mutator: F)
    where
        F: FnOnce(&mut ServiceStatus),
    {
        let mut guard = self.inner.write();
        mutator(&mut guard);
    }

    pub fn set_overall(&self, status: OverallStatus) {
        self.update(|s| s.overall = status);
    }

    pub fn push_warning(&self, msg: impl Into<String>) {
        self.update(|s| s.warnings.push(msg.into()));
    }

    pub fn clear_warnings_matching(&self, predicate: impl Fn(&str) -> bool) {
        self.update(|s| s.warnings.retain(|w| !predicate(w)));
    }

    pub fn push_error(&self, msg: impl Into<String>) {
        self.update(|s| s.errors.push(msg.into()));
    }

    pub fn clear_errors_matching(&self, predicate: impl Fn(&str) -> bool) {
        self.update(|s| s.errors.retain(|e| !predicate(e)));
    }

    /// Inserts or replaces the gauge with the same label.
    pub fn set_gauge(&self, label: &str, value: f64, unit: Option<&str>) {
        self.update(|s| match s.gauges.iter_mut().find(|g| g.label == label) {
            Some(gauge) => {
                gauge.value = value;
                gauge.unit = unit.map(str::to_string);
            }
            None => s.gauges.push(StatusGauge {
                label: label.to_string(),
                value,
                unit: unit.map(str::to_string),
            }),
        });
    }

    pub fn snapshot(&self) -> ServiceStatusSnapshot {
        let guard = self.inner.read();
        ServiceStatusSnapshot {
            name: self.name.to_string(),
            overall: guard.overall,
            warnings: guard.warnings.clone(),
            errors: guard.errors.clone(),
            gauges: guard.gauges.clone(),
        }
    }

    pub fn overall(&self) -> OverallStatus {
        self.inner.read().overall
    }
}

impl ServiceStatusReporter for ServiceStatusHandle {
    fn service_name(&self) -> &'static str {
        self.name
    }

    fn status(&self) -> ServiceStatusSnapshot {
        self.snapshot()
    }
}
