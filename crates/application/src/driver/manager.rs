use std::sync::Arc;

use anyhow::{Context, Result};
use dashmap::DashMap;
use domain::DomainError;
use domain::driver::{SensorDriver, StopReport};
use domain::event::EventListener;
use infrastructure::config::NodeConfig;
use infrastructure::drivers::DeviceAccessFactory;
use tracing::{error, info, warn};

use super::DriverFactory;

/// Owns the drivers hosted by a node and starts or stops them together
#[derive(Default)]
pub struct DriverManager {
    drivers: DashMap<String, Arc<dyn SensorDriver>>,
}

impl DriverManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and configure every driver listed in `config`, registering
    /// `listeners` on each of them. Drivers are not started.
    pub async fn from_config(
        config: &NodeConfig,
        listeners: &[Arc<dyn EventListener>],
    ) -> Result<Self> {
        config.validate().context("Invalid node configuration")?;
        let manager = Self::new();

        for module in &config.drivers {
            let driver_id = module.config.id.clone();
            let access = DeviceAccessFactory::create(module.access.kind, module.access.settings.clone())
                .with_context(|| format!("Failed to create device access for {}", driver_id))?;
            let driver = DriverFactory::create(module.kind, access)
                .with_context(|| format!("Failed to create driver {}", driver_id))?;

            for listener in listeners {
                driver.register_listener(listener);
            }
            driver
                .init(module.config.clone())
                .await
                .with_context(|| format!("Failed to configure driver {}", driver_id))?;

            manager.add(driver_id, driver)?;
        }

        info!(count = manager.len(), "Drivers configured");
        Ok(manager)
    }

    pub fn add(&self, id: impl Into<String>, driver: Arc<dyn SensorDriver>) -> Result<(), DomainError> {
        let id = id.into();
        if self.drivers.contains_key(&id) {
            return Err(DomainError::InvalidConfiguration(format!(
                "Driver {} already registered",
                id
            )));
        }
        self.drivers.insert(id, driver);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn SensorDriver>> {
        self.drivers.get(id).map(|d| d.value().clone())
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.drivers.iter().map(|d| d.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Drivers in id order; no map guard is held by the result
    fn snapshot(&self) -> Vec<(String, Arc<dyn SensorDriver>)> {
        let mut drivers: Vec<_> = self
            .drivers
            .iter()
            .map(|d| (d.key().clone(), d.value().clone()))
            .collect();
        drivers.sort_by(|a, b| a.0.cmp(&b.0));
        drivers
    }

    /// Start every enabled driver. A driver that fails to start is logged
    /// and left Configured; returns how many are running.
    pub async fn start_all(&self) -> usize {
        let mut started = 0;
        for (id, driver) in self.snapshot() {
            if !driver.is_enabled().await {
                info!(driver_id = %id, "Skipping disabled driver");
                continue;
            }
            match driver.start().await {
                Ok(()) => started += 1,
                Err(e) if e.is_retryable() => warn!(
                    driver_id = %id,
                    error = %e,
                    "Driver not started, retry once the device is available"
                ),
                Err(e) => error!(driver_id = %id, error = %e, "Failed to start driver"),
            }
        }
        started
    }

    /// Start a single driver
    pub async fn start(&self, id: &str) -> Result<(), DomainError> {
        let driver = self
            .get(id)
            .ok_or_else(|| DomainError::InvalidConfiguration(format!("Unknown driver {}", id)))?;
        driver.start().await
    }

    /// Stop every driver and return their reports by id
    pub async fn stop_all(&self) -> Vec<(String, StopReport)> {
        let mut reports = Vec::new();
        for (id, driver) in self.snapshot() {
            let report = driver.stop().await;
            for diagnostic in report.diagnostics() {
                warn!(driver_id = %id, diagnostic = %diagnostic, "Driver stop diagnostic");
            }
            reports.push((id, report));
        }
        reports
    }

    /// Tear a driver down and forget it
    pub async fn remove(&self, id: &str) -> Option<Arc<dyn SensorDriver>> {
        let (_, driver) = self.drivers.remove(id)?;
        driver.cleanup().await;
        info!(driver_id = %id, "Driver removed");
        Some(driver)
    }
}
