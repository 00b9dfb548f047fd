use std::sync::Arc;

use domain::driver::{
    DeviceAccess, DeviceHandle, DriverConfig, DriverState, HandleId, ParameterSet, StopReport,
};
use domain::event::SensorEvent;
use domain::interface::{InterfaceContext, SubInterfaceRegistry};
use domain::DomainError;
use infrastructure::messaging::EventBus;
use serde_json::Value;
use tokio::sync::Mutex;

#[derive(Default)]
struct LifecycleInner {
    state: DriverState,
    config: Option<DriverConfig>,
    params: Option<ParameterSet>,
    handle: Option<DeviceHandle>,
}

impl LifecycleInner {
    fn driver_id(&self) -> Option<String> {
        self.config.as_ref().map(|c| c.id.clone())
    }

    fn invalid_state(&self, operation: &'static str) -> DomainError {
        DomainError::InvalidState {
            operation,
            state: self.state.as_str(),
        }
    }
}

/// State machine shared by every driver variant.
///
/// Owns the device handle while running and drives the sub-interface
/// registry through it. All operations take the same async mutex, so they
/// never interleave; events produced by an operation are dispatched once
/// the mutex has been released.
pub struct DriverLifecycle {
    access: Arc<dyn DeviceAccess>,
    registry: SubInterfaceRegistry,
    events: Arc<EventBus>,
    inner: Mutex<LifecycleInner>,
}

impl DriverLifecycle {
    pub fn new(
        access: Arc<dyn DeviceAccess>,
        registry: SubInterfaceRegistry,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            access,
            registry,
            events,
            inner: Mutex::new(LifecycleInner::default()),
        }
    }

    pub fn registry(&self) -> &SubInterfaceRegistry {
        &self.registry
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Store `config`. Rejected while running.
    pub async fn init(&self, config: DriverConfig) -> Result<(), DomainError> {
        let result = {
            let mut inner = self.inner.lock().await;
            Self::init_locked(&mut inner, config)
        };

        match result {
            Ok(driver_id) => {
                self.publish(vec![SensorEvent::driver_initialized(driver_id)])
                    .await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Driver init rejected");
                Err(e)
            }
        }
    }

    /// Acquire the device and initialize every sub-interface
    pub async fn start(&self) -> Result<(), DomainError> {
        let (driver_id, result) = {
            let mut inner = self.inner.lock().await;
            let result = self.start_locked(&mut inner).await;
            (inner.driver_id(), result)
        };

        self.publish(Self::start_events(driver_id, &result)).await;
        result.map(|_| ())
    }

    /// Tear down the current run. Never fails; anything that could not be
    /// stopped cleanly is returned in the report.
    pub async fn stop(&self) -> StopReport {
        let (driver_id, report) = {
            let mut inner = self.inner.lock().await;
            let report = self.stop_locked(&mut inner).await;
            (inner.driver_id(), report)
        };

        self.publish(Self::stop_events(driver_id, report.as_ref()))
            .await;
        report.unwrap_or_default()
    }

    /// `stop`, `init`, `start` without letting another operation in between.
    /// If the final start fails the driver is left Configured.
    pub async fn update_config(&self, config: DriverConfig) -> Result<(), DomainError> {
        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().await;
            let previous_id = inner.driver_id();

            let report = self.stop_locked(&mut inner).await;
            events.extend(Self::stop_events(previous_id, report.as_ref()));

            match Self::init_locked(&mut inner, config) {
                Ok(driver_id) => {
                    events.push(SensorEvent::config_changed(driver_id.clone()));
                    let started = self.start_locked(&mut inner).await;
                    events.extend(Self::start_events(Some(driver_id), &started));
                    started.map(|_| ())
                }
                Err(e) => Err(e),
            }
        };

        self.publish(events).await;
        result
    }

    /// Apply `params` to the held device and restart the sub-interfaces
    /// with them. The handle is kept.
    pub async fn update_params(&self, params: ParameterSet) -> Result<(), DomainError> {
        let (driver_id, result) = {
            let mut inner = self.inner.lock().await;
            let result = self.update_params_locked(&mut inner, params).await;
            (inner.driver_id(), result)
        };

        self.publish(Self::params_events(driver_id, &result)).await;
        result.map(|_| ())
    }

    /// Pass `command` to the named input and apply the parameters it
    /// returns
    pub async fn execute_command(&self, input_name: &str, command: Value) -> Result<(), DomainError> {
        let (driver_id, result) = {
            let mut inner = self.inner.lock().await;
            let result = match self.command_params(&inner, input_name, command).await {
                Ok(params) => self.update_params_locked(&mut inner, params).await,
                Err(e) => Err(e),
            };
            (inner.driver_id(), result)
        };

        self.publish(Self::params_events(driver_id, &result)).await;
        result.map(|_| ())
    }

    /// Probe the configured device with a handle of its own, released
    /// before returning. The running handle is left alone.
    pub async fn is_connected(&self) -> bool {
        let device_id = {
            let inner = self.inner.lock().await;
            match &inner.config {
                Some(config) => config.device_id.clone(),
                None => return false,
            }
        };

        match DeviceHandle::acquire(self.access.as_ref(), &device_id).await {
            Ok(probe) => {
                probe.release();
                true
            }
            Err(e) => {
                tracing::debug!(device_id = %device_id, error = %e, "Connection probe failed");
                false
            }
        }
    }

    /// Stop, then forget the configuration
    pub async fn cleanup(&self) {
        let (driver_id, report) = {
            let mut inner = self.inner.lock().await;
            let report = self.stop_locked(&mut inner).await;
            let driver_id = inner.driver_id();
            *inner = LifecycleInner::default();
            (driver_id, report)
        };

        tracing::debug!(driver_id = ?driver_id, "Driver cleaned up");
        self.publish(Self::stop_events(driver_id, report.as_ref()))
            .await;
    }

    pub async fn state(&self) -> DriverState {
        self.inner.lock().await.state
    }

    pub async fn configuration(&self) -> Option<DriverConfig> {
        self.inner.lock().await.config.clone()
    }

    pub async fn current_params(&self) -> Option<ParameterSet> {
        self.inner.lock().await.params.clone()
    }

    pub async fn handle_id(&self) -> Option<HandleId> {
        self.inner.lock().await.handle.as_ref().map(DeviceHandle::id)
    }

    fn init_locked(inner: &mut LifecycleInner, config: DriverConfig) -> Result<String, DomainError> {
        if !inner.state.can_init() {
            return Err(inner.invalid_state("init"));
        }
        config.validate()?;

        let next = inner
            .state
            .to_configured()
            .map_err(|_| inner.invalid_state("init"))?;
        let driver_id = config.id.clone();
        tracing::info!(driver_id = %driver_id, device_id = %config.device_id, "Driver configured");

        inner.config = Some(config);
        inner.state = next;
        Ok(driver_id)
    }

    async fn start_locked(&self, inner: &mut LifecycleInner) -> Result<HandleId, DomainError> {
        if !inner.state.can_start() {
            return Err(inner.invalid_state("start"));
        }
        let config = inner
            .config
            .clone()
            .ok_or_else(|| inner.invalid_state("start"))?;
        let next = inner
            .state
            .to_running()
            .map_err(|_| inner.invalid_state("start"))?;
        let producer_id = config.producer_id()?;
        let params = config.default_params.clone();

        let handle = DeviceHandle::acquire(self.access.as_ref(), &config.device_id)
            .await
            .map_err(|e| match e {
                DomainError::DeviceUnavailable { .. } => e,
                other => DomainError::DeviceUnavailable {
                    device_id: config.device_id.clone(),
                    cause: other.to_string(),
                },
            })?;

        let device = handle.device_ref();
        if let Err(e) = device.configure(&params).await {
            handle.release();
            return Err(DomainError::DeviceUnavailable {
                device_id: config.device_id.clone(),
                cause: format!("default parameters rejected: {}", e),
            });
        }

        let ctx = InterfaceContext {
            driver_id: config.id.clone(),
            producer_id,
            device,
            params: params.clone(),
        };
        if let Err(e) = self.registry.init_all(&ctx).await {
            handle.release();
            return Err(e);
        }

        let handle_id = handle.id();
        tracing::info!(
            driver_id = %config.id,
            device_id = %config.device_id,
            handle = %handle_id,
            "Driver started"
        );
        inner.handle = Some(handle);
        inner.params = Some(params);
        inner.state = next;
        Ok(handle_id)
    }

    /// `None` when there was no run to tear down
    async fn stop_locked(&self, inner: &mut LifecycleInner) -> Option<StopReport> {
        if !inner.state.is_running() && inner.handle.is_none() {
            return None;
        }

        let mut failures = self.registry.stop_outputs().await;
        failures.extend(self.registry.stop_inputs().await);
        if let Some(handle) = inner.handle.take() {
            handle.release();
        }
        inner.state = inner.state.to_stopped();

        let report = StopReport { failures };
        if report.is_clean() {
            tracing::info!(driver_id = ?inner.driver_id(), "Driver stopped");
        } else {
            tracing::warn!(
                driver_id = ?inner.driver_id(),
                failures = report.failures.len(),
                "Driver stopped with errors"
            );
        }
        Some(report)
    }

    async fn update_params_locked(
        &self,
        inner: &mut LifecycleInner,
        params: ParameterSet,
    ) -> Result<ParameterSet, DomainError> {
        if !inner.state.is_running() {
            return Err(inner.invalid_state("update parameters"));
        }
        let (Some(config), Some(handle)) = (inner.config.as_ref(), inner.handle.as_ref()) else {
            return Err(inner.invalid_state("update parameters"));
        };
        params.validate().map_err(as_param_error)?;

        let device = handle.device_ref();
        device.configure(&params).await.map_err(as_param_error)?;

        for e in self.registry.stop_outputs().await {
            tracing::warn!(driver_id = %config.id, error = %e, "Output did not stop cleanly");
        }
        let mut ctx = InterfaceContext {
            driver_id: config.id.clone(),
            producer_id: config.producer_id()?,
            device,
            params: params.clone(),
        };
        if let Err(e) = self.registry.init_all(&ctx).await {
            let e = as_param_error(e);
            if let Some(previous) = inner.params.clone() {
                ctx.params = previous;
                self.restore_params(&ctx).await;
            }
            return Err(e);
        }

        tracing::info!(
            driver_id = %config.id,
            width = params.width,
            height = params.height,
            frame_rate = params.frame_rate,
            "Parameters applied"
        );
        inner.params = Some(params.clone());
        Ok(params)
    }

    /// Put the device and sub-interfaces back on `ctx.params` after a
    /// failed update. The handle is kept whatever happens.
    async fn restore_params(&self, ctx: &InterfaceContext) {
        if let Err(e) = ctx.device.configure(&ctx.params).await {
            tracing::error!(driver_id = %ctx.driver_id, error = %e, "Could not restore device parameters");
            return;
        }
        match self.registry.init_all(ctx).await {
            Ok(()) => tracing::info!(driver_id = %ctx.driver_id, "Previous parameters restored"),
            Err(e) => tracing::error!(
                driver_id = %ctx.driver_id,
                error = %e,
                "Could not restart sub-interfaces with previous parameters"
            ),
        }
    }

    async fn command_params(
        &self,
        inner: &LifecycleInner,
        input_name: &str,
        command: Value,
    ) -> Result<ParameterSet, DomainError> {
        if !inner.state.is_running() {
            return Err(inner.invalid_state("execute command"));
        }
        let input = self
            .registry
            .input(input_name)
            .ok_or_else(|| DomainError::InterfaceNotFound(input_name.to_string()))?;
        input.execute(command).await
    }

    fn stop_events(driver_id: Option<String>, report: Option<&StopReport>) -> Vec<SensorEvent> {
        match (driver_id, report) {
            (Some(id), Some(report)) => vec![SensorEvent::driver_stopped(id, report.diagnostics())],
            _ => Vec::new(),
        }
    }

    fn start_events(
        driver_id: Option<String>,
        result: &Result<HandleId, DomainError>,
    ) -> Vec<SensorEvent> {
        match (driver_id, result) {
            (Some(id), Ok(handle_id)) => vec![SensorEvent::driver_started(id, *handle_id)],
            (Some(id), Err(e)) => {
                tracing::error!(driver_id = %id, error = %e, "Driver failed to start");
                vec![SensorEvent::driver_error(id, e.to_string())]
            }
            (None, _) => Vec::new(),
        }
    }

    fn params_events(
        driver_id: Option<String>,
        result: &Result<ParameterSet, DomainError>,
    ) -> Vec<SensorEvent> {
        match (driver_id, result) {
            (Some(id), Ok(params)) => vec![SensorEvent::params_changed(id, params.clone())],
            (Some(id), Err(e)) => {
                tracing::warn!(driver_id = %id, error = %e, "Parameter update failed");
                vec![SensorEvent::driver_error(id, e.to_string())]
            }
            (None, _) => Vec::new(),
        }
    }

    async fn publish(&self, events: Vec<SensorEvent>) {
        for event in events {
            self.events.dispatch(&event).await;
        }
    }
}

fn as_param_error(e: DomainError) -> DomainError {
    match e {
        DomainError::ParamApply(_) => e,
        other => DomainError::ParamApply(other.to_string()),
    }
}
