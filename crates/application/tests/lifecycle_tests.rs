use application::camera::{CONTROL_NAME, CameraControl, CameraDriver, CameraOutput, OUTPUT_NAME};
use application::driver::DriverLifecycle;
use async_trait::async_trait;
use domain::DomainError;
use domain::driver::{
    DeviceAccess, DriverConfig, DriverState, MAX_FRAME_RATE, ParameterSet, SensorDriver,
};
use domain::event::{EventListener, SensorEvent};
use domain::interface::{CommandInput, InterfaceContext, OutputInterface, SubInterfaceRegistry};
use domain::storage::DataRecord;
use infrastructure::drivers::{SimulatedCameraAccess, SimulatedCameraConfig};
use infrastructure::messaging::EventBus;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn simulated() -> Arc<SimulatedCameraAccess> {
    Arc::new(SimulatedCameraAccess::new(SimulatedCameraConfig::default()))
}

fn cam0_config() -> DriverConfig {
    DriverConfig::new("cam-01", "Lab camera", "cam0")
}

fn camera(access: &Arc<SimulatedCameraAccess>) -> CameraDriver {
    let access: Arc<dyn DeviceAccess> = access.clone();
    CameraDriver::new(access).unwrap()
}

/// Collects lifecycle events, ignoring data
#[derive(Default)]
struct LifecycleCollector {
    events: Mutex<Vec<String>>,
}

impl LifecycleCollector {
    fn names(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventListener for LifecycleCollector {
    async fn handle_event(
        &self,
        event: &SensorEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !event.is_data() {
            self.events
                .lock()
                .unwrap()
                .push(event.event_type().to_string());
        }
        Ok(())
    }
}

/// Output whose init always fails
struct BrokenOutput;

#[async_trait]
impl OutputInterface for BrokenOutput {
    fn name(&self) -> &str {
        "broken"
    }

    async fn init(&self, _ctx: &InterfaceContext) -> Result<(), DomainError> {
        Err(DomainError::ParamApply("sensor refused".to_string()))
    }

    async fn stop(&self) -> Result<(), DomainError> {
        Ok(())
    }

    fn is_active(&self) -> bool {
        false
    }

    fn latest_record(&self) -> Option<DataRecord> {
        None
    }

    fn records_emitted(&self) -> u64 {
        0
    }

    fn sampling_period(&self) -> Option<Duration> {
        None
    }
}

/// Output that can be told to fail its n-th init or every stop
#[derive(Default)]
struct FlakyOutput {
    inits: AtomicUsize,
    fail_init: Option<usize>,
    fail_stop: bool,
    active: AtomicBool,
}

impl FlakyOutput {
    fn failing_init(attempt: usize) -> Self {
        Self {
            fail_init: Some(attempt),
            ..Self::default()
        }
    }

    fn failing_stop() -> Self {
        Self {
            fail_stop: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl OutputInterface for FlakyOutput {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn init(&self, _ctx: &InterfaceContext) -> Result<(), DomainError> {
        let attempt = self.inits.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_init == Some(attempt) {
            return Err(DomainError::ParamApply("sensor refused".to_string()));
        }
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), DomainError> {
        self.active.store(false, Ordering::SeqCst);
        if self.fail_stop {
            return Err(DomainError::CaptureFailed("flaky: stuck".to_string()));
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn latest_record(&self) -> Option<DataRecord> {
        None
    }

    fn records_emitted(&self) -> u64 {
        0
    }

    fn sampling_period(&self) -> Option<Duration> {
        None
    }
}

struct Assembled {
    lifecycle: DriverLifecycle,
    video: Arc<CameraOutput>,
    control: Arc<CameraControl>,
}

/// Lifecycle with a real video output, `extra` and the parameter input
fn assemble(access: &Arc<SimulatedCameraAccess>, extra: Arc<dyn OutputInterface>) -> Assembled {
    let events = Arc::new(EventBus::new());
    let video = Arc::new(CameraOutput::new("video", events.clone()));
    let control = Arc::new(CameraControl::new(CONTROL_NAME));
    let mut registry = SubInterfaceRegistry::new();
    registry.register_output(video.clone()).unwrap();
    registry.register_output(extra).unwrap();
    registry.register_input(control.clone()).unwrap();
    let shared: Arc<dyn DeviceAccess> = access.clone();

    Assembled {
        lifecycle: DriverLifecycle::new(shared, registry, events),
        video,
        control,
    }
}

#[tokio::test]
async fn test_init_start_stop_releases_handle() {
    let access = simulated();
    let driver = camera(&access);

    driver.init(cam0_config()).await.unwrap();
    driver.start().await.unwrap();

    assert_eq!(driver.state().await, DriverState::Running);
    assert!(driver.handle_id().await.is_some());
    assert!(driver.all_outputs().contains_key(OUTPUT_NAME));
    assert!(driver.all_outputs()[OUTPUT_NAME].is_active());

    let report = driver.stop().await;

    assert!(report.is_clean());
    assert_eq!(driver.state().await, DriverState::Stopped);
    assert!(driver.handle_id().await.is_none());
    assert!(!driver.all_outputs()[OUTPUT_NAME].is_active());
    assert_eq!(access.open_count(), 1);
    assert_eq!(access.close_count(), 1);
}

#[tokio::test]
async fn test_stop_twice_equals_stop_once() {
    let access = simulated();
    let driver = camera(&access);
    driver.init(cam0_config()).await.unwrap();
    driver.start().await.unwrap();

    let first = driver.stop().await;
    let second = driver.stop().await;

    assert!(first.is_clean());
    assert!(second.is_clean());
    assert_eq!(driver.state().await, DriverState::Stopped);
    assert_eq!(access.close_count(), 1);
}

#[tokio::test]
async fn test_stop_without_run_is_noop() {
    let access = simulated();
    let driver = camera(&access);

    driver.stop().await;
    assert_eq!(driver.state().await, DriverState::Uninitialized);

    driver.init(cam0_config()).await.unwrap();
    driver.stop().await;
    assert_eq!(driver.state().await, DriverState::Configured);
    assert_eq!(access.open_count(), 0);
}

#[tokio::test]
async fn test_failed_acquisition_keeps_configured() {
    let access = simulated();
    access.unplug("cam0");
    let driver = camera(&access);
    driver.init(cam0_config()).await.unwrap();

    let result = driver.start().await;

    assert!(matches!(
        result,
        Err(DomainError::DeviceUnavailable { ref device_id, .. }) if device_id == "cam0"
    ));
    assert_eq!(driver.state().await, DriverState::Configured);
    assert!(driver.handle_id().await.is_none());
    assert_eq!(access.close_count(), 0);

    access.plug("cam0");
    driver.start().await.unwrap();
    assert_eq!(driver.state().await, DriverState::Running);
    driver.stop().await;
}

#[tokio::test]
async fn test_sub_interface_failure_releases_handle() {
    let access = simulated();
    let events = Arc::new(EventBus::new());
    let video = Arc::new(CameraOutput::new("video", events.clone()));
    let mut registry = SubInterfaceRegistry::new();
    registry.register_output(video.clone()).unwrap();
    registry.register_output(Arc::new(BrokenOutput)).unwrap();
    let shared: Arc<dyn DeviceAccess> = access.clone();
    let lifecycle = DriverLifecycle::new(shared, registry, events);

    lifecycle.init(cam0_config()).await.unwrap();
    let result = lifecycle.start().await;

    assert!(matches!(
        result,
        Err(DomainError::SubInterfaceInit { ref interface, .. }) if interface == "broken"
    ));
    assert!(!video.is_active());
    assert_eq!(lifecycle.state().await, DriverState::Configured);
    assert!(lifecycle.handle_id().await.is_none());
    assert_eq!(access.open_count(), access.close_count());
}

#[tokio::test]
async fn test_start_requires_configuration() {
    let driver = camera(&simulated());

    let result = driver.start().await;

    assert!(matches!(
        result,
        Err(DomainError::InvalidState {
            operation: "start",
            state: "Uninitialized"
        })
    ));
}

#[tokio::test]
async fn test_invalid_configuration_rejected() {
    let driver = camera(&simulated());

    let result = driver.init(DriverConfig::new("cam-01", "Lab camera", "")).await;

    assert!(matches!(result, Err(DomainError::InvalidConfiguration(_))));
    assert_eq!(driver.state().await, DriverState::Uninitialized);
}

#[tokio::test]
async fn test_init_rejected_while_running() {
    let driver = camera(&simulated());
    driver.init(cam0_config()).await.unwrap();
    driver.start().await.unwrap();

    let result = driver.init(cam0_config()).await;

    assert!(matches!(result, Err(DomainError::InvalidState { .. })));
    assert_eq!(driver.state().await, DriverState::Running);
    driver.stop().await;
}

#[tokio::test]
async fn test_update_params_keeps_handle() {
    let access = simulated();
    let driver = camera(&access);
    driver.init(cam0_config()).await.unwrap();
    driver.start().await.unwrap();
    let handle = driver.handle_id().await;

    let params = ParameterSet::default()
        .with_resolution(640, 480)
        .with_frame_rate(25);
    driver.update_params(params.clone()).await.unwrap();

    assert_eq!(driver.handle_id().await, handle);
    assert_eq!(driver.current_params().await, Some(params));
    assert_eq!(
        driver.all_outputs()[OUTPUT_NAME].sampling_period(),
        Some(Duration::from_millis(40))
    );
    assert_eq!(access.open_count(), 1);
    driver.stop().await;
}

#[tokio::test]
async fn test_update_params_requires_running() {
    let driver = camera(&simulated());
    driver.init(cam0_config()).await.unwrap();

    let result = driver.update_params(ParameterSet::default()).await;

    assert!(matches!(result, Err(DomainError::InvalidState { .. })));
}

#[tokio::test]
async fn test_rejected_params_keep_handle() {
    let driver = camera(&simulated());
    driver.init(cam0_config()).await.unwrap();
    driver.start().await.unwrap();
    let handle = driver.handle_id().await;

    let mut params = ParameterSet::default();
    params.pixel_format = "MJPG".to_string();
    let result = driver.update_params(params).await;

    assert!(matches!(result, Err(DomainError::ParamApply(_))));
    assert_eq!(driver.state().await, DriverState::Running);
    assert_eq!(driver.handle_id().await, handle);
    assert_eq!(driver.current_params().await, Some(ParameterSet::default()));
    driver.stop().await;
}

#[tokio::test]
async fn test_update_config_restarts_with_new_handle() {
    let access = simulated();
    let driver = camera(&access);
    driver.init(cam0_config()).await.unwrap();
    driver.start().await.unwrap();
    let first = driver.handle_id().await;

    let renamed = DriverConfig::new("cam-01", "Renamed camera", "cam0");
    driver.update_config(renamed).await.unwrap();

    assert_eq!(driver.state().await, DriverState::Running);
    assert_ne!(driver.handle_id().await, first);
    assert_eq!(driver.name().await.as_deref(), Some("Renamed camera"));
    assert_eq!(access.open_count(), 2);
    assert_eq!(access.close_count(), 1);
    driver.stop().await;
}

#[tokio::test]
async fn test_update_config_failure_leaves_configured() {
    let access = simulated();
    let driver = camera(&access);
    driver.init(cam0_config()).await.unwrap();
    driver.start().await.unwrap();

    let missing = DriverConfig::new("cam-01", "Lab camera", "cam9");
    let result = driver.update_config(missing).await;

    assert!(matches!(result, Err(DomainError::DeviceUnavailable { .. })));
    assert_eq!(driver.state().await, DriverState::Configured);
    assert!(driver.handle_id().await.is_none());
    assert_eq!(
        driver.configuration().await.map(|c| c.device_id),
        Some("cam9".to_string())
    );
    assert_eq!(access.open_count(), access.close_count());
}

#[tokio::test]
async fn test_command_routes_through_input() {
    let driver = camera(&simulated());
    driver.init(cam0_config()).await.unwrap();
    driver.start().await.unwrap();
    let handle = driver.handle_id().await;

    driver
        .execute_command(
            CONTROL_NAME,
            json!({"frame_rate": 20, "controls": {"brightness": 10}}),
        )
        .await
        .unwrap();

    let params = driver.current_params().await.unwrap();
    assert_eq!(params.frame_rate, 20);
    assert_eq!(params.controls.get("brightness"), Some(&10));
    assert_eq!(driver.handle_id().await, handle);
    driver.stop().await;
}

#[tokio::test]
async fn test_command_to_unknown_input() {
    let driver = camera(&simulated());
    driver.init(cam0_config()).await.unwrap();
    driver.start().await.unwrap();

    let result = driver.execute_command("zoom", json!({})).await;

    assert!(matches!(result, Err(DomainError::InterfaceNotFound(ref name)) if name == "zoom"));
    driver.stop().await;
}

#[tokio::test]
async fn test_connection_probe_is_independent() {
    let access = simulated();
    let driver = camera(&access);
    assert!(!driver.is_connected().await);

    driver.init(cam0_config()).await.unwrap();
    assert!(driver.is_connected().await);
    assert_eq!(access.open_count(), 1);
    assert_eq!(access.close_count(), 1);

    driver.start().await.unwrap();
    let handle = driver.handle_id().await;
    assert!(driver.is_connected().await);
    assert_eq!(driver.handle_id().await, handle);
    assert_eq!(driver.state().await, DriverState::Running);

    driver.stop().await;
    assert_eq!(access.open_count(), access.close_count());

    access.unplug("cam0");
    assert!(!driver.is_connected().await);
}

#[tokio::test]
async fn test_cleanup_forgets_configuration() {
    let access = simulated();
    let driver = camera(&access);
    driver.init(cam0_config()).await.unwrap();
    driver.start().await.unwrap();

    driver.cleanup().await;

    assert_eq!(driver.state().await, DriverState::Uninitialized);
    assert!(driver.configuration().await.is_none());
    assert!(driver.local_id().await.is_none());
    assert_eq!(access.close_count(), 1);
}

#[tokio::test]
async fn test_lifecycle_events_in_order() {
    let driver = camera(&simulated());
    let collector = Arc::new(LifecycleCollector::default());
    let listener: Arc<dyn EventListener> = collector.clone();
    driver.register_listener(&listener);

    driver.init(cam0_config()).await.unwrap();
    driver.start().await.unwrap();
    driver
        .update_params(ParameterSet::default().with_frame_rate(5))
        .await
        .unwrap();
    driver.stop().await;
    driver.stop().await;

    assert_eq!(
        collector.names(),
        vec![
            "DriverInitialized",
            "DriverStarted",
            "ParamsChanged",
            "DriverStopped"
        ]
    );
}

#[tokio::test]
async fn test_listeners_survive_restart() {
    let driver = camera(&simulated());
    let collector = Arc::new(LifecycleCollector::default());
    let listener: Arc<dyn EventListener> = collector.clone();
    driver.register_listener(&listener);
    driver.init(cam0_config()).await.unwrap();

    driver.start().await.unwrap();
    driver.stop().await;
    driver.start().await.unwrap();
    driver.stop().await;
    driver.unregister_listener(&listener);
    driver.start().await.unwrap();
    driver.stop().await;

    let starts = collector
        .names()
        .iter()
        .filter(|name| *name == "DriverStarted")
        .count();
    assert_eq!(starts, 2);
}

#[tokio::test]
async fn test_description_follows_configuration() {
    let driver = camera(&simulated());
    assert!(driver.current_description().await.is_err());

    driver.init(cam0_config()).await.unwrap();
    let description = driver.current_description().await.unwrap();

    assert_eq!(description.identifier, "local://sensors/v4l/cam0");
    assert_eq!(description.name, "Lab camera");
    assert_eq!(description.document["outputs"], json!(["camOutput"]));
    assert!(!driver.description_support().history);
    assert!(matches!(
        driver.description_at(chrono::Utc::now()).await,
        Err(DomainError::UnsupportedOperation(_))
    ));
    assert!(matches!(
        driver.update_description(description, false).await,
        Err(DomainError::UnsupportedOperation(ref reason)) if reason.contains("not supported")
    ));
}

#[tokio::test]
async fn test_stop_steps_are_independent() {
    let access = simulated();
    let flaky = Arc::new(FlakyOutput::failing_stop());
    let driver = assemble(&access, flaky.clone());
    driver.lifecycle.init(cam0_config()).await.unwrap();
    driver.lifecycle.start().await.unwrap();
    assert!(driver.control.is_active());

    let report = driver.lifecycle.stop().await;

    assert_eq!(report.failures.len(), 1);
    assert!(report.diagnostics()[0].contains("flaky: stuck"));
    assert!(!driver.video.is_active());
    assert!(!driver.control.is_active());
    assert_eq!(driver.lifecycle.state().await, DriverState::Stopped);
    assert!(driver.lifecycle.handle_id().await.is_none());
    assert_eq!(access.open_count(), 1);
    assert_eq!(access.close_count(), 1);
}

#[tokio::test]
async fn test_failed_reinit_restores_previous_params() {
    let access = simulated();
    let flaky = Arc::new(FlakyOutput::failing_init(2));
    let driver = assemble(&access, flaky.clone());
    driver.lifecycle.init(cam0_config()).await.unwrap();
    driver.lifecycle.start().await.unwrap();
    let handle = driver.lifecycle.handle_id().await;

    let result = driver
        .lifecycle
        .update_params(ParameterSet::default().with_frame_rate(5))
        .await;

    assert!(matches!(result, Err(DomainError::ParamApply(_))));
    assert_eq!(driver.lifecycle.state().await, DriverState::Running);
    assert_eq!(driver.lifecycle.handle_id().await, handle);
    assert_eq!(
        driver.lifecycle.current_params().await,
        Some(ParameterSet::default())
    );
    assert!(driver.video.is_active());
    assert!(flaky.is_active());
    assert_eq!(
        driver.video.sampling_period(),
        Some(Duration::from_millis(100))
    );

    driver
        .lifecycle
        .execute_command(CONTROL_NAME, json!({"frame_rate": 20}))
        .await
        .unwrap();
    assert_eq!(
        driver.lifecycle.current_params().await.map(|p| p.frame_rate),
        Some(20)
    );
    assert_eq!(access.open_count(), 1);
    driver.lifecycle.stop().await;
}

#[tokio::test]
async fn test_rejected_default_params_make_device_unavailable() {
    let access = simulated();
    let driver = camera(&access);
    let mut params = ParameterSet::default();
    params.pixel_format = "MJPG".to_string();
    driver
        .init(cam0_config().with_params(params))
        .await
        .unwrap();

    let result = driver.start().await;

    assert!(matches!(
        result,
        Err(DomainError::DeviceUnavailable { ref device_id, ref cause })
            if device_id == "cam0" && cause.contains("MJPG")
    ));
    assert_eq!(driver.state().await, DriverState::Configured);
    assert!(driver.handle_id().await.is_none());
    assert_eq!(access.open_count(), access.close_count());
}

#[tokio::test]
async fn test_frame_rate_above_limit_rejected() {
    let driver = camera(&simulated());
    let config = cam0_config()
        .with_params(ParameterSet::default().with_frame_rate(MAX_FRAME_RATE * 2));

    let result = driver.init(config).await;

    assert!(matches!(result, Err(DomainError::InvalidConfiguration(_))));
    assert_eq!(driver.state().await, DriverState::Uninitialized);
}
