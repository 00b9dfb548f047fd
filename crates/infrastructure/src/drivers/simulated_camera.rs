use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use domain::DomainError;
use domain::driver::{DeviceAccess, DeviceConnection, DeviceInfo, Frame, ParameterSet};
use serde::Deserialize;
use tokio::time::sleep;

/// Pixel formats the simulated sensor can produce
pub const SUPPORTED_FORMATS: [&str; 3] = ["GREY", "YUYV", "RGB3"];

#[derive(Debug, Deserialize, Clone)]
pub struct SimulatedCameraConfig {
    /// Device identifiers that can be opened
    #[serde(default = "default_devices")]
    pub devices: Vec<String>,
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_devices() -> Vec<String> {
    vec!["cam0".to_string()]
}

fn default_name() -> String {
    "Simulated Camera".to_string()
}

impl Default for SimulatedCameraConfig {
    fn default() -> Self {
        Self {
            devices: default_devices(),
            name: default_name(),
        }
    }
}

#[derive(Default)]
struct AccessCounters {
    opened: AtomicU64,
    closed: AtomicU64,
}

/// Device access backed by synthetic gradient frames.
///
/// Counts every open and close so callers can check that handles are
/// balanced. Devices can be unplugged to simulate acquisition failures.
pub struct SimulatedCameraAccess {
    config: SimulatedCameraConfig,
    unplugged: Mutex<HashSet<String>>,
    counters: Arc<AccessCounters>,
}

impl SimulatedCameraAccess {
    pub fn new(config: SimulatedCameraConfig) -> Self {
        Self {
            config,
            unplugged: Mutex::new(HashSet::new()),
            counters: Arc::new(AccessCounters::default()),
        }
    }

    pub fn open_count(&self) -> u64 {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> u64 {
        self.counters.closed.load(Ordering::SeqCst)
    }

    /// Make subsequent opens of `device_id` fail
    pub fn unplug(&self, device_id: &str) {
        self.unplugged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(device_id.to_string());
    }

    pub fn plug(&self, device_id: &str) {
        self.unplugged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(device_id);
    }

    fn is_plugged(&self, device_id: &str) -> bool {
        !self
            .unplugged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(device_id)
    }
}

#[async_trait]
impl DeviceAccess for SimulatedCameraAccess {
    async fn open(&self, device_id: &str) -> Result<Arc<dyn DeviceConnection>, DomainError> {
        if !self.config.devices.iter().any(|d| d == device_id) {
            return Err(DomainError::DeviceUnavailable {
                device_id: device_id.to_string(),
                cause: "no such device".to_string(),
            });
        }
        if !self.is_plugged(device_id) {
            return Err(DomainError::DeviceUnavailable {
                device_id: device_id.to_string(),
                cause: "device unplugged".to_string(),
            });
        }

        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        tracing::info!(device_id = %device_id, "Simulated camera opened");

        Ok(Arc::new(SimulatedCameraConnection {
            device_id: device_id.to_string(),
            name: self.config.name.clone(),
            state: Mutex::new(CaptureState::new()),
            closed: AtomicBool::new(false),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct CaptureState {
    params: ParameterSet,
    sequence: u64,
    last_read_time: Instant,
    last_timestamp: i64,
}

impl CaptureState {
    fn new() -> Self {
        Self {
            params: ParameterSet::default(),
            sequence: 0,
            // First read waits a full interval
            last_read_time: Instant::now(),
            last_timestamp: i64::MIN,
        }
    }
}

struct SimulatedCameraConnection {
    device_id: String,
    name: String,
    state: Mutex<CaptureState>,
    closed: AtomicBool,
    counters: Arc<AccessCounters>,
}

impl SimulatedCameraConnection {
    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DomainError::Disconnected(self.device_id.clone()));
        }
        Ok(())
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CaptureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Horizontal gradient shifted by the sequence number, offset by the
/// `brightness` control. `None` when the frame size does not fit in memory.
fn gradient(params: &ParameterSet, sequence: u64) -> Option<Vec<u8>> {
    let bytes_per_pixel = match params.pixel_format.as_str() {
        "YUYV" => 2,
        "RGB3" => 3,
        _ => 1,
    };
    let brightness = params.controls.get("brightness").copied().unwrap_or(0);
    let width = params.width as usize;
    let height = params.height as usize;
    let size = width.checked_mul(height)?.checked_mul(bytes_per_pixel)?;

    let mut pixels = Vec::with_capacity(size);
    for _ in 0..height {
        for x in 0..width {
            let base = ((x as u64 * 255 / width.max(1) as u64) + sequence) % 256;
            let value = (base as i64).saturating_add(brightness).clamp(0, 255) as u8;
            pixels.extend(std::iter::repeat_n(value, bytes_per_pixel));
        }
    }
    Some(pixels)
}

#[async_trait]
impl DeviceConnection for SimulatedCameraConnection {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            device_id: self.device_id.clone(),
            name: self.name.clone(),
            driver: "simulated".to_string(),
            formats: SUPPORTED_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }

    async fn configure(&self, params: &ParameterSet) -> Result<(), DomainError> {
        self.ensure_open()?;
        params
            .validate()
            .map_err(|e| DomainError::ParamApply(e.to_string()))?;
        if !SUPPORTED_FORMATS.contains(&params.pixel_format.as_str()) {
            return Err(DomainError::ParamApply(format!(
                "Pixel format {} not supported by {}",
                params.pixel_format, self.device_id
            )));
        }

        self.lock_state().params = params.clone();
        tracing::debug!(
            device_id = %self.device_id,
            width = params.width,
            height = params.height,
            frame_rate = params.frame_rate,
            "Simulated camera configured"
        );
        Ok(())
    }

    async fn read_frame(&self) -> Result<Frame, DomainError> {
        self.ensure_open()?;

        let next_read_time = {
            let state = self.lock_state();
            state.last_read_time + state.params.frame_interval()
        };
        let now = Instant::now();
        if next_read_time > now {
            // Wait until the frame interval has passed
            sleep(next_read_time - now).await;
        }

        // Closed while waiting
        self.ensure_open()?;

        let mut state = self.lock_state();
        let pixels = gradient(&state.params, state.sequence + 1).ok_or_else(|| {
            DomainError::ParamApply(format!(
                "Frame of {}x{} {} is too large",
                state.params.width, state.params.height, state.params.pixel_format
            ))
        })?;
        state.last_read_time = Instant::now();
        state.sequence += 1;
        let timestamp = chrono::Utc::now()
            .timestamp_millis()
            .max(state.last_timestamp.saturating_add(1));
        state.last_timestamp = timestamp;

        Ok(Frame {
            sequence: state.sequence,
            timestamp,
            width: state.params.width,
            height: state.params.height,
            pixel_format: state.params.pixel_format.clone(),
            pixels,
        })
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            tracing::info!(device_id = %self.device_id, "Simulated camera closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_applies_brightness() {
        let params = ParameterSet::default()
            .with_resolution(4, 1)
            .with_control("brightness", 300);
        assert_eq!(gradient(&params, 0), Some(vec![255, 255, 255, 255]));
    }

    #[test]
    fn test_gradient_saturates_extreme_brightness() {
        let bright = ParameterSet::default()
            .with_resolution(2, 1)
            .with_control("brightness", i64::MAX);
        assert_eq!(gradient(&bright, 7), Some(vec![255, 255]));

        let dark = ParameterSet::default()
            .with_resolution(2, 1)
            .with_control("brightness", i64::MIN);
        assert_eq!(gradient(&dark, 7), Some(vec![0, 0]));
    }

    #[test]
    fn test_gradient_size_follows_format() {
        let mut params = ParameterSet::default().with_resolution(8, 2);
        params.pixel_format = "RGB3".to_string();
        assert_eq!(gradient(&params, 0).map(|p| p.len()), Some(8 * 2 * 3));
    }
}
