use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use domain::DomainError;
use domain::driver::{DeviceRef, DriverState, ParameterSet};
use domain::interface::{CommandInput, InterfaceContext};
use serde_json::Value;

const PARAM_FIELDS: [&str; 5] = ["width", "height", "frame_rate", "pixel_format", "controls"];

struct ActiveControl {
    device: DeviceRef,
    params: ParameterSet,
}

/// Parameter command input.
///
/// Accepts a partial JSON object over the current parameters, for example
/// `{"frame_rate": 5, "controls": {"brightness": 40}}`. Named controls are
/// merged one by one; every other field replaces the current value.
pub struct CameraControl {
    name: String,
    active: Mutex<Option<ActiveControl>>,
}

impl CameraControl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: Mutex::new(None),
        }
    }

    fn snapshot(&self) -> Option<(DeviceRef, ParameterSet)> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|a| (a.device.clone(), a.params.clone()))
    }
}

/// Overlay `command` on `current`
pub fn merge_command(current: &ParameterSet, command: Value) -> Result<ParameterSet, DomainError> {
    let Value::Object(fields) = command else {
        return Err(DomainError::ParamApply(
            "Command must be a JSON object".to_string(),
        ));
    };

    let mut merged = serde_json::to_value(current)
        .map_err(|e| DomainError::ParamApply(e.to_string()))?;
    for (key, value) in fields {
        if !PARAM_FIELDS.contains(&key.as_str()) {
            return Err(DomainError::ParamApply(format!("Unknown parameter: {}", key)));
        }
        match (key.as_str(), value) {
            ("controls", Value::Object(controls)) => {
                if let Some(Value::Object(existing)) = merged.get_mut("controls") {
                    existing.extend(controls);
                }
            }
            (_, value) => {
                merged[key.as_str()] = value;
            }
        }
    }

    let params: ParameterSet = serde_json::from_value(merged)
        .map_err(|e| DomainError::ParamApply(format!("Invalid parameters: {}", e)))?;
    params
        .validate()
        .map_err(|e| DomainError::ParamApply(e.to_string()))?;
    Ok(params)
}

#[async_trait]
impl CommandInput for CameraControl {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, ctx: &InterfaceContext) -> Result<(), DomainError> {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(ActiveControl {
            device: ctx.device.clone(),
            params: ctx.params.clone(),
        });
        Ok(())
    }

    async fn stop(&self) -> Result<(), DomainError> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    async fn execute(&self, command: Value) -> Result<ParameterSet, DomainError> {
        let Some((device, current)) = self.snapshot() else {
            return Err(DomainError::InvalidState {
                operation: "execute command",
                state: DriverState::Stopped.as_str(),
            });
        };

        let params = merge_command(&current, command)?;
        device.configure(&params).await?;
        tracing::debug!(input = %self.name, device_id = %device.device_id(), "Command forwarded to device");

        if let Some(active) = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            active.params = params.clone();
        }
        Ok(params)
    }
}
