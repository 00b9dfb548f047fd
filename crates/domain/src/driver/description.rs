use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Self-description document of a sensor.
///
/// Treated as opaque by the lifecycle: drivers fill `identifier` and
/// `name`, anything else goes into `document`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDescription {
    pub identifier: String,
    pub name: String,
    pub valid_from: DateTime<Utc>,
    #[serde(default)]
    pub document: Value,
}

impl SensorDescription {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>, document: Value) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            valid_from: Utc::now(),
            document,
        }
    }
}

/// Optional description capabilities a driver may declare
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionSupport {
    pub history: bool,
    pub update: bool,
}
