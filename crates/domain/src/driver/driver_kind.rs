use serde::{Deserialize, Serialize};

/// Kind of sensor driver, used to pick a concrete implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverKind {
    /// Video4Linux compatible camera
    #[serde(rename = "V4L-Camera")]
    V4lCamera,
    Weather,
    #[serde(rename = "GPS")]
    Gps,
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V4lCamera => "V4L-Camera",
            Self::Weather => "Weather",
            Self::Gps => "GPS",
        }
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
