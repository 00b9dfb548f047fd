use serde::{Deserialize, Serialize};

/// Lifecycle state of a sensor driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DriverState {
    /// No configuration has been supplied yet
    #[default]
    Uninitialized,
    /// Configuration stored, device untouched
    Configured,
    /// Device handle held and sub-interfaces producing
    Running,
    /// A previous run was torn down; handle released
    Stopped,
}

impl DriverState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Configured => "Configured",
            Self::Running => "Running",
            Self::Stopped => "Stopped",
        }
    }

    /// Check if state accepts a new configuration
    pub fn can_init(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Check if state allows acquiring the device
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Configured | Self::Stopped)
    }

    /// Check if the device handle is expected to be held
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Transition to configured state
    pub fn to_configured(&self) -> Result<Self, &'static str> {
        match self {
            Self::Uninitialized | Self::Configured | Self::Stopped => Ok(Self::Configured),
            Self::Running => Err("Cannot reconfigure a running driver without stopping it"),
        }
    }

    /// Transition to running state
    pub fn to_running(&self) -> Result<Self, &'static str> {
        match self {
            Self::Configured | Self::Stopped => Ok(Self::Running),
            _ => Err("Can only start from Configured or Stopped state"),
        }
    }

    /// Transition applied by `stop`. Only an active run moves to Stopped;
    /// every other state is left untouched.
    pub fn to_stopped(&self) -> Self {
        match self {
            Self::Running | Self::Stopped => Self::Stopped,
            other => *other,
        }
    }
}

impl std::fmt::Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_uninitialized() {
        let state = DriverState::default();
        assert_eq!(state, DriverState::Uninitialized);
        assert!(state.can_init());
        assert!(!state.can_start());
    }

    #[test]
    fn test_configured_to_running() {
        let state = DriverState::Configured;
        let next = state.to_running().unwrap();
        assert_eq!(next, DriverState::Running);
        assert!(next.is_running());
    }

    #[test]
    fn test_stopped_is_reenterable() {
        assert_eq!(
            DriverState::Stopped.to_running().unwrap(),
            DriverState::Running
        );
        assert_eq!(
            DriverState::Stopped.to_configured().unwrap(),
            DriverState::Configured
        );
    }

    #[test]
    fn test_cannot_start_from_uninitialized_or_running() {
        assert!(DriverState::Uninitialized.to_running().is_err());
        assert!(DriverState::Running.to_running().is_err());
    }

    #[test]
    fn test_cannot_configure_while_running() {
        assert!(!DriverState::Running.can_init());
        assert!(DriverState::Running.to_configured().is_err());
    }

    #[test]
    fn test_stop_only_moves_active_runs() {
        assert_eq!(DriverState::Running.to_stopped(), DriverState::Stopped);
        assert_eq!(DriverState::Stopped.to_stopped(), DriverState::Stopped);
        assert_eq!(
            DriverState::Configured.to_stopped(),
            DriverState::Configured
        );
        assert_eq!(
            DriverState::Uninitialized.to_stopped(),
            DriverState::Uninitialized
        );
    }
}
