use crate::event::SensorEvent;
use async_trait::async_trait;

/// Consumer of driver events.
///
/// Listeners are registered by reference only: the bus keeps a weak
/// reference and the caller owns the listener. Errors are reported by the
/// bus and never reach the producer.
///
/// `NewData` and capture `DriverError` events are delivered from the
/// driver's capture task, and stopping the driver waits for that task while
/// holding the lifecycle lock. A listener must therefore not call back into
/// the driver that delivered the event (not even accessors such as `state`)
/// from `handle_event`; hand the work to another task instead.
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn handle_event(
        &self,
        event: &SensorEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Name used in logs
    fn listener_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
