//! Error types for event receivers

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventBusError {
    /// Receiver couldn't keep up, missed messages
    #[error("Receiver lagged behind, missed {0} messages")]
    ReceiverLagged(u64),

    /// Event bus was dropped
    #[error("Event bus shutdown")]
    Shutdown,
}
