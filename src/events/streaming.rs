//! Filtered event receivers

use tokio::sync::broadcast;

use super::errors::EventBusError;
use super::types::ScanEvent;

/// Receiver that only yields events passing `filter`
pub struct FilteredReceiver<F>
where
    F: Fn(&ScanEvent) -> bool + Send + Sync + 'static,
{
    receiver: broadcast::Receiver<ScanEvent>,
    filter: F,
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&ScanEvent) -> bool + Send + Sync + 'static,
{
    pub fn new(receiver: broadcast::Receiver<ScanEvent>, filter: F) -> Self {
        Self { receiver, filter }
    }

    /// Wait for the next event that passes the filter
    ///
    /// # Errors
    ///
    /// `Shutdown` once the bus is gone, `ReceiverLagged` when events were
    /// overwritten before this receiver read them.
    pub async fn recv(&mut self) -> Result<ScanEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if (self.filter)(&event) => return Ok(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Closed) => return Err(EventBusError::Shutdown),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Err(EventBusError::ReceiverLagged(skipped));
                }
            }
        }
    }

    /// Drain buffered events without waiting
    ///
    /// # Errors
    ///
    /// As [`FilteredReceiver::recv`].
    pub fn try_recv(&mut self) -> Result<Option<ScanEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if (self.filter)(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(EventBusError::Shutdown),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    return Err(EventBusError::ReceiverLagged(skipped));
                }
            }
        }
    }
}
