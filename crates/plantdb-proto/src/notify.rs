//! Outbound notifications to whoever subscribed to the service.

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Plant list stream frames and operation results.
    Plant,
    /// Pack transfer status frames.
    Transfer,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// Transmit buffers are full; the frame may be retried.
    #[error("notification buffers busy")]
    Busy,

    #[error("subscriber disconnected")]
    Disconnected,

    #[error("notification failed: {0}")]
    Other(String),
}

/// Sink for frames pushed to a subscriber.
pub trait Notifier: Send + Sync + Debug {
    fn notify(&self, channel: Channel, frame: &[u8]) -> Result<(), NotifyError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records every delivered frame; queued failures are returned first.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        frames: Mutex<Vec<(Channel, Vec<u8>)>>,
        failures: Mutex<VecDeque<NotifyError>>,
    }

    impl RecordingNotifier {
        pub fn fail_with(&self, errors: impl IntoIterator<Item = NotifyError>) {
            self.failures.lock().unwrap().extend(errors);
        }

        pub fn frames(&self, channel: Channel) -> Vec<Vec<u8>> {
            self.frames
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| *c == channel)
                .map(|(_, f)| f.clone())
                .collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, channel: Channel, frame: &[u8]) -> Result<(), NotifyError> {
            if let Some(err) = self.failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            self.frames.lock().unwrap().push((channel, frame.to_vec()));
            Ok(())
        }
    }
}
