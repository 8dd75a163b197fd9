use vaultsync_logging::{LogEvent, Logger};

/// Receiver of the notices a sync shows the user
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &LogEvent);
}

impl Notifier for Logger {
    fn notify(&self, event: &LogEvent) {
        self.log(event);
    }
}
