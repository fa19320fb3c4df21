use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::{AverageTimeMode, Config};
use crate::events::DispatchEvent;
use crate::observability::metrics::Metrics;
use crate::store::Store;

pub struct AppState {
    pub store: Store,
    pub events_tx: broadcast::Sender<DispatchEvent>,
    pub metrics: Metrics,
    pub max_partner_load: u32,
    pub average_time_mode: AverageTimeMode,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        Self {
            store: Store::new(config.store_lock_timeout()),
            events_tx,
            metrics: Metrics::new(),
            max_partner_load: config.max_partner_load,
            average_time_mode: config.average_time_mode,
            request_timeout: config.request_timeout(),
        }
    }

    /// Nobody listening is not an error.
    pub fn publish(&self, event: DispatchEvent) {
        let _ = self.events_tx.send(event);
    }
}
