//! Operation events
//!
//! Components report what they do through an [`EventSink`] instead of
//! printing. The default sink forwards to `tracing`; tests record events.

use std::sync::{Arc, Mutex};

/// Something observable happened while talking to the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RequestSent {
        method: String,
        url: String,
    },
    ResponseReceived {
        method: String,
        url: String,
        status: u16,
    },
    OperationPolled {
        name: String,
        attempt: u32,
        done: bool,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RequestSent { .. } => "request_sent",
            Self::ResponseReceived { .. } => "response_received",
            Self::OperationPolled { .. } => "operation_polled",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn record(&self, event: &Event);
}

/// Default sink: structured `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &Event) {
        match event {
            Event::RequestSent { method, url } => {
                tracing::debug!(kind = event.kind(), %method, %url, "request sent");
            }
            Event::ResponseReceived { method, url, status } => {
                if *status >= 400 {
                    tracing::warn!(kind = event.kind(), %method, %url, status, "response received");
                } else {
                    tracing::debug!(kind = event.kind(), %method, %url, status, "response received");
                }
            }
            Event::OperationPolled { name, attempt, done } => {
                tracing::info!(kind = event.kind(), %name, attempt, done, "operation polled");
            }
        }
    }
}

/// Keeps every event in memory, in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events().iter().filter(|e| e.kind() == kind).count()
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

pub fn default_sink() -> Arc<dyn EventSink> {
    Arc::new(TracingSink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.record(&Event::RequestSent {
            method: "POST".to_string(),
            url: "https://example.com/v3/tagBindings".to_string(),
        });
        sink.record(&Event::OperationPolled {
            name: "operations/1".to_string(),
            attempt: 1,
            done: false,
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), "request_sent");
        assert_eq!(sink.count("operation_polled"), 1);
        assert_eq!(sink.count("response_received"), 0);
    }
}
