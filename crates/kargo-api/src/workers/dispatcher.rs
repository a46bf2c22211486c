//! Per-group event dispatcher
//!
//! One bounded queue and one consumer task per channel: events from the
//! same group are processed in arrival order and never concurrently, while
//! distinct groups proceed in parallel. The bounded channels are the
//! back-pressure point for the webhook intake.

use async_trait::async_trait;
use kargo_whatsapp::InboundEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

const LANE_CAPACITY: usize = 64;

/// Consumes ordered events for one group
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, event: InboundEvent);
}

pub struct GroupDispatcher {
    handler: Arc<dyn EventHandler>,
    lanes: Mutex<HashMap<String, mpsc::Sender<InboundEvent>>>,
}

impl GroupDispatcher {
    pub fn new(handler: Arc<dyn EventHandler>) -> Self {
        Self {
            handler,
            lanes: Mutex::new(HashMap::new()),
        }
    }

    /// Enqueue one event on its group's lane, creating the lane and its
    /// consumer task on first sight. Awaiting the send applies
    /// back-pressure when a lane is full.
    pub async fn dispatch(&self, event: InboundEvent) {
        let key = event.group_key().to_string();
        let sender = self.lane(&key).await;

        if let Err(send_error) = sender.send(event).await {
            // The consumer died; rebuild the lane and retry once.
            error!(group = %key, "dispatch lane was closed, rebuilding");
            let mut lanes = self.lanes.lock().await;
            lanes.remove(&key);
            drop(lanes);
            let sender = self.lane(&key).await;
            if sender.send(send_error.0).await.is_err() {
                error!(group = %key, "event lost: lane closed twice");
            }
        }
    }

    async fn lane(&self, key: &str) -> mpsc::Sender<InboundEvent> {
        let mut lanes = self.lanes.lock().await;
        if let Some(sender) = lanes.get(key) {
            return sender.clone();
        }

        let (sender, mut receiver) = mpsc::channel::<InboundEvent>(LANE_CAPACITY);
        let handler = Arc::clone(&self.handler);
        let lane_key = key.to_string();
        tokio::spawn(async move {
            debug!(group = %lane_key, "dispatch lane started");
            while let Some(event) = receiver.recv().await {
                handler.handle(event).await;
            }
            debug!(group = %lane_key, "dispatch lane drained");
        });

        lanes.insert(key.to_string(), sender.clone());
        sender
    }

    /// Drop every lane; consumers finish their queued events and exit.
    pub async fn close(&self) {
        self.lanes.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex as StdMutex;
    use tokio::time::{sleep, Duration};

    struct Recorder {
        seen: StdMutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: InboundEvent) {
            // Force an await point so interleaving bugs would surface.
            sleep(Duration::from_millis(1)).await;
            self.seen
                .lock()
                .unwrap()
                .push((event.group_key().to_string(), event.external_message_id));
        }
    }

    fn event(group: &str, id: &str) -> InboundEvent {
        InboundEvent {
            body: "Livré".to_string(),
            external_message_id: id.to_string(),
            external_group_id: Some(group.to_string()),
            group_display_name: None,
            is_group: true,
            from_self: false,
            quoted_external_message_id: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_intra_group_order_is_preserved() {
        let recorder = Arc::new(Recorder {
            seen: StdMutex::new(Vec::new()),
        });
        let dispatcher = GroupDispatcher::new(recorder.clone());

        for i in 0..10 {
            dispatcher.dispatch(event("a@g.us", &format!("m{}", i))).await;
            dispatcher.dispatch(event("b@g.us", &format!("n{}", i))).await;
        }

        // Wait for both lanes to drain.
        sleep(Duration::from_millis(200)).await;

        let seen = recorder.seen.lock().unwrap();
        let lane_a: Vec<&str> = seen
            .iter()
            .filter(|(group, _)| group == "a@g.us")
            .map(|(_, id)| id.as_str())
            .collect();
        let lane_b: Vec<&str> = seen
            .iter()
            .filter(|(group, _)| group == "b@g.us")
            .map(|(_, id)| id.as_str())
            .collect();

        assert_eq!(lane_a, ["m0", "m1", "m2", "m3", "m4", "m5", "m6", "m7", "m8", "m9"]);
        assert_eq!(lane_b, ["n0", "n1", "n2", "n3", "n4", "n5", "n6", "n7", "n8", "n9"]);
    }
}
