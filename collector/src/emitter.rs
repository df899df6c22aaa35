use crate::{
    error::{
        CollectError,
        Result,
    },
    metrics::MergedEvent,
    sinks::Sink,
};
use std::sync::Arc;

/// Hands merged events to the configured sink, one at a time.
#[derive(Clone)]
pub struct EventEmitter {
    sink: Arc<dyn Sink>,
}

impl EventEmitter {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self { sink }
    }

    pub async fn emit(&self, event: &MergedEvent) -> Result<()> {
        self.sink
            .publish(event)
            .await
            .map_err(|report| CollectError::Sink {
                resource: event.resource.clone(),
                timestamp: event.timestamp,
                sink: self.sink.name(),
                report,
            })?;

        debug!(resource = %event.resource, timestamp = %event.timestamp, "Event sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metrics::ResourceMetadata,
        testing::{
            t0,
            MemorySink,
        },
    };

    fn event() -> MergedEvent {
        MergedEvent {
            timestamp: t0(),
            resource: "checkout".to_string(),
            metadata: ResourceMetadata::new(),
            metrics: Vec::new(),
        }
    }

    #[tokio::test]
    async fn events_reach_the_sink() {
        let sink = Arc::new(MemorySink::default());
        EventEmitter::new(sink.clone()).emit(&event()).await.unwrap();
        assert_eq!(sink.events(), vec![event()]);
    }

    #[tokio::test]
    async fn sink_failures_name_the_event() {
        let err = EventEmitter::new(Arc::new(MemorySink::failing()))
            .emit(&event())
            .await
            .unwrap_err();

        assert!(
            matches!(err, CollectError::Sink { ref resource, sink: "memory", timestamp, .. } if resource == "checkout" && timestamp == t0())
        );
    }
}
