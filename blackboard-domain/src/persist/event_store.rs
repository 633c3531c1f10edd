//! 事件存储（EventStore）
//!
//! 对标记为需持久化的事件做“尽力而为”的记录：
//! - 非持久化事件不产生任何存储开销；
//! - 缺失实体/来源标识仅告警，不阻止提交；
//! - 提交失败被记录并吞掉，绝不阻塞扇出或发布者。
//!
use crate::error::DomainResult as Result;
use crate::model::Event;
use crate::persist::{EventRepository, StoredEvent};
use std::sync::Arc;
use tracing::{error, warn};

#[derive(Clone)]
pub struct EventStore {
    repository: Arc<dyn EventRepository>,
}

impl EventStore {
    pub fn new(repository: Arc<dyn EventRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<dyn EventRepository> {
        &self.repository
    }

    /// 记录事件；返回已提交的记录，未持久化或失败时返回 `None`
    pub async fn add_event(&self, event: &Event) -> Option<StoredEvent> {
        if !event.publish_to_database() {
            return None;
        }

        match self.commit(event).await {
            Ok(stored) => Some(stored),
            Err(err) => {
                error!(event_type = event.event_type(), error = %err, "failed to add event to store");
                None
            }
        }
    }

    async fn commit(&self, event: &Event) -> Result<StoredEvent> {
        if event.event_subject().is_nil() {
            warn!(event_type = event.event_type(), "event has no EventSubject");
        }
        if event.source_computer().is_nil() {
            warn!(event_type = event.event_type(), "event has no SourceComputer");
        }

        let record = StoredEvent::try_from(event)?;
        self.repository.commit(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use crate::persist::InMemoryEventRepository;
    use async_trait::async_trait;
    use uuid::Uuid;

    struct BrokenRepository;

    #[async_trait]
    impl EventRepository for BrokenRepository {
        async fn commit(&self, _event: StoredEvent) -> Result<StoredEvent> {
            Err(DomainError::event_store("disk full"))
        }
        async fn events_for(&self, _subject: Uuid) -> Result<Vec<StoredEvent>> {
            Ok(vec![])
        }
        async fn count(&self) -> Result<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn only_durable_events_are_committed() {
        let repo = Arc::new(InMemoryEventRepository::new());
        let store = EventStore::new(repo.clone());

        let transient = Event::builder().event_type("Tick").build();
        assert!(store.add_event(&transient).await.is_none());

        // 缺失标识只告警
        let durable = Event::builder()
            .event_type("UserEvent")
            .publish_to_database(true)
            .build();
        let stored = store.add_event(&durable).await.expect("committed");
        assert_eq!(stored.sequence_number(), Some(1));
        assert_eq!(stored.params(), None);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn commit_failure_is_swallowed() {
        let store = EventStore::new(Arc::new(BrokenRepository));
        let durable = Event::builder()
            .event_type("UserEvent")
            .event_subject(Uuid::new_v4())
            .publish_to_database(true)
            .build();
        assert!(store.add_event(&durable).await.is_none());
    }
}
