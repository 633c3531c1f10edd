//! 内存版事件仓储（InMemoryEventRepository）
//!
//! 典型用途：测试环境、示例与本地开发。位点从 1 开始按提交顺序递增。
//!
use crate::error::DomainResult as Result;
use crate::persist::{EventRepository, StoredEvent};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryEventRepository {
    events: Mutex<Vec<StoredEvent>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已提交事件的副本（按提交顺序）
    pub fn snapshot(&self) -> Vec<StoredEvent> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn commit(&self, event: StoredEvent) -> Result<StoredEvent> {
        let mut events = self.lock();
        let committed = event.with_sequence_number(events.len() as i64 + 1);
        events.push(committed.clone());
        Ok(committed)
    }

    async fn events_for(&self, subject: Uuid) -> Result<Vec<StoredEvent>> {
        Ok(self
            .lock()
            .iter()
            .filter(|e| e.event_subject() == subject)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.lock().len())
    }
}
