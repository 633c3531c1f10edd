use crate::{error::DomainResult as Result, persist::StoredEvent};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// 事件仓储：持久化后端
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// 提交一条事件，返回已赋位点的记录
    async fn commit(&self, event: StoredEvent) -> Result<StoredEvent>;

    /// 按实体查询，按位点升序
    async fn events_for(&self, subject: Uuid) -> Result<Vec<StoredEvent>>;

    async fn count(&self) -> Result<usize>;
}

#[async_trait]
impl<T> EventRepository for Arc<T>
where
    T: EventRepository + ?Sized,
{
    async fn commit(&self, event: StoredEvent) -> Result<StoredEvent> {
        (**self).commit(event).await
    }

    async fn events_for(&self, subject: Uuid) -> Result<Vec<StoredEvent>> {
        (**self).events_for(subject).await
    }

    async fn count(&self) -> Result<usize> {
        (**self).count().await
    }
}
