use crate::contract::{BlackboardService, RemoteBlackboardService};
use crate::local::LocalBlackboard;
use blackboard_domain::error::DomainResult as Result;
use blackboard_domain::eventing::Blackboard;
use blackboard_domain::model::{ChannelDescription, Event, EventFilter};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// 远端契约适配器
///
/// 订阅与退订都在订阅管理通道上排队，保证同一 cookie 的操作按到达顺序执行，
/// 且不阻塞远端调用方。
#[derive(Clone)]
pub struct RemoteBlackboard {
    local: LocalBlackboard,
}

impl RemoteBlackboard {
    pub fn new(core: Arc<Blackboard>) -> Self {
        Self {
            local: LocalBlackboard::new(core),
        }
    }

    fn core(&self) -> &Arc<Blackboard> {
        self.local.core()
    }
}

impl RemoteBlackboardService for RemoteBlackboard {
    fn publish_event(&self, event: Event) -> Result<()> {
        debug!(event_type = event.event_type(), "remote publish");
        self.local.publish_event(event)
    }

    fn subscribe(
        &self,
        filter: Arc<dyn EventFilter>,
        channel: Option<ChannelDescription>,
        cookie: Uuid,
    ) -> Result<()> {
        debug!(cookie = %cookie, "remote subscribe");
        let channel = channel
            .as_ref()
            .map(|description| self.core().transport().create_sender_channel(description))
            .transpose()?;

        let local = self.local.clone();
        self.core()
            .sequence_subscription(async move { local.subscribe(filter, channel, cookie) })
    }

    fn unsubscribe(&self, cookie: Uuid) -> Result<()> {
        debug!(cookie = %cookie, "remote unsubscribe");
        let local = self.local.clone();
        self.core()
            .sequence_subscription(async move { local.unsubscribe(cookie) })
    }

    fn host_id(&self) -> Uuid {
        debug!("remote host id requested");
        self.core().host_id()
    }
}
