use crate::contract::{BlackboardService, ExecutiveService};
use blackboard_domain::channel::SenderChannel;
use blackboard_domain::error::DomainResult as Result;
use blackboard_domain::eventing::Blackboard;
use blackboard_domain::model::{Command, Event, EventFilter};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// 本地契约适配器
///
/// 只登记主机标记与本机一致的订阅；跨主机订阅在此忽略，由远端路径处理。
#[derive(Clone)]
pub struct LocalBlackboard {
    core: Arc<Blackboard>,
}

impl LocalBlackboard {
    pub fn new(core: Arc<Blackboard>) -> Self {
        Self { core }
    }

    pub fn core(&self) -> &Arc<Blackboard> {
        &self.core
    }
}

impl BlackboardService for LocalBlackboard {
    fn publish_event(&self, event: Event) -> Result<()> {
        self.core.publish_event(event)
    }

    fn subscribe(
        &self,
        filter: Arc<dyn EventFilter>,
        channel: Option<Arc<dyn SenderChannel>>,
        cookie: Uuid,
    ) -> Result<()> {
        if filter.host() != self.core.host_id() {
            debug!(cookie = %cookie, host = %filter.host(), "ignored subscription for another host");
            return Ok(());
        }
        self.core.register(cookie, filter, channel)
    }

    fn unsubscribe(&self, cookie: Uuid) -> Result<()> {
        self.core.unregister(cookie);
        Ok(())
    }
}

impl ExecutiveService for LocalBlackboard {
    fn execute_command(&self, command: Command) -> Result<()> {
        self.core.execute_command(command)
    }
}
