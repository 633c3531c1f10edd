//! 黑板对外契约
//!
//! 本地契约与远端契约共享同一核心与相同的排序/过滤语义，区别仅在于：
//! - 本地订阅直接携带发送通道，并按过滤器的主机标记决定是否登记；
//! - 远端订阅携带通道描述，由传输层还原后在订阅管理通道上排队执行。
//!
use blackboard_domain::channel::SenderChannel;
use blackboard_domain::error::DomainResult as Result;
use blackboard_domain::model::{ChannelDescription, Command, Event, EventFilter};
use std::sync::Arc;
use uuid::Uuid;

/// 本地契约（同进程调用方）
pub trait BlackboardService: Send + Sync {
    fn publish_event(&self, event: Event) -> Result<()>;

    /// `channel` 为空表示只更新过滤器
    fn subscribe(
        &self,
        filter: Arc<dyn EventFilter>,
        channel: Option<Arc<dyn SenderChannel>>,
        cookie: Uuid,
    ) -> Result<()>;

    fn unsubscribe(&self, cookie: Uuid) -> Result<()>;
}

/// 远端契约（跨主机调用方）
pub trait RemoteBlackboardService: Send + Sync {
    fn publish_event(&self, event: Event) -> Result<()>;

    fn subscribe(
        &self,
        filter: Arc<dyn EventFilter>,
        channel: Option<ChannelDescription>,
        cookie: Uuid,
    ) -> Result<()>;

    fn unsubscribe(&self, cookie: Uuid) -> Result<()>;

    /// 供远端调用方选择本地或远端路由
    fn host_id(&self) -> Uuid;
}

/// 管理契约
pub trait ExecutiveService: Send + Sync {
    fn execute_command(&self, command: Command) -> Result<()>;
}
