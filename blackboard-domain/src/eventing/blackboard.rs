//! 黑板核心（Blackboard）
//!
//! 发布、订阅管理与管理命令的统一入口。内部运行两条独立的先进先出通道：
//! - 发布通道：所有发布全序执行，每个单元先持久化再扇出；
//! - 订阅通道：远端订阅/退订按提交顺序执行，与发布互不阻塞。
//!
//! 公开入口只负责排队并立即返回；同步返回的失败仅有排队失败，
//! 以及无应答通道时的不支持命令。主机路由与远端通道还原由上层适配器负责。
//!
use crate::channel::SenderChannel;
use crate::error::{DomainError, DomainResult as Result};
use crate::eventing::{BlackboardConfig, Sequencer, SubscriberRegistry};
use crate::model::{Command, CommandId, CommandResponse, ErrorResult, Event, EventFilter};
use crate::persist::{EventRepository, EventStore};
use crate::transport::Transport;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error};
use uuid::Uuid;

pub struct Blackboard {
    host_id: Uuid,
    transport: Arc<dyn Transport>,
    store: EventStore,
    registry: SubscriberRegistry,
    publish_lane: Sequencer,
    subscribe_lane: Sequencer,
    config: BlackboardConfig,
    runtime: Handle,
}

#[bon::bon]
impl Blackboard {
    /// 构建黑板并启动两条执行通道
    ///
    /// 后台任务运行在 `runtime` 上；未提供时取当前运行时（此时需在 tokio 运行时内调用）。
    /// 构建完成后，各入口可从任意线程调用。
    #[builder]
    pub fn new(
        transport: Arc<dyn Transport>,
        event_repository: Arc<dyn EventRepository>,
        #[builder(default)] config: BlackboardConfig,
        #[builder(default = Handle::current())] runtime: Handle,
    ) -> Self {
        let host_id = transport.host_id();
        let publish_lane = Sequencer::new(format!("{}:publish", config.service_name), &runtime);
        let subscribe_lane =
            Sequencer::new(format!("{}:subscribe", config.service_name), &runtime);

        Self {
            host_id,
            transport,
            store: EventStore::new(event_repository),
            registry: SubscriberRegistry::new(config.backlog_report_threshold, runtime.clone()),
            publish_lane,
            subscribe_lane,
            config,
            runtime,
        }
    }
}

impl Blackboard {
    pub fn host_id(&self) -> Uuid {
        self.host_id
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    pub fn event_store(&self) -> &EventStore {
        &self.store
    }

    pub fn config(&self) -> &BlackboardConfig {
        &self.config
    }

    /// 承载后台任务的运行时
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// 排队发布；返回即表示已提交
    pub fn publish_event(&self, event: Event) -> Result<()> {
        let store = self.store.clone();
        let registry = self.registry.clone();

        self.publish_lane
            .run(async move {
                store.add_event(&event).await;
                registry.dispatch(&event);
                Ok(())
            })
            .inspect_err(|err| {
                error!(error = %err, "failed to queue event for publishing");
            })
    }

    /// 直接登记订阅（调用方负责主机路由）
    pub fn register(
        &self,
        cookie: Uuid,
        filter: Arc<dyn EventFilter>,
        channel: Option<Arc<dyn SenderChannel>>,
    ) -> Result<()> {
        self.registry.add(cookie, filter, channel)
    }

    /// 直接删除订阅；重复删除为空操作
    pub fn unregister(&self, cookie: Uuid) -> bool {
        self.registry.remove(cookie).is_some()
    }

    /// 在订阅管理通道上排队执行
    pub fn sequence_subscription<F>(&self, unit: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.subscribe_lane.run(unit)
    }

    /// 执行管理命令
    ///
    /// 有应答通道时结果（含错误）经其回送并返回 `Ok`；否则错误直接返回。
    pub fn execute_command(&self, command: Command) -> Result<()> {
        let outcome = if command.command_id == CommandId::UPDATE_ENTITY
            || command.command_id == CommandId::UPDATE_ENTITY_COLLECTION
        {
            self.on_update_entity(&command);
            Ok(())
        } else if command.command_id == CommandId::CLOSE_SERVICE {
            self.on_close_service(&command);
            Ok(())
        } else {
            Err(DomainError::NotSupported {
                service: self.config.service_name.clone(),
                command: command.command_id.to_string(),
            })
        };

        let Some(response_channel) = &command.response_channel else {
            return outcome;
        };
        let response = match outcome {
            Ok(()) => CommandResponse::Done,
            Err(err) => CommandResponse::Error(ErrorResult {
                service: self.config.service_name.clone(),
                message: format!("command failed in {}", self.config.service_name),
                reason: err.to_string(),
            }),
        };
        response_channel.send_response(response);
        Ok(())
    }

    // 保留扩展点
    fn on_update_entity(&self, command: &Command) {
        debug!(command = %command.command_id, "entity update requested");
    }

    // 保留扩展点
    fn on_close_service(&self, command: &Command) {
        debug!(command = %command.command_id, "service close requested");
    }

    /// 有序关闭：先排空发布与订阅通道，再排空每个订阅者的投递队列
    pub async fn shutdown(&self) {
        self.publish_lane.shutdown().await;
        self.subscribe_lane.shutdown().await;
        self.registry.shutdown().await;
    }
}
