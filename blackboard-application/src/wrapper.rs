//! 同步外观（BlackboardWrapper）
//!
//! 为同进程调用方提供便捷接口：订阅时分配新的通道对与 cookie，
//! 可选地挂接接收回调，再委托给本地契约。资源随 `shutdown` 或释放确定性回收。
//!
use crate::contract::{BlackboardService, ExecutiveService};
use crate::error::AppResult as Result;
use crate::local::LocalBlackboard;
use crate::transport::{InProcessTransport, ReceiverChannel};
use blackboard_domain::channel::SenderChannel;
use blackboard_domain::eventing::{Blackboard, BlackboardConfig};
use blackboard_domain::model::{Command, Event, EventFilter};
use blackboard_domain::persist::EventRepository;
use dashmap::DashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use uuid::Uuid;

/// 接收回调
pub type ReceiveHandler = Arc<dyn Fn(Event) + Send + Sync>;

/// 订阅结果
///
/// 未提供回调时 `receiver` 交还调用方自行消费；提供回调时接收端由后台泵持有。
pub struct WrapperSubscription {
    pub cookie: Uuid,
    pub receiver: Option<ReceiverChannel>,
}

pub struct BlackboardWrapper {
    local: LocalBlackboard,
    transport: Arc<InProcessTransport>,
    pumps: DashMap<Uuid, CancellationToken>,
}

impl BlackboardWrapper {
    /// 以进程内传输构建核心（需在 tokio 运行时内调用；之后可从任意线程使用）
    pub fn new(
        transport: Arc<InProcessTransport>,
        event_repository: Arc<dyn EventRepository>,
        config: BlackboardConfig,
    ) -> Self {
        let core = Blackboard::builder()
            .transport(transport.clone())
            .event_repository(event_repository)
            .config(config)
            .build();
        Self::with_core(transport, Arc::new(core))
    }

    /// 包装已有核心；`transport` 应与核心使用的传输一致
    pub fn with_core(transport: Arc<InProcessTransport>, core: Arc<Blackboard>) -> Self {
        Self {
            local: LocalBlackboard::new(core),
            transport,
            pumps: DashMap::new(),
        }
    }

    pub fn core(&self) -> &Arc<Blackboard> {
        self.local.core()
    }

    pub fn host_id(&self) -> Uuid {
        self.local.core().host_id()
    }

    pub fn subscribe(
        &self,
        filter: Arc<dyn EventFilter>,
        on_receive: Option<ReceiveHandler>,
    ) -> Result<WrapperSubscription> {
        let cookie = Uuid::new_v4();
        let (sender, receiver) = self.transport.create_channel_pair();
        let channel: Arc<dyn SenderChannel> = sender;
        self.local.subscribe(filter, Some(channel), cookie)?;

        let Some(handler) = on_receive else {
            return Ok(WrapperSubscription {
                cookie,
                receiver: Some(receiver),
            });
        };

        let token = CancellationToken::new();
        self.pumps.insert(cookie, token.clone());
        self.core()
            .runtime()
            .spawn(pump(cookie, receiver, handler, token));

        Ok(WrapperSubscription {
            cookie,
            receiver: None,
        })
    }

    /// 仅更新过滤器，通道保持不变
    pub fn update(&self, cookie: Uuid, filter: Arc<dyn EventFilter>) -> Result<()> {
        self.local.subscribe(filter, None, cookie)?;
        Ok(())
    }

    pub fn unsubscribe(&self, cookie: Uuid) -> Result<()> {
        if let Some((_, token)) = self.pumps.remove(&cookie) {
            token.cancel();
        }
        self.local.unsubscribe(cookie)?;
        Ok(())
    }

    pub fn publish_event(&self, event: Event) -> Result<()> {
        self.local.publish_event(event)?;
        Ok(())
    }

    pub fn execute_command(&self, command: Command) -> Result<()> {
        self.local.execute_command(command)?;
        Ok(())
    }

    /// 停止全部接收泵，再有序关闭核心
    pub async fn shutdown(&self) {
        self.cancel_pumps();
        self.local.core().shutdown().await;
    }

    fn cancel_pumps(&self) {
        self.pumps.iter().for_each(|entry| entry.value().cancel());
        self.pumps.clear();
    }
}

impl Drop for BlackboardWrapper {
    fn drop(&mut self) {
        self.cancel_pumps();
    }
}

async fn pump(
    cookie: Uuid,
    mut receiver: ReceiverChannel,
    handler: ReceiveHandler,
    token: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = token.cancelled() => break,
            next = receiver.recv() => match next {
                Some(event) => event,
                None => break,
            },
        };

        let handler = handler.clone();
        if catch_unwind(AssertUnwindSafe(move || handler(event))).is_err() {
            error!(cookie = %cookie, "receive callback panicked");
        }
    }
    debug!(cookie = %cookie, "receive pump stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackboard_domain::model::{EventTypes, TypeFilter};
    use blackboard_domain::persist::InMemoryEventRepository;
    use std::sync::Mutex;
    use std::time::Duration;

    fn wrapper() -> BlackboardWrapper {
        BlackboardWrapper::new(
            Arc::new(InProcessTransport::new(Uuid::new_v4())),
            Arc::new(InMemoryEventRepository::new()),
            BlackboardConfig::default(),
        )
    }

    fn by_type(host: Uuid, ty: &str) -> Arc<dyn EventFilter> {
        Arc::new(
            TypeFilter::builder()
                .host(host)
                .types(EventTypes::One(ty.into()))
                .build(),
        )
    }

    #[test]
    fn subscribe_with_callback_from_a_plain_thread() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let bb = Arc::new(runtime.block_on(async { wrapper() }));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: ReceiveHandler = Arc::new(move |event: Event| {
            sink.lock().unwrap().push(event.event_type().to_string());
        });

        let subscription = {
            let bb = bb.clone();
            std::thread::spawn(move || bb.subscribe(by_type(bb.host_id(), "A"), Some(handler)))
                .join()
                .unwrap()
                .unwrap()
        };
        bb.publish_event(Event::builder().event_type("A").build()).unwrap();

        runtime.block_on(async {
            let _ = tokio::time::timeout(Duration::from_secs(2), async {
                while seen.lock().unwrap().is_empty() {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
            .await;
        });
        assert_eq!(*seen.lock().unwrap(), vec!["A"]);

        bb.unsubscribe(subscription.cookie).unwrap();
        runtime.block_on(bb.shutdown());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn callback_survives_a_panicking_event() {
        let bb = wrapper();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: ReceiveHandler = Arc::new(move |event: Event| {
            if event.event_type() == "Boom" {
                panic!("callback failure");
            }
            sink.lock().unwrap().push(event.event_type().to_string());
        });

        let host = bb.host_id();
        let first = bb.subscribe(by_type(host, "Boom"), Some(handler.clone())).unwrap();
        assert!(first.receiver.is_none());
        bb.update(
            first.cookie,
            Arc::new(
                TypeFilter::builder()
                    .host(host)
                    .types(EventTypes::Many(vec!["Boom".into(), "Ok".into()]))
                    .build(),
            ),
        )
        .unwrap();

        bb.publish_event(Event::builder().event_type("Boom").build()).unwrap();
        bb.publish_event(Event::builder().event_type("Ok").build()).unwrap();

        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            while seen.lock().unwrap().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert_eq!(*seen.lock().unwrap(), vec!["Ok"]);
        bb.shutdown().await;
    }
}
