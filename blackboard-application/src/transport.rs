//! 进程内传输（InProcessTransport）
//!
//! 基于 tokio 通道实现的轻量传输，满足 `Transport` 协议：
//! - `create_channel_pair`：创建一对“整体”通道，发送端健康感知；
//! - `expose`：把发送端登记到端点目录，返回可随远端请求传递的描述；
//! - `create_sender_channel`：依据描述从端点目录还原发送端。
//!
//! 接收端被释放或关闭时，发送端转为断开，黑板据此剔除相关订阅。
//!
use async_trait::async_trait;
use blackboard_domain::channel::{ConnectionState, SenderChannel};
use blackboard_domain::error::{DomainError, DomainResult as Result};
use blackboard_domain::model::{ChannelDescription, Event};
use blackboard_domain::transport::Transport;
use dashmap::DashMap;
use futures_core::Stream;
use futures_core::stream::BoxStream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

pub struct InProcessTransport {
    host_id: Uuid,
    endpoints: DashMap<Uuid, Arc<IntegralSender>>,
}

impl InProcessTransport {
    pub fn new(host_id: Uuid) -> Self {
        Self {
            host_id,
            endpoints: DashMap::new(),
        }
    }

    /// 创建一对进程内通道
    pub fn create_channel_pair(&self) -> (Arc<IntegralSender>, ReceiverChannel) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Connected);
        let state = Arc::new(state);

        let sender = Arc::new(IntegralSender {
            id,
            tx,
            state: state.clone(),
        });
        let receiver = ReceiverChannel {
            id,
            rx,
            guard: DisconnectGuard { state },
        };
        (sender, receiver)
    }

    /// 登记发送端，返回其远端描述
    pub fn expose(&self, sender: Arc<IntegralSender>) -> ChannelDescription {
        let description = ChannelDescription {
            channel_id: sender.id,
            host: self.host_id,
        };
        self.endpoints.insert(sender.id, sender);
        description
    }

    /// 撤销登记
    pub fn withdraw(&self, channel_id: Uuid) -> bool {
        self.endpoints.remove(&channel_id).is_some()
    }
}

impl Transport for InProcessTransport {
    fn host_id(&self) -> Uuid {
        self.host_id
    }

    fn create_sender_channel(
        &self,
        description: &ChannelDescription,
    ) -> Result<Arc<dyn SenderChannel>> {
        let Some(sender) = self
            .endpoints
            .get(&description.channel_id)
            .map(|e| e.value().clone())
        else {
            return Err(DomainError::UnknownChannel {
                channel_id: description.channel_id,
            });
        };
        Ok(sender)
    }
}

/// 进程内发送端（健康感知）
pub struct IntegralSender {
    id: Uuid,
    tx: mpsc::UnboundedSender<Event>,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl IntegralSender {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

#[async_trait]
impl SenderChannel for IntegralSender {
    async fn send(&self, event: &Event) -> Result<()> {
        if !self.is_connected() {
            return Err(DomainError::ChannelClosed);
        }
        self.tx.send(event.clone()).map_err(|_| {
            self.state.send_replace(ConnectionState::Disconnected);
            DomainError::ChannelClosed
        })
    }

    fn channel_id(&self) -> Option<Uuid> {
        Some(self.id)
    }

    fn is_connected(&self) -> bool {
        *self.state.borrow() == ConnectionState::Connected && !self.tx.is_closed()
    }

    fn state_changes(&self) -> Option<watch::Receiver<ConnectionState>> {
        Some(self.state.subscribe())
    }

    fn close(&self) {
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

/// 接收端释放时将通道标记为断开
struct DisconnectGuard {
    state: Arc<watch::Sender<ConnectionState>>,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

/// 进程内接收端
pub struct ReceiverChannel {
    id: Uuid,
    rx: mpsc::UnboundedReceiver<Event>,
    guard: DisconnectGuard,
}

impl ReceiverChannel {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        *self.guard.state.borrow() == ConnectionState::Connected
    }

    /// 等待下一条事件；发送端全部释放后返回 `None`
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// 主动断开；已到达的事件仍可取出
    pub fn close(&mut self) {
        self.guard.state.send_replace(ConnectionState::Disconnected);
        self.rx.close();
    }

    /// 转为 `'static` 生命周期的事件流，流被释放时通道断开
    pub fn into_stream(self) -> BoxStream<'static, Event> {
        Box::pin(EventStream {
            inner: UnboundedReceiverStream::new(self.rx),
            _guard: self.guard,
        })
    }
}

struct EventStream {
    inner: UnboundedReceiverStream<Event>,
    _guard: DisconnectGuard,
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(ty: &str) -> Event {
        Event::builder().event_type(ty).build()
    }

    #[tokio::test]
    async fn pair_delivers_and_reports_disconnect_on_drop() {
        let transport = InProcessTransport::new(Uuid::new_v4());
        let (sender, mut receiver) = transport.create_channel_pair();
        let mut state = sender.state_changes().unwrap();

        sender.send(&event("A")).await.unwrap();
        assert_eq!(receiver.recv().await.unwrap().event_type(), "A");
        assert!(sender.is_connected());

        drop(receiver);
        state.changed().await.unwrap();
        assert_eq!(*state.borrow(), ConnectionState::Disconnected);
        assert!(matches!(
            sender.send(&event("B")).await,
            Err(DomainError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn exposed_sender_can_be_materialized_from_description() {
        let transport = InProcessTransport::new(Uuid::new_v4());
        let (sender, mut receiver) = transport.create_channel_pair();
        let description = transport.expose(sender.clone());
        assert_eq!(description.host, transport.host_id());

        let materialized = transport.create_sender_channel(&description).unwrap();
        assert_eq!(materialized.channel_id(), Some(sender.id()));
        materialized.send(&event("A")).await.unwrap();
        assert_eq!(receiver.try_recv().unwrap().event_type(), "A");

        assert!(transport.withdraw(description.channel_id));
        assert!(matches!(
            transport.create_sender_channel(&description),
            Err(DomainError::UnknownChannel { .. })
        ));
    }
}
