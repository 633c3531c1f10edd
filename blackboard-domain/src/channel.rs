//! 投递通道（Channel）协议
//!
//! 每个订阅持有一个发送通道。通道可选地具备“健康感知”能力：
//! 提供唯一标识、连接状态与状态变化通知，此类通道断开时其上的全部订阅会被剔除。
//!
use crate::{error::DomainResult as Result, model::Event};
use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// 发送通道
///
/// 传输层超时由实现自行负责，失败须以错误返回，由投递队列记录。
#[async_trait]
pub trait SenderChannel: Send + Sync {
    async fn send(&self, event: &Event) -> Result<()>;

    /// 健康感知通道的唯一标识；`None` 表示不参与健康剔除
    fn channel_id(&self) -> Option<Uuid> {
        None
    }

    fn is_connected(&self) -> bool {
        true
    }

    /// 连接状态变化通知
    fn state_changes(&self) -> Option<watch::Receiver<ConnectionState>> {
        None
    }

    /// 显式退订时调用
    fn close(&self) {}
}
