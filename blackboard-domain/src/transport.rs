//! 传输层（Transport）协议
//!
//! 黑板核心只依赖两件事：本进程的主机标识，以及把远端通道描述还原为发送通道。
//! 具体传输（进程内、网络）由上层实现并注入。
//!
use crate::{channel::SenderChannel, error::DomainResult as Result, model::ChannelDescription};
use std::sync::Arc;
use uuid::Uuid;

pub trait Transport: Send + Sync {
    /// 本进程所在主机标识
    fn host_id(&self) -> Uuid;

    /// 依据远端描述构造发送通道
    fn create_sender_channel(&self, description: &ChannelDescription)
    -> Result<Arc<dyn SenderChannel>>;
}
