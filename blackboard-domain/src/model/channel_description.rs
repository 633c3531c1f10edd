use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 远端通道描述：跨主机订阅时随请求传输，由传输层还原为发送通道
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelDescription {
    pub channel_id: Uuid,
    pub host: Uuid,
}
