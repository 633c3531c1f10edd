use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// 管理命令标识
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(Uuid);

impl CommandId {
    /// 更新单个实体
    pub const UPDATE_ENTITY: CommandId =
        CommandId(Uuid::from_u128(0x6c2f_1a4e_0b7d_4f3a_9e51_2d8c_7a10_0001));
    /// 更新实体集合
    pub const UPDATE_ENTITY_COLLECTION: CommandId =
        CommandId(Uuid::from_u128(0x6c2f_1a4e_0b7d_4f3a_9e51_2d8c_7a10_0002));
    /// 关闭服务
    pub const CLOSE_SERVICE: CommandId =
        CommandId(Uuid::from_u128(0x6c2f_1a4e_0b7d_4f3a_9e51_2d8c_7a10_0003));

    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == CommandId::UPDATE_ENTITY {
            f.write_str("UpdateEntity")
        } else if *self == CommandId::UPDATE_ENTITY_COLLECTION {
            f.write_str("UpdateEntityCollection")
        } else if *self == CommandId::CLOSE_SERVICE {
            f.write_str("CloseService")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// 命令执行失败时回送的结构化错误
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    /// 报告错误的服务名
    pub service: String,
    pub message: String,
    /// 底层错误描述
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CommandResponse {
    Done,
    Error(ErrorResult),
}

/// 命令应答通道
pub trait ResponseChannel: Send + Sync {
    fn send_response(&self, response: CommandResponse);
}

/// 管理命令
#[derive(Clone)]
pub struct Command {
    pub command_id: CommandId,
    pub payload: Value,
    pub response_channel: Option<Arc<dyn ResponseChannel>>,
}

impl Command {
    pub fn new(command_id: CommandId, payload: Value) -> Self {
        Self {
            command_id,
            payload,
            response_channel: None,
        }
    }

    pub fn with_response_channel(mut self, channel: Arc<dyn ResponseChannel>) -> Self {
        self.response_channel = Some(channel);
        self
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("command_id", &self.command_id)
            .field("payload", &self.payload)
            .field("has_response_channel", &self.response_channel.is_some())
            .finish()
    }
}
