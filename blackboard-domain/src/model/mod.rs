//! 黑板值模型（Event / Filter / Command）
//!
//! 定义发布者构造的事件、订阅方使用的过滤谓词、管理命令及远端通道描述。
//! 这些类型只承载数据与匹配逻辑，不关心投递与持久化。

mod channel_description;
mod command;
mod event;
mod filter;

pub use channel_description::ChannelDescription;
pub use command::{Command, CommandId, CommandResponse, ErrorResult, ResponseChannel};
pub use event::Event;
pub use filter::{EventFilter, EventTypes, TypeFilter};
