use super::Event;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 事件过滤器：匹配谓词 + 路由主机标记
///
/// `host` 决定订阅由本地路径还是远端路径处理；`is_pass` 在扇出时于锁外调用，
/// 实现不得阻塞。
pub trait EventFilter: fmt::Debug + Send + Sync {
    /// 订阅方所在主机
    fn host(&self) -> Uuid;

    /// 事件是否通过过滤
    fn is_pass(&self, event: &Event) -> bool;
}

/// 过滤器接受的事件类型集合
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTypes {
    One(String),
    Many(Vec<String>),
    All,
}

impl EventTypes {
    pub fn contains(&self, event_type: &str) -> bool {
        match self {
            EventTypes::One(t) => t == event_type,
            EventTypes::Many(ts) => ts.iter().any(|t| t == event_type),
            EventTypes::All => true,
        }
    }
}

/// 按事件类型（可选再按实体）过滤
#[derive(Clone, Debug, Builder, Serialize, Deserialize)]
pub struct TypeFilter {
    host: Uuid,
    types: EventTypes,
    /// 仅接受该实体的事件；为空则不限
    subject: Option<Uuid>,
}

impl TypeFilter {
    pub fn types(&self) -> &EventTypes {
        &self.types
    }

    pub fn subject(&self) -> Option<Uuid> {
        self.subject
    }
}

impl EventFilter for TypeFilter {
    fn host(&self) -> Uuid {
        self.host
    }

    fn is_pass(&self, event: &Event) -> bool {
        if let Some(subject) = self.subject {
            if subject != event.event_subject() {
                return false;
            }
        }
        self.types.contains(event.event_type())
    }
}
