use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 黑板事件
///
/// 由发布者构造，按需持久化后扇出给所有匹配的订阅，随后丢弃。
/// `event_subject` 与 `source_computer` 允许为空（nil），仅在持久化时告警。
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct Event {
    /// 事件类型
    #[builder(into)]
    event_type: String,
    /// 事件所涉及的实体
    #[builder(default)]
    event_subject: Uuid,
    /// 事件来源主机
    #[builder(default)]
    source_computer: Uuid,
    /// 附加数据（对黑板不透明）
    #[builder(default)]
    ext_data: Value,
    /// 是否写入事件存储
    #[builder(default)]
    publish_to_database: bool,
}

impl Event {
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_subject(&self) -> Uuid {
        self.event_subject
    }

    pub fn source_computer(&self) -> Uuid {
        self.source_computer
    }

    pub fn ext_data(&self) -> &Value {
        &self.ext_data
    }

    pub fn publish_to_database(&self) -> bool {
        self.publish_to_database
    }
}
