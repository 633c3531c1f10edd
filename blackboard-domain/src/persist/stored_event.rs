//! 事件持久化模型（StoredEvent）
//!
//! 事件在持久化层的标准形态：由 `Event` 生成的新值，补充记录时间与
//! 规范化后的参数文本，序号由存储层在提交后赋值。原事件不会被修改。
//!
use crate::model::Event;
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct StoredEvent {
    /// 全局事件位点，由存储层在持久化后赋值
    sequence_number: Option<i64>,
    /// 事件类型
    #[builder(into)]
    event_type: String,
    /// 事件所涉及的实体
    event_subject: Uuid,
    /// 事件来源主机
    source_computer: Uuid,
    /// 参数文本；`None` 即“无参数”
    params: Option<String>,
    /// 记录时间
    recorded_at: DateTime<Utc>,
}

impl StoredEvent {
    pub fn sequence_number(&self) -> Option<i64> {
        self.sequence_number
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_subject(&self) -> Uuid {
        self.event_subject
    }

    pub fn source_computer(&self) -> Uuid {
        self.source_computer
    }

    pub fn params(&self) -> Option<&str> {
        self.params.as_deref()
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// 返回带有存储层位点的新值
    pub fn with_sequence_number(mut self, sequence_number: i64) -> Self {
        self.sequence_number = Some(sequence_number);
        self
    }
}

impl TryFrom<&Event> for StoredEvent {
    type Error = serde_json::Error;

    fn try_from(event: &Event) -> Result<Self, Self::Error> {
        Ok(StoredEvent {
            sequence_number: None,
            event_type: event.event_type().to_string(),
            event_subject: event.event_subject(),
            source_computer: event.source_computer(),
            params: serialize_params(event.ext_data())?,
            recorded_at: Utc::now(),
        })
    }
}

/// 将附加数据序列化为参数文本，空载荷规范化为 `None`
pub fn serialize_params(ext_data: &Value) -> Result<Option<String>, serde_json::Error> {
    let is_empty = match ext_data {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    };
    if is_empty {
        return Ok(None);
    }

    let text = serde_json::to_string(ext_data)?;
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_payloads_normalize_to_no_params() {
        for empty in [json!(null), json!(""), json!("   "), json!([]), json!({})] {
            assert_eq!(serialize_params(&empty).unwrap(), None, "{empty}");
        }
        assert_eq!(
            serialize_params(&json!({"count": 3})).unwrap().as_deref(),
            Some(r#"{"count":3}"#)
        );
        assert_eq!(serialize_params(&json!(false)).unwrap().as_deref(), Some("false"));
    }

    #[test]
    fn stored_event_copies_identity_without_touching_source() {
        let subject = Uuid::new_v4();
        let host = Uuid::new_v4();
        let event = Event::builder()
            .event_type("UserEvent")
            .event_subject(subject)
            .source_computer(host)
            .ext_data(json!({"name": "D1"}))
            .publish_to_database(true)
            .build();
        let before = event.clone();

        let stored = StoredEvent::try_from(&event).unwrap();
        assert_eq!(stored.sequence_number(), None);
        assert_eq!(stored.event_type(), "UserEvent");
        assert_eq!(stored.event_subject(), subject);
        assert_eq!(stored.source_computer(), host);
        assert_eq!(stored.params(), Some(r#"{"name":"D1"}"#));
        assert_eq!(event, before);

        let committed = stored.with_sequence_number(7);
        assert_eq!(committed.sequence_number(), Some(7));
    }
}
