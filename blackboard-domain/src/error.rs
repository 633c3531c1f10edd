//! 领域层统一错误定义
//!
//! 聚焦订阅协议、顺序执行通道、投递、持久化与管理命令的最小必要集合，
//! 便于在各实现层统一转换为 `DomainError`。
//!
use thiserror::Error;
use uuid::Uuid;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 订阅协议 ---
    #[error("missing channel for new subscription: cookie={cookie}")]
    MissingChannel { cookie: Uuid },

    // --- 顺序执行通道 ---
    #[error("sequencer closed: lane={lane}")]
    SequencerClosed { lane: String },

    // --- 投递/通道 ---
    #[error("channel send failed: {reason}")]
    ChannelSend { reason: String },
    #[error("channel closed")]
    ChannelClosed,
    #[error("unknown channel: channel_id={channel_id}")]
    UnknownChannel { channel_id: Uuid },

    // --- 管理命令 ---
    #[error("component {service} does not support command {command}")]
    NotSupported { service: String, command: String },

    // --- 持久化 ---
    #[error("event store error: {reason}")]
    EventStore { reason: String },
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("database error: {reason}")]
    Database { reason: String },
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn channel_send(reason: impl Into<String>) -> Self {
        DomainError::ChannelSend {
            reason: reason.into(),
        }
    }

    pub fn event_store(reason: impl Into<String>) -> Self {
        DomainError::EventStore {
            reason: reason.into(),
        }
    }
}

#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Database {
            reason: err.to_string(),
        }
    }
}
