//! 持久化（persist）
//!
//! 定义事件仓储协议与其实现，以及在仓储之上的尽力而为事件存储：
//! - `EventRepository`：持久化后端（内存实现、可选 Postgres 实现）；
//! - `StoredEvent`：提交前由事件生成的记录形态；
//! - `EventStore`：仅处理需持久化的事件，失败只记录不上抛。
//!
//! 存储表结构由部署方维护，本模块只关心写入与按实体查询。
//!
mod event_repository;
mod event_store;
mod inmemory_repository;
#[cfg(feature = "infra-sqlx")]
mod pg_repository;
mod stored_event;

pub use event_repository::EventRepository;
pub use event_store::EventStore;
pub use inmemory_repository::InMemoryEventRepository;
#[cfg(feature = "infra-sqlx")]
pub use pg_repository::PgEventRepository;
pub use stored_event::{StoredEvent, serialize_params};
