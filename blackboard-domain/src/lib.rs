//! 事件黑板领域层（blackboard-domain）
//!
//! 进程内事件黑板：组件向中心发布领域事件，本地或远端组件以过滤器订阅，
//! 并经各自的投递通道接收匹配事件，可选地对事件做持久化记录。
//! - 值模型（`model`）：事件、过滤器、管理命令、远端通道描述
//! - 通道与传输协议（`channel`、`transport`）
//! - 持久化（`persist`）：事件仓储与尽力而为的事件存储
//! - 事件子系统（`eventing`）：顺序执行通道、投递队列、订阅者注册表与黑板核心
//!
//! 典型用法：
//! 1. 实现 `Transport` 与 `EventRepository`（或使用内存实现）；
//! 2. 通过 `Blackboard::builder()` 注入依赖并构建核心；
//! 3. 由上层适配器暴露本地/远端契约。
//!
pub mod channel;
pub mod error;
pub mod eventing;
pub mod model;
pub mod persist;
pub mod transport;
