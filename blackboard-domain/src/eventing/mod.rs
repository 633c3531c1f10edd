//! 事件子系统（eventing）
//!
//! 黑板的发布/订阅引擎：
//! - `Sequencer`：先进先出、单并发的后台执行通道；
//! - `DeliveryQueue`：单个订阅者的有序投递与积压诊断；
//! - `SubscriberRegistry`：cookie → 订阅映射、过滤扇出与健康剔除；
//! - `Blackboard`：统一发布、订阅管理与管理命令，内部运行发布与订阅两条独立通道。
//!
//! 该模块不绑定具体传输实现，本地/远端契约的适配由上层完成。
//!
pub mod blackboard;
pub mod config;
pub mod delivery;
pub mod registry;
pub mod sequencer;

pub use blackboard::Blackboard;
pub use config::BlackboardConfig;
pub use delivery::DeliveryQueue;
pub use registry::{SubscriberRegistry, Subscription};
pub use sequencer::Sequencer;
