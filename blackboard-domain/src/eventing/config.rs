use bon::Builder;
use serde::{Deserialize, Serialize};

/// 黑板配置
#[derive(Clone, Debug, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackboardConfig {
    /// 服务名，用于命令错误结果与通道命名
    #[builder(default = BlackboardConfig::DEFAULT_SERVICE_NAME.to_string(), into)]
    pub service_name: String,
    /// 订阅者在途事件数自上次报告以来的变化超过该值时记录告警
    #[builder(default = BlackboardConfig::DEFAULT_BACKLOG_REPORT_THRESHOLD)]
    pub backlog_report_threshold: usize,
}

impl BlackboardConfig {
    pub const DEFAULT_SERVICE_NAME: &'static str = "Blackboard";
    pub const DEFAULT_BACKLOG_REPORT_THRESHOLD: usize = 40;
}

impl Default for BlackboardConfig {
    fn default() -> Self {
        Self {
            service_name: Self::DEFAULT_SERVICE_NAME.to_string(),
            backlog_report_threshold: Self::DEFAULT_BACKLOG_REPORT_THRESHOLD,
        }
    }
}
