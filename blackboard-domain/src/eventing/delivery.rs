//! 订阅者投递队列（DeliveryQueue）
//!
//! 对单个订阅者保证：
//! - 事件按扇出选中的顺序到达其通道；
//! - 发送互不重叠；
//! - 扇出循环永不因慢订阅者而阻塞。
//!
//! 在途计数仅用于诊断：自上次报告以来增减超过阈值时记录告警，不做上游限流。
//!
use crate::channel::SenderChannel;
use crate::eventing::Sequencer;
use crate::model::{Event, EventFilter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Backlog {
    in_flight: usize,
    last_reported: usize,
}

enum BacklogTrend {
    Growing,
    Shrinking,
}

pub struct DeliveryQueue {
    cookie: Uuid,
    lane: Sequencer,
    backlog: Arc<Mutex<Backlog>>,
    report_threshold: usize,
}

impl DeliveryQueue {
    pub fn new(cookie: Uuid, report_threshold: usize, runtime: &Handle) -> Self {
        Self {
            cookie,
            lane: Sequencer::new(format!("delivery:{cookie}"), runtime),
            backlog: Arc::new(Mutex::new(Backlog::default())),
            report_threshold,
        }
    }

    pub fn cookie(&self) -> Uuid {
        self.cookie
    }

    /// 当前在途（已排队未完成）事件数
    pub fn in_flight(&self) -> usize {
        lock(&self.backlog).in_flight
    }

    /// 排队一次发送；通道在选中时确定
    pub fn on_new_event(
        &self,
        event: Arc<Event>,
        channel: Arc<dyn SenderChannel>,
        filter: &dyn EventFilter,
    ) {
        let (in_flight, trend) = {
            let mut backlog = lock(&self.backlog);
            backlog.in_flight += 1;
            let trend = if backlog.in_flight >= backlog.last_reported + self.report_threshold {
                Some(BacklogTrend::Growing)
            } else if backlog.last_reported > backlog.in_flight + self.report_threshold {
                Some(BacklogTrend::Shrinking)
            } else {
                None
            };
            if trend.is_some() {
                backlog.last_reported = backlog.in_flight;
            }
            (backlog.in_flight, trend)
        };

        match trend {
            Some(BacklogTrend::Growing) => {
                warn!(cookie = %self.cookie, in_flight, filter = ?filter, "subscriber backlog growing");
            }
            Some(BacklogTrend::Shrinking) => {
                warn!(cookie = %self.cookie, in_flight, filter = ?filter, "subscriber backlog shrinking");
            }
            None => {}
        }

        let guard = InFlightGuard {
            backlog: self.backlog.clone(),
        };
        let cookie = self.cookie;
        let queued = self.lane.run(async move {
            let _guard = guard;
            if let Err(err) = channel.send(&event).await {
                error!(
                    cookie = %cookie,
                    event_type = event.event_type(),
                    error = %err,
                    "failed to deliver event"
                );
            }
            Ok(())
        });

        if let Err(err) = queued {
            error!(cookie = %self.cookie, error = %err, "failed to queue delivery");
        }
    }

    /// 在已排队的发送之后关闭通道
    ///
    /// 退订前已选中的事件照常送达；队列已关闭时立即关闭通道。
    pub fn close_after_pending(&self, channel: Arc<dyn SenderChannel>) {
        lock(&self.backlog).in_flight += 1;
        let guard = InFlightGuard {
            backlog: self.backlog.clone(),
        };
        let closing = channel.clone();
        let queued = self.lane.run(async move {
            let _guard = guard;
            closing.close();
            Ok(())
        });
        if queued.is_err() {
            channel.close();
        }
    }

    /// 等待已排队的发送全部完成
    pub async fn shutdown(&self) {
        self.lane.shutdown().await;
    }
}

/// 无论发送成功、失败或 panic，都会归还在途计数
struct InFlightGuard {
    backlog: Arc<Mutex<Backlog>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut backlog = lock(&self.backlog);
        backlog.in_flight = backlog.in_flight.saturating_sub(1);
    }
}

fn lock(backlog: &Mutex<Backlog>) -> MutexGuard<'_, Backlog> {
    backlog.lock().unwrap_or_else(PoisonError::into_inner)
}
