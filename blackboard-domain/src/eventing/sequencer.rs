//! 顺序执行通道（Sequencer）
//!
//! 每个通道由一个 tokio 工作任务串行消费一个无界队列：
//! - `run` 从不阻塞提交方，仅在通道关闭后返回 `SequencerClosed`；
//! - 同一时刻至多一个单元在执行，按提交顺序执行；
//! - 单元返回错误或 panic 时由通道记录，后续单元照常执行，不做重试。
//!
use crate::error::{DomainError, DomainResult as Result};
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

type Unit = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

pub struct Sequencer {
    lane: String,
    tx: Mutex<Option<mpsc::UnboundedSender<Unit>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Sequencer {
    /// 创建通道并在给定运行时上启动工作任务；调用线程无需处于运行时内
    pub fn new(lane: impl Into<String>, runtime: &Handle) -> Self {
        let lane = lane.into();
        let (tx, rx) = mpsc::unbounded_channel::<Unit>();
        let worker = runtime.spawn(Self::drain(lane.clone(), rx));

        Self {
            lane,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn lane(&self) -> &str {
        &self.lane
    }

    /// 提交一个执行单元
    pub fn run<F>(&self, unit: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let guard = lock(&self.tx);
        let Some(tx) = guard.as_ref() else {
            return Err(self.closed());
        };
        tx.send(Box::pin(unit)).map_err(|_| self.closed())
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.tx).as_ref().is_none_or(|tx| tx.is_closed())
    }

    /// 关闭通道：拒绝新单元，等待已排队单元执行完毕
    pub async fn shutdown(&self) {
        lock(&self.tx).take();
        let worker = lock(&self.worker).take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }

    async fn drain(lane: String, mut rx: mpsc::UnboundedReceiver<Unit>) {
        while let Some(unit) = rx.recv().await {
            match AssertUnwindSafe(unit).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(lane = %lane, error = %err, "sequenced unit failed");
                }
                Err(panic) => {
                    error!(lane = %lane, panic = %panic_message(&*panic), "sequenced unit panicked");
                }
            }
        }
    }

    fn closed(&self) -> DomainError {
        DomainError::SequencerClosed {
            lane: self.lane.clone(),
        }
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        // 工作任务在队列排空后自行结束
        lock(&self.tx).take();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
