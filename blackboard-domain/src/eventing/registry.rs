//! 订阅者注册表（SubscriberRegistry）
//!
//! 线程安全的 cookie → 订阅映射，负责过滤扇出与基于通道健康的剔除：
//! - `add`：按 cookie 新增或更新订阅，新 cookie 必须携带通道；
//! - `remove`：删除并返回订阅，健康感知通道在其已排队的发送完成后关闭；
//! - `dispatch`：持锁取快照、释放锁，再在锁外逐个过滤并排队投递；
//! - 健康感知通道断开时，绑定在该通道上的全部订阅一次性剔除。
//!
//! 任何订阅者代码（过滤、发送、关闭）都不会在持锁期间被调用，
//! 因此订阅者可在投递路径中重入调用订阅/退订。
//!
use crate::channel::{ConnectionState, SenderChannel};
use crate::error::{DomainError, DomainResult as Result};
use crate::eventing::DeliveryQueue;
use crate::model::{Event, EventFilter};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{error, info};
use uuid::Uuid;

/// 一条订阅：过滤器、发送通道与专属投递队列
#[derive(Clone)]
pub struct Subscription {
    cookie: Uuid,
    filter: Arc<dyn EventFilter>,
    channel: Arc<dyn SenderChannel>,
    /// 健康感知通道的 id，登记时取得
    channel_id: Option<Uuid>,
    queue: Arc<DeliveryQueue>,
}

impl Subscription {
    pub fn cookie(&self) -> Uuid {
        self.cookie
    }

    pub fn filter(&self) -> &Arc<dyn EventFilter> {
        &self.filter
    }

    pub fn channel(&self) -> &Arc<dyn SenderChannel> {
        &self.channel
    }

    pub fn in_flight(&self) -> usize {
        self.queue.in_flight()
    }
}

#[derive(Default)]
struct Entries {
    subscriptions: HashMap<Uuid, Subscription>,
    /// 通道 id → 状态监听任务
    watched: HashMap<Uuid, AbortHandle>,
    /// 已退订但仍有排队发送的投递队列
    retired: Vec<Arc<DeliveryQueue>>,
}

impl Entries {
    fn is_bound(&self, channel_id: Uuid) -> bool {
        self.subscriptions
            .values()
            .any(|s| s.channel_id == Some(channel_id))
    }

    /// 通道不再被任何订阅引用时停止其状态监听
    fn release_watch(&mut self, channel_id: Option<Uuid>) {
        let Some(channel_id) = channel_id else {
            return;
        };
        if self.is_bound(channel_id) {
            return;
        }
        if let Some(watcher) = self.watched.remove(&channel_id) {
            watcher.abort();
        }
    }
}

struct Inner {
    entries: Mutex<Entries>,
    report_threshold: usize,
    runtime: Handle,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evict_channel(&self, channel_id: Uuid) -> Vec<Uuid> {
        let mut entries = self.lock();
        let doomed: Vec<Uuid> = entries
            .subscriptions
            .iter()
            .filter(|(_, s)| s.channel_id == Some(channel_id))
            .map(|(cookie, _)| *cookie)
            .collect();
        for cookie in &doomed {
            entries.subscriptions.remove(cookie);
        }
        entries.watched.remove(&channel_id);
        doomed
    }
}

/// 订阅者注册表（可廉价克隆，共享同一映射）
#[derive(Clone)]
pub struct SubscriberRegistry {
    inner: Arc<Inner>,
}

impl SubscriberRegistry {
    /// 投递队列与状态监听任务运行在 `runtime` 上
    pub fn new(report_threshold: usize, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(Entries::default()),
                report_threshold,
                runtime,
            }),
        }
    }

    /// 新增或更新订阅
    ///
    /// - 已存在：总是更新过滤器，仅当提供了通道时替换通道；
    /// - 不存在：必须提供通道，否则返回 `MissingChannel` 且不改变状态。
    pub fn add(
        &self,
        cookie: Uuid,
        filter: Arc<dyn EventFilter>,
        channel: Option<Arc<dyn SenderChannel>>,
    ) -> Result<()> {
        // 通道标识与状态通知在加锁前取得
        let channel_id = channel.as_ref().and_then(|c| c.channel_id());
        let state = channel_id
            .and(channel.as_ref())
            .and_then(|c| c.state_changes());

        let mut guard = self.inner.lock();
        let entries = &mut *guard;
        match entries.subscriptions.get_mut(&cookie) {
            Some(existing) => {
                existing.filter = filter;
                if let Some(channel) = channel {
                    existing.channel = channel;
                    let replaced = std::mem::replace(&mut existing.channel_id, channel_id);
                    if replaced != channel_id {
                        entries.release_watch(replaced);
                    }
                }
            }
            None => {
                let Some(channel) = channel else {
                    error!(cookie = %cookie, "new subscription arrived without a channel");
                    return Err(DomainError::MissingChannel { cookie });
                };
                let queue = Arc::new(DeliveryQueue::new(
                    cookie,
                    self.inner.report_threshold,
                    &self.inner.runtime,
                ));
                entries.subscriptions.insert(
                    cookie,
                    Subscription {
                        cookie,
                        filter,
                        channel,
                        channel_id,
                        queue,
                    },
                );
            }
        }

        if let (Some(channel_id), Some(state)) = (channel_id, state) {
            self.watch_health(entries, channel_id, state);
        }
        Ok(())
    }

    /// 删除订阅；不存在时返回 `None`
    pub fn remove(&self, cookie: Uuid) -> Option<Subscription> {
        let removed = {
            let mut entries = self.inner.lock();
            let removed = entries.subscriptions.remove(&cookie)?;
            entries.release_watch(removed.channel_id);
            removed
        };
        if removed.channel_id.is_some() {
            removed.queue.close_after_pending(removed.channel.clone());
        }

        // 保留仍有排队发送的队列，供 shutdown 等待
        let mut entries = self.inner.lock();
        entries.retired.retain(|queue| queue.in_flight() > 0);
        if removed.queue.in_flight() > 0 {
            entries.retired.push(removed.queue.clone());
        }
        drop(entries);
        Some(removed)
    }

    pub fn get(&self, cookie: Uuid) -> Option<Subscription> {
        self.inner.lock().subscriptions.get(&cookie).cloned()
    }

    pub fn contains(&self, cookie: Uuid) -> bool {
        self.inner.lock().subscriptions.contains_key(&cookie)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 当前挂接状态监听的通道数
    pub fn watched_channels(&self) -> usize {
        self.inner.lock().watched.len()
    }

    /// 扇出：返回选中的订阅数
    pub fn dispatch(&self, event: &Event) -> usize {
        let snapshot: Vec<Subscription> =
            self.inner.lock().subscriptions.values().cloned().collect();

        let event = Arc::new(event.clone());
        let mut matched = 0;
        for subscription in snapshot {
            if subscription.filter.is_pass(&event) {
                subscription.queue.on_new_event(
                    event.clone(),
                    subscription.channel.clone(),
                    subscription.filter.as_ref(),
                );
                matched += 1;
            }
        }
        matched
    }

    /// 移除全部订阅并等待其在途投递（含已退订订阅的）完成
    pub async fn shutdown(&self) {
        let drained: Vec<Arc<DeliveryQueue>> = {
            let mut entries = self.inner.lock();
            entries.watched.drain().for_each(|(_, watcher)| watcher.abort());
            let mut queues: Vec<Arc<DeliveryQueue>> = entries.retired.drain(..).collect();
            queues.extend(entries.subscriptions.drain().map(|(_, s)| s.queue));
            queues
        };
        for queue in drained {
            queue.shutdown().await;
        }
    }

    /// 需在持锁期间调用，保证同一通道至多一个监听任务
    fn watch_health(
        &self,
        entries: &mut Entries,
        channel_id: Uuid,
        mut state: watch::Receiver<ConnectionState>,
    ) {
        if entries.watched.contains_key(&channel_id) {
            return;
        }

        // 任务只持有状态接收端，通道被释放时通知源随之消失；
        // 已断开的通道在首轮检查时即被剔除
        let registry: Weak<Inner> = Arc::downgrade(&self.inner);
        let watcher = self.inner.runtime.spawn(async move {
            loop {
                if *state.borrow_and_update() == ConnectionState::Disconnected {
                    break;
                }
                if state.changed().await.is_err() {
                    break;
                }
            }

            let Some(inner) = registry.upgrade() else {
                return;
            };
            let evicted = inner.evict_channel(channel_id);
            if !evicted.is_empty() {
                info!(channel_id = %channel_id, evicted = evicted.len(), "evicted subscriptions of disconnected channel");
            }
        });
        entries.watched.insert(channel_id, watcher.abort_handle());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainResult;
    use crate::model::{EventTypes, TypeFilter};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::watch;

    #[derive(Default)]
    struct Plain {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SenderChannel for Plain {
        async fn send(&self, event: &Event) -> DomainResult<()> {
            self.seen.lock().unwrap().push(event.event_type().to_string());
            Ok(())
        }
    }

    struct Watched {
        id: Uuid,
        state: watch::Sender<ConnectionState>,
        closed: AtomicBool,
        delivered: AtomicUsize,
    }

    impl Watched {
        fn new() -> Self {
            let (state, _) = watch::channel(ConnectionState::Connected);
            Self {
                id: Uuid::new_v4(),
                state,
                closed: AtomicBool::new(false),
                delivered: AtomicUsize::new(0),
            }
        }

        fn disconnect(&self) {
            self.state.send_replace(ConnectionState::Disconnected);
        }
    }

    #[async_trait]
    impl SenderChannel for Watched {
        async fn send(&self, _event: &Event) -> DomainResult<()> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(DomainError::ChannelClosed);
            }
            tokio::task::yield_now().await;
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn channel_id(&self) -> Option<Uuid> {
            Some(self.id)
        }
        fn is_connected(&self) -> bool {
            *self.state.borrow() == ConnectionState::Connected
        }
        fn state_changes(&self) -> Option<watch::Receiver<ConnectionState>> {
            Some(self.state.subscribe())
        }
        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn filter(types: EventTypes) -> Arc<dyn EventFilter> {
        Arc::new(TypeFilter::builder().host(Uuid::nil()).types(types).build())
    }

    #[tokio::test]
    async fn new_cookie_without_channel_is_rejected() {
        let registry = SubscriberRegistry::new(40, Handle::current());
        let cookie = Uuid::new_v4();

        let err = registry
            .add(cookie, filter(EventTypes::All), None)
            .unwrap_err();
        assert!(matches!(err, DomainError::MissingChannel { cookie: c } if c == cookie));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn update_without_channel_keeps_channel_and_swaps_filter() {
        let registry = SubscriberRegistry::new(40, Handle::current());
        let cookie = Uuid::new_v4();
        let channel = Arc::new(Plain::default());

        registry
            .add(cookie, filter(EventTypes::One("A".into())), Some(channel.clone()))
            .unwrap();
        registry
            .add(cookie, filter(EventTypes::One("B".into())), None)
            .unwrap();

        assert_eq!(registry.len(), 1);
        let sub = registry.get(cookie).unwrap();
        assert!(Arc::ptr_eq(
            sub.channel(),
            &(channel.clone() as Arc<dyn SenderChannel>)
        ));

        let a = Event::builder().event_type("A").build();
        let b = Event::builder().event_type("B").build();
        assert_eq!(registry.dispatch(&a), 0);
        assert_eq!(registry.dispatch(&b), 1);
    }

    #[tokio::test]
    async fn remove_twice_is_a_no_op_and_closes_health_aware_channel() {
        let registry = SubscriberRegistry::new(40, Handle::current());
        let cookie = Uuid::new_v4();
        let channel = Arc::new(Watched::new());

        registry
            .add(cookie, filter(EventTypes::All), Some(channel.clone()))
            .unwrap();
        assert!(registry.remove(cookie).is_some());
        assert!(registry.remove(cookie).is_none());

        registry.shutdown().await;
        assert!(channel.closed.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn removal_closes_channel_only_after_selected_events_are_sent() {
        let registry = SubscriberRegistry::new(40, Handle::current());
        let cookie = Uuid::new_v4();
        let channel = Arc::new(Watched::new());

        registry
            .add(cookie, filter(EventTypes::All), Some(channel.clone()))
            .unwrap();
        for _ in 0..200 {
            registry.dispatch(&Event::builder().event_type("A").build());
        }
        registry.remove(cookie);
        registry.shutdown().await;

        assert_eq!(channel.delivered.load(Ordering::SeqCst), 200);
        assert!(channel.closed.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn replaced_channel_stops_being_watched() {
        let registry = SubscriberRegistry::new(40, Handle::current());
        let cookie = Uuid::new_v4();
        let first = Arc::new(Watched::new());
        let second = Arc::new(Watched::new());

        registry
            .add(cookie, filter(EventTypes::All), Some(first.clone()))
            .unwrap();
        assert_eq!(registry.watched_channels(), 1);
        registry
            .add(cookie, filter(EventTypes::All), Some(second.clone()))
            .unwrap();
        assert_eq!(registry.watched_channels(), 1);

        // 旧通道断开不影响已换绑的订阅
        first.disconnect();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(registry.contains(cookie));

        registry.remove(cookie);
        assert_eq!(registry.watched_channels(), 0);
        registry.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn already_disconnected_channel_is_evicted_on_add() {
        let registry = SubscriberRegistry::new(40, Handle::current());
        let channel = Arc::new(Watched::new());
        channel.disconnect();
        let cookie = Uuid::new_v4();

        registry
            .add(cookie, filter(EventTypes::All), Some(channel.clone()))
            .unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            while registry.contains(cookie) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        assert!(!registry.contains(cookie));
        assert_eq!(registry.watched_channels(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn disconnection_evicts_every_subscription_on_that_channel() {
        let registry = SubscriberRegistry::new(40, Handle::current());
        let shared = Arc::new(Watched::new());
        let other = Arc::new(Plain::default());
        let (c1, c2, c3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        registry
            .add(c1, filter(EventTypes::All), Some(shared.clone()))
            .unwrap();
        registry
            .add(c2, filter(EventTypes::All), Some(shared.clone()))
            .unwrap();
        registry
            .add(c3, filter(EventTypes::All), Some(other))
            .unwrap();

        shared.disconnect();
        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            while registry.len() != 1 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        assert!(!registry.contains(c1));
        assert!(!registry.contains(c2));
        assert!(registry.contains(c3));
        // 剔除不等同于显式退订，不关闭通道
        assert!(!shared.closed.load(Ordering::SeqCst));
    }
}
