//! 无操作计时器
//!
//! `arm()` 启动（或重启）一个定时任务，到期后执行回调。每次 arm/disarm 都会让 epoch 递增；
//! 回调在持有 epoch 锁的情况下执行，且只在 epoch 未变化时执行，
//! 因此 `disarm()` 返回后不会再有过期回调触发。

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::observability::ComponentSpan;

type ExpiryCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct WatchdogState {
    epoch: u64,
    fired: Option<u64>,
    handle: Option<JoinHandle<()>>,
}

/// 一次 arm 的凭据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Armed(u64);

/// 无操作计时器
pub struct InactivityWatchdog {
    timeout: Duration,
    state: Arc<Mutex<WatchdogState>>,
    on_expire: ExpiryCallback,
    notify: Arc<Notify>,
    log: ComponentSpan,
}

impl InactivityWatchdog {
    pub fn new(
        timeout: Duration,
        on_expire: impl Fn() + Send + Sync + 'static,
        log: ComponentSpan,
    ) -> Self {
        Self {
            timeout,
            state: Arc::new(Mutex::new(WatchdogState::default())),
            on_expire: Arc::new(on_expire),
            notify: Arc::new(Notify::new()),
            log,
        }
    }

    /// 启动计时；已有的计时会被取消
    pub fn arm(&self) -> Armed {
        let mut state = self.state.lock();
        state.epoch += 1;
        if let Some(handle) = state.handle.take() {
            handle.abort();
        }

        let epoch = state.epoch;
        let timeout = self.timeout;
        let shared = Arc::clone(&self.state);
        let on_expire = Arc::clone(&self.on_expire);
        let notify = Arc::clone(&self.notify);
        let span = self.log.span().clone();

        state.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let mut state = shared.lock();
            if state.epoch != epoch {
                return;
            }
            let _span = span.enter();
            tracing::info!(
                timeout_secs = timeout.as_secs(),
                "Inactivity timeout reached, resetting session"
            );
            state.fired = Some(epoch);
            on_expire();
            notify.notify_waiters();
        }));

        Armed(epoch)
    }

    /// 取消计时；返回后不会再触发回调
    pub fn disarm(&self) {
        let mut state = self.state.lock();
        state.epoch += 1;
        if let Some(handle) = state.handle.take() {
            handle.abort();
        }
    }

    /// 该次 arm 是否已经过期
    pub fn has_fired(&self, armed: Armed) -> bool {
        self.state.lock().fired == Some(armed.0)
    }

    /// 等待该次 arm 过期
    pub async fn expired(&self, armed: Armed) {
        loop {
            let notified = self.notify.notified();
            if self.has_fired(armed) {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for InactivityWatchdog {
    fn drop(&mut self) {
        self.disarm();
    }
}
