//! 冷却与就绪等待。
//!
//! 所有挂起点都经过 `Pacer`，测试里换成记录型实现即可不真正睡眠。

use std::time::Duration;

pub trait Pacer {
    fn sleep(&self, duration: Duration);
}

/// 直接阻塞当前线程。
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// 有界等待策略：超时、初始轮询间隔、退避倍数与间隔上限。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub backoff: f64,
    pub max_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(4),
            poll_interval: Duration::from_millis(250),
            backoff: 1.5,
            max_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready { waited: Duration },
    TimedOut { waited: Duration },
}

#[cfg(test)]
impl WaitOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready { .. })
    }
}

/// 轮询 `ready` 直到返回 true 或累计等待超过 `policy.timeout`。
///
/// 累计时间按实际请求的睡眠时长计算，不读取系统时钟。
pub fn wait_until<F>(pacer: &dyn Pacer, policy: &WaitPolicy, mut ready: F) -> WaitOutcome
where
    F: FnMut() -> bool,
{
    let mut waited = Duration::ZERO;
    let mut interval = policy.poll_interval.max(Duration::from_millis(1));
    let cap = policy.max_interval.max(interval);

    loop {
        if ready() {
            return WaitOutcome::Ready { waited };
        }
        if waited >= policy.timeout {
            return WaitOutcome::TimedOut { waited };
        }
        let step = interval.min(policy.timeout - waited);
        pacer.sleep(step);
        waited += step;
        interval = next_interval(interval, policy.backoff, cap);
    }
}

/// 按倍数放大轮询间隔，溢出或非有限值时直接取上限。
fn next_interval(interval: Duration, backoff: f64, cap: Duration) -> Duration {
    Duration::try_from_secs_f64(interval.as_secs_f64() * backoff.max(1.0))
        .map_or(cap, |next| next.min(cap))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Pacer;
    use std::cell::RefCell;
    use std::time::Duration;

    /// 记录每次睡眠请求而不真正等待。
    #[derive(Debug, Default)]
    pub(crate) struct RecordingPacer {
        pub(crate) sleeps: RefCell<Vec<Duration>>,
    }

    impl RecordingPacer {
        pub(crate) fn total(&self) -> Duration {
            self.sleeps.borrow().iter().sum()
        }
    }

    impl Pacer for RecordingPacer {
        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
        }
    }
}
