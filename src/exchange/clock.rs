//! ### English
//! Monotonic nanosecond time sources.
//!
//! ### 中文
//! 纳秒精度的单调时间源。

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// ### English
/// Nanosecond timestamp on the monotonic timeline.
///
/// ### 中文
/// 单调时间线上的纳秒时间戳。
pub type Nsecs = i64;

/// ### English
/// Monotonic clock consumed by the exchange (auto timestamps, log context) and the render thread.
///
/// ### 中文
/// 交换模块（自动时间戳、日志上下文）与渲染线程所使用的单调时钟。
pub trait MonotonicClock: Send + Sync {
    /// ### English
    /// Returns "now" in nanoseconds. Values never decrease and are positive.
    ///
    /// ### 中文
    /// 返回当前时间（纳秒）；取值单调不减且为正。
    fn now_ns(&self) -> Nsecs;
}

/// ### English
/// `Instant`-backed clock. Time is measured from the moment the clock was created, offset by one
/// second so that every reading is strictly positive.
///
/// ### 中文
/// 基于 `Instant` 的时钟。从创建时刻开始计时，并整体偏移一秒以保证读数严格为正。
pub struct SystemClock {
    origin: Instant,
}

const SYSTEM_CLOCK_OFFSET_NS: Nsecs = 1_000_000_000;

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now_ns(&self) -> Nsecs {
        let elapsed = i64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(i64::MAX);
        elapsed.saturating_add(SYSTEM_CLOCK_OFFSET_NS)
    }
}

/// ### English
/// Manually advanced clock for deterministic tests and simulations.
///
/// ### 中文
/// 手动推进的时钟，用于确定性测试与模拟。
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ns: Nsecs) -> Self {
        Self {
            now: AtomicI64::new(start_ns),
        }
    }

    /// ### English
    /// Sets the current time. Moving backwards is ignored.
    ///
    /// ### 中文
    /// 设置当前时间；向回拨动会被忽略。
    pub fn set(&self, now_ns: Nsecs) {
        self.now.fetch_max(now_ns, Ordering::AcqRel);
    }

    pub fn advance(&self, delta_ns: Nsecs) {
        if delta_ns > 0 {
            let _ = self
                .now
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |now| {
                    Some(now.saturating_add(delta_ns))
                });
        }
    }
}

impl MonotonicClock for ManualClock {
    fn now_ns(&self) -> Nsecs {
        self.now.load(Ordering::Acquire)
    }
}
