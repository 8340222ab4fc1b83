//! ### English
//! Fence abstraction: a signal/wait primitive with an "already signaled" sentinel.
//!
//! Fences may wrap a platform-native sync object (`GLsync`/sync-fd cast to `u64`). The exchange
//! never waits on native fences itself; it only stores them and hands them to the other side.
//!
//! ### 中文
//! Fence 抽象：带有“已 signal”哨兵值的 signal/wait 原语。
//!
//! Fence 可以包装平台原生同步对象（`GLsync`/sync-fd 转为 `u64`）。交换模块自身从不等待原生 fence，
//! 只负责保存并交给另一端。

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

struct FenceInner {
    native_handle: u64,
    signaled: Mutex<bool>,
    cond: Condvar,
}

/// ### English
/// Synchronization point the reader must wait on before touching the buffer.
///
/// ### 中文
/// 读取方在访问缓冲区之前必须等待的同步点。
#[derive(Clone, Default)]
pub struct Fence {
    inner: Option<Arc<FenceInner>>,
}

impl Fence {
    /// ### English
    /// Sentinel for "already signaled".
    ///
    /// ### 中文
    /// 表示“已 signal”的哨兵值。
    pub const NO_FENCE: Fence = Fence { inner: None };

    /// ### English
    /// Creates an unsignaled fence owned by Rust code.
    ///
    /// ### 中文
    /// 创建一个由 Rust 侧持有的未 signal fence。
    pub fn new() -> Self {
        Self::build(0)
    }

    /// ### English
    /// Wraps a platform-native sync handle. `0` maps to [`Fence::NO_FENCE`].
    ///
    /// ### 中文
    /// 包装平台原生同步句柄；`0` 映射为 [`Fence::NO_FENCE`]。
    pub fn from_native(native_handle: u64) -> Self {
        if native_handle == 0 {
            return Self::NO_FENCE;
        }
        Self::build(native_handle)
    }

    fn build(native_handle: u64) -> Self {
        Self {
            inner: Some(Arc::new(FenceInner {
                native_handle,
                signaled: Mutex::new(false),
                cond: Condvar::new(),
            })),
        }
    }

    /// ### English
    /// Returns whether this is a real fence (not the `NO_FENCE` sentinel).
    ///
    /// ### 中文
    /// 返回是否为真实 fence（而非 `NO_FENCE` 哨兵）。
    pub fn is_valid(&self) -> bool {
        self.inner.is_some()
    }

    pub fn native_handle(&self) -> u64 {
        self.inner.as_ref().map_or(0, |inner| inner.native_handle)
    }

    pub fn signal(&self) {
        if let Some(inner) = &self.inner {
            let mut signaled = inner.signaled.lock();
            *signaled = true;
            inner.cond.notify_all();
        }
    }

    pub fn is_signaled(&self) -> bool {
        self.inner
            .as_ref()
            .is_none_or(|inner| *inner.signaled.lock())
    }

    /// ### English
    /// Waits until the fence signals or `timeout` elapses. Returns whether it signaled.
    ///
    /// ### 中文
    /// 等待 fence signal 或 `timeout` 超时；返回是否已 signal。
    pub fn wait(&self, timeout: Duration) -> bool {
        let Some(inner) = &self.inner else {
            return true;
        };
        let mut signaled = inner.signaled.lock();
        if !*signaled {
            let _ = inner
                .cond
                .wait_while_for(&mut signaled, |signaled| !*signaled, timeout);
        }
        *signaled
    }

    /// ### English
    /// Returns whether two values refer to the same fence object.
    ///
    /// ### 中文
    /// 返回两个值是否指向同一 fence 对象。
    pub fn same_as(&self, other: &Fence) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Fence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            None => f.write_str("Fence::NO_FENCE"),
            Some(inner) => f
                .debug_struct("Fence")
                .field("native_handle", &inner.native_handle)
                .field("signaled", &*inner.signaled.lock())
                .finish(),
        }
    }
}

/// ### English
/// Optional platform sync handles recorded alongside the release fence (display + sync object).
///
/// ### 中文
/// 与 release fence 一同记录的可选平台同步句柄（display + sync 对象）。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReleaseSync {
    pub display: u64,
    pub sync: u64,
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn no_fence_is_already_signaled() {
        let fence = Fence::NO_FENCE;
        assert!(!fence.is_valid());
        assert!(fence.is_signaled());
        assert!(fence.wait(Duration::ZERO));
        assert_eq!(fence.native_handle(), 0);
    }

    #[test]
    fn wait_times_out_then_observes_signal_from_another_thread() {
        let fence = Fence::new();
        assert!(!fence.wait(Duration::from_millis(5)));

        let signaller = fence.clone();
        let handle = thread::spawn(move || signaller.signal());
        assert!(fence.wait(Duration::from_secs(5)));
        handle.join().unwrap();
        assert!(fence.is_signaled());
    }

    #[test]
    fn clones_share_identity() {
        let fence = Fence::from_native(42);
        assert!(fence.same_as(&fence.clone()));
        assert!(!fence.same_as(&Fence::from_native(42)));
        assert_eq!(fence.native_handle(), 42);
    }
}
