//! ### English
//! Consumer end of the exchange.
//!
//! Every operation takes the exchange lock for its whole duration and reports unavailability
//! as an immediate error instead of blocking. Listener callbacks run after the lock is released.
//!
//! ### 中文
//! 交换的消费者端。
//!
//! 每个操作在整个执行期间持有交换锁，不可用时立即返回错误而不会阻塞。监听者回调在释放锁之后执行。

mod acquire;
mod attach;
mod connection;
mod release;
mod settings;

use std::sync::Arc;
use std::time::Duration;

use super::shared_state::ExchangeCore;

/// ### English
/// Handle used by the consumer thread(s). Cloning shares the same exchange.
///
/// ### 中文
/// 供消费者线程使用的句柄；克隆后共享同一个交换实例。
#[derive(Clone)]
pub struct BufferConsumer {
    core: Arc<ExchangeCore>,
}

impl BufferConsumer {
    pub(crate) fn new(core: Arc<ExchangeCore>) -> Self {
        Self { core }
    }

    /// ### English
    /// Shared state inspection (slot states, counts).
    ///
    /// ### 中文
    /// 共享状态检查接口（槽位状态、计数）。
    pub fn core(&self) -> &ExchangeCore {
        &self.core
    }

    /// ### English
    /// Blocks until a slot becomes free, the exchange is abandoned, or `timeout` elapses.
    ///
    /// ### 中文
    /// 阻塞直到出现空闲槽位、交换被废弃或 `timeout` 超时。
    pub fn wait_for_free_slot(&self, timeout: Duration) -> bool {
        self.core.wait_for_free_slot(timeout)
    }

    /// ### English
    /// Text snapshot of the pending queue and occupied slots, one entry per line.
    ///
    /// ### 中文
    /// 待取队列与已占用槽位的文本快照，每个条目一行。
    pub fn dump(&self, prefix: &str) -> String {
        self.core.dump(prefix)
    }
}
