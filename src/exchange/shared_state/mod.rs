//! ### English
//! Shared state of one exchange instance.
//!
//! Everything mutable sits in [`CoreState`] behind one non-reentrant mutex. The condition
//! variable is broadcast on every transition that can free a slot or shrink the pending queue;
//! no listener or allocator is ever called while the mutex is held.
//!
//! ### 中文
//! 单个交换实例的共享状态。
//!
//! 所有可变状态都位于 [`CoreState`] 中，由一把不可重入互斥锁保护。每当发生可能释放槽位或缩短
//! 待取队列的状态转换时，都会 broadcast 条件变量；持锁期间从不调用监听者或分配器。

mod dump;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dpi::PhysicalSize;
use parking_lot::{Condvar, Mutex, MutexGuard};

use super::buffer::BufferAllocator;
use super::clock::MonotonicClock;
use super::config::{ExchangeConfig, NUM_BUFFER_SLOTS};
use super::item::BufferItem;
use super::listener::{ConsumerListener, ProducerListener};
use super::producer::ConnectedApi;
use super::queue::PendingQueue;
use super::slot::{SlotState, SlotTable};

/// ### English
/// Mutable state guarded by the exchange mutex.
///
/// ### 中文
/// 由交换互斥锁保护的可变状态。
pub(crate) struct CoreState {
    pub(crate) slots: SlotTable,
    pub(crate) queue: PendingQueue,
    pub(crate) max_acquired_buffer_count: usize,
    pub(crate) default_max_buffer_count: usize,
    /// ### English
    /// Terminal flag; set by consumer disconnect.
    ///
    /// ### 中文
    /// 终态标记；由消费者 disconnect 设置。
    pub(crate) is_abandoned: bool,
    pub(crate) consumer_listener: Option<Arc<dyn ConsumerListener>>,
    pub(crate) consumer_controlled_by_app: bool,
    pub(crate) producer_listener: Option<Arc<dyn ProducerListener>>,
    pub(crate) connected_api: Option<ConnectedApi>,
    pub(crate) producer_controlled_by_app: bool,
    pub(crate) producer_async: bool,
    pub(crate) use_async_buffer: bool,
    pub(crate) buffer_has_been_queued: bool,
    pub(crate) default_size: PhysicalSize<u32>,
    pub(crate) default_format: u32,
    pub(crate) consumer_usage_bits: u32,
    pub(crate) transform_hint: u32,
    pub(crate) consumer_name: String,
    /// ### English
    /// Last frame number handed out by `queue_buffer`.
    ///
    /// ### 中文
    /// `queue_buffer` 最近分配的帧号。
    pub(crate) frame_counter: u64,
}

impl CoreState {
    fn new(config: &ExchangeConfig) -> Self {
        Self {
            slots: SlotTable::new(),
            queue: PendingQueue::new(),
            max_acquired_buffer_count: config.max_acquired_buffers,
            default_max_buffer_count: config.default_max_buffer_count,
            is_abandoned: false,
            consumer_listener: None,
            consumer_controlled_by_app: false,
            producer_listener: None,
            connected_api: None,
            producer_controlled_by_app: false,
            producer_async: false,
            use_async_buffer: true,
            buffer_has_been_queued: false,
            default_size: config.default_size,
            default_format: config.default_format,
            consumer_usage_bits: 0,
            transform_hint: 0,
            consumer_name: config.consumer_name.clone(),
            frame_counter: 0,
        }
    }

    /// ### English
    /// Returns whether the pending-queue entry still refers to the buffer in its slot.
    ///
    /// The producer may have freed or reallocated the slot after queueing, in which case the
    /// entry is delivered but the slot itself must not be touched.
    ///
    /// ### 中文
    /// 返回待取队列条目是否仍指向其槽位中的缓冲区。
    ///
    /// 生产者可能在 queue 之后释放或重新分配了该槽位；此时条目照常交付，但不能再修改槽位本身。
    pub(crate) fn still_tracking(&self, item: &BufferItem) -> bool {
        let Ok(slot) = self.slots.get(item.slot) else {
            return false;
        };
        match (&slot.buffer, &item.buffer) {
            (Some(current), Some(queued)) => current == queued,
            _ => false,
        }
    }

    /// ### English
    /// Returns whether one more buffer may be acquired without exceeding
    /// `max_acquired_buffer_count + 1`.
    ///
    /// ### 中文
    /// 返回在不超过 `max_acquired_buffer_count + 1` 的前提下能否再获取一个缓冲区。
    pub(crate) fn can_acquire_one_more(&self) -> bool {
        self.slots.acquired_count() < self.max_acquired_buffer_count + 1
    }

    /// ### English
    /// Number of buffers that must stay undequeued for the consumer.
    ///
    /// ### 中文
    /// 必须保留给消费者、不可被 dequeue 的缓冲区数量。
    pub(crate) fn min_undequeued_buffer_count(&self) -> usize {
        if self.use_async_buffer && self.producer_async {
            self.max_acquired_buffer_count + 1
        } else {
            self.max_acquired_buffer_count
        }
    }

    /// ### English
    /// Number of slots the producer may currently use.
    ///
    /// Slots beyond the nominal count that are still dequeued or queued stay counted.
    ///
    /// ### 中文
    /// 生产者当前可使用的槽位数量。
    ///
    /// 超出名义数量但仍处于 dequeued/queued 的槽位也会被计入。
    pub(crate) fn max_buffer_count(&self) -> usize {
        let min_max = self.min_undequeued_buffer_count() + 1;
        let mut max = self.default_max_buffer_count.max(min_max).min(NUM_BUFFER_SLOTS);
        for (index, slot) in self.slots.iter().skip(max) {
            if matches!(slot.state, SlotState::Dequeued | SlotState::Queued) {
                max = index + 1;
            }
        }
        max
    }

    /// ### English
    /// Frees every slot and forgets that a buffer was ever queued.
    ///
    /// ### 中文
    /// 释放所有槽位，并重置“曾经 queue 过缓冲区”的标记。
    pub(crate) fn free_all_buffers(&mut self) {
        self.buffer_has_been_queued = false;
        self.slots.free_all();
    }
}

/// ### English
/// One buffer exchange instance shared by its producer and consumer ends.
///
/// ### 中文
/// 由生产者端与消费者端共享的单个缓冲区交换实例。
pub struct ExchangeCore {
    state: Mutex<CoreState>,
    /// ### English
    /// Broadcast on every free-slot-producing transition.
    ///
    /// ### 中文
    /// 每次产生空闲槽位的状态转换时 broadcast。
    dequeue_condition: Condvar,
    clock: Arc<dyn MonotonicClock>,
    allocator: Arc<dyn BufferAllocator>,
    max_acquired_ceiling: usize,
    present_window_ns: i64,
}

impl ExchangeCore {
    pub(crate) fn new(
        config: ExchangeConfig,
        clock: Arc<dyn MonotonicClock>,
        allocator: Arc<dyn BufferAllocator>,
    ) -> Self {
        tracing::debug!(
            consumer = %config.consumer_name,
            max_acquired = config.max_acquired_buffers,
            window_ns = config.present_window_nanos(),
            "creating buffer exchange"
        );
        Self {
            state: Mutex::new(CoreState::new(&config)),
            dequeue_condition: Condvar::new(),
            clock,
            allocator,
            max_acquired_ceiling: config.max_acquired_ceiling,
            present_window_ns: config.present_window_nanos(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock()
    }

    /// ### English
    /// Wakes every thread waiting for slot availability.
    ///
    /// ### 中文
    /// 唤醒所有等待槽位可用的线程。
    pub(crate) fn broadcast(&self) {
        self.dequeue_condition.notify_all();
    }

    /// ### English
    /// Waits on the condition variable, optionally until `deadline`.
    /// Returns `false` if the deadline passed.
    ///
    /// ### 中文
    /// 在条件变量上等待，可选地等到 `deadline`；若已超时则返回 `false`。
    pub(crate) fn wait(
        &self,
        guard: &mut MutexGuard<'_, CoreState>,
        deadline: Option<Instant>,
    ) -> bool {
        match deadline {
            Some(deadline) => !self.dequeue_condition.wait_until(guard, deadline).timed_out(),
            None => {
                self.dequeue_condition.wait(guard);
                true
            }
        }
    }

    /// ### English
    /// Blocks until at least one slot is `Free`, the exchange is abandoned, or `timeout` elapses.
    /// Returns whether a free slot exists on return.
    ///
    /// ### 中文
    /// 阻塞直到至少有一个 `Free` 槽位、交换被废弃或 `timeout` 超时；返回时是否存在空闲槽位。
    pub fn wait_for_free_slot(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        loop {
            if state.slots.count_in_state(SlotState::Free) > 0 {
                return true;
            }
            if state.is_abandoned || !self.wait(&mut state, deadline) {
                return state.slots.count_in_state(SlotState::Free) > 0;
            }
        }
    }

    pub(crate) fn clock(&self) -> &dyn MonotonicClock {
        self.clock.as_ref()
    }

    pub(crate) fn allocator(&self) -> &dyn BufferAllocator {
        self.allocator.as_ref()
    }

    pub(crate) fn max_acquired_ceiling(&self) -> usize {
        self.max_acquired_ceiling
    }

    pub(crate) fn present_window_ns(&self) -> i64 {
        self.present_window_ns
    }

    /// ### English
    /// Snapshot of one slot's state (diagnostics and tests).
    ///
    /// ### 中文
    /// 单个槽位状态的快照（用于诊断与测试）。
    pub fn slot_state(&self, slot: usize) -> Option<SlotState> {
        self.lock().slots.get(slot).ok().map(|slot| slot.state)
    }

    /// ### English
    /// Frame number currently stored in a slot.
    ///
    /// ### 中文
    /// 槽位当前存储的帧号。
    pub fn slot_frame_number(&self, slot: usize) -> Option<u64> {
        self.lock().slots.get(slot).ok().map(|slot| slot.frame_number)
    }

    pub fn acquired_count(&self) -> usize {
        self.lock().slots.acquired_count()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_abandoned(&self) -> bool {
        self.lock().is_abandoned
    }

    pub fn max_acquired_buffer_count(&self) -> usize {
        self.lock().max_acquired_buffer_count
    }
}
