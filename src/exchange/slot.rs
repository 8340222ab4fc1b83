//! ### English
//! Fixed-size slot table.
//!
//! Each slot tracks ownership state, the buffer it currently holds, the fence guarding it and
//! the frame number that identifies its occupant.
//!
//! ### 中文
//! 固定大小的槽位表。
//!
//! 每个槽位记录所有权状态、当前持有的缓冲区、保护它的 fence，以及标识占用者的帧号。

use super::buffer::GraphicBuffer;
use super::config::NUM_BUFFER_SLOTS;
use super::error::{ExchangeError, Result};
use super::fence::{Fence, ReleaseSync};

/// ### English
/// Frame number stored in a slot whose buffer was freed (sorts after every real frame).
///
/// ### 中文
/// 缓冲区被释放后的槽位所存储的帧号（排序在所有真实帧之后）。
pub(crate) const FRAME_NUMBER_FREED: u64 = u64::MAX;

/// ### English
/// Ownership state of one slot.
///
/// ### 中文
/// 单个槽位的所有权状态。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// ### English
    /// Owned by the exchange, available to the producer.
    ///
    /// ### 中文
    /// 归交换模块所有，可供生产者使用。
    Free,
    /// ### English
    /// Owned by the producer (being rendered into).
    ///
    /// ### 中文
    /// 归生产者所有（正在渲染写入）。
    Dequeued,
    /// ### English
    /// Submitted by the producer, waiting in the pending queue.
    ///
    /// ### 中文
    /// 已由生产者提交，在待取队列中等待。
    Queued,
    /// ### English
    /// Owned by the consumer.
    ///
    /// ### 中文
    /// 归消费者所有。
    Acquired,
}

#[derive(Clone, Debug)]
pub(crate) struct BufferSlot {
    pub(crate) state: SlotState,
    pub(crate) buffer: Option<GraphicBuffer>,
    pub(crate) fence: Fence,
    pub(crate) release_sync: Option<ReleaseSync>,
    pub(crate) frame_number: u64,
    pub(crate) acquire_called: bool,
    pub(crate) attached_by_consumer: bool,
    pub(crate) needs_cleanup_on_release: bool,
    pub(crate) request_buffer_called: bool,
}

impl BufferSlot {
    fn new() -> Self {
        Self {
            state: SlotState::Free,
            buffer: None,
            fence: Fence::NO_FENCE,
            release_sync: None,
            frame_number: 0,
            acquire_called: false,
            attached_by_consumer: false,
            needs_cleanup_on_release: false,
            request_buffer_called: false,
        }
    }
}

/// ### English
/// The slot array plus the scans the exchange performs over it.
///
/// ### 中文
/// 槽位数组及交换模块对其执行的扫描操作。
pub(crate) struct SlotTable {
    slots: [BufferSlot; NUM_BUFFER_SLOTS],
}

impl SlotTable {
    pub(crate) fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| BufferSlot::new()),
        }
    }

    /// ### English
    /// Bounds-checked shared access.
    ///
    /// ### 中文
    /// 带越界检查的只读访问。
    pub(crate) fn get(&self, index: usize) -> Result<&BufferSlot> {
        self.slots.get(index).ok_or(ExchangeError::InvalidArgument)
    }

    /// ### English
    /// Bounds-checked mutable access.
    ///
    /// ### 中文
    /// 带越界检查的可变访问。
    pub(crate) fn get_mut(&mut self, index: usize) -> Result<&mut BufferSlot> {
        self.slots
            .get_mut(index)
            .ok_or(ExchangeError::InvalidArgument)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &BufferSlot)> {
        self.slots.iter().enumerate()
    }

    pub(crate) fn count_in_state(&self, state: SlotState) -> usize {
        self.slots.iter().filter(|slot| slot.state == state).count()
    }

    pub(crate) fn acquired_count(&self) -> usize {
        self.count_in_state(SlotState::Acquired)
    }

    /// ### English
    /// Drops the slot's buffer and fence and returns it to `Free`.
    ///
    /// A slot that was `Acquired` is marked so that the consumer's late release reports
    /// `StaleSlot`. Does not wake waiters; the caller broadcasts afterwards.
    ///
    /// #### Parameters
    /// - `index`: Slot to free; must be in range.
    ///
    /// ### 中文
    /// 释放槽位的缓冲区与 fence，并将其置为 `Free`。
    ///
    /// 原先处于 `Acquired` 的槽位会被标记，使消费者随后的 release 返回 `StaleSlot`。
    /// 本函数不唤醒等待者，由调用方随后 broadcast。
    ///
    /// #### 参数
    /// - `index`：要释放的槽位；必须在范围内。
    pub(crate) fn free_slot(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        slot.buffer = None;
        if slot.state == SlotState::Acquired {
            slot.needs_cleanup_on_release = true;
        }
        slot.state = SlotState::Free;
        slot.frame_number = FRAME_NUMBER_FREED;
        slot.acquire_called = false;
        slot.attached_by_consumer = false;
        slot.request_buffer_called = false;
        slot.fence = Fence::NO_FENCE;
        slot.release_sync = None;
    }

    pub(crate) fn free_all(&mut self) {
        for index in 0..NUM_BUFFER_SLOTS {
            self.free_slot(index);
        }
    }

    /// ### English
    /// Finds a `Free` slot among the first `limit` slots.
    ///
    /// With `prefer_oldest`, the slot with the lowest frame number wins (ties go to the lowest
    /// index); otherwise the first `Free` slot is returned.
    ///
    /// ### 中文
    /// 在前 `limit` 个槽位中查找 `Free` 槽位。
    ///
    /// 若 `prefer_oldest` 为真，选择帧号最小的槽位（相同时取索引最小者）；否则返回第一个 `Free` 槽位。
    pub(crate) fn find_free_slot_within(&self, limit: usize, prefer_oldest: bool) -> Result<usize> {
        let mut found: Option<usize> = None;
        for (index, slot) in self.slots.iter().enumerate().take(limit) {
            if slot.state != SlotState::Free {
                continue;
            }
            if !prefer_oldest {
                return Ok(index);
            }
            match found {
                Some(best) if self.slots[best].frame_number <= slot.frame_number => {}
                _ => found = Some(index),
            }
        }
        found.ok_or(ExchangeError::NoMemory)
    }

    pub(crate) fn find_free_slot(&self, prefer_oldest: bool) -> Result<usize> {
        self.find_free_slot_within(NUM_BUFFER_SLOTS, prefer_oldest)
    }
}
