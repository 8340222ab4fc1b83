//! ### English
//! Pending queue: FIFO of producer-submitted frames not yet acquired.
//!
//! Entries stay in arrival order; timestamps never reorder the queue.
//!
//! ### 中文
//! 待取队列：生产者已提交、尚未被 acquire 的帧组成的 FIFO。
//!
//! 条目始终保持到达顺序，时间戳不会改变队列顺序。

use std::collections::VecDeque;

use super::item::BufferItem;

#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    items: VecDeque<BufferItem>,
}

impl PendingQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn front(&self) -> Option<&BufferItem> {
        self.items.front()
    }

    pub(crate) fn get(&self, position: usize) -> Option<&BufferItem> {
        self.items.get(position)
    }

    pub(crate) fn back(&self) -> Option<&BufferItem> {
        self.items.back()
    }

    pub(crate) fn pop_front(&mut self) -> Option<BufferItem> {
        self.items.pop_front()
    }

    /// ### English
    /// Appends an entry.
    ///
    /// A slot can only be pending once; queueing it again is a programming error and panics.
    ///
    /// ### 中文
    /// 追加一个条目。
    ///
    /// 同一槽位只能在队列中出现一次；重复入队属于编程错误，会直接 panic。
    pub(crate) fn push_back(&mut self, item: BufferItem) {
        assert!(
            !self.contains_slot(item.slot),
            "slot {} is already in the pending queue",
            item.slot
        );
        self.items.push_back(item);
    }

    /// ### English
    /// Replaces the newest entry, returning the one it displaced.
    ///
    /// ### 中文
    /// 替换最新的条目，并返回被替换的条目。
    pub(crate) fn replace_back(&mut self, item: BufferItem) -> Option<BufferItem> {
        let previous = self.items.pop_back();
        self.push_back(item);
        previous
    }

    pub(crate) fn contains_slot(&self, slot: usize) -> bool {
        self.items.iter().any(|item| item.slot == slot)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &BufferItem> {
        self.items.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }
}
