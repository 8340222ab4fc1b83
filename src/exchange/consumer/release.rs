use super::BufferConsumer;
use crate::exchange::config::NUM_BUFFER_SLOTS;
use crate::exchange::error::{ExchangeError, Result};
use crate::exchange::fence::{Fence, ReleaseSync};
use crate::exchange::slot::SlotState;

impl BufferConsumer {
    /// ### English
    /// Returns an acquired slot to the exchange.
    ///
    /// The producer listener, if any, is notified once after the lock is dropped.
    ///
    /// #### Parameters
    /// - `slot`: Slot returned by `acquire_buffer` or `attach_buffer`.
    /// - `frame_number`: Frame number from the acquired item (`0` for attached buffers).
    /// - `release_fence`: Signals when the consumer is done reading; use `Fence::NO_FENCE` if it
    ///   already is.
    /// - `release_sync`: Optional platform sync handles kept alongside the fence.
    ///
    /// #### Errors
    /// - `InvalidArgument`: index out of range, slot still pending, or slot not acquired.
    /// - `NotInitialized`: the exchange was abandoned.
    /// - `StaleSlot`: the slot was reallocated or already reclaimed; treat as a no-op.
    ///
    /// ### 中文
    /// 将已获取的槽位归还给交换模块。
    ///
    /// 若存在生产者监听者，会在释放锁之后通知一次。
    ///
    /// #### 参数
    /// - `slot`：由 `acquire_buffer` 或 `attach_buffer` 返回的槽位。
    /// - `frame_number`：acquire 得到的帧号（attach 的缓冲区为 `0`）。
    /// - `release_fence`：消费者读取完成时 signal；若已完成可传 `Fence::NO_FENCE`。
    /// - `release_sync`：与 fence 一同保存的可选平台同步句柄。
    ///
    /// #### 错误
    /// - `InvalidArgument`：索引越界、槽位仍在待取队列中，或槽位不处于 acquired 状态。
    /// - `NotInitialized`：交换已被废弃。
    /// - `StaleSlot`：槽位已被重新分配或回收；调用方应视为无操作。
    pub fn release_buffer(
        &self,
        slot: usize,
        frame_number: u64,
        release_fence: Fence,
        release_sync: Option<ReleaseSync>,
    ) -> Result<()> {
        if slot >= NUM_BUFFER_SLOTS {
            tracing::error!(slot, "release_buffer: slot index out of range");
            return Err(ExchangeError::InvalidArgument);
        }

        let listener = {
            let mut state = self.core.lock();

            if state.is_abandoned {
                tracing::error!(
                    consumer = %state.consumer_name,
                    "release_buffer: exchange abandoned"
                );
                return Err(ExchangeError::NotInitialized);
            }

            if state.slots.get(slot)?.frame_number != frame_number {
                return Err(ExchangeError::StaleSlot);
            }

            if state.queue.contains_slot(slot) {
                tracing::error!(
                    consumer = %state.consumer_name,
                    slot,
                    "release_buffer: slot pending release is currently queued"
                );
                return Err(ExchangeError::InvalidArgument);
            }

            let listener = state.producer_listener.clone();
            let consumer_name = state.consumer_name.clone();
            let entry = state.slots.get_mut(slot)?;
            match entry.state {
                SlotState::Acquired => {
                    entry.fence = release_fence;
                    entry.release_sync = release_sync;
                    entry.state = SlotState::Free;
                    tracing::trace!(
                        consumer = %consumer_name,
                        slot,
                        frame_number,
                        "release_buffer: released"
                    );
                }
                _ if entry.needs_cleanup_on_release => {
                    entry.needs_cleanup_on_release = false;
                    tracing::trace!(
                        consumer = %consumer_name,
                        slot,
                        "release_buffer: stale slot cleaned up"
                    );
                    return Err(ExchangeError::StaleSlot);
                }
                other => {
                    tracing::error!(
                        consumer = %consumer_name,
                        slot,
                        state = ?other,
                        "release_buffer: slot is not acquired"
                    );
                    return Err(ExchangeError::InvalidArgument);
                }
            }

            self.core.broadcast();
            listener
        };

        if let Some(listener) = listener {
            listener.on_buffer_released();
        }
        Ok(())
    }

    /// ### English
    /// Returns a bitmask of slots whose cached buffer mapping the consumer should drop.
    ///
    /// Bit `s` is set when slot `s` never had its buffer delivered through acquire, unless the
    /// slot is still pending with its buffer already delivered (the next acquire omits it).
    ///
    /// ### 中文
    /// 返回消费者应丢弃其缓存缓冲区映射的槽位位掩码。
    ///
    /// 若槽位 `s` 从未通过 acquire 交付缓冲区，则置位第 `s` 位；但若该槽位仍在待取队列中且其
    /// 缓冲区已交付过（下一次 acquire 将省略它），则不置位。
    pub fn released_buffers(&self) -> Result<u64> {
        let state = self.core.lock();

        if state.is_abandoned {
            tracing::error!(
                consumer = %state.consumer_name,
                "released_buffers: exchange abandoned"
            );
            return Err(ExchangeError::NotInitialized);
        }

        let mut mask = state
            .slots
            .iter()
            .filter(|(_, entry)| !entry.acquire_called)
            .fold(0u64, |mask, (index, _)| mask | (1u64 << index));

        for item in state.queue.iter().filter(|item| item.acquire_called) {
            mask &= !(1u64 << item.slot);
        }

        tracing::trace!(
            consumer = %state.consumer_name,
            mask = format_args!("{mask:#x}"),
            "released_buffers"
        );
        Ok(mask)
    }
}
