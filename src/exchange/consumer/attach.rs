use super::BufferConsumer;
use crate::exchange::buffer::GraphicBuffer;
use crate::exchange::error::{ExchangeError, Result};
use crate::exchange::fence::Fence;
use crate::exchange::slot::SlotState;

impl BufferConsumer {
    /// ### English
    /// Gives up an acquired slot without handing its buffer back to the producer.
    ///
    /// The slot is freed (its buffer reference dropped) and waiters are woken.
    ///
    /// ### 中文
    /// 放弃一个已获取的槽位，且不把其缓冲区交还给生产者。
    ///
    /// 该槽位会被释放（丢弃缓冲区引用），并唤醒等待者。
    pub fn detach_buffer(&self, slot: usize) -> Result<()> {
        let mut state = self.core.lock();

        if state.is_abandoned {
            tracing::error!(consumer = %state.consumer_name, "detach_buffer: exchange abandoned");
            return Err(ExchangeError::NotInitialized);
        }

        let current = match state.slots.get(slot) {
            Ok(entry) => entry.state,
            Err(err) => {
                tracing::error!(slot, "detach_buffer: slot index out of range");
                return Err(err);
            }
        };
        if current != SlotState::Acquired {
            tracing::error!(
                consumer = %state.consumer_name,
                slot,
                state = ?current,
                "detach_buffer: slot is not owned by the consumer"
            );
            return Err(ExchangeError::InvalidArgument);
        }

        state.slots.free_slot(slot);
        tracing::debug!(consumer = %state.consumer_name, slot, "detach_buffer: detached");
        self.core.broadcast();
        Ok(())
    }

    /// ### English
    /// Injects an externally obtained buffer as a consumer-owned, acquired slot.
    ///
    /// The oldest free slot is chosen. The slot's frame number becomes `0` and the next acquire
    /// of that slot resends the full buffer handle.
    ///
    /// #### Errors
    /// - `InvalidArgument`: `buffer` is `None`.
    /// - `NotInitialized`: the exchange was abandoned.
    /// - `Aborted`: the consumer already holds `max_acquired + 1` buffers.
    /// - `OutOfSlots`: no free slot.
    ///
    /// ### 中文
    /// 将外部获得的缓冲区注入为消费者持有的 acquired 槽位。
    ///
    /// 选择最旧的空闲槽位；该槽位帧号置为 `0`，之后对该槽位的 acquire 会重新发送完整缓冲区句柄。
    ///
    /// #### 错误
    /// - `InvalidArgument`：`buffer` 为 `None`。
    /// - `NotInitialized`：交换已被废弃。
    /// - `Aborted`：消费者已持有 `max_acquired + 1` 个缓冲区。
    /// - `OutOfSlots`：没有空闲槽位。
    pub fn attach_buffer(&self, buffer: Option<GraphicBuffer>) -> Result<usize> {
        let Some(buffer) = buffer else {
            tracing::error!("attach_buffer: cannot attach a null buffer");
            return Err(ExchangeError::InvalidArgument);
        };

        let mut state = self.core.lock();

        if state.is_abandoned {
            tracing::error!(consumer = %state.consumer_name, "attach_buffer: exchange abandoned");
            return Err(ExchangeError::NotInitialized);
        }

        if !state.can_acquire_one_more() {
            tracing::error!(
                consumer = %state.consumer_name,
                acquired = state.slots.acquired_count(),
                max = state.max_acquired_buffer_count,
                "attach_buffer: max acquired buffer count reached"
            );
            return Err(ExchangeError::Aborted);
        }

        let Ok(found) = state.slots.find_free_slot(true) else {
            tracing::error!(consumer = %state.consumer_name, "attach_buffer: no free buffer slot");
            return Err(ExchangeError::OutOfSlots);
        };

        let entry = state.slots.get_mut(found)?;
        entry.buffer = Some(buffer);
        entry.state = SlotState::Acquired;
        entry.attached_by_consumer = true;
        entry.needs_cleanup_on_release = false;
        entry.fence = Fence::NO_FENCE;
        entry.frame_number = 0;
        entry.acquire_called = false;

        tracing::debug!(consumer = %state.consumer_name, slot = found, "attach_buffer: attached");
        Ok(found)
    }
}
