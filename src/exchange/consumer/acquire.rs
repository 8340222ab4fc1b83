use super::BufferConsumer;
use crate::exchange::clock::Nsecs;
use crate::exchange::error::{ExchangeError, Result};
use crate::exchange::fence::Fence;
use crate::exchange::item::BufferItem;
use crate::exchange::policy::{self, HeadDecision};
use crate::exchange::slot::SlotState;

impl BufferConsumer {
    /// ### English
    /// Takes the next pending frame.
    ///
    /// With `expected_present == 0` the FIFO head is taken unconditionally. Otherwise stale heads
    /// are dropped first and a head that wants to be shown shortly after `expected_present` is
    /// deferred with [`ExchangeError::NotReady`]. Drops performed before a deferral stay in effect.
    ///
    /// The returned item carries the real acquire fence; its `buffer` is `None` when the consumer
    /// already received this slot's buffer on an earlier acquire.
    ///
    /// #### Parameters
    /// - `expected_present`: Expected presentation time in monotonic nanoseconds, or `0`.
    ///
    /// #### Errors
    /// - `NotInitialized`: the exchange was abandoned.
    /// - `Aborted`: the consumer already holds `max_acquired + 1` buffers.
    /// - `WouldBlock`: nothing is pending.
    /// - `NotReady`: the head is due later.
    ///
    /// ### 中文
    /// 取出下一帧待取帧。
    ///
    /// `expected_present == 0` 时无条件取 FIFO 队首；否则先丢弃过时的队首，若队首希望在
    /// `expected_present` 之后不久才显示，则返回 [`ExchangeError::NotReady`] 延后获取。
    /// 延后之前已执行的丢帧保持有效。
    ///
    /// 返回的条目携带真实的 acquire fence；若消费者此前已通过 acquire 收到过该槽位的缓冲区，
    /// 则其 `buffer` 为 `None`。
    ///
    /// #### 参数
    /// - `expected_present`：预期显示时间（单调时钟纳秒），或 `0`。
    ///
    /// #### 错误
    /// - `NotInitialized`：交换已被废弃。
    /// - `Aborted`：消费者已持有 `max_acquired + 1` 个缓冲区。
    /// - `WouldBlock`：没有待取帧。
    /// - `NotReady`：队首需要稍后再显示。
    pub fn acquire_buffer(&self, expected_present: Nsecs) -> Result<BufferItem> {
        let window = self.core.present_window_ns();
        let mut state = self.core.lock();

        if state.is_abandoned {
            tracing::error!(consumer = %state.consumer_name, "acquire_buffer: exchange abandoned");
            return Err(ExchangeError::NotInitialized);
        }

        let acquired = state.slots.acquired_count();
        if !state.can_acquire_one_more() {
            tracing::error!(
                consumer = %state.consumer_name,
                acquired,
                max = state.max_acquired_buffer_count,
                "acquire_buffer: max acquired buffer count reached"
            );
            return Err(ExchangeError::Aborted);
        }

        if state.queue.is_empty() {
            return Err(ExchangeError::WouldBlock);
        }

        if expected_present != 0 {
            let mut dropped = 0usize;
            while policy::should_drop_head(&state.queue, expected_present, window) {
                let Some(stale) = state.queue.pop_front() else {
                    break;
                };
                tracing::trace!(
                    consumer = %state.consumer_name,
                    slot = stale.slot,
                    frame = stale.frame_number,
                    expected_present,
                    "acquire_buffer: drop"
                );
                if state.still_tracking(&stale) {
                    let slot = state.slots.get_mut(stale.slot)?;
                    slot.state = SlotState::Free;
                    slot.fence = stale.fence;
                }
                dropped += 1;
            }
            if dropped > 0 {
                self.core.broadcast();
            }

            let Some(head) = state.queue.front() else {
                return Err(ExchangeError::WouldBlock);
            };
            if policy::head_decision(head, expected_present, window) == HeadDecision::Defer {
                tracing::trace!(
                    consumer = %state.consumer_name,
                    slot = head.slot,
                    desired = head.timestamp,
                    expected_present,
                    "acquire_buffer: defer"
                );
                return Err(ExchangeError::NotReady);
            }
        }

        let Some(mut item) = state.queue.pop_front() else {
            return Err(ExchangeError::WouldBlock);
        };

        if state.still_tracking(&item) {
            let slot = state.slots.get_mut(item.slot)?;
            slot.acquire_called = true;
            slot.needs_cleanup_on_release = false;
            slot.state = SlotState::Acquired;
            slot.fence = Fence::NO_FENCE;
        }

        if item.acquire_called {
            item.buffer = None;
        }

        tracing::trace!(
            consumer = %state.consumer_name,
            slot = item.slot,
            frame = item.frame_number,
            pending = state.queue.len(),
            "acquire_buffer: acquired"
        );

        self.core.broadcast();
        Ok(item)
    }
}
