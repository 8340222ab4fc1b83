use super::{BufferProducer, QueueBufferInput, QueueBufferOutput};
use crate::exchange::error::{ExchangeError, Result};
use crate::exchange::item::BufferItem;
use crate::exchange::slot::SlotState;

impl BufferProducer {
    /// ### English
    /// Submits a dequeued slot to the pending queue and notifies the consumer listener.
    ///
    /// Each queue assigns the next frame number. With an async producer a droppable tail entry
    /// is replaced instead of growing the queue, and its slot goes back to `Free`.
    ///
    /// #### Errors
    /// - `NotInitialized`: abandoned, or the producer is not connected.
    /// - `InvalidArgument`: slot out of range, not dequeued, or its buffer was never requested.
    ///
    /// ### 中文
    /// 将已 dequeue 的槽位提交到待取队列，并通知消费者监听者。
    ///
    /// 每次 queue 分配下一个帧号。异步生产者会替换队尾可丢弃条目而不是增长队列，被替换条目的
    /// 槽位回到 `Free`。
    ///
    /// #### 错误
    /// - `NotInitialized`：已废弃，或生产者未连接。
    /// - `InvalidArgument`：槽位越界、未处于 dequeued 状态，或从未请求过其缓冲区。
    pub fn queue_buffer(&self, slot: usize, input: QueueBufferInput) -> Result<QueueBufferOutput> {
        let QueueBufferInput {
            timestamp,
            fence,
            transform,
        } = input;
        let (is_auto_timestamp, timestamp) = match timestamp {
            Some(timestamp) => (false, timestamp),
            None => (true, self.core.clock().now_ns()),
        };

        let (item, output, listener) = {
            let mut state = self.core.lock();
            Self::check_connected(&state, "queue_buffer")?;

            let current = match state.slots.get(slot) {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::error!(slot, "queue_buffer: slot index out of range");
                    return Err(err);
                }
            };
            if current.state != SlotState::Dequeued {
                tracing::error!(slot, state = ?current.state, "queue_buffer: slot is not dequeued");
                return Err(ExchangeError::InvalidArgument);
            }
            if !current.request_buffer_called {
                tracing::error!(slot, "queue_buffer: slot was queued without requesting a buffer");
                return Err(ExchangeError::InvalidArgument);
            }

            let is_droppable = state.producer_async;
            state.frame_counter += 1;
            let frame_number = state.frame_counter;

            let entry = state.slots.get_mut(slot)?;
            entry.state = SlotState::Queued;
            entry.frame_number = frame_number;
            entry.fence = fence.clone();

            let item = BufferItem {
                slot,
                frame_number,
                buffer: entry.buffer.clone(),
                fence,
                timestamp,
                is_auto_timestamp,
                acquire_called: entry.acquire_called,
                transform,
                is_droppable,
            };

            let replace_tail = state.queue.back().is_some_and(|back| back.is_droppable);
            if replace_tail {
                if let Some(replaced) = state.queue.replace_back(item.clone()) {
                    if state.still_tracking(&replaced) {
                        if let Ok(previous) = state.slots.get_mut(replaced.slot) {
                            previous.state = SlotState::Free;
                            previous.fence = replaced.fence;
                        }
                    }
                    tracing::trace!(
                        consumer = %state.consumer_name,
                        replaced = replaced.slot,
                        slot,
                        "queue_buffer: replaced droppable frame"
                    );
                }
            } else {
                state.queue.push_back(item.clone());
            }

            state.buffer_has_been_queued = true;
            tracing::trace!(
                consumer = %state.consumer_name,
                slot,
                frame = frame_number,
                timestamp,
                is_auto_timestamp,
                pending = state.queue.len(),
                "queue_buffer: queued"
            );
            self.core.broadcast();

            let output = QueueBufferOutput {
                default_size: state.default_size,
                transform_hint: state.transform_hint,
                pending_buffers: state.queue.len(),
            };
            (item, output, state.consumer_listener.clone())
        };

        if let Some(listener) = listener {
            listener.on_frame_available(&item);
        }
        Ok(output)
    }
}
