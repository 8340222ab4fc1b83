use std::time::Instant;

use super::{BufferProducer, DequeueOutput, DequeueRequest};
use crate::exchange::buffer::GraphicBuffer;
use crate::exchange::config::NUM_BUFFER_SLOTS;
use crate::exchange::error::{ExchangeError, Result};
use crate::exchange::fence::Fence;
use crate::exchange::shared_state::CoreState;
use crate::exchange::slot::{FRAME_NUMBER_FREED, SlotState};

impl BufferProducer {
    /// ### English
    /// Dequeues a free slot, blocking until one is available or `request.timeout` elapses.
    ///
    /// #### Errors
    /// - `NotInitialized`: abandoned, or the producer is not connected.
    /// - `InvalidArgument`: exactly one of width/height is 0.
    /// - `InvalidState`: too many buffers are already dequeued.
    /// - `WouldBlock`: the timeout elapsed.
    /// - Any error from the buffer allocator.
    ///
    /// ### 中文
    /// dequeue 一个空闲槽位；阻塞直到有可用槽位或 `request.timeout` 超时。
    ///
    /// #### 错误
    /// - `NotInitialized`：已废弃，或生产者未连接。
    /// - `InvalidArgument`：宽高中恰好有一个为 0。
    /// - `InvalidState`：已 dequeue 的缓冲区过多。
    /// - `WouldBlock`：等待超时。
    /// - 缓冲区分配器返回的任何错误。
    pub fn dequeue_buffer(&self, request: DequeueRequest) -> Result<DequeueOutput> {
        // A timeout past the end of the `Instant` range waits without limit.
        let deadline = request
            .timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
        self.dequeue(request, Some(deadline))
    }

    /// ### English
    /// Non-blocking dequeue; reports `WouldBlock` instead of waiting.
    ///
    /// ### 中文
    /// 非阻塞 dequeue；无可用槽位时返回 `WouldBlock` 而不等待。
    pub fn try_dequeue_buffer(&self, request: DequeueRequest) -> Result<DequeueOutput> {
        self.dequeue(request, None)
    }

    /// `wait`: `None` never blocks, `Some(None)` blocks without limit.
    fn dequeue(
        &self,
        request: DequeueRequest,
        wait: Option<Option<Instant>>,
    ) -> Result<DequeueOutput> {
        let DequeueRequest { size, format, usage, .. } = request;
        if (size.width == 0) != (size.height == 0) {
            tracing::error!(
                width = size.width,
                height = size.height,
                "dequeue_buffer: invalid size"
            );
            return Err(ExchangeError::InvalidArgument);
        }

        let (slot, fence, needs_allocation, size, format, usage) = {
            let mut state = self.core.lock();
            let slot = loop {
                Self::check_connected(&state, "dequeue_buffer")?;

                if let Some(found) = self.find_dequeue_slot(&state)? {
                    break found;
                }

                let Some(deadline) = wait else {
                    return Err(ExchangeError::WouldBlock);
                };
                if !self.core.wait(&mut state, deadline) {
                    tracing::debug!(consumer = %state.consumer_name, "dequeue_buffer: timed out");
                    return Err(ExchangeError::WouldBlock);
                }
            };

            let size = if size.width == 0 { state.default_size } else { size };
            let format = if format == 0 { state.default_format } else { format };
            let usage = usage | state.consumer_usage_bits;

            let entry = state.slots.get_mut(slot)?;
            entry.state = SlotState::Dequeued;
            let fence = std::mem::replace(&mut entry.fence, Fence::NO_FENCE);
            entry.release_sync = None;

            let needs_allocation = !entry
                .buffer
                .as_ref()
                .is_some_and(|buffer| buffer.matches(size, format, usage));
            if needs_allocation {
                entry.buffer = None;
                entry.acquire_called = false;
                entry.request_buffer_called = false;
                entry.attached_by_consumer = false;
            }

            tracing::trace!(
                consumer = %state.consumer_name,
                slot,
                needs_allocation,
                "dequeue_buffer: dequeued"
            );
            (slot, fence, needs_allocation, size, format, usage)
        };

        if needs_allocation {
            let buffer = match self.core.allocator().allocate(size, format, usage) {
                Ok(buffer) => buffer,
                Err(err) => {
                    tracing::error!(slot, error = %err, "dequeue_buffer: allocation failed");
                    self.return_unallocated(slot);
                    return Err(err);
                }
            };
            self.install_buffer(slot, buffer)?;
        }

        Ok(DequeueOutput {
            slot,
            fence,
            reallocated: needs_allocation,
        })
    }

    pub(super) fn check_connected(state: &CoreState, operation: &'static str) -> Result<()> {
        if state.is_abandoned {
            tracing::error!(consumer = %state.consumer_name, operation, "exchange abandoned");
            return Err(ExchangeError::NotInitialized);
        }
        if state.connected_api.is_none() {
            tracing::error!(consumer = %state.consumer_name, operation, "producer not connected");
            return Err(ExchangeError::NotInitialized);
        }
        Ok(())
    }

    /// ### English
    /// Picks the oldest free slot within the current max buffer count, or `None` if the producer
    /// has to wait.
    ///
    /// ### 中文
    /// 在当前最大缓冲区数量范围内选择最旧的空闲槽位；若生产者需要等待则返回 `None`。
    fn find_dequeue_slot(&self, state: &CoreState) -> Result<Option<usize>> {
        let max_buffers = state.max_buffer_count();
        let dequeued = state
            .slots
            .iter()
            .take(max_buffers)
            .filter(|(_, entry)| entry.state == SlotState::Dequeued)
            .count();

        if state.buffer_has_been_queued {
            let min_undequeued = state.min_undequeued_buffer_count();
            if max_buffers < dequeued + 1 + min_undequeued {
                tracing::error!(
                    consumer = %state.consumer_name,
                    dequeued,
                    max_buffers,
                    min_undequeued,
                    "dequeue_buffer: too many dequeued buffers"
                );
                return Err(ExchangeError::InvalidState);
            }
        }

        if state.queue.len() > max_buffers {
            return Ok(None);
        }
        Ok(state.slots.find_free_slot_within(max_buffers, true).ok())
    }

    fn install_buffer(&self, slot: usize, buffer: GraphicBuffer) -> Result<()> {
        let mut state = self.core.lock();
        if state.is_abandoned {
            tracing::error!(
                consumer = %state.consumer_name,
                slot,
                "dequeue_buffer: abandoned during allocation"
            );
            return Err(ExchangeError::NotInitialized);
        }
        let entry = state.slots.get_mut(slot)?;
        if entry.state != SlotState::Dequeued {
            return Err(ExchangeError::NotInitialized);
        }
        entry.buffer = Some(buffer);
        entry.frame_number = FRAME_NUMBER_FREED;
        Ok(())
    }

    fn return_unallocated(&self, slot: usize) {
        let mut state = self.core.lock();
        if let Ok(entry) = state.slots.get_mut(slot) {
            if entry.state == SlotState::Dequeued {
                entry.state = SlotState::Free;
            }
        }
        self.core.broadcast();
    }

    /// ### English
    /// Returns the buffer of a dequeued slot and marks it requested (required before queueing).
    ///
    /// ### 中文
    /// 返回已 dequeue 槽位的缓冲区并将其标记为已请求（queue 之前必须调用）。
    pub fn request_buffer(&self, slot: usize) -> Result<GraphicBuffer> {
        let mut state = self.core.lock();
        Self::check_connected(&state, "request_buffer")?;

        if slot >= NUM_BUFFER_SLOTS {
            tracing::error!(slot, "request_buffer: slot index out of range");
            return Err(ExchangeError::InvalidArgument);
        }
        let entry = state.slots.get_mut(slot)?;
        if entry.state != SlotState::Dequeued {
            tracing::error!(slot, state = ?entry.state, "request_buffer: slot is not dequeued");
            return Err(ExchangeError::InvalidArgument);
        }
        let Some(buffer) = entry.buffer.clone() else {
            return Err(ExchangeError::InvalidState);
        };
        entry.request_buffer_called = true;
        Ok(buffer)
    }

    /// ### English
    /// Hands a dequeued slot back without queueing it.
    ///
    /// #### Parameters
    /// - `fence`: Signals when the producer stopped touching the buffer.
    ///
    /// ### 中文
    /// 不经 queue 直接归还已 dequeue 的槽位。
    ///
    /// #### 参数
    /// - `fence`：生产者停止访问该缓冲区时 signal。
    pub fn cancel_buffer(&self, slot: usize, fence: Fence) -> Result<()> {
        let mut state = self.core.lock();
        if state.is_abandoned {
            tracing::error!(consumer = %state.consumer_name, "cancel_buffer: exchange abandoned");
            return Err(ExchangeError::NotInitialized);
        }

        let entry = state.slots.get_mut(slot)?;
        if entry.state != SlotState::Dequeued {
            tracing::error!(slot, state = ?entry.state, "cancel_buffer: slot is not dequeued");
            return Err(ExchangeError::InvalidArgument);
        }
        entry.state = SlotState::Free;
        entry.fence = fence;
        tracing::trace!(slot, "cancel_buffer: cancelled");
        self.core.broadcast();
        Ok(())
    }
}
