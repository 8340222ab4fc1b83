use dpi::PhysicalSize;

use super::BufferConsumer;
use crate::exchange::config::NUM_BUFFER_SLOTS;
use crate::exchange::error::{ExchangeError, Result};

impl BufferConsumer {
    /// ### English
    /// Sets the size used when the producer dequeues with a 0×0 request.
    ///
    /// ### 中文
    /// 设置生产者以 0×0 请求 dequeue 时使用的尺寸。
    pub fn set_default_buffer_size(&self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            tracing::debug!(width, height, "set_default_buffer_size: dimensions cannot be 0");
            return Err(ExchangeError::InvalidArgument);
        }

        let mut state = self.core.lock();
        tracing::debug!(consumer = %state.consumer_name, width, height, "set_default_buffer_size");
        state.default_size = PhysicalSize::new(width, height);
        Ok(())
    }

    /// ### English
    /// Sets the nominal number of slots the producer may use.
    ///
    /// Valid range is `[2, NUM_BUFFER_SLOTS]` with async buffers enabled, `[1, NUM_BUFFER_SLOTS]`
    /// otherwise. Wakes producers waiting for a slot.
    ///
    /// ### 中文
    /// 设置生产者可使用的名义槽位数量。
    ///
    /// 启用异步缓冲时有效范围为 `[2, NUM_BUFFER_SLOTS]`，否则为 `[1, NUM_BUFFER_SLOTS]`。
    /// 会唤醒等待槽位的生产者。
    pub fn set_default_max_buffer_count(&self, count: usize) -> Result<()> {
        let mut state = self.core.lock();
        let min = if state.use_async_buffer { 2 } else { 1 };
        if count < min || count > NUM_BUFFER_SLOTS {
            tracing::error!(
                consumer = %state.consumer_name,
                count,
                min,
                "set_default_max_buffer_count: invalid count"
            );
            return Err(ExchangeError::InvalidArgument);
        }

        tracing::debug!(consumer = %state.consumer_name, count, "set_default_max_buffer_count");
        state.default_max_buffer_count = count;
        self.core.broadcast();
        Ok(())
    }

    /// ### English
    /// Sets how many buffers the consumer may hold at once (plus one of headroom).
    ///
    /// #### Errors
    /// - `InvalidArgument`: `count` outside `[1, max_acquired_ceiling]`.
    /// - `InvalidState`: a producer is already connected.
    ///
    /// ### 中文
    /// 设置消费者可同时持有的缓冲区数量（另有一个余量）。
    ///
    /// #### 错误
    /// - `InvalidArgument`：`count` 不在 `[1, max_acquired_ceiling]` 内。
    /// - `InvalidState`：生产者已连接。
    pub fn set_max_acquired_buffer_count(&self, count: usize) -> Result<()> {
        let ceiling = self.core.max_acquired_ceiling();
        if count < 1 || count > ceiling {
            tracing::error!(count, ceiling, "set_max_acquired_buffer_count: invalid count");
            return Err(ExchangeError::InvalidArgument);
        }

        let mut state = self.core.lock();
        if state.connected_api.is_some() {
            tracing::error!(
                consumer = %state.consumer_name,
                "set_max_acquired_buffer_count: producer is already connected"
            );
            return Err(ExchangeError::InvalidState);
        }

        tracing::debug!(consumer = %state.consumer_name, count, "set_max_acquired_buffer_count");
        state.max_acquired_buffer_count = count;
        Ok(())
    }

    /// ### English
    /// Turns off the extra buffer reserved for async producers.
    ///
    /// #### Errors
    /// - `InvalidState`: a consumer listener is already connected.
    ///
    /// ### 中文
    /// 关闭为异步生产者额外保留的缓冲区。
    ///
    /// #### 错误
    /// - `InvalidState`：消费者监听者已连接。
    pub fn disable_async_buffer(&self) -> Result<()> {
        let mut state = self.core.lock();
        if state.consumer_listener.is_some() {
            tracing::error!(
                consumer = %state.consumer_name,
                "disable_async_buffer: consumer already connected"
            );
            return Err(ExchangeError::InvalidState);
        }

        state.use_async_buffer = false;
        Ok(())
    }

    pub fn set_default_buffer_format(&self, format: u32) {
        let mut state = self.core.lock();
        tracing::debug!(consumer = %state.consumer_name, format, "set_default_buffer_format");
        state.default_format = format;
    }

    /// ### English
    /// Usage bits OR-ed into every producer allocation.
    ///
    /// ### 中文
    /// 会被 OR 进每次生产者分配的用途位。
    pub fn set_consumer_usage_bits(&self, usage: u32) {
        let mut state = self.core.lock();
        tracing::debug!(
            consumer = %state.consumer_name,
            usage = format_args!("{usage:#x}"),
            "set_consumer_usage_bits"
        );
        state.consumer_usage_bits = usage;
    }

    pub fn set_transform_hint(&self, hint: u32) {
        let mut state = self.core.lock();
        tracing::debug!(
            consumer = %state.consumer_name,
            hint = format_args!("{hint:#x}"),
            "set_transform_hint"
        );
        state.transform_hint = hint;
    }

    pub fn set_consumer_name(&self, name: impl Into<String>) {
        let name = name.into();
        let mut state = self.core.lock();
        tracing::debug!(consumer = %name, "set_consumer_name");
        state.consumer_name = name;
    }

    pub fn consumer_name(&self) -> String {
        self.core.lock().consumer_name.clone()
    }
}
