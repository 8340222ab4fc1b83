use std::sync::Arc;

use super::BufferConsumer;
use crate::exchange::error::{ExchangeError, Result};
use crate::exchange::listener::ConsumerListener;

impl BufferConsumer {
    /// ### English
    /// Connects the consumer listener. Reconnecting replaces the previous listener.
    ///
    /// #### Parameters
    /// - `listener`: Receives frame-available and buffers-released notifications.
    /// - `controlled_by_app`: Whether the consumer is driven by application code.
    ///
    /// #### Errors
    /// - `NotInitialized`: the exchange was abandoned.
    ///
    /// ### 中文
    /// 连接消费者监听者；重复连接会替换之前的监听者。
    ///
    /// #### 参数
    /// - `listener`：接收“有新帧”与“缓冲区已全部释放”通知。
    /// - `controlled_by_app`：消费者是否由应用代码驱动。
    ///
    /// #### 错误
    /// - `NotInitialized`：交换已被废弃。
    pub fn connect(
        &self,
        listener: Arc<dyn ConsumerListener>,
        controlled_by_app: bool,
    ) -> Result<()> {
        let mut state = self.core.lock();

        if state.is_abandoned {
            tracing::error!(consumer = %state.consumer_name, "connect(C): exchange abandoned");
            return Err(ExchangeError::NotInitialized);
        }

        tracing::debug!(consumer = %state.consumer_name, controlled_by_app, "connect(C)");
        state.consumer_listener = Some(listener);
        state.consumer_controlled_by_app = controlled_by_app;
        Ok(())
    }

    /// ### English
    /// Connects like [`connect`](Self::connect) and turns off the async buffer reservation in
    /// the same critical section.
    ///
    /// Reconnecting is allowed when the reservation is already off.
    ///
    /// #### Errors
    /// - `NotInitialized`: the exchange was abandoned; nothing is changed.
    /// - `InvalidState`: a listener is connected and the reservation is still on.
    ///
    /// ### 中文
    /// 与 [`connect`](Self::connect) 相同，并在同一临界区内关闭异步缓冲区预留。
    ///
    /// 若预留已关闭，允许重复连接。
    ///
    /// #### 错误
    /// - `NotInitialized`：交换已被废弃；不做任何修改。
    /// - `InvalidState`：已有监听者连接且预留仍处于开启状态。
    pub fn connect_without_async_buffer(
        &self,
        listener: Arc<dyn ConsumerListener>,
        controlled_by_app: bool,
    ) -> Result<()> {
        let mut state = self.core.lock();

        if state.is_abandoned {
            tracing::error!(consumer = %state.consumer_name, "connect(C): exchange abandoned");
            return Err(ExchangeError::NotInitialized);
        }
        if state.consumer_listener.is_some() && state.use_async_buffer {
            tracing::error!(
                consumer = %state.consumer_name,
                "connect(C): async buffer reservation already in use"
            );
            return Err(ExchangeError::InvalidState);
        }

        tracing::debug!(
            consumer = %state.consumer_name,
            controlled_by_app,
            "connect(C) without async buffer"
        );
        state.use_async_buffer = false;
        state.consumer_listener = Some(listener);
        state.consumer_controlled_by_app = controlled_by_app;
        Ok(())
    }

    /// ### English
    /// Disconnects the consumer and abandons the exchange permanently.
    ///
    /// Clears the pending queue, frees every slot and wakes all waiters. Every later operation
    /// that checks for abandonment fails with `NotInitialized`.
    ///
    /// #### Errors
    /// - `InvalidArgument`: no consumer listener is connected (including a second disconnect).
    ///
    /// ### 中文
    /// 断开消费者并永久废弃该交换。
    ///
    /// 清空待取队列、释放所有槽位并唤醒所有等待者。此后所有检查废弃状态的操作都会返回
    /// `NotInitialized`。
    ///
    /// #### 错误
    /// - `InvalidArgument`：当前没有已连接的消费者监听者（包括重复 disconnect）。
    pub fn disconnect(&self) -> Result<()> {
        let mut state = self.core.lock();

        if state.consumer_listener.is_none() {
            tracing::error!(
                consumer = %state.consumer_name,
                "disconnect(C): no consumer is connected"
            );
            return Err(ExchangeError::InvalidArgument);
        }

        state.is_abandoned = true;
        state.consumer_listener = None;
        state.queue.clear();
        state.free_all_buffers();
        tracing::debug!(consumer = %state.consumer_name, "disconnect(C): abandoned");
        self.core.broadcast();
        Ok(())
    }
}
