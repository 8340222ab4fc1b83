use std::sync::Arc;

use super::{BufferProducer, ConnectedApi, QueueBufferOutput};
use crate::exchange::error::{ExchangeError, Result};
use crate::exchange::listener::ProducerListener;

impl BufferProducer {
    /// ### English
    /// Connects the producer. A consumer must already be connected.
    ///
    /// #### Parameters
    /// - `listener`: Optional sink for buffer-released notifications.
    /// - `api`: Client API the producer renders with.
    /// - `controlled_by_app`: Whether the producer is driven by application code.
    /// - `is_async`: Queued frames may be replaced by newer ones before they are acquired.
    ///
    /// #### Errors
    /// - `NotInitialized`: abandoned, or no consumer connected.
    /// - `InvalidArgument`: a producer is already connected.
    ///
    /// ### 中文
    /// 连接生产者；消费者必须已经连接。
    ///
    /// #### 参数
    /// - `listener`：可选的“缓冲区已归还”通知接收者。
    /// - `api`：生产者用于渲染的客户端 API。
    /// - `controlled_by_app`：生产者是否由应用代码驱动。
    /// - `is_async`：已 queue 但尚未被获取的帧可以被更新的帧替换。
    ///
    /// #### 错误
    /// - `NotInitialized`：已废弃，或消费者尚未连接。
    /// - `InvalidArgument`：已有生产者连接。
    pub fn connect(
        &self,
        listener: Option<Arc<dyn ProducerListener>>,
        api: ConnectedApi,
        controlled_by_app: bool,
        is_async: bool,
    ) -> Result<QueueBufferOutput> {
        let mut state = self.core.lock();

        if state.is_abandoned {
            tracing::error!(consumer = %state.consumer_name, "connect(P): exchange abandoned");
            return Err(ExchangeError::NotInitialized);
        }
        if state.consumer_listener.is_none() {
            tracing::error!(consumer = %state.consumer_name, "connect(P): consumer not connected");
            return Err(ExchangeError::NotInitialized);
        }
        if let Some(current) = state.connected_api {
            tracing::error!(
                consumer = %state.consumer_name,
                current = ?current,
                requested = ?api,
                "connect(P): already connected"
            );
            return Err(ExchangeError::InvalidArgument);
        }

        state.producer_listener = listener;
        state.connected_api = Some(api);
        state.producer_controlled_by_app = controlled_by_app;
        state.producer_async = is_async;
        state.buffer_has_been_queued = false;

        tracing::debug!(consumer = %state.consumer_name, api = ?api, is_async, "connect(P)");
        Ok(QueueBufferOutput {
            default_size: state.default_size,
            transform_hint: state.transform_hint,
            pending_buffers: state.queue.len(),
        })
    }

    /// ### English
    /// Disconnects the producer and frees every buffer.
    ///
    /// Frames still pending are discarded. The consumer listener is told its cached buffers are
    /// gone. Disconnecting from an abandoned exchange succeeds without doing anything.
    ///
    /// #### Errors
    /// - `InvalidArgument`: `api` is not the connected API.
    ///
    /// ### 中文
    /// 断开生产者并释放所有缓冲区。
    ///
    /// 仍在待取队列中的帧会被丢弃；消费者监听者会收到“缓存的缓冲区已失效”通知。
    /// 对已废弃的交换调用 disconnect 直接成功，不做任何事。
    ///
    /// #### 错误
    /// - `InvalidArgument`：`api` 不是当前已连接的 API。
    pub fn disconnect(&self, api: ConnectedApi) -> Result<()> {
        let listener = {
            let mut state = self.core.lock();

            if state.is_abandoned {
                return Ok(());
            }
            if state.connected_api != Some(api) {
                tracing::error!(
                    consumer = %state.consumer_name,
                    connected = ?state.connected_api,
                    requested = ?api,
                    "disconnect(P): api mismatch"
                );
                return Err(ExchangeError::InvalidArgument);
            }

            state.queue.clear();
            state.free_all_buffers();
            state.producer_listener = None;
            state.connected_api = None;
            tracing::debug!(consumer = %state.consumer_name, api = ?api, "disconnect(P)");
            self.core.broadcast();
            state.consumer_listener.clone()
        };

        if let Some(listener) = listener {
            listener.on_buffers_released();
        }
        Ok(())
    }
}
