//! ### English
//! C ABI bindings for the producer end.
//!
//! ### 中文
//! 生产者端的 C ABI 绑定。

use std::sync::Arc;
use std::time::Duration;

use dpi::PhysicalSize;

use super::{
    CallbackProducerListener, XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT, XIAN_FRAME_EXCHANGE_OK,
    XianFrameExchange, XianFrameExchangeBuffer, XianFrameExchangeProducerCallbacks, status,
};
use crate::exchange::flags::{
    self as exchange_flags, XIAN_FRAME_EXCHANGE_FLAG_PRODUCER_ASYNC,
    XIAN_FRAME_EXCHANGE_FLAG_PRODUCER_CONTROLLED_BY_APP,
};
use crate::exchange::{
    ConnectedApi, DequeueRequest, Fence, ProducerListener, QueueBufferInput, QueueBufferOutput,
};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
/// ### English
/// Producer-visible exchange state (returned by connect and queue).
///
/// ### 中文
/// 生产者可见的交换状态（由 connect 与 queue 返回）。
pub struct XianFrameExchangeQueueOutput {
    pub default_width: u32,
    pub default_height: u32,
    pub transform_hint: u32,
    pub pending_buffers: u32,
}

impl From<QueueBufferOutput> for XianFrameExchangeQueueOutput {
    fn from(output: QueueBufferOutput) -> Self {
        Self {
            default_width: output.default_size.width,
            default_height: output.default_size.height,
            transform_hint: output.transform_hint,
            pending_buffers: output.pending_buffers as u32,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
/// ### English
/// Result of a dequeue.
///
/// ### 中文
/// dequeue 的结果。
pub struct XianFrameExchangeDequeued {
    pub slot: u32,
    /// ### English
    /// Release fence handle left by the consumer; `0` if already signaled.
    ///
    /// ### 中文
    /// 消费者留下的 release fence 句柄；已 signal 时为 `0`。
    pub fence: u64,
    /// ### English
    /// `1` if the slot got a new buffer and `xian_frame_exchange_request_buffer` must be called.
    ///
    /// ### 中文
    /// 若槽位获得了新缓冲区则为 `1`，此时必须调用 `xian_frame_exchange_request_buffer`。
    pub reallocated: u8,
}

/// ### English
/// Writes `value` through `out` if `out` is non-NULL.
///
/// ### 中文
/// 若 `out` 非 NULL，则通过 `out` 写入 `value`。
unsafe fn write_optional<T>(out: *mut T, value: T) {
    if let Some(out) = unsafe { out.as_mut() } {
        *out = value;
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Connects the producer.
///
/// - `callbacks` may be NULL (no release notifications).
/// - `api`: `1` EGL, `2` CPU, `3` media, `4` camera.
/// - `flags`: `XIAN_FRAME_EXCHANGE_FLAG_PRODUCER_*`.
/// - `out_output` may be NULL.
///
/// ### 中文
/// 连接生产者。
///
/// - `callbacks` 可为 NULL（不接收 release 通知）。
/// - `api`：`1` EGL、`2` CPU、`3` media、`4` camera。
/// - `flags`：`XIAN_FRAME_EXCHANGE_FLAG_PRODUCER_*`。
/// - `out_output` 可为 NULL。
pub unsafe extern "C" fn xian_frame_exchange_producer_connect(
    exchange: *const XianFrameExchange,
    callbacks: *const XianFrameExchangeProducerCallbacks,
    api: u32,
    flags: u32,
    out_output: *mut XianFrameExchangeQueueOutput,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    let Some(api) = ConnectedApi::from_raw(api) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };

    let listener = unsafe { callbacks.as_ref() }.map(|callbacks| {
        Arc::new(CallbackProducerListener(*callbacks)) as Arc<dyn ProducerListener>
    });
    match exchange.producer.connect(
        listener,
        api,
        exchange_flags::has(flags, XIAN_FRAME_EXCHANGE_FLAG_PRODUCER_CONTROLLED_BY_APP),
        exchange_flags::has(flags, XIAN_FRAME_EXCHANGE_FLAG_PRODUCER_ASYNC),
    ) {
        Ok(output) => {
            unsafe { write_optional(out_output, output.into()) };
            XIAN_FRAME_EXCHANGE_OK
        }
        Err(err) => err.status_code(),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn xian_frame_exchange_producer_disconnect(
    exchange: *const XianFrameExchange,
    api: u32,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    let Some(api) = ConnectedApi::from_raw(api) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    status(exchange.producer.disconnect(api))
}

#[unsafe(no_mangle)]
/// ### English
/// Dequeues a free slot.
///
/// `timeout_ns`: `0` never blocks, `u64::MAX` blocks until a slot frees up or the exchange is
/// abandoned, anything else is an upper bound. Zero width/height/format use the defaults.
///
/// ### 中文
/// dequeue 一个空闲槽位。
///
/// `timeout_ns`：`0` 表示不阻塞，`u64::MAX` 表示一直阻塞到有空闲槽位或交换被废弃，其它值为
/// 等待上限。宽/高/格式为 0 时使用默认值。
pub unsafe extern "C" fn xian_frame_exchange_dequeue_buffer(
    exchange: *const XianFrameExchange,
    width: u32,
    height: u32,
    format: u32,
    usage: u32,
    timeout_ns: u64,
    out_dequeued: *mut XianFrameExchangeDequeued,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    if out_dequeued.is_null() {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    }

    let request = DequeueRequest {
        size: PhysicalSize::new(width, height),
        format,
        usage,
        timeout: None,
    };
    let result = match timeout_ns {
        0 => exchange.producer.try_dequeue_buffer(request),
        u64::MAX => exchange.producer.dequeue_buffer(request),
        timeout => exchange
            .producer
            .dequeue_buffer(request.with_timeout(Duration::from_nanos(timeout))),
    };

    match result {
        Ok(output) => {
            unsafe {
                out_dequeued.write(XianFrameExchangeDequeued {
                    slot: output.slot as u32,
                    fence: output.fence.native_handle(),
                    reallocated: u8::from(output.reallocated),
                })
            };
            XIAN_FRAME_EXCHANGE_OK
        }
        Err(err) => err.status_code(),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn xian_frame_exchange_request_buffer(
    exchange: *const XianFrameExchange,
    slot: u32,
    out_buffer: *mut XianFrameExchangeBuffer,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    if out_buffer.is_null() {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    }

    match exchange.producer.request_buffer(slot as usize) {
        Ok(buffer) => {
            unsafe { out_buffer.write(XianFrameExchangeBuffer::from(&buffer)) };
            XIAN_FRAME_EXCHANGE_OK
        }
        Err(err) => err.status_code(),
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Queues a dequeued slot.
///
/// - `timestamp_ns`: desired presentation time; `0` stamps the frame with the exchange clock
///   (see `xian_frame_exchange_now_ns`) and marks it auto-timestamped, so it never causes the
///   frame ahead of it to be dropped. An explicit presentation time of `0` cannot be expressed;
///   any other value, including out-of-window garbage such as `1`, is kept as given.
/// - `fence`: native acquire fence handle, `0` if the buffer is already complete.
/// - `out_output` may be NULL.
///
/// ### 中文
/// queue 一个已 dequeue 的槽位。
///
/// - `timestamp_ns`：期望显示时间；`0` 表示使用交换时钟（见 `xian_frame_exchange_now_ns`）
///   自动打时间戳并标记为自动时间戳，因此它永远不会导致排在它前面的帧被丢弃。无法显式传入
///   `0` 作为显示时间；其他任何值（包括窗口外的异常值，例如 `1`）都会按原样保留。
/// - `fence`：原生 acquire fence 句柄，缓冲区已完成时为 `0`。
/// - `out_output` 可为 NULL。
pub unsafe extern "C" fn xian_frame_exchange_queue_buffer(
    exchange: *const XianFrameExchange,
    slot: u32,
    timestamp_ns: i64,
    fence: u64,
    transform: u32,
    out_output: *mut XianFrameExchangeQueueOutput,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };

    let input = QueueBufferInput {
        timestamp: (timestamp_ns != 0).then_some(timestamp_ns),
        fence: Fence::from_native(fence),
        transform,
    };
    match exchange.producer.queue_buffer(slot as usize, input) {
        Ok(output) => {
            unsafe { write_optional(out_output, output.into()) };
            XIAN_FRAME_EXCHANGE_OK
        }
        Err(err) => err.status_code(),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn xian_frame_exchange_cancel_buffer(
    exchange: *const XianFrameExchange,
    slot: u32,
    fence: u64,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    status(
        exchange
            .producer
            .cancel_buffer(slot as usize, Fence::from_native(fence)),
    )
}
