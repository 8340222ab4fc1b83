//! ### English
//! C ABI bindings for exchange lifecycle (create/destroy/dump).
//!
//! ### 中文
//! 交换生命周期相关的 C ABI 绑定（create/destroy/dump）。

use std::ffi::c_char;
use std::sync::Arc;
use std::time::Duration;

use super::{
    CallbackAllocator, CallbackClock, XianFrameExchange, XianFrameExchangeAllocator,
    XianFrameExchangeClock,
};
use crate::exchange::{
    BufferAllocator, BufferExchange, ExchangeConfig, HeapBufferAllocator, MonotonicClock,
    SystemClock,
};

#[unsafe(no_mangle)]
/// ### English
/// Creates a buffer exchange.
///
/// - `consumer_name` is an optional NUL-terminated UTF-8 string used in logs and dumps.
/// - `max_acquired_buffers`: `0` keeps the default (1).
/// - `present_window_ns`: drop/defer window; `0` keeps the default (1 s).
/// - `allocator` may be NULL, in which case buffers carry no native handle.
///
/// Auto timestamps use the exchange's own clock; read it with `xian_frame_exchange_now_ns`,
/// or supply the vsync time base through `xian_frame_exchange_create_with_clock`.
///
/// Returns NULL if the configuration is invalid.
///
/// ### 中文
/// 创建一个缓冲区交换。
///
/// - `consumer_name` 为可选的 NUL 结尾 UTF-8 字符串，用于日志与 dump。
/// - `max_acquired_buffers`：`0` 表示使用默认值（1）。
/// - `present_window_ns`：丢帧/延后窗口；`0` 表示使用默认值（1 秒）。
/// - `allocator` 可为 NULL，此时缓冲区不带原生句柄。
///
/// 自动时间戳使用交换自身的时钟；可通过 `xian_frame_exchange_now_ns` 读取，
/// 或通过 `xian_frame_exchange_create_with_clock` 提供 vsync 时间基准。
///
/// 配置非法时返回 NULL。
pub unsafe extern "C" fn xian_frame_exchange_create(
    consumer_name: *const c_char,
    max_acquired_buffers: u32,
    present_window_ns: u64,
    allocator: *const XianFrameExchangeAllocator,
) -> *mut XianFrameExchange {
    unsafe {
        xian_frame_exchange_create_with_clock(
            consumer_name,
            max_acquired_buffers,
            present_window_ns,
            allocator,
            std::ptr::null(),
        )
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Same as `xian_frame_exchange_create`, with an embedder clock for auto timestamps.
///
/// `clock` may be NULL (or carry a NULL `now_ns`), in which case the exchange keeps its own
/// clock. The callback must be monotonic and callable from any thread.
///
/// ### 中文
/// 与 `xian_frame_exchange_create` 相同，但自动时间戳使用宿主提供的时钟。
///
/// `clock` 可为 NULL（或其 `now_ns` 为 NULL），此时交换使用自身时钟。回调必须单调，
/// 且可在任意线程上调用。
pub unsafe extern "C" fn xian_frame_exchange_create_with_clock(
    consumer_name: *const c_char,
    max_acquired_buffers: u32,
    present_window_ns: u64,
    allocator: *const XianFrameExchangeAllocator,
    clock: *const XianFrameExchangeClock,
) -> *mut XianFrameExchange {
    let mut config = ExchangeConfig::default();
    if let Some(name) = unsafe { super::cstr_to_string(consumer_name) } {
        config = config.with_consumer_name(name);
    }
    if max_acquired_buffers != 0 {
        config = config.with_max_acquired_buffers(max_acquired_buffers as usize);
    }
    if present_window_ns != 0 {
        config = config.with_present_window(Duration::from_nanos(present_window_ns));
    }

    let allocator: Arc<dyn BufferAllocator> = match unsafe { allocator.as_ref() } {
        Some(callbacks) => Arc::new(CallbackAllocator(*callbacks)),
        None => Arc::new(HeapBufferAllocator),
    };

    let callback = unsafe { clock.as_ref() }.and_then(|clock| {
        clock.now_ns.map(|now_ns| CallbackClock {
            user_data: clock.user_data,
            now_ns,
        })
    });
    let clock: Arc<dyn MonotonicClock> = match callback {
        Some(callback) => Arc::new(callback),
        None => Arc::new(SystemClock::new()),
    };

    let Ok((producer, consumer)) = BufferExchange::with_collaborators(config, clock, allocator)
    else {
        return std::ptr::null_mut();
    };

    Box::into_raw(Box::new(XianFrameExchange { producer, consumer }))
}

#[unsafe(no_mangle)]
/// ### English
/// Destroys an exchange created by `xian_frame_exchange_create`.
///
/// Threads blocked in `xian_frame_exchange_dequeue_buffer` must have returned before this call.
///
/// ### 中文
/// 销毁由 `xian_frame_exchange_create` 创建的交换。
///
/// 调用前，阻塞在 `xian_frame_exchange_dequeue_buffer` 中的线程必须已经返回。
pub unsafe extern "C" fn xian_frame_exchange_destroy(exchange: *mut XianFrameExchange) {
    if exchange.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(exchange));
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Reads the clock the exchange stamps auto-timestamped frames with. Returns `0` for NULL.
///
/// ### 中文
/// 读取交换为自动时间戳帧打时间戳所用的时钟；传入 NULL 时返回 `0`。
pub unsafe extern "C" fn xian_frame_exchange_now_ns(exchange: *const XianFrameExchange) -> i64 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return 0;
    };
    exchange.consumer.core().clock().now_ns()
}

#[unsafe(no_mangle)]
/// ### English
/// Writes a text snapshot of the exchange into `out` (NUL-terminated, truncated to `capacity`).
///
/// Returns the full snapshot length in bytes excluding the NUL, so a caller can retry with a
/// larger buffer. `out` may be NULL to query the length only.
///
/// ### 中文
/// 将交换的文本快照写入 `out`（以 NUL 结尾，超出 `capacity` 会被截断）。
///
/// 返回不含 NUL 的完整快照字节长度，调用方可据此用更大的缓冲区重试。`out` 可为 NULL 以仅查询长度。
pub unsafe extern "C" fn xian_frame_exchange_dump(
    exchange: *const XianFrameExchange,
    out: *mut c_char,
    capacity: usize,
) -> usize {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return 0;
    };

    let text = exchange.consumer.dump("");
    let bytes = text.as_bytes();
    if !out.is_null() && capacity > 0 {
        let written = bytes.len().min(capacity - 1);
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), out.cast::<u8>(), written);
            *out.add(written) = 0;
        }
    }
    bytes.len()
}
