//! ### English
//! C ABI bindings for the consumer end.
//!
//! ### 中文
//! 消费者端的 C ABI 绑定。

use std::sync::Arc;

use dpi::PhysicalSize;

use super::{
    CallbackConsumerListener, XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT, XIAN_FRAME_EXCHANGE_OK,
    XianFrameExchange, XianFrameExchangeConsumerCallbacks, XianFrameExchangeItem, status,
};
use crate::exchange::flags::{
    self as exchange_flags, XIAN_FRAME_EXCHANGE_FLAG_CONSUMER_CONTROLLED_BY_APP,
    XIAN_FRAME_EXCHANGE_FLAG_DISABLE_ASYNC_BUFFER,
};
use crate::exchange::{Fence, GraphicBuffer, ReleaseSync};

#[unsafe(no_mangle)]
/// ### English
/// Connects the consumer callbacks (`flags`: `XIAN_FRAME_EXCHANGE_FLAG_*`).
///
/// The callbacks struct is copied; `user_data` must stay valid until the consumer disconnects
/// or the exchange is destroyed.
///
/// ### 中文
/// 连接消费者回调（`flags`：`XIAN_FRAME_EXCHANGE_FLAG_*`）。
///
/// 回调结构体会被复制；`user_data` 必须在消费者 disconnect 或交换销毁之前保持有效。
pub unsafe extern "C" fn xian_frame_exchange_consumer_connect(
    exchange: *const XianFrameExchange,
    callbacks: *const XianFrameExchangeConsumerCallbacks,
    flags: u32,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    let Some(callbacks) = (unsafe { callbacks.as_ref() }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };

    let listener = Arc::new(CallbackConsumerListener(*callbacks));
    let controlled_by_app =
        exchange_flags::has(flags, XIAN_FRAME_EXCHANGE_FLAG_CONSUMER_CONTROLLED_BY_APP);
    if exchange_flags::has(flags, XIAN_FRAME_EXCHANGE_FLAG_DISABLE_ASYNC_BUFFER) {
        status(
            exchange
                .consumer
                .connect_without_async_buffer(listener, controlled_by_app),
        )
    } else {
        status(exchange.consumer.connect(listener, controlled_by_app))
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Disconnects the consumer and abandons the exchange.
///
/// ### 中文
/// 断开消费者并废弃该交换。
pub unsafe extern "C" fn xian_frame_exchange_consumer_disconnect(
    exchange: *const XianFrameExchange,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    status(exchange.consumer.disconnect())
}

#[unsafe(no_mangle)]
/// ### English
/// Acquires the next frame into `out_item`.
///
/// `expected_present_ns == 0` takes the oldest frame unconditionally. On any non-zero status
/// `out_item` is left untouched.
///
/// ### 中文
/// 获取下一帧并写入 `out_item`。
///
/// `expected_present_ns == 0` 时无条件取最旧帧。返回非零状态时 `out_item` 保持不变。
pub unsafe extern "C" fn xian_frame_exchange_acquire_buffer(
    exchange: *const XianFrameExchange,
    expected_present_ns: i64,
    out_item: *mut XianFrameExchangeItem,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    if out_item.is_null() {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    }

    match exchange.consumer.acquire_buffer(expected_present_ns) {
        Ok(item) => {
            unsafe { out_item.write(XianFrameExchangeItem::from(&item)) };
            XIAN_FRAME_EXCHANGE_OK
        }
        Err(err) => err.status_code(),
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Releases an acquired slot.
///
/// `release_fence` points at the native release fence handle (`0` = already signaled) and must
/// not be NULL. `egl_display`/`egl_sync` are stored alongside it; pass `0` when unused.
///
/// ### 中文
/// 释放一个已获取的槽位。
///
/// `release_fence` 指向原生 release fence 句柄（`0` 表示已 signal），不能为 NULL。
/// `egl_display`/`egl_sync` 会一并保存；不使用时传 `0`。
pub unsafe extern "C" fn xian_frame_exchange_release_buffer(
    exchange: *const XianFrameExchange,
    slot: u32,
    frame_number: u64,
    release_fence: *const u64,
    egl_display: u64,
    egl_sync: u64,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    let Some(&fence_handle) = (unsafe { release_fence.as_ref() }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };

    let release_sync = (egl_display != 0 || egl_sync != 0).then_some(ReleaseSync {
        display: egl_display,
        sync: egl_sync,
    });
    status(exchange.consumer.release_buffer(
        slot as usize,
        frame_number,
        Fence::from_native(fence_handle),
        release_sync,
    ))
}

#[unsafe(no_mangle)]
/// ### English
/// Attaches an embedder-owned buffer; the chosen slot is written to `out_slot`.
///
/// `native_handle == 0` is treated as a NULL buffer.
///
/// ### 中文
/// attach 一个宿主持有的缓冲区；所选槽位写入 `out_slot`。
///
/// `native_handle == 0` 视为 NULL 缓冲区。
pub unsafe extern "C" fn xian_frame_exchange_attach_buffer(
    exchange: *const XianFrameExchange,
    native_handle: u64,
    width: u32,
    height: u32,
    format: u32,
    usage: u32,
    out_slot: *mut u32,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    if out_slot.is_null() {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    }

    let buffer = (native_handle != 0).then(|| {
        GraphicBuffer::with_native_handle(
            PhysicalSize::new(width, height),
            format,
            usage,
            native_handle,
        )
    });
    match exchange.consumer.attach_buffer(buffer) {
        Ok(slot) => {
            unsafe { out_slot.write(slot as u32) };
            XIAN_FRAME_EXCHANGE_OK
        }
        Err(err) => err.status_code(),
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Detaches an acquired slot.
///
/// ### 中文
/// detach 一个已获取的槽位。
pub unsafe extern "C" fn xian_frame_exchange_detach_buffer(
    exchange: *const XianFrameExchange,
    slot: u32,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    status(exchange.consumer.detach_buffer(slot as usize))
}

#[unsafe(no_mangle)]
/// ### English
/// Writes the mask of slots whose cached buffers the embedder should forget.
///
/// ### 中文
/// 写入宿主应丢弃其缓存缓冲区的槽位掩码。
pub unsafe extern "C" fn xian_frame_exchange_get_released_buffers(
    exchange: *const XianFrameExchange,
    out_slot_mask: *mut u64,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    if out_slot_mask.is_null() {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    }

    match exchange.consumer.released_buffers() {
        Ok(mask) => {
            unsafe { out_slot_mask.write(mask) };
            XIAN_FRAME_EXCHANGE_OK
        }
        Err(err) => err.status_code(),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn xian_frame_exchange_set_default_buffer_size(
    exchange: *const XianFrameExchange,
    width: u32,
    height: u32,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    status(exchange.consumer.set_default_buffer_size(width, height))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn xian_frame_exchange_set_default_max_buffer_count(
    exchange: *const XianFrameExchange,
    count: u32,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    status(exchange.consumer.set_default_max_buffer_count(count as usize))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn xian_frame_exchange_set_max_acquired_buffer_count(
    exchange: *const XianFrameExchange,
    count: u32,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    status(exchange.consumer.set_max_acquired_buffer_count(count as usize))
}

#[unsafe(no_mangle)]
/// ### English
/// Sets the default format, consumer usage bits and transform hint in one call.
///
/// ### 中文
/// 一次性设置默认格式、消费者用途位与变换提示。
pub unsafe extern "C" fn xian_frame_exchange_set_buffer_defaults(
    exchange: *const XianFrameExchange,
    format: u32,
    consumer_usage: u32,
    transform_hint: u32,
) -> i32 {
    let Some(exchange) = (unsafe { super::exchange_ref(exchange) }) else {
        return XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT;
    };
    exchange.consumer.set_default_buffer_format(format);
    exchange.consumer.set_consumer_usage_bits(consumer_usage);
    exchange.consumer.set_transform_hint(transform_hint);
    XIAN_FRAME_EXCHANGE_OK
}
