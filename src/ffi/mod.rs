//! ### English
//! C ABI surface for `xian_frame_exchange`.
//!
//! All exported symbols are `extern "C"` functions; structs are `#[repr(C)]`. Every function
//! returns an `i32` status: `0` on success, a negative [`ExchangeError`] code otherwise. NULL
//! pointers where a value is required map to `XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT`.
//!
//! ### 中文
//! `xian_frame_exchange` 的 C ABI 接口层。
//!
//! 所有导出符号均为 `extern "C"` 函数；结构体使用 `#[repr(C)]`。每个函数返回 `i32` 状态码：
//! 成功为 `0`，否则为负的 [`ExchangeError`] 错误码。必需参数传入 NULL 时返回
//! `XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT`。
mod abi;
mod consumer;
mod lifecycle;
mod producer;

use std::ffi::{CStr, c_char, c_void};

use dpi::PhysicalSize;

pub use abi::*;
pub use consumer::*;
pub use lifecycle::*;
pub use producer::*;

use crate::exchange::{
    BufferAllocator, BufferConsumer, BufferItem, BufferProducer, ConsumerListener, ExchangeError,
    GraphicBuffer, MonotonicClock, Nsecs, ProducerListener, Result,
};

/// ### English
/// Opaque exchange handle owning both ends of one buffer exchange.
///
/// ### 中文
/// 不透明交换句柄，持有同一缓冲区交换的两端。
pub struct XianFrameExchange {
    producer: BufferProducer,
    consumer: BufferConsumer,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
/// ### English
/// Buffer description crossing the C boundary.
///
/// ### 中文
/// 跨越 C 边界的缓冲区描述。
pub struct XianFrameExchangeBuffer {
    /// ### English
    /// Process-unique buffer identity; `0` means "no buffer" (already delivered earlier).
    ///
    /// ### 中文
    /// 进程内唯一的缓冲区标识；`0` 表示“无缓冲区”（此前已交付过）。
    pub id: u64,
    pub native_handle: u64,
    pub width: u32,
    pub height: u32,
    pub format: u32,
    pub usage: u32,
}

impl From<&GraphicBuffer> for XianFrameExchangeBuffer {
    fn from(buffer: &GraphicBuffer) -> Self {
        let size = buffer.size();
        Self {
            id: buffer.id(),
            native_handle: buffer.native_handle(),
            width: size.width,
            height: size.height,
            format: buffer.format(),
            usage: buffer.usage(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
/// ### English
/// One acquired frame returned to the embedder.
///
/// ### 中文
/// 返回给宿主的单个已获取帧。
pub struct XianFrameExchangeItem {
    pub slot: u32,
    pub frame_number: u64,
    /// ### English
    /// Buffer of the slot; `buffer.id == 0` when the embedder already has it cached.
    ///
    /// ### 中文
    /// 槽位的缓冲区；若宿主已缓存该缓冲区则 `buffer.id == 0`。
    pub buffer: XianFrameExchangeBuffer,
    /// ### English
    /// Acquire fence (native sync handle), `0` if already signaled. Wait on it before sampling.
    ///
    /// ### 中文
    /// acquire fence（原生同步句柄），已 signal 时为 `0`。采样前需等待。
    pub fence: u64,
    pub timestamp: i64,
    pub is_auto_timestamp: u8,
    pub transform: u32,
}

impl From<&BufferItem> for XianFrameExchangeItem {
    fn from(item: &BufferItem) -> Self {
        Self {
            slot: item.slot as u32,
            frame_number: item.frame_number,
            buffer: item
                .buffer
                .as_ref()
                .map(XianFrameExchangeBuffer::from)
                .unwrap_or_default(),
            fence: item.fence.native_handle(),
            timestamp: item.timestamp,
            is_auto_timestamp: u8::from(item.is_auto_timestamp),
            transform: item.transform,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
/// ### English
/// Consumer callbacks. Both are invoked on the thread that triggered them, never under a lock.
///
/// ### 中文
/// 消费者回调。两者都在触发它们的线程上调用，调用时不持有任何锁。
pub struct XianFrameExchangeConsumerCallbacks {
    pub user_data: *mut c_void,
    pub on_frame_available:
        Option<extern "C" fn(user_data: *mut c_void, slot: u32, frame_number: u64)>,
    pub on_buffers_released: Option<extern "C" fn(user_data: *mut c_void)>,
}

#[repr(C)]
#[derive(Clone, Copy)]
/// ### English
/// Producer callbacks.
///
/// ### 中文
/// 生产者回调。
pub struct XianFrameExchangeProducerCallbacks {
    pub user_data: *mut c_void,
    pub on_buffer_released: Option<extern "C" fn(user_data: *mut c_void)>,
}

#[repr(C)]
#[derive(Clone, Copy)]
/// ### English
/// Embedder-provided allocator. Must write a non-zero native handle and return `0` on success.
///
/// ### 中文
/// 宿主提供的分配器；成功时必须写入非零原生句柄并返回 `0`。
pub struct XianFrameExchangeAllocator {
    pub user_data: *mut c_void,
    pub allocate: Option<
        extern "C" fn(
            user_data: *mut c_void,
            width: u32,
            height: u32,
            format: u32,
            usage: u32,
            out_native_handle: *mut u64,
        ) -> i32,
    >,
}

/// ### English
/// Wraps embedder callbacks. The embedder guarantees `user_data` may be used from any thread
/// for as long as the exchange exists.
///
/// ### 中文
/// 包装宿主回调。宿主保证在交换存在期间 `user_data` 可以在任意线程上使用。
struct CallbackConsumerListener(XianFrameExchangeConsumerCallbacks);

unsafe impl Send for CallbackConsumerListener {}
unsafe impl Sync for CallbackConsumerListener {}

impl ConsumerListener for CallbackConsumerListener {
    fn on_frame_available(&self, item: &BufferItem) {
        if let Some(callback) = self.0.on_frame_available {
            callback(self.0.user_data, item.slot as u32, item.frame_number);
        }
    }

    fn on_buffers_released(&self) {
        if let Some(callback) = self.0.on_buffers_released {
            callback(self.0.user_data);
        }
    }
}

struct CallbackProducerListener(XianFrameExchangeProducerCallbacks);

unsafe impl Send for CallbackProducerListener {}
unsafe impl Sync for CallbackProducerListener {}

impl ProducerListener for CallbackProducerListener {
    fn on_buffer_released(&self) {
        if let Some(callback) = self.0.on_buffer_released {
            callback(self.0.user_data);
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
/// ### English
/// Embedder-provided monotonic clock, normally the same time base as the vsync timestamps
/// passed to `xian_frame_exchange_acquire_buffer` (e.g. `CLOCK_MONOTONIC`).
///
/// ### 中文
/// 宿主提供的单调时钟，通常与传给 `xian_frame_exchange_acquire_buffer` 的 vsync 时间戳
/// 使用同一时间基准（例如 `CLOCK_MONOTONIC`）。
pub struct XianFrameExchangeClock {
    pub user_data: *mut c_void,
    pub now_ns: Option<extern "C" fn(user_data: *mut c_void) -> i64>,
}

struct CallbackClock {
    user_data: *mut c_void,
    now_ns: extern "C" fn(user_data: *mut c_void) -> i64,
}

unsafe impl Send for CallbackClock {}
unsafe impl Sync for CallbackClock {}

impl MonotonicClock for CallbackClock {
    fn now_ns(&self) -> Nsecs {
        (self.now_ns)(self.user_data)
    }
}

struct CallbackAllocator(XianFrameExchangeAllocator);

unsafe impl Send for CallbackAllocator {}
unsafe impl Sync for CallbackAllocator {}

impl BufferAllocator for CallbackAllocator {
    fn allocate(&self, size: PhysicalSize<u32>, format: u32, usage: u32) -> Result<GraphicBuffer> {
        let Some(allocate) = self.0.allocate else {
            return Err(ExchangeError::NoMemory);
        };
        let mut native_handle = 0u64;
        let status = allocate(
            self.0.user_data,
            size.width,
            size.height,
            format,
            usage,
            &mut native_handle,
        );
        if status != XIAN_FRAME_EXCHANGE_OK || native_handle == 0 {
            tracing::error!(status, "embedder allocator failed");
            return Err(ExchangeError::NoMemory);
        }
        Ok(GraphicBuffer::with_native_handle(size, format, usage, native_handle))
    }
}

/// ### English
/// Collapses a result into a C status code.
///
/// ### 中文
/// 将结果折叠为 C 状态码。
fn status(result: Result<()>) -> i32 {
    match result {
        Ok(()) => XIAN_FRAME_EXCHANGE_OK,
        Err(err) => err.status_code(),
    }
}

/// ### English
/// Borrows the exchange behind a handle, or `None` for NULL.
///
/// # Safety
/// `exchange` must be NULL or a live pointer returned by `xian_frame_exchange_create`.
///
/// ### 中文
/// 借用句柄背后的交换实例；NULL 时返回 `None`。
///
/// # Safety
/// `exchange` 必须为 NULL 或由 `xian_frame_exchange_create` 返回且仍存活的指针。
unsafe fn exchange_ref<'a>(exchange: *const XianFrameExchange) -> Option<&'a XianFrameExchange> {
    unsafe { exchange.as_ref() }
}

/// ### English
/// Converts an optional NUL-terminated UTF-8 C string. Returns `None` for NULL, invalid UTF-8 or
/// empty strings.
///
/// # Safety
/// `ptr` must be NULL or point to a NUL-terminated string for the duration of the call.
///
/// ### 中文
/// 转换可选的 NUL 结尾 UTF-8 C 字符串；对 NULL、UTF-8 非法或空字符串返回 `None`。
///
/// # Safety
/// `ptr` 在本次调用期间必须为 NULL 或指向以 NUL 结尾的字符串。
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }

    let value = unsafe { CStr::from_ptr(ptr) }.to_str().ok()?;
    if value.is_empty() {
        return None;
    }

    Some(value.to_string())
}
