//! ### English
//! Opaque graphics buffer handles and the allocator collaborator.
//!
//! A [`GraphicBuffer`] is a reference-counted handle: the slot table, pending-queue entries and the
//! consumer all share the same underlying resource and compare it by identity.
//!
//! ### 中文
//! 不透明图形缓冲区句柄与分配器协作接口。
//!
//! [`GraphicBuffer`] 是引用计数句柄：槽位表、待取队列条目与消费者共享同一底层资源，并按身份比较。

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dpi::PhysicalSize;

use super::error::Result;

/// ### English
/// 32-bit RGBA pixel format identifier (the default buffer format).
///
/// ### 中文
/// 32 位 RGBA 像素格式标识（默认缓冲区格式）。
pub const PIXEL_FORMAT_RGBA_8888: u32 = 1;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

struct BufferInner {
    id: u64,
    size: PhysicalSize<u32>,
    format: u32,
    usage: u32,
    native_handle: u64,
}

/// ### English
/// Shared handle to one graphics buffer resource.
///
/// ### 中文
/// 指向单个图形缓冲区资源的共享句柄。
#[derive(Clone)]
pub struct GraphicBuffer {
    inner: Arc<BufferInner>,
}

impl GraphicBuffer {
    /// ### English
    /// Creates a buffer handle without a platform-native handle.
    ///
    /// ### 中文
    /// 创建一个不带平台原生句柄的缓冲区句柄。
    pub fn new(size: PhysicalSize<u32>, format: u32, usage: u32) -> Self {
        Self::with_native_handle(size, format, usage, 0)
    }

    /// ### English
    /// Wraps a platform-native handle (e.g. a dma-buf fd or texture name cast to `u64`).
    ///
    /// ### 中文
    /// 包装一个平台原生句柄（例如 dma-buf fd 或纹理名，转为 `u64`）。
    pub fn with_native_handle(
        size: PhysicalSize<u32>,
        format: u32,
        usage: u32,
        native_handle: u64,
    ) -> Self {
        Self {
            inner: Arc::new(BufferInner {
                id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
                size,
                format,
                usage,
                native_handle,
            }),
        }
    }

    /// ### English
    /// Process-unique identity of the underlying resource.
    ///
    /// ### 中文
    /// 底层资源在进程内唯一的身份标识。
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.inner.size
    }

    pub fn format(&self) -> u32 {
        self.inner.format
    }

    pub fn usage(&self) -> u32 {
        self.inner.usage
    }

    pub fn native_handle(&self) -> u64 {
        self.inner.native_handle
    }

    /// ### English
    /// Returns whether the buffer satisfies a dequeue request without reallocation.
    ///
    /// ### 中文
    /// 返回该缓冲区是否无需重新分配即可满足 dequeue 请求。
    pub(crate) fn matches(&self, size: PhysicalSize<u32>, format: u32, usage: u32) -> bool {
        self.inner.size == size
            && self.inner.format == format
            && (self.inner.usage & usage) == usage
    }

    /// ### English
    /// Number of live handles sharing this resource.
    ///
    /// ### 中文
    /// 共享该资源的存活句柄数量。
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl PartialEq for GraphicBuffer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for GraphicBuffer {}

impl fmt::Debug for GraphicBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicBuffer")
            .field("id", &self.inner.id)
            .field("width", &self.inner.size.width)
            .field("height", &self.inner.size.height)
            .field("format", &self.inner.format)
            .field("usage", &format_args!("{:#x}", self.inner.usage))
            .finish()
    }
}

/// ### English
/// Allocates buffers for the producer side. Called without the exchange lock held.
///
/// ### 中文
/// 为生产者侧分配缓冲区；调用时不持有交换锁。
pub trait BufferAllocator: Send + Sync {
    /// ### English
    /// Allocates one buffer.
    ///
    /// #### Parameters
    /// - `size`: Buffer dimensions (never 0×0).
    /// - `format`: Pixel format (never 0).
    /// - `usage`: Usage bits, already including the consumer usage bits.
    ///
    /// ### 中文
    /// 分配一个缓冲区。
    ///
    /// #### 参数
    /// - `size`：缓冲区尺寸（不会为 0×0）。
    /// - `format`：像素格式（不会为 0）。
    /// - `usage`：用途位，已包含消费者用途位。
    fn allocate(&self, size: PhysicalSize<u32>, format: u32, usage: u32) -> Result<GraphicBuffer>;
}

/// ### English
/// Allocator producing plain handles with no platform backing.
///
/// ### 中文
/// 生成无平台后端的普通句柄的分配器。
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapBufferAllocator;

impl BufferAllocator for HeapBufferAllocator {
    fn allocate(&self, size: PhysicalSize<u32>, format: u32, usage: u32) -> Result<GraphicBuffer> {
        Ok(GraphicBuffer::new(size, format, usage))
    }
}
