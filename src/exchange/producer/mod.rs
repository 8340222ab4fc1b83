//! ### English
//! Producer end of the exchange.
//!
//! The producer dequeues a free slot, renders into its buffer, then queues it for the consumer.
//! Dequeue may block on the exchange condition variable; buffer allocation and listener calls
//! happen with the lock released.
//!
//! ### 中文
//! 交换的生产者端。
//!
//! 生产者 dequeue 一个空闲槽位，向其缓冲区渲染，然后 queue 给消费者。dequeue 可能在交换的条件
//! 变量上阻塞；缓冲区分配与监听者调用都在释放锁之后进行。

mod connection;
mod dequeue;
mod queue;

use std::sync::Arc;
use std::time::Duration;

use dpi::PhysicalSize;

use super::clock::Nsecs;
use super::fence::Fence;
use super::shared_state::ExchangeCore;

/// ### English
/// Client API the producer connected with.
///
/// ### 中文
/// 生产者连接时使用的客户端 API。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectedApi {
    Egl,
    Cpu,
    Media,
    Camera,
}

impl ConnectedApi {
    /// ### English
    /// Parses the C ABI value (`1..=4`).
    ///
    /// ### 中文
    /// 解析 C ABI 取值（`1..=4`）。
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Egl),
            2 => Some(Self::Cpu),
            3 => Some(Self::Media),
            4 => Some(Self::Camera),
            _ => None,
        }
    }
}

/// ### English
/// Parameters of one dequeue.
///
/// Zero width/height/format fall back to the consumer's defaults.
///
/// ### 中文
/// 单次 dequeue 的参数。
///
/// 宽/高/格式为 0 时使用消费者设置的默认值。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DequeueRequest {
    pub size: PhysicalSize<u32>,
    pub format: u32,
    pub usage: u32,
    /// ### English
    /// Upper bound for blocking; `None` waits indefinitely.
    ///
    /// ### 中文
    /// 阻塞的上限；`None` 表示无限等待。
    pub timeout: Option<Duration>,
}

impl DequeueRequest {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = PhysicalSize::new(width, height);
        self
    }

    pub fn with_format(mut self, format: u32) -> Self {
        self.format = format;
        self
    }

    pub fn with_usage(mut self, usage: u32) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// ### English
/// Result of a successful dequeue.
///
/// ### 中文
/// dequeue 成功后的结果。
#[derive(Clone, Debug)]
pub struct DequeueOutput {
    pub slot: usize,
    /// ### English
    /// Release fence left by the consumer; wait on it before writing.
    ///
    /// ### 中文
    /// 消费者留下的 release fence；写入前需等待。
    pub fence: Fence,
    /// ### English
    /// The slot got a new buffer; call `request_buffer` to fetch it.
    ///
    /// ### 中文
    /// 槽位获得了新缓冲区；需调用 `request_buffer` 获取。
    pub reallocated: bool,
}

/// ### English
/// Per-frame data submitted with `queue_buffer`.
///
/// ### 中文
/// 随 `queue_buffer` 提交的逐帧数据。
#[derive(Clone, Debug, Default)]
pub struct QueueBufferInput {
    /// ### English
    /// Desired presentation time; `None` stamps the frame with the current clock value.
    ///
    /// ### 中文
    /// 期望显示时间；`None` 表示使用当前时钟值自动打时间戳。
    pub timestamp: Option<Nsecs>,
    pub fence: Fence,
    pub transform: u32,
}

impl QueueBufferInput {
    pub fn at(timestamp: Nsecs) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }

    pub fn with_fence(mut self, fence: Fence) -> Self {
        self.fence = fence;
        self
    }
}

/// ### English
/// State reported back to the producer on connect and after each queue.
///
/// ### 中文
/// 在 connect 以及每次 queue 之后返回给生产者的状态。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueBufferOutput {
    pub default_size: PhysicalSize<u32>,
    pub transform_hint: u32,
    pub pending_buffers: usize,
}

/// ### English
/// Handle used by the producer thread. Cloning shares the same exchange.
///
/// ### 中文
/// 供生产者线程使用的句柄；克隆后共享同一个交换实例。
#[derive(Clone)]
pub struct BufferProducer {
    core: Arc<ExchangeCore>,
}

impl BufferProducer {
    pub(crate) fn new(core: Arc<ExchangeCore>) -> Self {
        Self { core }
    }

    pub fn core(&self) -> &ExchangeCore {
        &self.core
    }
}
