//! ### English
//! Bounded multi-slot buffer exchange between one producer and one consumer.
//!
//! All shared state (slot table, pending queue, configuration) lives in [`ExchangeCore`] behind a
//! single mutex. [`BufferProducer`] and [`BufferConsumer`] are the two ends handed to the
//! producer thread and the consumer thread respectively.
//!
//! ### 中文
//! 单生产者与单消费者之间的有界多槽位缓冲区交换。
//!
//! 所有共享状态（槽位表、待取队列、配置）都位于 [`ExchangeCore`] 中，由同一把互斥锁保护。
//! [`BufferProducer`] 与 [`BufferConsumer`] 分别交给生产者线程与消费者线程使用。
mod buffer;
mod clock;
mod config;
mod consumer;
mod error;
mod fence;
pub mod flags;
mod item;
mod listener;
mod policy;
mod producer;
mod queue;
mod shared_state;
mod slot;

use std::sync::Arc;

pub use buffer::{BufferAllocator, GraphicBuffer, HeapBufferAllocator, PIXEL_FORMAT_RGBA_8888};
pub use clock::{ManualClock, MonotonicClock, Nsecs, SystemClock};
pub use config::{ExchangeConfig, MAX_MAX_ACQUIRED_BUFFERS, NUM_BUFFER_SLOTS};
pub use consumer::BufferConsumer;
pub use error::{ExchangeError, Result};
pub use fence::{Fence, ReleaseSync};
pub use item::BufferItem;
pub use listener::{
    ChannelConsumerListener, ChannelProducerListener, ConsumerEvent, ConsumerListener,
    ProducerEvent, ProducerListener,
};
pub use producer::{
    BufferProducer, ConnectedApi, DequeueOutput, DequeueRequest, QueueBufferInput,
    QueueBufferOutput,
};
pub use shared_state::ExchangeCore;
pub use slot::SlotState;

/// ### English
/// Entry point that builds one exchange instance and splits it into its producer and consumer ends.
///
/// ### 中文
/// 构建一个交换实例并拆分为生产者端与消费者端的入口。
pub struct BufferExchange;

impl BufferExchange {
    /// ### English
    /// Creates an exchange with the system monotonic clock and the heap allocator.
    ///
    /// #### Parameters
    /// - `config`: Exchange configuration; validated before anything is allocated.
    ///
    /// ### 中文
    /// 使用系统单调时钟与堆分配器创建交换实例。
    ///
    /// #### 参数
    /// - `config`：交换配置；在分配任何资源前先校验。
    pub fn create(config: ExchangeConfig) -> Result<(BufferProducer, BufferConsumer)> {
        Self::with_collaborators(
            config,
            Arc::new(SystemClock::new()),
            Arc::new(HeapBufferAllocator),
        )
    }

    /// ### English
    /// Creates an exchange with an explicit clock and buffer allocator.
    ///
    /// ### 中文
    /// 使用显式提供的时钟与缓冲区分配器创建交换实例。
    pub fn with_collaborators(
        config: ExchangeConfig,
        clock: Arc<dyn MonotonicClock>,
        allocator: Arc<dyn BufferAllocator>,
    ) -> Result<(BufferProducer, BufferConsumer)> {
        config.validate()?;
        let core = Arc::new(ExchangeCore::new(config, clock, allocator));
        Ok((
            BufferProducer::new(core.clone()),
            BufferConsumer::new(core),
        ))
    }
}
