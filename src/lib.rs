/// ### English
/// `xian_frame_exchange` crate root.
/// The buffer exchange core lives under `exchange`, the render-thread collaborator under `render`,
/// and the C ABI is exposed via `ffi`.
///
/// ### 中文
/// `xian_frame_exchange` 的 crate 根。
/// 缓冲区交换核心位于 `exchange`，渲染线程协作模块位于 `render`，C ABI 通过 `ffi` 导出。
pub mod exchange;
pub mod ffi;
pub mod render;

pub use exchange::{
    BufferAllocator, BufferConsumer, BufferExchange, BufferItem, BufferProducer, ConnectedApi,
    ConsumerListener, DequeueRequest, ExchangeConfig, ExchangeError, Fence, GraphicBuffer,
    MonotonicClock, ProducerListener, QueueBufferInput, Result,
};
