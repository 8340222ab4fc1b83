use super::buffer::GraphicBuffer;
use super::clock::Nsecs;
use super::fence::Fence;

/// ### English
/// One pending-queue entry, and the descriptor returned by `acquire_buffer`.
///
/// ### 中文
/// 待取队列中的一个条目，也是 `acquire_buffer` 返回的描述符。
#[derive(Clone, Debug)]
pub struct BufferItem {
    /// ### English
    /// Slot index holding the frame.
    ///
    /// ### 中文
    /// 持有该帧的槽位索引。
    pub slot: usize,
    /// ### English
    /// Frame number assigned when the producer queued the buffer.
    ///
    /// ### 中文
    /// 生产者 queue 时分配的帧号。
    pub frame_number: u64,
    /// ### English
    /// Buffer handle. `None` in an acquired descriptor when the consumer already has it cached.
    ///
    /// ### 中文
    /// 缓冲区句柄。若消费者已缓存该句柄，则 acquire 返回的描述符中为 `None`。
    pub buffer: Option<GraphicBuffer>,
    /// ### English
    /// Fence the consumer must wait on before reading the buffer.
    ///
    /// ### 中文
    /// 消费者读取缓冲区前必须等待的 fence。
    pub fence: Fence,
    /// ### English
    /// Desired presentation time in nanoseconds.
    ///
    /// ### 中文
    /// 期望显示时间（纳秒）。
    pub timestamp: Nsecs,
    /// ### English
    /// Timestamp was generated by the exchange rather than supplied by the producer.
    ///
    /// ### 中文
    /// 时间戳由交换模块自动生成，而非生产者提供。
    pub is_auto_timestamp: bool,
    /// ### English
    /// Snapshot of the slot's `acquire_called` flag when the buffer was queued.
    ///
    /// ### 中文
    /// queue 时槽位 `acquire_called` 标记的快照。
    pub acquire_called: bool,
    pub transform: u32,
    /// ### English
    /// May be replaced by a newer frame before it is acquired (async mode).
    ///
    /// ### 中文
    /// 在被 acquire 之前可被更新的帧替换（异步模式）。
    pub is_droppable: bool,
}
