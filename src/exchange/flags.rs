//! ### English
//! Bitflags accepted by the C ABI connect functions.
//!
//! Passed as a `u32` bitmask; unknown bits are ignored.
//!
//! ### 中文
//! C ABI connect 函数接受的位标志。
//!
//! 以 `u32` 位掩码传入；未知位会被忽略。

/// ### English
/// The consumer is driven by application code rather than a system compositor.
///
/// ### 中文
/// 消费者由应用代码驱动，而不是系统合成器。
pub const XIAN_FRAME_EXCHANGE_FLAG_CONSUMER_CONTROLLED_BY_APP: u32 = 1 << 0;

/// ### English
/// Disable the extra buffer reserved for async producers. Must be passed on the consumer connect
/// call; it is applied before the listener is installed.
///
/// ### 中文
/// 关闭为异步生产者额外保留的缓冲区。必须在消费者 connect 调用时传入；会在安装监听者之前生效。
pub const XIAN_FRAME_EXCHANGE_FLAG_DISABLE_ASYNC_BUFFER: u32 = 1 << 1;

/// ### English
/// The producer is driven by application code.
///
/// ### 中文
/// 生产者由应用代码驱动。
pub const XIAN_FRAME_EXCHANGE_FLAG_PRODUCER_CONTROLLED_BY_APP: u32 = 1 << 2;

/// ### English
/// Async producer: a queued frame that was not acquired yet is replaced by the next one.
///
/// ### 中文
/// 异步生产者：尚未被获取的已 queue 帧会被下一帧替换。
pub const XIAN_FRAME_EXCHANGE_FLAG_PRODUCER_ASYNC: u32 = 1 << 3;

pub(crate) fn has(flags: u32, flag: u32) -> bool {
    flags & flag != 0
}
