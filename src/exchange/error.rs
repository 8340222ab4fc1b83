//! ### English
//! Error taxonomy shared by every exchange operation.
//!
//! `StaleSlot`, `WouldBlock` and `NotReady` are expected outcomes of normal operation; every other
//! variant reports a protocol violation by the caller.
//!
//! ### 中文
//! 所有交换操作共用的错误分类。
//!
//! `StaleSlot`、`WouldBlock` 与 `NotReady` 属于正常运行中的预期结果；其余变体表示调用方违反了协议。

use thiserror::Error;

/// ### English
/// Result alias used across the exchange.
///
/// ### 中文
/// 交换模块通用的 Result 别名。
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// ### English
/// Discrete failure codes returned synchronously by exchange operations.
///
/// ### 中文
/// 交换操作同步返回的离散错误码。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeError {
    /// ### English
    /// Malformed input: null, out of range or zero.
    ///
    /// ### 中文
    /// 非法输入：空值、越界或为 0。
    #[error("invalid argument")]
    InvalidArgument,
    /// ### English
    /// Operation not permitted with the current connection or capacity configuration.
    ///
    /// ### 中文
    /// 当前连接/容量配置下不允许该操作。
    #[error("operation not permitted in the current state")]
    InvalidState,
    /// ### English
    /// The exchange was abandoned, or a required connection is missing.
    ///
    /// ### 中文
    /// 交换已被废弃，或缺少必需的连接。
    #[error("buffer exchange is abandoned or not connected")]
    NotInitialized,
    /// ### English
    /// The acquired-buffer limit would be exceeded.
    ///
    /// ### 中文
    /// 将超出已获取缓冲区数量上限。
    #[error("max acquired buffer count reached")]
    Aborted,
    /// ### English
    /// No free slot to attach a buffer into.
    ///
    /// ### 中文
    /// 没有可用于 attach 的空闲槽位。
    #[error("no free buffer slot")]
    OutOfSlots,
    /// ### English
    /// No free slot found by a slot-table scan.
    ///
    /// ### 中文
    /// 槽位表扫描未找到空闲槽位。
    #[error("out of memory: no free slot in table")]
    NoMemory,
    /// ### English
    /// Frame number mismatch, or the slot was already reclaimed. Treat as a no-op.
    ///
    /// ### 中文
    /// 帧号不匹配或槽位已被回收；调用方应视为无操作。
    #[error("stale buffer slot")]
    StaleSlot,
    /// ### English
    /// Nothing is available right now (empty pending queue, no free slot without blocking).
    ///
    /// ### 中文
    /// 当前无可用内容（待取队列为空，或非阻塞模式下无空闲槽位）。
    #[error("no buffer available")]
    WouldBlock,
    /// ### English
    /// The head buffer should be presented later than the expected present time.
    ///
    /// ### 中文
    /// 队首缓冲区的期望显示时间晚于预期显示时间，应稍后再取。
    #[error("buffer not ready: present later")]
    NotReady,
}

impl ExchangeError {
    /// ### English
    /// Returns whether this error is an expected, recoverable outcome.
    ///
    /// ### 中文
    /// 返回该错误是否属于预期且可恢复的结果。
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::StaleSlot | Self::WouldBlock | Self::NotReady)
    }

    /// ### English
    /// Stable status code used by the C ABI (always negative).
    ///
    /// ### 中文
    /// C ABI 使用的稳定状态码（总为负数）。
    pub fn status_code(self) -> i32 {
        match self {
            Self::InvalidArgument => -1,
            Self::InvalidState => -2,
            Self::NotInitialized => -3,
            Self::Aborted => -4,
            Self::OutOfSlots => -5,
            Self::NoMemory => -6,
            Self::StaleSlot => -7,
            Self::WouldBlock => -8,
            Self::NotReady => -9,
        }
    }
}
