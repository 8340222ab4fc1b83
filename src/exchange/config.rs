//! ### English
//! Exchange configuration and table-size constants.
//!
//! The slot count is fixed at compile time so the released-buffer mask fits a `u64`; everything
//! else (acquired ceiling, drop/defer window, defaults) is runtime configuration.
//!
//! ### 中文
//! 交换配置与槽位表尺寸常量。
//!
//! 槽位数量在编译期固定，以便“已释放缓冲区”掩码能放入 `u64`；其余参数（已获取上限、
//! 丢帧/延后窗口、默认值）均为运行时配置。

use std::time::Duration;

use dpi::PhysicalSize;

use super::buffer::PIXEL_FORMAT_RGBA_8888;
use super::error::{ExchangeError, Result};

/// ### English
/// Number of slots in the table.
///
/// ### 中文
/// 槽位表中的槽位数量。
pub const NUM_BUFFER_SLOTS: usize = 64;

/// ### English
/// Upper bound accepted for the max-acquired ceiling (two slots stay reserved for the producer).
///
/// ### 中文
/// 已获取上限可接受的最大值（为生产者保留两个槽位）。
pub const MAX_MAX_ACQUIRED_BUFFERS: usize = NUM_BUFFER_SLOTS - 2;

const DEFAULT_PRESENT_WINDOW: Duration = Duration::from_secs(1);

/// ### English
/// Configuration for one exchange instance.
///
/// ### 中文
/// 单个交换实例的配置。
#[derive(Clone, Debug)]
pub struct ExchangeConfig {
    /// ### English
    /// Name used in log events and `dump()` output.
    ///
    /// ### 中文
    /// 日志事件与 `dump()` 输出中使用的名称。
    pub consumer_name: String,
    /// ### English
    /// Largest value accepted by `set_max_acquired_buffer_count`.
    ///
    /// ### 中文
    /// `set_max_acquired_buffer_count` 可接受的最大值。
    pub max_acquired_ceiling: usize,
    /// ### English
    /// Drop/defer window around the expected present time.
    ///
    /// ### 中文
    /// 预期显示时间前后的丢帧/延后窗口。
    pub present_window: Duration,
    /// ### English
    /// Initial max acquired buffer count.
    ///
    /// ### 中文
    /// 初始的最大已获取缓冲区数量。
    pub max_acquired_buffers: usize,
    /// ### English
    /// Initial default max buffer count (producer-visible capacity).
    ///
    /// ### 中文
    /// 初始的默认最大缓冲区数量（生产者可见容量）。
    pub default_max_buffer_count: usize,
    /// ### English
    /// Size used when the producer dequeues with a 0×0 request.
    ///
    /// ### 中文
    /// 生产者以 0×0 请求 dequeue 时使用的尺寸。
    pub default_size: PhysicalSize<u32>,
    /// ### English
    /// Format used when the producer dequeues with format 0.
    ///
    /// ### 中文
    /// 生产者以格式 0 请求 dequeue 时使用的格式。
    pub default_format: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            consumer_name: String::from("unnamed-consumer"),
            max_acquired_ceiling: MAX_MAX_ACQUIRED_BUFFERS,
            present_window: DEFAULT_PRESENT_WINDOW,
            max_acquired_buffers: 1,
            default_max_buffer_count: 2,
            default_size: PhysicalSize::new(1, 1),
            default_format: PIXEL_FORMAT_RGBA_8888,
        }
    }
}

impl ExchangeConfig {
    pub fn with_consumer_name(mut self, name: impl Into<String>) -> Self {
        self.consumer_name = name.into();
        self
    }

    pub fn with_max_acquired_ceiling(mut self, ceiling: usize) -> Self {
        self.max_acquired_ceiling = ceiling;
        self
    }

    pub fn with_present_window(mut self, window: Duration) -> Self {
        self.present_window = window;
        self
    }

    pub fn with_max_acquired_buffers(mut self, count: usize) -> Self {
        self.max_acquired_buffers = count;
        self
    }

    pub fn with_default_max_buffer_count(mut self, count: usize) -> Self {
        self.default_max_buffer_count = count;
        self
    }

    pub fn with_default_size(mut self, size: PhysicalSize<u32>) -> Self {
        self.default_size = size;
        self
    }

    pub fn with_default_format(mut self, format: u32) -> Self {
        self.default_format = format;
        self
    }

    /// ### English
    /// Checks that every value is inside the range the exchange can honor.
    ///
    /// ### 中文
    /// 检查所有取值都在交换实例可支持的范围内。
    pub fn validate(&self) -> Result<()> {
        if self.max_acquired_ceiling == 0 || self.max_acquired_ceiling > MAX_MAX_ACQUIRED_BUFFERS {
            return Err(ExchangeError::InvalidArgument);
        }
        if self.max_acquired_buffers == 0 || self.max_acquired_buffers > self.max_acquired_ceiling
        {
            return Err(ExchangeError::InvalidArgument);
        }
        if self.default_max_buffer_count == 0 || self.default_max_buffer_count > NUM_BUFFER_SLOTS {
            return Err(ExchangeError::InvalidArgument);
        }
        if self.default_size.width == 0 || self.default_size.height == 0 {
            return Err(ExchangeError::InvalidArgument);
        }
        if self.present_window.is_zero() || self.present_window_nanos() == i64::MAX {
            return Err(ExchangeError::InvalidArgument);
        }
        Ok(())
    }

    /// ### English
    /// Drop/defer window in nanoseconds (saturates at `i64::MAX`).
    ///
    /// ### 中文
    /// 以纳秒表示的丢帧/延后窗口（饱和到 `i64::MAX`）。
    pub fn present_window_nanos(&self) -> i64 {
        i64::try_from(self.present_window.as_nanos()).unwrap_or(i64::MAX)
    }
}
