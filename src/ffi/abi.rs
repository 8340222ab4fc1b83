//! ### English
//! ABI version and status codes.
//!
//! ### 中文
//! ABI 版本号与状态码。

/// ### English
/// C ABI version for `xian_frame_exchange`.
///
/// ### 中文
/// `xian_frame_exchange` 的 C ABI 版本号。
const XIAN_FRAME_EXCHANGE_ABI_VERSION: u32 = 1;

pub const XIAN_FRAME_EXCHANGE_OK: i32 = 0;
pub const XIAN_FRAME_EXCHANGE_INVALID_ARGUMENT: i32 = -1;
pub const XIAN_FRAME_EXCHANGE_INVALID_STATE: i32 = -2;
pub const XIAN_FRAME_EXCHANGE_NOT_INITIALIZED: i32 = -3;
pub const XIAN_FRAME_EXCHANGE_ABORTED: i32 = -4;
pub const XIAN_FRAME_EXCHANGE_OUT_OF_SLOTS: i32 = -5;
pub const XIAN_FRAME_EXCHANGE_NO_MEMORY: i32 = -6;
pub const XIAN_FRAME_EXCHANGE_STALE_SLOT: i32 = -7;
pub const XIAN_FRAME_EXCHANGE_WOULD_BLOCK: i32 = -8;
pub const XIAN_FRAME_EXCHANGE_NOT_READY: i32 = -9;

#[unsafe(no_mangle)]
/// ### English
/// Returns the C ABI version.
///
/// ### 中文
/// 返回 C ABI 版本号。
pub extern "C" fn xian_frame_exchange_abi_version() -> u32 {
    XIAN_FRAME_EXCHANGE_ABI_VERSION
}

#[unsafe(no_mangle)]
/// ### English
/// Returns `1` for statuses callers should treat as normal outcomes (stale slot, would block,
/// not ready), `0` otherwise.
///
/// ### 中文
/// 对调用方应视为正常结果的状态码（stale slot、would block、not ready）返回 `1`，否则返回 `0`。
pub extern "C" fn xian_frame_exchange_status_is_recoverable(status: i32) -> u8 {
    u8::from(matches!(
        status,
        XIAN_FRAME_EXCHANGE_STALE_SLOT
            | XIAN_FRAME_EXCHANGE_WOULD_BLOCK
            | XIAN_FRAME_EXCHANGE_NOT_READY
    ))
}
