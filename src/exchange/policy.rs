//! ### English
//! Presentation-time drop/defer policy evaluated by `acquire_buffer`.
//!
//! Given the expected present time `E` and a window `W`:
//! - The head is obsolete when the *second* entry (not auto-timestamped) wants to be shown inside
//!   `[E - W, E]`: it is due now, so showing the head first would only add latency.
//! - The head is deferred when it wants to be shown inside `(E, E + W)`.
//! - Timestamps outside the window are treated as "ignore timestamp, acquire immediately", so a
//!   bogus value (e.g. 0) never starves the consumer.
//!
//! ### 中文
//! `acquire_buffer` 使用的基于显示时间的丢帧/延后策略。
//!
//! 给定预期显示时间 `E` 与窗口 `W`：
//! - 若*第二个*条目（非自动时间戳）希望在 `[E - W, E]` 内显示，则队首已过时：第二帧已到期，
//!   先显示队首只会增加延迟。
//! - 若队首希望在 `(E, E + W)` 内显示，则延后获取。
//! - 窗口外的时间戳视为“忽略时间戳、立即获取”，因此异常值（例如 0）不会饿死消费者。

use super::clock::Nsecs;
use super::item::BufferItem;
use super::queue::PendingQueue;

/// ### English
/// Decision for the (possibly advanced) queue head.
///
/// ### 中文
/// 针对（可能已前移的）队首作出的决定。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HeadDecision {
    Accept,
    Defer,
}

/// ### English
/// Returns whether the head should be dropped in favor of `next` (the second entry).
///
/// ### 中文
/// 返回是否应丢弃队首、改用 `next`（第二个条目）。
pub(crate) fn next_supersedes_head(
    next: &BufferItem,
    expected_present: Nsecs,
    window: Nsecs,
) -> bool {
    if next.is_auto_timestamp {
        return false;
    }
    let desired = next.timestamp;
    desired >= expected_present.saturating_sub(window) && desired <= expected_present
}

pub(crate) fn head_decision(
    head: &BufferItem,
    expected_present: Nsecs,
    window: Nsecs,
) -> HeadDecision {
    let desired = head.timestamp;
    if desired > expected_present && desired < expected_present.saturating_add(window) {
        HeadDecision::Defer
    } else {
        HeadDecision::Accept
    }
}

/// ### English
/// Returns whether the queue head should be dropped right now.
///
/// ### 中文
/// 返回当前是否应丢弃队首。
pub(crate) fn should_drop_head(
    queue: &PendingQueue,
    expected_present: Nsecs,
    window: Nsecs,
) -> bool {
    queue.len() > 1
        && queue
            .get(1)
            .is_some_and(|next| next_supersedes_head(next, expected_present, window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::fence::Fence;

    const SECOND: Nsecs = 1_000_000_000;

    fn item(slot: usize, timestamp: Nsecs, auto: bool) -> BufferItem {
        BufferItem {
            slot,
            frame_number: slot as u64 + 1,
            buffer: None,
            fence: Fence::NO_FENCE,
            timestamp,
            is_auto_timestamp: auto,
            acquire_called: false,
            transform: 0,
            is_droppable: false,
        }
    }

    fn queue_of(timestamps: &[Nsecs]) -> PendingQueue {
        let mut queue = PendingQueue::new();
        for (slot, &ts) in timestamps.iter().enumerate() {
            queue.push_back(item(slot, ts, false));
        }
        queue
    }

    #[test]
    fn future_second_entry_keeps_the_head() {
        let queue = queue_of(&[100, 150, 4_000_000_000]);
        assert!(!should_drop_head(&queue, 140, SECOND));
        let head = queue.front().unwrap();
        assert_eq!(head_decision(head, 140, SECOND), HeadDecision::Accept);
    }

    #[test]
    fn due_second_entry_drops_the_head() {
        let queue = queue_of(&[100, 130, 4_000_000_000]);
        assert!(should_drop_head(&queue, 140, SECOND));
    }

    #[test]
    fn window_edges_are_inclusive_for_dropping() {
        let expected = 5 * SECOND;
        assert!(next_supersedes_head(&item(1, expected, false), expected, SECOND));
        assert!(next_supersedes_head(
            &item(1, expected - SECOND, false),
            expected,
            SECOND
        ));
        assert!(!next_supersedes_head(
            &item(1, expected - SECOND - 1, false),
            expected,
            SECOND
        ));
        assert!(!next_supersedes_head(&item(1, expected + 1, false), expected, SECOND));
    }

    #[test]
    fn garbage_timestamps_never_drop() {
        let expected = 10 * SECOND;
        assert!(!next_supersedes_head(&item(1, 0, false), expected, SECOND));
        assert!(!next_supersedes_head(&item(1, 12, false), expected, SECOND));
    }

    #[test]
    fn auto_timestamped_second_entry_never_drops() {
        let mut queue = PendingQueue::new();
        queue.push_back(item(0, 100, false));
        queue.push_back(item(1, 130, true));
        assert!(!should_drop_head(&queue, 140, SECOND));
    }

    #[test]
    fn single_entry_is_never_dropped() {
        let queue = queue_of(&[10]);
        assert!(!should_drop_head(&queue, 140, SECOND));
    }

    #[test]
    fn head_inside_the_future_window_is_deferred() {
        let expected = 2 * SECOND;
        assert_eq!(
            head_decision(&item(0, expected + 1, false), expected, SECOND),
            HeadDecision::Defer
        );
        assert_eq!(
            head_decision(&item(0, expected + SECOND - 1, false), expected, SECOND),
            HeadDecision::Defer
        );
        assert_eq!(
            head_decision(&item(0, expected + SECOND, false), expected, SECOND),
            HeadDecision::Accept
        );
        assert_eq!(
            head_decision(&item(0, expected, false), expected, SECOND),
            HeadDecision::Accept
        );
    }
}
