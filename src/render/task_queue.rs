//! ### English
//! Ordered task container keyed by run time.
//!
//! Tasks with equal run times keep insertion order. Tasks queued at the front run before every
//! timed task, most recent first.
//!
//! ### 中文
//! 以执行时间为键的有序任务容器。
//!
//! 执行时间相同的任务保持插入顺序；插到队首的任务先于所有定时任务执行，且最近插入者最先执行。

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use super::{RenderError, Result};
use crate::exchange::Nsecs;

/// ### English
/// Identity of a queued task.
///
/// ### 中文
/// 已入队任务的标识。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

/// ### English
/// `(run_at, sequence)`; front tasks use `Nsecs::MIN` and a negative, decreasing sequence.
///
/// ### 中文
/// `(run_at, sequence)`；队首任务使用 `Nsecs::MIN` 与递减的负序号。
type TaskKey = (Nsecs, i64);

pub struct TaskQueue<T> {
    ordered: BTreeMap<TaskKey, (TaskId, T)>,
    keys: HashMap<TaskId, TaskKey>,
    next_back: i64,
    next_front: i64,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            ordered: BTreeMap::new(),
            keys: HashMap::new(),
            next_back: 0,
            next_front: -1,
        }
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.keys.contains_key(&id)
    }

    /// ### English
    /// Inserts `task` after every task whose run time is `<= run_at`.
    ///
    /// #### Errors
    /// - `AlreadyQueued`: `id` is already present.
    ///
    /// ### 中文
    /// 将 `task` 插入到所有执行时间 `<= run_at` 的任务之后。
    ///
    /// #### 错误
    /// - `AlreadyQueued`：`id` 已在队列中。
    pub fn queue(&mut self, id: TaskId, run_at: Nsecs, task: T) -> Result<()> {
        if self.contains(id) {
            return Err(RenderError::AlreadyQueued(id));
        }
        let key = (run_at, self.next_back);
        self.next_back += 1;
        self.insert(key, id, task);
        Ok(())
    }

    /// ### English
    /// Inserts `task` ahead of everything currently queued.
    ///
    /// ### 中文
    /// 将 `task` 插入到当前所有任务之前。
    pub fn queue_at_front(&mut self, id: TaskId, task: T) -> Result<()> {
        if self.contains(id) {
            return Err(RenderError::AlreadyQueued(id));
        }
        let key = (Nsecs::MIN, self.next_front);
        self.next_front -= 1;
        self.insert(key, id, task);
        Ok(())
    }

    fn insert(&mut self, key: TaskKey, id: TaskId, task: T) {
        self.keys.insert(id, key);
        self.ordered.insert(key, (id, task));
    }

    /// ### English
    /// Removes a queued task and returns it.
    ///
    /// #### Errors
    /// - `NotQueued`: `id` is not present.
    ///
    /// ### 中文
    /// 移除并返回一个已入队的任务。
    ///
    /// #### 错误
    /// - `NotQueued`：`id` 不在队列中。
    pub fn remove(&mut self, id: TaskId) -> Result<T> {
        let key = self.keys.remove(&id).ok_or(RenderError::NotQueued(id))?;
        self.ordered
            .remove(&key)
            .map(|(_, task)| task)
            .ok_or(RenderError::NotQueued(id))
    }

    /// ### English
    /// Head of the queue without removing it: `(id, run_at, task)`.
    ///
    /// ### 中文
    /// 查看队首但不移除：`(id, run_at, task)`。
    pub fn peek(&self) -> Option<(TaskId, Nsecs, &T)> {
        self.ordered
            .iter()
            .next()
            .map(|(&(run_at, _), (id, task))| (*id, run_at, task))
    }

    pub fn next(&mut self) -> Option<(TaskId, T)> {
        let (_, (id, task)) = self.ordered.pop_first()?;
        self.keys.remove(&id);
        Some((id, task))
    }

    /// ### English
    /// Pops the head only if its run time is `<= now`.
    ///
    /// ### 中文
    /// 仅当队首执行时间 `<= now` 时弹出队首。
    pub fn next_due(&mut self, now: Nsecs) -> Option<(TaskId, T)> {
        match self.peek() {
            Some((_, run_at, _)) if run_at <= now => self.next(),
            _ => None,
        }
    }

    /// ### English
    /// Run time of the head, if any.
    ///
    /// ### 中文
    /// 队首的执行时间（若存在）。
    pub fn next_wakeup(&self) -> Option<Nsecs> {
        self.peek().map(|(_, run_at, _)| run_at)
    }

    pub fn clear(&mut self) {
        self.ordered.clear();
        self.keys.clear();
    }

    pub fn dump(&self, now: Nsecs) -> String {
        let mut out = String::from("TaskQueue:\n");
        if self.ordered.is_empty() {
            out.push_str("  empty\n");
            return out;
        }
        for (&(run_at, _), (id, _)) in &self.ordered {
            if run_at == Nsecs::MIN {
                let _ = writeln!(out, "  task {} at front", id.0);
            } else {
                let _ = writeln!(out, "  task {} runs in {}ns", id.0, run_at.saturating_sub(now));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &mut TaskQueue<&'static str>) -> Vec<&'static str> {
        std::iter::from_fn(|| queue.next().map(|(_, task)| task)).collect()
    }

    #[test]
    fn orders_by_run_time_then_insertion() {
        let mut queue = TaskQueue::new();
        queue.queue(TaskId(1), 30, "c").unwrap();
        queue.queue(TaskId(2), 10, "a").unwrap();
        queue.queue(TaskId(3), 30, "d").unwrap();
        queue.queue(TaskId(4), 20, "b").unwrap();

        assert_eq!(drain(&mut queue), ["a", "b", "c", "d"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn front_tasks_run_first_most_recent_first() {
        let mut queue = TaskQueue::new();
        queue.queue(TaskId(1), 0, "timed").unwrap();
        queue.queue_at_front(TaskId(2), "front-1").unwrap();
        queue.queue_at_front(TaskId(3), "front-2").unwrap();

        assert_eq!(drain(&mut queue), ["front-2", "front-1", "timed"]);
    }

    #[test]
    fn duplicate_and_unknown_ids_are_rejected() {
        let mut queue = TaskQueue::new();
        queue.queue(TaskId(7), 5, "x").unwrap();
        assert_eq!(
            queue.queue(TaskId(7), 9, "y"),
            Err(RenderError::AlreadyQueued(TaskId(7)))
        );
        assert_eq!(
            queue.queue_at_front(TaskId(7), "z"),
            Err(RenderError::AlreadyQueued(TaskId(7)))
        );
        assert_eq!(queue.remove(TaskId(8)), Err(RenderError::NotQueued(TaskId(8))));

        assert_eq!(queue.remove(TaskId(7)), Ok("x"));
        assert!(!queue.contains(TaskId(7)));
        queue.queue(TaskId(7), 9, "again").unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn next_due_respects_the_clock() {
        let mut queue = TaskQueue::new();
        queue.queue(TaskId(1), 100, "late").unwrap();

        assert_eq!(queue.next_wakeup(), Some(100));
        assert!(queue.next_due(99).is_none());
        assert_eq!(queue.next_due(100), Some((TaskId(1), "late")));
        assert_eq!(queue.next_wakeup(), None);
    }

    #[test]
    fn removing_from_the_middle_keeps_order() {
        let mut queue = TaskQueue::new();
        for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
            queue.queue(TaskId(id), id as Nsecs, name).unwrap();
        }
        queue.remove(TaskId(2)).unwrap();

        assert!(queue.dump(0).contains("task 3"));
        assert_eq!(drain(&mut queue), ["a", "c"]);
    }
}
