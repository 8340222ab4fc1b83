//! ### English
//! Worker thread draining a [`TaskQueue`] of boxed closures.
//!
//! One instance per owner; there is no global render thread. The owner constructs it, hands
//! `&RenderThread` (or an `Arc`) to dependents, and dropping it shuts the worker down and joins.
//!
//! ### 中文
//! 消费 [`TaskQueue`] 中闭包任务的工作线程。
//!
//! 每个持有者一个实例，不存在全局渲染线程。持有者负责构造，并把 `&RenderThread`（或 `Arc`）
//! 传给依赖方；drop 时关闭工作线程并 join。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use std::time::Duration;

use crossbeam_channel as channel;
use parking_lot::Mutex;

use super::task_queue::{TaskId, TaskQueue};
use super::{RenderError, Result};
use crate::exchange::{MonotonicClock, Nsecs};

/// ### English
/// Unit of work executed on the render thread.
///
/// ### 中文
/// 在渲染线程上执行的工作单元。
pub type RenderTask = Box<dyn FnOnce() + Send + 'static>;

enum RenderMsg {
    Queue {
        id: TaskId,
        run_at: Nsecs,
        task: RenderTask,
    },
    QueueAtFront {
        id: TaskId,
        task: RenderTask,
    },
    Remove {
        id: TaskId,
        reply: channel::Sender<Result<()>>,
    },
    Shutdown,
}

pub struct RenderThread {
    tx: channel::Sender<RenderMsg>,
    next_id: AtomicU64,
    clock: Arc<dyn MonotonicClock>,
    worker_id: ThreadId,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl RenderThread {
    /// ### English
    /// Spawns the worker thread.
    ///
    /// #### Parameters
    /// - `name`: OS thread name.
    /// - `clock`: Time source for delayed tasks.
    ///
    /// ### 中文
    /// 启动工作线程。
    ///
    /// #### 参数
    /// - `name`：操作系统线程名。
    /// - `clock`：延迟任务使用的时间源。
    pub fn new(name: &str, clock: Arc<dyn MonotonicClock>) -> Result<Self> {
        let (tx, rx) = channel::unbounded::<RenderMsg>();
        let worker_clock = clock.clone();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_render_loop(rx, worker_clock))
            .map_err(|err| {
                tracing::error!(error = %err, "failed to spawn render thread");
                RenderError::Spawn
            })?;
        let worker_id = thread.thread().id();
        tracing::debug!(name, "render thread started");

        Ok(Self {
            tx,
            next_id: AtomicU64::new(1),
            clock,
            worker_id,
            thread: Mutex::new(Some(thread)),
        })
    }

    fn allocate_id(&self) -> TaskId {
        TaskId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn send(&self, msg: RenderMsg) -> Result<()> {
        self.tx.send(msg).map_err(|_| RenderError::Shutdown)
    }

    /// ### English
    /// Runs `task` as soon as every earlier-due task has run.
    ///
    /// ### 中文
    /// 在所有更早到期的任务执行完后尽快执行 `task`。
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> Result<TaskId> {
        self.post_at(self.clock.now_ns(), Box::new(task))
    }

    pub fn post_delayed(
        &self,
        task: impl FnOnce() + Send + 'static,
        delay: Duration,
    ) -> Result<TaskId> {
        let delay = Nsecs::try_from(delay.as_nanos()).unwrap_or(Nsecs::MAX);
        let run_at = self.clock.now_ns().saturating_add(delay);
        self.post_at(run_at, Box::new(task))
    }

    fn post_at(&self, run_at: Nsecs, task: RenderTask) -> Result<TaskId> {
        let id = self.allocate_id();
        self.send(RenderMsg::Queue { id, run_at, task })?;
        Ok(id)
    }

    /// ### English
    /// Runs `task` before anything already queued.
    ///
    /// ### 中文
    /// 在所有已入队任务之前执行 `task`。
    pub fn post_at_front(&self, task: impl FnOnce() + Send + 'static) -> Result<TaskId> {
        let id = self.allocate_id();
        self.send(RenderMsg::QueueAtFront {
            id,
            task: Box::new(task),
        })?;
        Ok(id)
    }

    /// ### English
    /// Cancels a task that has not started yet.
    ///
    /// #### Errors
    /// - `NotQueued`: the task already ran or was removed.
    /// - `OnRenderThread`: called from a task running on this render thread.
    /// - `Shutdown`: the worker is gone.
    ///
    /// ### 中文
    /// 取消一个尚未开始执行的任务。
    ///
    /// #### 错误
    /// - `NotQueued`：任务已执行或已被移除。
    /// - `OnRenderThread`：在本渲染线程上运行的任务中调用。
    /// - `Shutdown`：工作线程已退出。
    pub fn remove(&self, id: TaskId) -> Result<()> {
        if thread::current().id() == self.worker_id {
            return Err(RenderError::OnRenderThread);
        }
        let (reply, response) = channel::bounded(1);
        self.send(RenderMsg::Remove { id, reply })?;
        response.recv().map_err(|_| RenderError::Shutdown)?
    }

    /// ### English
    /// Stops the worker after the task it is currently running, dropping pending tasks, and joins.
    ///
    /// ### 中文
    /// 在当前正在执行的任务结束后停止工作线程（丢弃待执行任务）并 join。
    pub fn shutdown(&self) {
        let Some(thread) = self.thread.lock().take() else {
            return;
        };
        let _ = self.tx.send(RenderMsg::Shutdown);
        if thread.thread().id() != thread::current().id() {
            let _ = thread.join();
        }
        tracing::debug!("render thread stopped");
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_render_loop(rx: channel::Receiver<RenderMsg>, clock: Arc<dyn MonotonicClock>) {
    let mut queue: TaskQueue<RenderTask> = TaskQueue::new();

    loop {
        while let Some((id, task)) = queue.next_due(clock.now_ns()) {
            tracing::trace!(task = id.0, "running render task");
            task();
        }

        let timeout = queue.next_wakeup().map(|run_at| {
            let wait = run_at.saturating_sub(clock.now_ns()).max(0);
            Duration::from_nanos(u64::try_from(wait).unwrap_or(0))
        });

        let msg = match timeout {
            Some(timeout) => match rx.recv_timeout(timeout) {
                Ok(msg) => Some(msg),
                Err(channel::RecvTimeoutError::Timeout) => None,
                Err(channel::RecvTimeoutError::Disconnected) => return,
            },
            None => match rx.recv() {
                Ok(msg) => Some(msg),
                Err(channel::RecvError) => return,
            },
        };

        let Some(msg) = msg else {
            continue;
        };

        // Apply everything already sent so front-queued tasks overtake earlier posts.
        for msg in std::iter::once(msg).chain(rx.try_iter()) {
            if !apply_msg(&mut queue, msg) {
                return;
            }
        }
    }
}

/// Returns `false` on shutdown.
fn apply_msg(queue: &mut TaskQueue<RenderTask>, msg: RenderMsg) -> bool {
    let outcome = match msg {
        RenderMsg::Queue { id, run_at, task } => queue.queue(id, run_at, task),
        RenderMsg::QueueAtFront { id, task } => queue.queue_at_front(id, task),
        RenderMsg::Remove { id, reply } => {
            let _ = reply.send(queue.remove(id).map(drop));
            Ok(())
        }
        RenderMsg::Shutdown => return false,
    };
    if let Err(err) = outcome {
        tracing::error!(error = %err, "render task rejected");
    }
    true
}
