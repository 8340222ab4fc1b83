//! ### English
//! Render-thread collaborator: a time-ordered task queue and the worker thread that drains it.
//!
//! The exchange never depends on this module; it is the scheduling side a consumer uses to run
//! frame work (acquire, draw, release) at the right time.
//!
//! ### 中文
//! 渲染线程协作模块：按时间排序的任务队列以及消费该队列的工作线程。
//!
//! 交换模块本身不依赖此模块；消费者用它在合适的时间执行帧相关工作（acquire、绘制、release）。

mod render_thread;
mod task_queue;

use thiserror::Error;

pub use render_thread::{RenderTask, RenderThread};
pub use task_queue::{TaskId, TaskQueue};

/// ### English
/// Errors reported by the task queue and the render thread.
///
/// ### 中文
/// 任务队列与渲染线程返回的错误。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    #[error("task {0:?} is already in the queue")]
    AlreadyQueued(TaskId),
    #[error("task {0:?} is not in the queue")]
    NotQueued(TaskId),
    #[error("render thread has shut down")]
    Shutdown,
    #[error("failed to spawn the render thread")]
    Spawn,
    #[error("operation would block the render thread on itself")]
    OnRenderThread,
}

pub type Result<T> = std::result::Result<T, RenderError>;
