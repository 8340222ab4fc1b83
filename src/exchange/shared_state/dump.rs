use std::fmt::Write as _;

use super::ExchangeCore;
use crate::exchange::slot::SlotState;

impl ExchangeCore {
    /// ### English
    /// Renders a human-readable snapshot of the pending queue and every non-free slot.
    ///
    /// #### Parameters
    /// - `prefix`: Prepended to every line.
    ///
    /// ### 中文
    /// 生成待取队列与所有非空闲槽位的可读快照。
    ///
    /// #### 参数
    /// - `prefix`：添加在每一行前面。
    pub(crate) fn dump(&self, prefix: &str) -> String {
        let state = self.lock();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{prefix}[{}] max_acquired={} max_buffers={} abandoned={} default={}x{} format={}",
            state.consumer_name,
            state.max_acquired_buffer_count,
            state.max_buffer_count(),
            state.is_abandoned,
            state.default_size.width,
            state.default_size.height,
            state.default_format,
        );
        let _ = writeln!(
            out,
            "{prefix}consumer_app={} async_buffer={} producer={:?} producer_app={} async={}",
            state.consumer_controlled_by_app,
            state.use_async_buffer,
            state.connected_api,
            state.producer_controlled_by_app,
            state.producer_async,
        );

        let _ = writeln!(out, "{prefix}pending: {}", state.queue.len());
        for item in state.queue.iter() {
            let _ = writeln!(
                out,
                "{prefix}  slot={:02} frame={} ts={} auto={} droppable={}",
                item.slot,
                item.frame_number,
                item.timestamp,
                item.is_auto_timestamp,
                item.is_droppable,
            );
        }

        for (index, slot) in state.slots.iter() {
            if slot.state == SlotState::Free && slot.buffer.is_none() {
                continue;
            }
            let marker = if slot.state == SlotState::Acquired { '>' } else { ' ' };
            let _ = write!(
                out,
                "{prefix}{marker}[{index:02}] state={:<8?} frame={}",
                slot.state, slot.frame_number
            );
            if slot.attached_by_consumer {
                out.push_str(" attached");
            }
            if let Some(sync) = slot.release_sync {
                let _ = write!(out, " sync={:#x}/{:#x}", sync.display, sync.sync);
            }
            if let Some(buffer) = &slot.buffer {
                let size = buffer.size();
                let _ = write!(
                    out,
                    " buffer={} {}x{} format={}",
                    buffer.id(),
                    size.width,
                    size.height,
                    buffer.format()
                );
            }
            out.push('\n');
        }
        out
    }
}
