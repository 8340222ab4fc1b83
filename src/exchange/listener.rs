//! ### English
//! Listener capabilities notified by the exchange.
//!
//! Notifications are always delivered after the exchange lock has been released, on the thread
//! that performed the triggering operation.
//!
//! ### 中文
//! 由交换模块通知的监听者能力接口。
//!
//! 通知总是在释放交换锁之后、在触发该操作的线程上投递。

use crossbeam_channel as channel;

use super::item::BufferItem;

/// ### English
/// Producer-side capability: learns when the consumer hands a slot back.
///
/// ### 中文
/// 生产者侧能力：获知消费者何时归还槽位。
pub trait ProducerListener: Send + Sync {
    /// ### English
    /// Called once after each successful consumer release.
    ///
    /// ### 中文
    /// 每次消费者 release 成功后调用一次。
    fn on_buffer_released(&self);
}

/// ### English
/// Consumer-side capability: learns about newly queued frames and buffer teardown.
///
/// ### 中文
/// 消费者侧能力：获知新入队的帧以及缓冲区的整体释放。
pub trait ConsumerListener: Send + Sync {
    /// ### English
    /// Called after the producer queued a frame (or replaced a droppable one).
    ///
    /// #### Parameters
    /// - `item`: The queued entry as it sits in the pending queue.
    ///
    /// ### 中文
    /// 生产者 queue 一帧（或替换一个可丢弃帧）之后调用。
    ///
    /// #### 参数
    /// - `item`：位于待取队列中的该条目。
    fn on_frame_available(&self, item: &BufferItem);

    /// ### English
    /// Called after the producer freed every buffer; cached slot mappings are invalid.
    ///
    /// ### 中文
    /// 生产者释放所有缓冲区后调用；消费者缓存的槽位映射全部失效。
    fn on_buffers_released(&self);
}

/// ### English
/// Event emitted by [`ChannelConsumerListener`].
///
/// ### 中文
/// [`ChannelConsumerListener`] 发出的事件。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumerEvent {
    FrameAvailable { slot: usize, frame_number: u64 },
    BuffersReleased,
}

/// ### English
/// Event emitted by [`ChannelProducerListener`].
///
/// ### 中文
/// [`ChannelProducerListener`] 发出的事件。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProducerEvent {
    BufferReleased,
}

/// ### English
/// Consumer listener that forwards notifications into a channel, so a consumer loop can
/// `recv()` instead of implementing callbacks.
///
/// ### 中文
/// 将通知转发到 channel 的消费者监听者，使消费循环可直接 `recv()` 而无需实现回调。
pub struct ChannelConsumerListener {
    tx: channel::Sender<ConsumerEvent>,
}

impl ChannelConsumerListener {
    /// ### English
    /// Creates the listener together with the receiving end of its event channel.
    ///
    /// ### 中文
    /// 创建监听者及其事件 channel 的接收端。
    pub fn new() -> (Self, channel::Receiver<ConsumerEvent>) {
        let (tx, rx) = channel::unbounded();
        (Self { tx }, rx)
    }
}

impl ConsumerListener for ChannelConsumerListener {
    fn on_frame_available(&self, item: &BufferItem) {
        let _ = self.tx.send(ConsumerEvent::FrameAvailable {
            slot: item.slot,
            frame_number: item.frame_number,
        });
    }

    fn on_buffers_released(&self) {
        let _ = self.tx.send(ConsumerEvent::BuffersReleased);
    }
}

/// ### English
/// Producer listener that forwards release notifications into a channel.
///
/// ### 中文
/// 将 release 通知转发到 channel 的生产者监听者。
pub struct ChannelProducerListener {
    tx: channel::Sender<ProducerEvent>,
}

impl ChannelProducerListener {
    pub fn new() -> (Self, channel::Receiver<ProducerEvent>) {
        let (tx, rx) = channel::unbounded();
        (Self { tx }, rx)
    }
}

impl ProducerListener for ChannelProducerListener {
    fn on_buffer_released(&self) {
        let _ = self.tx.send(ProducerEvent::BufferReleased);
    }
}
