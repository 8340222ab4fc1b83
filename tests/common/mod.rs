#![allow(dead_code)]

use std::sync::Arc;

use crossbeam_channel::Receiver;
use xian_frame_exchange::exchange::{
    BufferConsumer, BufferExchange, BufferProducer, ChannelConsumerListener,
    ChannelProducerListener, ConnectedApi, ConsumerEvent, DequeueRequest, ExchangeConfig,
    HeapBufferAllocator, ManualClock, Nsecs, ProducerEvent, QueueBufferInput,
};

pub const START_NS: Nsecs = 10_000_000_000;
pub const SECOND: Nsecs = 1_000_000_000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Both ends of one exchange, connected, with channel listeners and a manual clock.
pub struct Harness {
    pub producer: BufferProducer,
    pub consumer: BufferConsumer,
    pub clock: Arc<ManualClock>,
    pub consumer_events: Receiver<ConsumerEvent>,
    pub producer_events: Receiver<ProducerEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ExchangeConfig::default().with_default_max_buffer_count(8))
    }

    pub fn with_config(config: ExchangeConfig) -> Self {
        Self::build(config, false)
    }

    pub fn new_async() -> Self {
        Self::build(
            ExchangeConfig::default().with_default_max_buffer_count(8),
            true,
        )
    }

    fn build(config: ExchangeConfig, is_async: bool) -> Self {
        init_tracing();
        let clock = Arc::new(ManualClock::new(START_NS));
        let (producer, consumer) = BufferExchange::with_collaborators(
            config.with_consumer_name("harness"),
            clock.clone(),
            Arc::new(HeapBufferAllocator),
        )
        .expect("valid config");

        let (consumer_listener, consumer_events) = ChannelConsumerListener::new();
        consumer
            .connect(Arc::new(consumer_listener), false)
            .expect("consumer connect");

        let (producer_listener, producer_events) = ChannelProducerListener::new();
        producer
            .connect(
                Some(Arc::new(producer_listener)),
                ConnectedApi::Cpu,
                false,
                is_async,
            )
            .expect("producer connect");

        Self {
            producer,
            consumer,
            clock,
            consumer_events,
            producer_events,
        }
    }

    /// Dequeues, requests and queues one frame; returns its slot.
    pub fn queue_frame(&self, timestamp: Option<Nsecs>) -> usize {
        let dequeued = self
            .producer
            .try_dequeue_buffer(DequeueRequest::default().with_size(16, 16))
            .expect("dequeue");
        self.producer
            .request_buffer(dequeued.slot)
            .expect("request buffer");
        let input = QueueBufferInput {
            timestamp,
            ..QueueBufferInput::default()
        };
        self.producer
            .queue_buffer(dequeued.slot, input)
            .expect("queue");
        dequeued.slot
    }

    pub fn queue_frames(&self, timestamps: &[Nsecs]) -> Vec<usize> {
        timestamps
            .iter()
            .map(|&timestamp| self.queue_frame(Some(timestamp)))
            .collect()
    }

    pub fn drain_consumer_events(&self) -> Vec<ConsumerEvent> {
        self.consumer_events.try_iter().collect()
    }

    pub fn drain_producer_events(&self) -> Vec<ProducerEvent> {
        self.producer_events.try_iter().collect()
    }
}
