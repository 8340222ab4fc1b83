//! Producer-side dequeue/queue/cancel behavior and end-to-end threaded flow.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use common::{Harness, SECOND, init_tracing};
use dpi::PhysicalSize;
use xian_frame_exchange::exchange::{
    BufferAllocator, BufferExchange, ChannelConsumerListener, ConnectedApi, ConsumerEvent,
    DequeueRequest, ExchangeConfig, ExchangeError, Fence, GraphicBuffer, ManualClock,
    QueueBufferInput, Result, SlotState,
};

const FRAMES: u64 = 200;

#[test]
fn frames_flow_in_order_between_threads() {
    let harness = Harness::new();
    let producer = harness.producer.clone();

    let producer_thread = thread::spawn(move || {
        let request = DequeueRequest::default()
            .with_size(16, 16)
            .with_timeout(Duration::from_secs(5));
        for index in 0..FRAMES {
            let dequeued = producer.dequeue_buffer(request).expect("dequeue");
            producer.request_buffer(dequeued.slot).expect("request");
            producer
                .queue_buffer(dequeued.slot, QueueBufferInput::at(index as i64 + 1))
                .expect("queue");
        }
    });

    let mut frames = Vec::new();
    while frames.len() < FRAMES as usize {
        match harness.consumer.acquire_buffer(0) {
            Ok(item) => {
                frames.push(item.frame_number);
                harness
                    .consumer
                    .release_buffer(item.slot, item.frame_number, Fence::NO_FENCE, None)
                    .expect("release");
            }
            Err(ExchangeError::WouldBlock) => {
                let _ = harness
                    .consumer_events
                    .recv_timeout(Duration::from_millis(100));
            }
            Err(err) => panic!("unexpected acquire error: {err}"),
        }
    }

    producer_thread.join().expect("producer thread panicked");
    assert_eq!(frames, (1..=FRAMES).collect::<Vec<_>>());
}

#[test]
fn blocked_dequeue_resumes_after_release_with_the_release_fence() {
    let harness = Harness::with_config(ExchangeConfig::default());
    harness.queue_frames(&[1, 2]);
    let item = harness.consumer.acquire_buffer(0).unwrap();

    let producer = harness.producer.clone();
    let waiter = thread::spawn(move || {
        producer.dequeue_buffer(
            DequeueRequest::default()
                .with_size(16, 16)
                .with_timeout(Duration::from_secs(5)),
        )
    });

    thread::sleep(Duration::from_millis(50));
    harness
        .consumer
        .release_buffer(item.slot, item.frame_number, Fence::from_native(99), None)
        .unwrap();

    let dequeued = waiter.join().expect("dequeue thread panicked").unwrap();
    assert_eq!(dequeued.slot, item.slot);
    assert!(!dequeued.reallocated);
    assert_eq!(dequeued.fence.native_handle(), 99);
}

#[test]
fn async_producer_replaces_the_droppable_tail() {
    let harness = Harness::new_async();
    let slots = harness.queue_frames(&[1, 2, 3]);

    assert_eq!(harness.consumer.core().pending_count(), 1);
    assert_eq!(
        harness.consumer.core().slot_state(slots[0]),
        Some(SlotState::Free)
    );
    assert_eq!(
        harness.consumer.core().slot_state(slots[1]),
        Some(SlotState::Free)
    );
    assert_eq!(harness.drain_consumer_events().len(), 3);

    let item = harness.consumer.acquire_buffer(0).unwrap();
    assert_eq!(item.slot, slots[2]);
    assert_eq!(item.frame_number, 3);
    assert_eq!(item.timestamp, 3);
}

#[test]
fn dequeue_applies_consumer_defaults() {
    let harness = Harness::new();
    harness.consumer.set_default_buffer_size(32, 8).unwrap();
    harness.consumer.set_default_buffer_format(5);
    harness.consumer.set_consumer_usage_bits(0x10);
    harness.consumer.set_transform_hint(4);

    let dequeued = harness
        .producer
        .try_dequeue_buffer(DequeueRequest::default().with_usage(0x1))
        .unwrap();
    assert!(dequeued.reallocated);

    let buffer = harness.producer.request_buffer(dequeued.slot).unwrap();
    assert_eq!(buffer.size(), PhysicalSize::new(32, 8));
    assert_eq!(buffer.format(), 5);
    assert_eq!(buffer.usage(), 0x11);

    let output = harness
        .producer
        .queue_buffer(dequeued.slot, QueueBufferInput::at(SECOND))
        .unwrap();
    assert_eq!(output.default_size, PhysicalSize::new(32, 8));
    assert_eq!(output.transform_hint, 4);
    assert_eq!(output.pending_buffers, 1);
}

#[test]
fn dequeue_rejects_a_half_empty_size() {
    let harness = Harness::new();
    assert_eq!(
        harness
            .producer
            .try_dequeue_buffer(DequeueRequest::default().with_size(0, 4))
            .unwrap_err(),
        ExchangeError::InvalidArgument
    );
}

#[test]
fn too_many_dequeued_buffers_is_invalid_state_once_a_frame_was_queued() {
    let harness = Harness::with_config(ExchangeConfig::default());
    let request = DequeueRequest::default().with_size(16, 16);

    // Before the first queue both producer-visible slots can be held.
    let first = harness.producer.try_dequeue_buffer(request).unwrap();
    let second = harness.producer.try_dequeue_buffer(request).unwrap();
    assert_eq!(
        harness.producer.try_dequeue_buffer(request).unwrap_err(),
        ExchangeError::WouldBlock
    );
    harness.producer.cancel_buffer(second.slot, Fence::NO_FENCE).unwrap();

    harness.producer.request_buffer(first.slot).unwrap();
    harness
        .producer
        .queue_buffer(first.slot, QueueBufferInput::at(1))
        .unwrap();
    let item = harness.consumer.acquire_buffer(0).unwrap();
    harness
        .consumer
        .release_buffer(item.slot, item.frame_number, Fence::NO_FENCE, None)
        .unwrap();

    harness.producer.try_dequeue_buffer(request).unwrap();
    assert_eq!(
        harness.producer.try_dequeue_buffer(request).unwrap_err(),
        ExchangeError::InvalidState
    );
}

#[test]
fn cancel_returns_the_slot_and_keeps_its_fence_for_the_next_dequeue() {
    let harness = Harness::with_config(ExchangeConfig::default());
    let request = DequeueRequest::default().with_size(16, 16);

    let dequeued = harness.producer.try_dequeue_buffer(request).unwrap();
    harness
        .producer
        .cancel_buffer(dequeued.slot, Fence::from_native(7))
        .unwrap();
    assert_eq!(
        harness.consumer.core().slot_state(dequeued.slot),
        Some(SlotState::Free)
    );
    assert_eq!(
        harness.producer.cancel_buffer(dequeued.slot, Fence::NO_FENCE),
        Err(ExchangeError::InvalidArgument)
    );
    assert_eq!(
        harness
            .producer
            .queue_buffer(dequeued.slot, QueueBufferInput::at(1))
            .unwrap_err(),
        ExchangeError::InvalidArgument
    );

    // Hold the other producer-visible slot so the cancelled one is picked again.
    let other = harness.producer.try_dequeue_buffer(request).unwrap();
    assert_ne!(other.slot, dequeued.slot);
    let again = harness.producer.try_dequeue_buffer(request).unwrap();
    assert_eq!(again.slot, dequeued.slot);
    assert!(!again.reallocated);
    assert_eq!(again.fence.native_handle(), 7);
}

#[test]
fn queue_requires_request_buffer_and_keeps_frame_numbers_dense() {
    let harness = Harness::new();
    let dequeued = harness
        .producer
        .try_dequeue_buffer(DequeueRequest::default())
        .unwrap();

    assert_eq!(
        harness
            .producer
            .queue_buffer(dequeued.slot, QueueBufferInput::at(1))
            .unwrap_err(),
        ExchangeError::InvalidArgument
    );

    harness.producer.request_buffer(dequeued.slot).unwrap();
    harness
        .producer
        .queue_buffer(dequeued.slot, QueueBufferInput::at(1))
        .unwrap();
    assert_eq!(
        harness.drain_consumer_events(),
        [ConsumerEvent::FrameAvailable {
            slot: dequeued.slot,
            frame_number: 1
        }]
    );
    assert_eq!(
        harness.producer.request_buffer(dequeued.slot).unwrap_err(),
        ExchangeError::InvalidArgument
    );
}

#[test]
fn auto_timestamp_reads_the_exchange_clock() {
    let harness = Harness::new();
    harness.clock.advance(SECOND);
    harness.queue_frame(None);

    let item = harness.consumer.acquire_buffer(0).unwrap();
    assert!(item.is_auto_timestamp);
    assert_eq!(item.timestamp, common::START_NS + SECOND);
}

struct FailingAllocator {
    calls: AtomicUsize,
}

impl BufferAllocator for FailingAllocator {
    fn allocate(
        &self,
        _size: PhysicalSize<u32>,
        _format: u32,
        _usage: u32,
    ) -> Result<GraphicBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ExchangeError::NoMemory)
    }
}

#[test]
fn allocation_failure_returns_the_slot() {
    init_tracing();
    let allocator = Arc::new(FailingAllocator {
        calls: AtomicUsize::new(0),
    });
    let (producer, consumer) = BufferExchange::with_collaborators(
        ExchangeConfig::default(),
        Arc::new(ManualClock::new(0)),
        allocator.clone(),
    )
    .unwrap();
    let (listener, _events) = ChannelConsumerListener::new();
    consumer.connect(Arc::new(listener), false).unwrap();
    producer
        .connect(None, ConnectedApi::Cpu, false, false)
        .unwrap();

    assert_eq!(
        producer
            .try_dequeue_buffer(DequeueRequest::default())
            .unwrap_err(),
        ExchangeError::NoMemory
    );
    assert_eq!(allocator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(consumer.core().slot_state(0), Some(SlotState::Free));
    assert!(consumer.wait_for_free_slot(Duration::ZERO));
}

#[test]
fn unbounded_timeout_waits_for_a_release() {
    let harness = Harness::with_config(ExchangeConfig::default());
    harness.queue_frames(&[1, 2]);
    let item = harness.consumer.acquire_buffer(0).unwrap();

    let producer = harness.producer.clone();
    let waiter = thread::spawn(move || {
        producer.dequeue_buffer(
            DequeueRequest::default()
                .with_size(16, 16)
                .with_timeout(Duration::MAX),
        )
    });

    thread::sleep(Duration::from_millis(50));
    harness
        .consumer
        .release_buffer(item.slot, item.frame_number, Fence::new(), None)
        .unwrap();

    let dequeued = waiter.join().expect("dequeue thread panicked").unwrap();
    assert_eq!(dequeued.slot, item.slot);
}

#[test]
fn unbounded_wait_for_free_slot_returns_when_one_is_free() {
    let harness = Harness::new();
    assert!(harness.consumer.wait_for_free_slot(Duration::MAX));
    assert!(harness.consumer.core().wait_for_free_slot(Duration::MAX));
}
