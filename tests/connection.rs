//! Connect/disconnect lifecycle, abandonment and configuration setters.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{Harness, init_tracing};
use dpi::PhysicalSize;
use xian_frame_exchange::exchange::{
    BufferExchange, ChannelConsumerListener, ConnectedApi, ConsumerEvent, DequeueRequest,
    ExchangeConfig, ExchangeError, Fence, GraphicBuffer, PIXEL_FORMAT_RGBA_8888,
    QueueBufferInput, SlotState,
};

#[test]
fn consumer_disconnect_abandons_the_exchange() {
    let harness = Harness::new();
    harness.queue_frames(&[1, 2]);
    let item = harness.consumer.acquire_buffer(0).unwrap();

    harness.consumer.disconnect().unwrap();

    let core = harness.consumer.core();
    assert!(core.is_abandoned());
    assert_eq!(core.pending_count(), 0);
    assert_eq!(core.slot_state(item.slot), Some(SlotState::Free));

    let buffer = GraphicBuffer::new(PhysicalSize::new(4, 4), PIXEL_FORMAT_RGBA_8888, 0);
    assert_eq!(
        harness.consumer.acquire_buffer(0).unwrap_err(),
        ExchangeError::NotInitialized
    );
    assert_eq!(
        harness
            .consumer
            .release_buffer(item.slot, item.frame_number, Fence::NO_FENCE, None),
        Err(ExchangeError::NotInitialized)
    );
    assert_eq!(
        harness.consumer.attach_buffer(Some(buffer)),
        Err(ExchangeError::NotInitialized)
    );
    assert_eq!(
        harness.consumer.detach_buffer(item.slot),
        Err(ExchangeError::NotInitialized)
    );
    assert_eq!(
        harness.consumer.released_buffers(),
        Err(ExchangeError::NotInitialized)
    );
    assert_eq!(
        harness
            .producer
            .try_dequeue_buffer(DequeueRequest::default())
            .unwrap_err(),
        ExchangeError::NotInitialized
    );
    assert_eq!(
        harness
            .producer
            .queue_buffer(item.slot, QueueBufferInput::default())
            .unwrap_err(),
        ExchangeError::NotInitialized
    );
}

#[test]
fn abandonment_is_terminal() {
    let harness = Harness::new();
    harness.consumer.disconnect().unwrap();

    assert_eq!(
        harness.consumer.disconnect(),
        Err(ExchangeError::InvalidArgument)
    );
    let (listener, _events) = ChannelConsumerListener::new();
    assert_eq!(
        harness.consumer.connect(Arc::new(listener), false),
        Err(ExchangeError::NotInitialized)
    );
    // The producer side may still tear down cleanly.
    assert_eq!(harness.producer.disconnect(ConnectedApi::Cpu), Ok(()));
    assert_eq!(
        harness
            .producer
            .connect(None, ConnectedApi::Cpu, false, false)
            .unwrap_err(),
        ExchangeError::NotInitialized
    );
}

#[test]
fn producer_requires_a_connected_consumer_and_a_single_connection() {
    init_tracing();
    let (producer, consumer) = BufferExchange::create(ExchangeConfig::default()).unwrap();

    assert_eq!(
        producer
            .connect(None, ConnectedApi::Egl, false, false)
            .unwrap_err(),
        ExchangeError::NotInitialized
    );

    let (listener, _events) = ChannelConsumerListener::new();
    consumer.connect(Arc::new(listener), true).unwrap();

    let output = producer
        .connect(None, ConnectedApi::Egl, false, false)
        .unwrap();
    assert_eq!(output.default_size, PhysicalSize::new(1, 1));
    assert_eq!(output.pending_buffers, 0);

    assert_eq!(
        producer
            .connect(None, ConnectedApi::Media, false, false)
            .unwrap_err(),
        ExchangeError::InvalidArgument
    );
    assert_eq!(
        producer.disconnect(ConnectedApi::Cpu),
        Err(ExchangeError::InvalidArgument)
    );
    producer.disconnect(ConnectedApi::Egl).unwrap();
    producer
        .connect(None, ConnectedApi::Camera, false, false)
        .unwrap();
}

#[test]
fn producer_disconnect_discards_pending_frames_and_notifies_the_consumer() {
    let harness = Harness::new();
    harness.queue_frames(&[1, 2, 3]);
    harness.drain_consumer_events();

    harness.producer.disconnect(ConnectedApi::Cpu).unwrap();

    assert_eq!(harness.consumer.core().pending_count(), 0);
    assert_eq!(
        harness.drain_consumer_events(),
        [ConsumerEvent::BuffersReleased]
    );
    assert_eq!(
        harness.consumer.acquire_buffer(0).unwrap_err(),
        ExchangeError::WouldBlock
    );
    assert_eq!(
        harness
            .producer
            .try_dequeue_buffer(DequeueRequest::default())
            .unwrap_err(),
        ExchangeError::NotInitialized
    );
}

#[test]
fn consumer_reconnect_replaces_the_listener() {
    let harness = Harness::new();
    let (listener, events) = ChannelConsumerListener::new();
    harness.consumer.connect(Arc::new(listener), true).unwrap();

    let slot = harness.queue_frame(Some(1));

    assert!(harness.drain_consumer_events().is_empty());
    assert!(matches!(
        events.try_recv(),
        Ok(ConsumerEvent::FrameAvailable { slot: s, frame_number: 1 }) if s == slot
    ));
}

#[test]
fn max_acquired_count_is_fixed_once_the_producer_connects() {
    let harness = Harness::new();
    assert_eq!(
        harness.consumer.set_max_acquired_buffer_count(0),
        Err(ExchangeError::InvalidArgument)
    );
    assert_eq!(
        harness.consumer.set_max_acquired_buffer_count(63),
        Err(ExchangeError::InvalidArgument)
    );
    assert_eq!(
        harness.consumer.set_max_acquired_buffer_count(2),
        Err(ExchangeError::InvalidState)
    );

    harness.producer.disconnect(ConnectedApi::Cpu).unwrap();
    harness.consumer.set_max_acquired_buffer_count(2).unwrap();
    assert_eq!(harness.consumer.core().max_acquired_buffer_count(), 2);
}

#[test]
fn configured_ceiling_bounds_max_acquired_count() {
    init_tracing();
    let config = ExchangeConfig::default().with_max_acquired_ceiling(3);
    let (_producer, consumer) = BufferExchange::create(config).unwrap();

    consumer.set_max_acquired_buffer_count(3).unwrap();
    assert_eq!(
        consumer.set_max_acquired_buffer_count(4),
        Err(ExchangeError::InvalidArgument)
    );
}

#[test]
fn async_buffer_can_only_be_disabled_before_the_consumer_connects() {
    init_tracing();
    let (_producer, consumer) = BufferExchange::create(ExchangeConfig::default()).unwrap();

    assert_eq!(
        consumer.set_default_max_buffer_count(1),
        Err(ExchangeError::InvalidArgument)
    );
    consumer.disable_async_buffer().unwrap();
    consumer.set_default_max_buffer_count(1).unwrap();

    let (listener, _events) = ChannelConsumerListener::new();
    consumer.connect(Arc::new(listener), false).unwrap();
    assert_eq!(
        consumer.disable_async_buffer(),
        Err(ExchangeError::InvalidState)
    );
}

#[test]
fn connecting_without_async_buffer_allows_reconnects() {
    init_tracing();
    let (_producer, consumer) = BufferExchange::create(ExchangeConfig::default()).unwrap();

    let (listener, _events) = ChannelConsumerListener::new();
    consumer
        .connect_without_async_buffer(Arc::new(listener), false)
        .unwrap();
    consumer.set_default_max_buffer_count(1).unwrap();
    assert!(consumer.dump("").contains("async_buffer=false"));

    let (listener, _events) = ChannelConsumerListener::new();
    consumer
        .connect_without_async_buffer(Arc::new(listener), true)
        .unwrap();
    assert!(consumer.dump("").contains("consumer_app=true async_buffer=false"));
}

#[test]
fn connecting_without_async_buffer_rejects_a_live_reservation() {
    let harness = Harness::new();
    let (listener, _events) = ChannelConsumerListener::new();
    assert_eq!(
        harness
            .consumer
            .connect_without_async_buffer(Arc::new(listener), false),
        Err(ExchangeError::InvalidState)
    );
    assert!(harness.consumer.dump("").contains("async_buffer=true"));
}

#[test]
fn connecting_without_async_buffer_leaves_an_abandoned_exchange_untouched() {
    let harness = Harness::new();
    harness.consumer.disconnect().unwrap();

    let (listener, _events) = ChannelConsumerListener::new();
    assert_eq!(
        harness
            .consumer
            .connect_without_async_buffer(Arc::new(listener), false),
        Err(ExchangeError::NotInitialized)
    );
    assert!(harness.consumer.dump("").contains("async_buffer=true"));
}

#[test]
fn setters_reject_out_of_range_values() {
    let harness = Harness::new();
    assert_eq!(
        harness.consumer.set_default_buffer_size(0, 4),
        Err(ExchangeError::InvalidArgument)
    );
    assert_eq!(
        harness.consumer.set_default_buffer_size(4, 0),
        Err(ExchangeError::InvalidArgument)
    );
    assert_eq!(
        harness.consumer.set_default_max_buffer_count(65),
        Err(ExchangeError::InvalidArgument)
    );
    harness.consumer.set_default_max_buffer_count(64).unwrap();

    harness.consumer.set_consumer_name("renamed");
    assert_eq!(harness.consumer.consumer_name(), "renamed");
    assert!(harness.consumer.dump("# ").starts_with("# [renamed]"));
}

#[test]
fn consumer_disconnect_wakes_a_blocked_dequeue() {
    let harness = Harness::with_config(ExchangeConfig::default());
    harness.queue_frames(&[1, 2]);

    let producer = harness.producer.clone();
    let waiter = thread::spawn(move || producer.dequeue_buffer(DequeueRequest::default()));

    thread::sleep(Duration::from_millis(50));
    harness.consumer.disconnect().unwrap();

    let result = waiter.join().expect("dequeue thread panicked");
    assert_eq!(result.unwrap_err(), ExchangeError::NotInitialized);
}

#[test]
fn dequeue_times_out_when_no_slot_frees_up() {
    let harness = Harness::with_config(ExchangeConfig::default());
    harness.queue_frames(&[1, 2]);

    let request = DequeueRequest::default().with_timeout(Duration::from_millis(20));
    assert_eq!(
        harness.producer.dequeue_buffer(request).unwrap_err(),
        ExchangeError::WouldBlock
    );
}
