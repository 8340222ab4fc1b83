//! Release, attach/detach and released-buffer mask behavior.

mod common;

use common::Harness;
use dpi::PhysicalSize;
use xian_frame_exchange::exchange::{
    ConnectedApi, ExchangeConfig, ExchangeError, Fence, GraphicBuffer, NUM_BUFFER_SLOTS,
    PIXEL_FORMAT_RGBA_8888, ProducerEvent, ReleaseSync, SlotState,
};

fn external_buffer() -> GraphicBuffer {
    GraphicBuffer::with_native_handle(PhysicalSize::new(32, 32), PIXEL_FORMAT_RGBA_8888, 0, 77)
}

#[test]
fn release_returns_the_slot_and_notifies_the_producer_once() {
    let harness = Harness::new();
    harness.queue_frame(Some(1));
    let item = harness.consumer.acquire_buffer(0).unwrap();
    harness.drain_producer_events();

    harness
        .consumer
        .release_buffer(
            item.slot,
            item.frame_number,
            Fence::new(),
            Some(ReleaseSync { display: 1, sync: 2 }),
        )
        .unwrap();

    assert_eq!(
        harness.consumer.core().slot_state(item.slot),
        Some(SlotState::Free)
    );
    assert_eq!(harness.drain_producer_events(), [ProducerEvent::BufferReleased]);
}

#[test]
fn release_with_a_mismatched_frame_number_is_stale_and_changes_nothing() {
    let harness = Harness::new();
    harness.queue_frame(Some(1));
    let item = harness.consumer.acquire_buffer(0).unwrap();
    let before = harness.consumer.dump("");

    assert_eq!(
        harness
            .consumer
            .release_buffer(item.slot, item.frame_number + 1, Fence::NO_FENCE, None),
        Err(ExchangeError::StaleSlot)
    );
    assert_eq!(harness.consumer.dump(""), before);
    assert_eq!(
        harness.consumer.core().slot_state(item.slot),
        Some(SlotState::Acquired)
    );
    assert!(harness.drain_producer_events().is_empty());
}

#[test]
fn release_rejects_out_of_range_queued_and_unowned_slots() {
    let harness = Harness::new();
    assert_eq!(
        harness
            .consumer
            .release_buffer(NUM_BUFFER_SLOTS, 0, Fence::NO_FENCE, None),
        Err(ExchangeError::InvalidArgument)
    );

    let queued = harness.queue_frame(Some(1));
    let frame = harness.consumer.core().slot_frame_number(queued).unwrap();
    assert_eq!(
        harness
            .consumer
            .release_buffer(queued, frame, Fence::NO_FENCE, None),
        Err(ExchangeError::InvalidArgument)
    );

    let item = harness.consumer.acquire_buffer(0).unwrap();
    harness
        .consumer
        .release_buffer(item.slot, item.frame_number, Fence::NO_FENCE, None)
        .unwrap();
    assert_eq!(
        harness
            .consumer
            .release_buffer(item.slot, item.frame_number, Fence::NO_FENCE, None),
        Err(ExchangeError::InvalidArgument)
    );
}

#[test]
fn release_after_the_producer_freed_everything_is_stale() {
    let harness = Harness::new();
    harness.queue_frame(Some(1));
    let item = harness.consumer.acquire_buffer(0).unwrap();

    harness.producer.disconnect(ConnectedApi::Cpu).unwrap();

    assert_eq!(
        harness
            .consumer
            .release_buffer(item.slot, item.frame_number, Fence::NO_FENCE, None),
        Err(ExchangeError::StaleSlot)
    );
    assert_eq!(
        harness.consumer.core().slot_state(item.slot),
        Some(SlotState::Free)
    );
}

#[test]
fn attach_then_detach_round_trips() {
    let harness = Harness::new();
    let max_before = harness.consumer.core().max_acquired_buffer_count();

    let slot = harness.consumer.attach_buffer(Some(external_buffer())).unwrap();
    assert_eq!(
        harness.consumer.core().slot_state(slot),
        Some(SlotState::Acquired)
    );
    assert_eq!(harness.consumer.core().slot_frame_number(slot), Some(0));

    harness.consumer.detach_buffer(slot).unwrap();
    assert_eq!(
        harness.consumer.core().slot_state(slot),
        Some(SlotState::Free)
    );
    assert_eq!(
        harness.consumer.core().max_acquired_buffer_count(),
        max_before
    );
}

#[test]
fn attached_buffers_release_with_frame_zero() {
    let harness = Harness::new();
    let slot = harness.consumer.attach_buffer(Some(external_buffer())).unwrap();
    harness.drain_producer_events();

    harness
        .consumer
        .release_buffer(slot, 0, Fence::NO_FENCE, None)
        .unwrap();
    assert_eq!(harness.drain_producer_events(), [ProducerEvent::BufferReleased]);
}

#[test]
fn attach_validates_input_and_capacity() {
    let harness = Harness::new();
    assert_eq!(
        harness.consumer.attach_buffer(None),
        Err(ExchangeError::InvalidArgument)
    );

    let max = harness.consumer.core().max_acquired_buffer_count();
    for _ in 0..=max {
        harness.consumer.attach_buffer(Some(external_buffer())).unwrap();
    }
    assert_eq!(
        harness.consumer.attach_buffer(Some(external_buffer())),
        Err(ExchangeError::Aborted)
    );
}

#[test]
fn attach_reports_out_of_slots_when_the_table_is_full() {
    let config = ExchangeConfig::default()
        .with_max_acquired_buffers(NUM_BUFFER_SLOTS - 2)
        .with_default_max_buffer_count(NUM_BUFFER_SLOTS);
    let harness = Harness::with_config(config);

    let queued = harness.queue_frame(Some(1));
    let mut dequeued = Vec::new();
    while let Ok(output) = harness.producer.try_dequeue_buffer(Default::default()) {
        dequeued.push(output.slot);
    }
    let attached: Vec<_> =
        std::iter::from_fn(|| harness.consumer.attach_buffer(Some(external_buffer())).ok())
            .collect();

    assert!(!attached.contains(&queued));
    assert_eq!(1 + dequeued.len() + attached.len(), NUM_BUFFER_SLOTS);
    assert_eq!(
        harness.consumer.attach_buffer(Some(external_buffer())),
        Err(ExchangeError::OutOfSlots)
    );
}

#[test]
fn attach_picks_the_oldest_free_slot() {
    let harness = Harness::new();
    let slots = harness.queue_frames(&[1, 2]);
    for _ in 0..2 {
        let item = harness.consumer.acquire_buffer(0).unwrap();
        harness
            .consumer
            .release_buffer(item.slot, item.frame_number, Fence::NO_FENCE, None)
            .unwrap();
    }

    // Every untouched slot still has frame number 0, so the lowest-index untouched one wins.
    let attached = harness.consumer.attach_buffer(Some(external_buffer())).unwrap();
    assert!(!slots.contains(&attached));
    assert_eq!(harness.consumer.core().slot_frame_number(attached), Some(0));
}

#[test]
fn detach_requires_an_acquired_slot() {
    let harness = Harness::new();
    assert_eq!(
        harness.consumer.detach_buffer(NUM_BUFFER_SLOTS),
        Err(ExchangeError::InvalidArgument)
    );
    let queued = harness.queue_frame(Some(1));
    assert_eq!(
        harness.consumer.detach_buffer(queued),
        Err(ExchangeError::InvalidArgument)
    );
}

#[test]
fn released_buffers_mask_tracks_acquire_called() {
    let harness = Harness::new();
    assert_eq!(harness.consumer.released_buffers(), Ok(u64::MAX));

    harness.queue_frame(Some(1));
    let item = harness.consumer.acquire_buffer(0).unwrap();
    let mask = harness.consumer.released_buffers().unwrap();
    assert_eq!(mask & (1 << item.slot), 0);
    assert_eq!(mask.count_ones() as usize, NUM_BUFFER_SLOTS - 1);

    harness.consumer.detach_buffer(item.slot).unwrap();
    assert_eq!(harness.consumer.released_buffers(), Ok(u64::MAX));
}
