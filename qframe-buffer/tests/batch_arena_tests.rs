//! Batch arena behaviour: FIFO popping, relocation and in-place detection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use proptest::prelude::*;
use qframe_buffer::{BatchWriterBuffer, PacketSource, PerPacketOptions, DEFAULT_MAX_PACKET_SIZE};

fn self_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn peer(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), port)
}

fn packet(id: u16, len: usize) -> Vec<u8> {
    (0..len).map(|i| (id as usize * 31 + i) as u8).collect()
}

fn push(arena: &mut BatchWriterBuffer, id: u16, len: usize, in_place: bool) -> bool {
    let data = packet(id, len);
    let result = if in_place {
        let Some(location) = arena.next_write_location() else {
            return false;
        };
        arena.location_mut(&location).unwrap()[..len].copy_from_slice(&data);
        arena.push_buffered_write(PacketSource::InPlace { location, len }, self_ip(), peer(id), None, 0)
    } else {
        arena.push_buffered_write(PacketSource::External(&data), self_ip(), peer(id), None, 0)
    };
    if result.succeeded {
        assert_eq!(result.buffer_copied, !in_place);
    }
    result.succeeded
}

/// (peer port, payload) of every buffered write, oldest first.
fn contents(arena: &BatchWriterBuffer) -> Vec<(u16, Vec<u8>)> {
    arena
        .buffered_writes()
        .map(|w| (w.peer_address.port(), arena.data_of(w).to_vec()))
        .collect()
}

#[test]
fn test_fill_arena_then_pop_one() {
    let mut arena = BatchWriterBuffer::new();
    let mut pushed = 0u16;
    while arena.next_write_location().is_some() {
        assert!(push(&mut arena, pushed, DEFAULT_MAX_PACKET_SIZE, true));
        pushed += 1;
    }
    assert_eq!(pushed as usize, arena.capacity() / DEFAULT_MAX_PACKET_SIZE);

    // A full arena refuses both kinds of push.
    let refused = arena.push_buffered_write(PacketSource::External(b"late"), self_ip(), peer(1), None, 0);
    assert!(!refused.succeeded);
    assert_eq!(arena.len(), pushed as usize);

    let result = arena.pop_buffered_write(1);
    assert_eq!(result.num_buffers_popped, 1);
    assert!(result.moved_remaining_buffers);
    assert!(arena.next_write_location().is_some());

    let remaining = contents(&arena);
    assert_eq!(remaining.len(), pushed as usize - 1);
    assert_eq!(remaining[0], (1, packet(1, DEFAULT_MAX_PACKET_SIZE)));
    assert_eq!(arena.front().unwrap().offset(), 0);
}

#[test]
fn test_location_goes_stale_after_pop() {
    let mut arena = BatchWriterBuffer::new();
    push(&mut arena, 1, 200, false);
    push(&mut arena, 2, 300, false);

    let location = arena.next_write_location().unwrap();
    assert_eq!(location.offset(), 500);
    arena.pop_buffered_write(1);

    let fresh = arena.next_write_location().unwrap();
    assert_ne!(fresh, location);
    assert_eq!(fresh.offset(), 300);
    assert!(arena.location_mut(&location).is_none());
}

#[test]
fn test_options_and_release_time_are_kept() {
    let mut arena = BatchWriterBuffer::new();
    let options = PerPacketOptions {
        ecn_codepoint: 0b10,
        ..Default::default()
    };
    arena.push_buffered_write(PacketSource::External(b"x"), self_ip(), peer(9), Some(options), 1234);

    let write = arena.front().unwrap();
    assert_eq!(write.options, Some(options));
    assert_eq!(write.release_time, 1234);
    assert_eq!(write.self_address, self_ip());
}

proptest! {
    #[test]
    fn prop_pop_leaves_suffix_in_order(
        writes in prop::collection::vec((1usize..=DEFAULT_MAX_PACKET_SIZE, any::<bool>()), 1..30),
        k in 0usize..32,
        more in prop::collection::vec((1usize..=DEFAULT_MAX_PACKET_SIZE, any::<bool>()), 0..5),
    ) {
        let mut arena = BatchWriterBuffer::new();
        for (id, (len, in_place)) in writes.iter().enumerate() {
            prop_assert!(push(&mut arena, id as u16, *len, *in_place));
        }
        let before = contents(&arena);

        let result = arena.pop_buffered_write(k);
        let popped = k.min(writes.len());
        prop_assert_eq!(result.num_buffers_popped, popped);
        prop_assert_eq!(contents(&arena), before[popped..].to_vec());

        let used: usize = before[popped..].iter().map(|(_, d)| d.len()).sum();
        prop_assert_eq!(arena.size_in_use(), used);

        let mut expected = before[popped..].to_vec();
        for (i, (len, in_place)) in more.iter().enumerate() {
            let id = 1000 + i as u16;
            if push(&mut arena, id, *len, *in_place) {
                expected.push((id, packet(id, *len)));
            }
        }
        prop_assert_eq!(contents(&arena), expected);
    }
}
