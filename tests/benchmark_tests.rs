//! Performance benchmarks for the wire codec, the directory and the round protocol

use client::board::{BingoBoard, Board};
use client::round::RoundCoordinator;
use server::coordinator::deliveries_for;
use server::directory::Directory;
use shared::{MessageType, Packet, RoomSummary, MAX_PAYLOAD};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Instant;

fn peer(index: u32) -> SocketAddr {
    SocketAddr::new(
        IpAddr::V4(Ipv4Addr::new(10, 0, (index >> 8) as u8, index as u8)),
        9000 + (index % 1000) as u16,
    )
}

/// Benchmarks header and payload encode/decode
#[test]
fn benchmark_packet_codec() {
    let members: Vec<SocketAddr> = (0..20).map(peer).collect();
    let packet = Packet::with_peers(MessageType::MembershipUpdate, 3, &members).unwrap();

    let iterations = 50_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let data = packet.encode().unwrap();
        let decoded = Packet::decode(&data).unwrap();
        assert_eq!(decoded.room_id(), 3);
    }

    let duration = start.elapsed();
    println!(
        "Packet codec: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks decoding of maximum-size payloads
#[test]
fn benchmark_large_payload_decode() {
    let text = "x".repeat(MAX_PAYLOAD);
    let data = Packet::text(MessageType::RoundMessage, 1, &text)
        .unwrap()
        .encode()
        .unwrap();

    let iterations = 50_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let packet = Packet::decode(&data).unwrap();
        assert_eq!(packet.payload().len(), MAX_PAYLOAD);
    }

    let duration = start.elapsed();
    println!(
        "Large payload decode: {} iterations in {:?}",
        iterations, duration
    );

    assert!(duration.as_millis() < 2000);
}

/// Stress tests the directory with a full house of rooms and members
#[test]
fn stress_test_directory_churn() {
    let rooms = 20;
    let members = 20;
    let mut directory = Directory::new(rooms, members);

    let start = Instant::now();
    let mut deliveries = 0;

    for room in 0..rooms as u32 {
        let creator = peer(room * 100);
        let mutation = directory.create(creator, "host").unwrap();
        deliveries += deliveries_for(&directory, &mutation).len();

        let room_id = directory.room_of(&creator).unwrap();
        for seat in 1..members as u32 {
            let mutation = directory.join(peer(room * 100 + seat), "guest", room_id).unwrap();
            deliveries += deliveries_for(&directory, &mutation).len();
        }
    }

    let summaries: Vec<RoomSummary> = directory.list();
    assert_eq!(summaries.len(), rooms);
    assert!(summaries.iter().all(|s| s.members as usize == members));

    for room in 0..rooms as u32 {
        for seat in 0..members as u32 {
            let mutation = directory.leave(peer(room * 100 + seat)).unwrap();
            deliveries += deliveries_for(&directory, &mutation).len();
        }
    }

    let duration = start.elapsed();
    println!(
        "Directory churn: {} mutations, {} deliveries in {:?}",
        rooms * members * 2,
        deliveries,
        duration
    );

    assert!(directory.is_empty());
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks a liveness cycle over a full directory
#[test]
fn benchmark_liveness_cycle() {
    let mut directory = Directory::new(20, 20);
    for room in 0..20u32 {
        let creator = peer(room * 100);
        directory.create(creator, "host").unwrap();
        let room_id = directory.room_of(&creator).unwrap();
        for seat in 1..20u32 {
            directory.join(peer(room * 100 + seat), "guest", room_id).unwrap();
        }
    }

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let targets = directory.begin_probe_cycle();
        for addr in &targets {
            directory.mark_alive(addr);
        }
        assert!(directory.evict_unresponsive().is_empty());
    }

    let duration = start.elapsed();
    println!(
        "Liveness cycle over {} peers: {} iterations in {:?}",
        directory.len(),
        iterations,
        duration
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks card dealing and full-pool draws
#[test]
fn benchmark_board_reset_and_draw() {
    let mut board = BingoBoard::from_seed(99);

    let iterations = 2_000;
    let start = Instant::now();

    for _ in 0..iterations {
        board.reset();
        while let Some(ball) = board.draw() {
            board.mark(ball);
        }
        assert!(board.winning_line().is_some());
    }

    let duration = start.elapsed();
    println!("Board reset and draw: {} iterations in {:?}", iterations, duration);

    assert!(duration.as_millis() < 3000);
}

/// Benchmarks round message handling on a single coordinator
#[test]
fn benchmark_round_message_handling() {
    let mut coordinator = RoundCoordinator::new(BingoBoard::from_seed(7));

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let ball = (i % 75 + 1).to_string();
        let _ = coordinator.on_round_message(&ball);
    }

    let duration = start.elapsed();
    println!(
        "Round message handling: {} iterations in {:?}",
        iterations, duration
    );

    assert!(duration.as_millis() < 2000);
}
