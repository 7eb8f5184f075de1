//! Worker and manager lifecycle, driven with scripted in-memory
//! transports.

mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dotchat_common::proto::requests::LoginRequest;
use dotchat_common::proto::responses::{self, TokenResponse};
use dotchat_common::Message;
use dotchat_server::manager::ConnectionManager;
use dotchat_server::store::Store;
use dotchat_server::worker::{Worker, WorkerState};

use support::transport_pair;

fn login_message() -> Message {
    LoginRequest {
        user: "master".into(),
        pass: "pass".into(),
    }
    .to_message()
}

fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    check()
}

#[test]
fn test_worker_answers_requests() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let (transport, peer) = transport_pair();
    let mut worker = Worker::spawn(transport, store).unwrap();

    peer.send_message(&login_message());
    let reply = peer.recv_message();
    let token = TokenResponse::from_message(&reply).unwrap().token;
    assert_ne!(token, 0);

    drop(peer);
    worker.join();
    assert_eq!(worker.state(), WorkerState::Finished);
}

#[test]
fn test_worker_finishes_on_peer_close() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let (transport, mut peer) = transport_pair();
    let mut worker = Worker::spawn(transport, store).unwrap();

    peer.hang_up();
    worker.join();
    assert_eq!(worker.state(), WorkerState::Finished);
    assert!(peer.worker_closed());
}

#[test]
fn test_worker_handles_split_and_coalesced_reads() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let (transport, peer) = transport_pair();
    let mut worker = Worker::spawn(transport, store).unwrap();

    // one message delivered a byte at a time
    for byte in support::encode(&login_message()) {
        peer.send_bytes(vec![byte]);
    }
    assert_eq!(peer.recv_message().command(), responses::OK);

    // two messages coalesced into a single chunk
    let mut chunk = support::encode(&login_message());
    chunk.extend(support::encode(&login_message()));
    peer.send_bytes(chunk);
    assert_eq!(peer.recv_message().command(), responses::OK);
    assert_eq!(peer.recv_message().command(), responses::OK);

    drop(peer);
    worker.join();
}

#[test]
fn test_worker_closes_on_bad_framing() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let (transport, peer) = transport_pair();
    let mut worker = Worker::spawn(transport, store).unwrap();

    peer.send_bytes(vec![0xFF, 0xFF, 0x00, 0x00]);
    worker.join();
    assert_eq!(worker.state(), WorkerState::Finished);
    assert!(peer.worker_closed());
}

#[test]
fn test_worker_observes_stop_between_messages() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let (transport, peer) = transport_pair();
    let mut worker = Worker::spawn(transport, store).unwrap();

    peer.send_message(&login_message());
    peer.recv_message();

    worker.request_stop();
    // the worker is blocked in a read; the next message lets it run its
    // loop once and observe the stop request
    peer.send_message(&login_message());
    worker.join();
    assert_eq!(worker.state(), WorkerState::Stopped);
    assert!(peer.worker_closed());
}

#[test]
fn test_enlist_k_connections_yields_k_workers() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let manager = Arc::new(ConnectionManager::new());

    const K: usize = 12;
    let mut peers = Vec::new();
    let mut handles = Vec::new();
    for _ in 0..K {
        let (transport, peer) = transport_pair();
        peers.push(peer);
        let manager = Arc::clone(&manager);
        let store = Arc::clone(&store);
        handles.push(std::thread::spawn(move || {
            manager.enlist(transport, store).unwrap()
        }));
    }
    let ids: std::collections::HashSet<u64> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(ids.len(), K);
    assert_eq!(manager.worker_count(), K);

    drop(peers);
    let manager = Arc::try_unwrap(manager).ok().expect("sole owner");
    manager.shutdown_all();
}

#[test]
fn test_reaper_removes_terminated_workers() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let manager = ConnectionManager::with_reap_interval(Duration::from_millis(20));

    let (transport, peer) = transport_pair();
    manager.enlist(transport, Arc::clone(&store)).unwrap();
    assert_eq!(manager.worker_count(), 1);

    // peer close terminates the worker; the reaper removes it within a
    // couple of sleep periods
    drop(peer);
    assert!(wait_until(Duration::from_secs(2), || {
        manager.worker_count() == 0
    }));
}

#[test]
fn test_shutdown_drains_all_workers() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let manager = ConnectionManager::new();

    let mut peers = Vec::new();
    for _ in 0..2 {
        let (transport, peer) = transport_pair();
        manager.enlist(transport, Arc::clone(&store)).unwrap();
        peers.push(peer);
    }

    // both workers are mid-conversation
    for peer in &peers {
        peer.send_message(&login_message());
        peer.recv_message();
    }

    let states = manager.states();
    assert_eq!(states.len(), 2);
    assert!(states
        .iter()
        .all(|(_, state)| *state == WorkerState::Running));

    // a blocked worker observes the stop request once its read completes
    let handle = std::thread::spawn(move || manager.shutdown_all());
    std::thread::sleep(Duration::from_millis(50));
    for peer in &peers {
        peer.send_message(&login_message());
    }
    handle.join().unwrap();

    assert!(peers.iter().all(|peer| peer.worker_closed()));
}
