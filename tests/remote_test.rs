// tests/remote_test.rs
//
// Remote mining through the RPC façade: work distribution, submissions,
// hashrate reports, notifications and behaviour after close.

use crossbeam_channel::{Sender, bounded};
use frkhash_rs::miner::algorithm::ethash::{generate_cache, hashimoto_light};
use frkhash_rs::miner::difficulty::{difficulty_to_target, result_meets_target};
use frkhash_rs::utils::hexutil;
use frkhash_rs::{Api, BlockNonce, Config, Engine, FrkhashError, H256, Header, PowMode, U256};
use serde_json::json;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::{Duration, Instant};
use url::Url;

fn remote_only_tester(notify: Vec<Url>) -> Engine {
    let engine = Engine::new_tester(notify, false).unwrap();
    engine.set_threads(-1);
    engine
}

fn push(engine: &Engine, difficulty: u64, results: &Sender<Header>) -> Header {
    let header = Header {
        number: 1,
        difficulty: U256::from(difficulty),
        ..Default::default()
    };
    // the stop sender is leaked so the idle runner keeps waiting
    let (stop_tx, stop) = bounded::<()>(0);
    std::mem::forget(stop_tx);
    engine.seal(header.clone(), results.clone(), stop).unwrap();
    header
}

/// Brute-forces a nonce for a test-mode header of epoch 0
fn solve(header: &Header) -> (BlockNonce, H256) {
    let cache = generate_cache(1024, &[0; 32]);
    let target = difficulty_to_target(&header.difficulty).unwrap();
    let hash = header.seal_hash();
    (0u64..)
        .find_map(|nonce| {
            let (digest, result) = hashimoto_light(32 * 1024, &cache, &hash, nonce);
            result_meets_target(&result, &target).then_some((BlockNonce::from_u64(nonce), digest))
        })
        .unwrap()
}

#[test]
fn get_work_before_any_push() {
    let engine = remote_only_tester(Vec::new());
    let api = Api::new(engine.clone());
    assert!(matches!(api.get_work(), Err(FrkhashError::NoMiningWork)));
    engine.close().unwrap();
}

#[test]
fn fabricated_solution_is_rejected() {
    let engine = remote_only_tester(Vec::new());
    let api = Api::new(engine.clone());
    let (results, _sealed) = bounded(1);
    let header = push(&engine, 100, &results);

    assert!(!api.submit_work(BlockNonce::from_u64(1), header.seal_hash(), [0x42; 32]));
    assert!(!api.submit_work(BlockNonce::from_u64(1), [0x13; 32], [0x42; 32]));
    engine.close().unwrap();
}

#[test]
fn superseded_work_stays_solvable_once() {
    let engine = remote_only_tester(Vec::new());
    let api = Api::new(engine.clone());
    let (results, sealed) = bounded(4);

    let first = push(&engine, 100, &results);
    let second = push(&engine, 1000, &results);
    let work = api.get_work().unwrap();
    assert_eq!(work[0], hexutil::encode(second.seal_hash()));
    assert_eq!(work[3], "0x1");

    let (nonce, digest) = solve(&first);
    assert!(api.submit_work(nonce, first.seal_hash(), digest));
    assert!(!api.submit_work(nonce, first.seal_hash(), digest));
    // the newer package for the same block is settled by that delivery
    let (second_nonce, second_digest) = solve(&second);
    assert!(!api.submit_work(second_nonce, second.seal_hash(), second_digest));

    let block = sealed.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(block.seal_hash(), first.seal_hash());
    assert_eq!(block.nonce, nonce);
    assert!(engine.verify_seal(&block).is_ok());
    engine.close().unwrap();
}

#[test]
fn json_dispatch_round_trip() {
    let engine = remote_only_tester(Vec::new());
    let api = Api::new(engine.clone());
    let (results, sealed) = bounded(1);
    let header = push(&engine, 100, &results);

    let response = api.handle_request(&json!({
        "jsonrpc": "2.0", "id": 1, "method": "eth_getWork", "params": []
    }));
    assert_eq!(response["result"][0], hexutil::encode(header.seal_hash()));

    let (nonce, digest) = solve(&header);
    let response = api.handle_request(&json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "frkhash_submitWork",
        "params": [
            hexutil::encode(nonce.0),
            hexutil::encode(header.seal_hash()),
            hexutil::encode(digest),
        ]
    }));
    assert_eq!(response["result"], true);
    assert!(sealed.recv_timeout(Duration::from_secs(5)).is_ok());
    engine.close().unwrap();
}

#[test]
fn hashrates_are_aggregated() {
    let engine = remote_only_tester(Vec::new());
    let api = Api::new(engine.clone());
    assert!(api.submit_hashrate(100, [1; 32]));
    assert!(api.submit_hashrate(200, [2; 32]));
    assert!(api.submit_hashrate(300, [3; 32]));

    assert_eq!(engine.remote().unwrap().aggregate_hashrate().unwrap(), 600);
    let local = engine.local_hashrate().rate1;
    assert!((engine.hashrate() - (local + 600.0)).abs() < 1e-6);
    assert_eq!(api.get_hashrate(), 600);
    engine.close().unwrap();
}

#[test]
fn closed_engine_stops_serving() {
    let engine = remote_only_tester(Vec::new());
    let api = Api::new(engine.clone());
    assert!(api.submit_hashrate(100, [1; 32]));
    engine.close().unwrap();

    assert!(matches!(api.get_work(), Err(FrkhashError::EngineStopped)));
    assert!(!api.submit_hashrate(100, [1; 32]));
    assert!(!api.submit_work(BlockNonce::default(), [0; 32], [0; 32]));
    // falls back to the local meter instead of blocking
    assert_eq!(api.get_hashrate(), 0);
}

/// Accepts one notification and reads it until `marker` shows up
fn receive_notification(listener: &TcpListener, marker: &str) -> String {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut stream = loop {
        match listener.accept() {
            Ok((stream, _)) => break stream,
            Err(_) if Instant::now() < deadline => std::thread::sleep(Duration::from_millis(20)),
            Err(e) => panic!("no notification received: {}", e),
        }
    };
    stream.set_nonblocking(false).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    let mut received = Vec::new();
    let mut buf = [0u8; 4096];
    while !String::from_utf8_lossy(&received).contains(marker) {
        let n = stream.read(&mut buf).unwrap();
        assert!(n > 0, "connection closed before the work arrived");
        received.extend_from_slice(&buf[..n]);
    }
    let _ = stream.write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n");
    String::from_utf8_lossy(&received).into_owned()
}

fn listener_url() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
    (listener, url)
}

#[test]
fn new_work_is_posted_to_listeners() {
    let (listener, url) = listener_url();
    let engine = remote_only_tester(vec![url]);
    let (results, _sealed) = bounded(1);
    let header = push(&engine, 100, &results);

    let request = receive_notification(&listener, &hexutil::encode(header.seal_hash()));
    assert!(request.starts_with("POST"));
    assert!(!request.contains("mixHash"));
    engine.close().unwrap();
}

#[test]
fn full_notifications_carry_the_header() {
    let (listener, url) = listener_url();
    let engine = Engine::new(&Config {
        pow_mode: PowMode::Test,
        notify: vec![url],
        notify_full: true,
        ..Config::default()
    })
    .unwrap();
    engine.set_threads(-1);
    let (results, _sealed) = bounded(1);
    push(&engine, 100, &results);

    // the header is a flat object, so its closing brace ends the body
    let request = receive_notification(&listener, "\"}");
    assert!(request.contains("\"mixHash\""));
    let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
    let posted: Header = serde_json::from_str(body).unwrap();
    assert_eq!(posted.number, 1);
    assert_eq!(posted.difficulty, U256::from(100u64));
    assert!(request.contains("\"difficulty\":\"0x64\""));
    engine.close().unwrap();
}
