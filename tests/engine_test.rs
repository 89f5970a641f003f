// tests/engine_test.rs
//
// Engine-level behaviour across modes: sealing and verifying in test mode,
// the fake variants, shared delegation and the close lifecycle.

use crossbeam_channel::bounded;
use frkhash_rs::epoch::{self, EPOCH_LENGTH};
use frkhash_rs::miner::algorithm::ethash::{generate_cache, hashimoto_light};
use frkhash_rs::miner::difficulty::{difficulty_to_target, result_meets_target};
use frkhash_rs::{Api, AlgorithmType, BlockNonce, Config, Engine, FrkhashError, Header, Lifecycle, PowMode, U256};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn header(number: u64, difficulty: u64) -> Header {
    Header {
        number,
        difficulty: U256::from(difficulty),
        ..Default::default()
    }
}

#[test]
fn test_mode_seals_and_verifies() {
    let engine = Engine::new_tester(Vec::new(), false).unwrap();
    engine.set_threads(2);
    let (results, sealed) = bounded(1);
    let (_stop_tx, stop) = bounded::<()>(0);
    engine.seal(header(1, 100), results, stop).unwrap();

    let block = sealed.recv_timeout(Duration::from_secs(30)).unwrap();
    assert_eq!(block.number, 1);
    assert!(engine.verify_seal(&block).is_ok());

    let mut tampered = block.clone();
    tampered.mix_digest[0] ^= 0xff;
    assert!(matches!(
        engine.verify_seal(&tampered),
        Err(FrkhashError::InvalidProofOfWork)
    ));
    engine.close().unwrap();
}

#[test]
fn frankomoto_engine_seals_without_dataset() {
    let engine = Engine::new(&Config {
        pow_mode: PowMode::Test,
        algorithm: AlgorithmType::Frankomoto,
        threads: 1,
        ..Config::default()
    })
    .unwrap();
    let (results, sealed) = bounded(1);
    let (_stop_tx, stop) = bounded::<()>(0);
    engine.seal(header(5, 50), results, stop).unwrap();

    let block = sealed.recv_timeout(Duration::from_secs(30)).unwrap();
    assert!(engine.verify_seal(&block).is_ok());
    assert!(!engine.core().algorithm().needs_lookup());
    engine.close().unwrap();
}

#[test]
fn zero_difficulty_is_rejected() {
    let engine = Engine::new_tester(Vec::new(), false).unwrap();
    let block = header(1, 0).with_seal(BlockNonce::from_u64(1), [0; 32]);
    assert!(matches!(
        engine.verify_seal(&block),
        Err(FrkhashError::InvalidDifficulty)
    ));
}

#[test]
fn fake_modes() {
    let bogus = header(10, 1_000_000).with_seal(BlockNonce::from_u64(3), [9; 32]);

    assert!(Engine::new_faker().verify_seal(&bogus).is_ok());
    assert!(Engine::new_full_faker().verify_seal(&bogus).is_ok());

    let failer = Engine::new_fake_failer(10);
    assert!(matches!(
        failer.verify_seal(&bogus),
        Err(FrkhashError::InvalidProofOfWork)
    ));
    assert!(failer.verify_seal(&header(11, 1)).is_ok());

    let delayer = Engine::new_fake_delayer(Duration::from_millis(100));
    let start = Instant::now();
    assert!(delayer.verify_seal(&bogus).is_ok());
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[test]
fn fake_seal_answers_immediately() {
    let engine = Engine::new_faker();
    let (results, sealed) = bounded(1);
    let (_stop_tx, stop) = bounded::<()>(0);
    engine.seal(header(7, 1_000_000), results, stop).unwrap();

    let block = sealed.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(block.nonce, BlockNonce::default());
    assert_eq!(block.mix_digest, [0; 32]);
    assert!(engine.remote().is_none());
    assert_eq!(engine.hashrate(), 0.0);
}

#[test]
fn concurrent_close_tears_down_once() {
    let engine = Engine::new_tester(Vec::new(), false).unwrap();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || engine.close())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
    assert_eq!(engine.lifecycle(), Lifecycle::Stopped);
    assert!(engine.close().is_ok());

    let (results, _sealed) = bounded(1);
    let (_stop_tx, stop) = bounded::<()>(0);
    assert!(matches!(
        engine.seal(header(1, 1), results, stop),
        Err(FrkhashError::EngineStopped)
    ));
}

#[test]
fn shared_engines_delegate() {
    let a = Engine::new_shared();
    let b = Engine::new(&Config {
        pow_mode: PowMode::Shared,
        ..Config::default()
    })
    .unwrap();
    assert_eq!(a.mode(), PowMode::Shared);
    assert!(Arc::ptr_eq(a.core(), b.core()));
    assert!(Arc::ptr_eq(a.core(), Engine::shared().core()));

    let before = Engine::shared().threads();
    a.set_threads(-1);
    assert_eq!(b.threads(), -1);
    assert_eq!(Engine::shared().threads(), -1);
    a.set_threads(before);
}

#[test]
fn closed_shared_handle_stops_serving() {
    let engine = Engine::new_shared();
    let api = Api::new(engine.clone());
    assert!(api.submit_hashrate(100, [7; 32]));
    engine.close().unwrap();

    assert!(matches!(api.get_work(), Err(FrkhashError::EngineStopped)));
    assert!(!api.submit_hashrate(100, [7; 32]));
    assert!(!api.submit_work(BlockNonce::default(), [0; 32], [0; 32]));

    // the process-wide engine keeps running for other handles
    assert_eq!(Engine::shared().lifecycle(), Lifecycle::Running);
    let other = Api::new(Engine::new_shared());
    assert!(other.submit_hashrate(100, [8; 32]));
}

#[test]
fn apis_expose_both_namespaces() {
    let engine = Engine::new_faker();
    let apis = engine.apis();
    let namespaces: Vec<_> = apis.iter().map(|api| api.namespace).collect();
    assert_eq!(namespaces, ["eth", "frkhash"]);
    assert!(apis.iter().all(|api| api.public && api.version == "1.0"));
}

/// Seals a test-mode header by hand against the light cache of its epoch
fn hand_sealed(number: u64, difficulty: u64) -> Header {
    let block = header(number, difficulty);
    let cache = generate_cache(1024, &epoch::seed_hash_for_epoch(epoch::epoch(number)));
    let target = difficulty_to_target(&block.difficulty).unwrap();
    let hash = block.seal_hash();
    (0u64..)
        .find_map(|nonce| {
            let (digest, result) = hashimoto_light(32 * 1024, &cache, &hash, nonce);
            result_meets_target(&result, &target)
                .then(|| block.with_seal(BlockNonce::from_u64(nonce), digest))
        })
        .unwrap()
}

#[test]
fn concurrent_verification_across_epochs() {
    // one cache slot: every epoch switch evicts another thread's cache
    let engine = Engine::new_tester(Vec::new(), false).unwrap();
    engine.set_threads(-1);
    let blocks: Arc<Vec<Header>> = Arc::new(
        (0..4u64)
            .map(|e| hand_sealed(e * EPOCH_LENGTH + 1, 20))
            .collect(),
    );

    let handles: Vec<_> = (0..8usize)
        .map(|t| {
            let engine = engine.clone();
            let blocks = blocks.clone();
            thread::spawn(move || {
                for round in 0..6 {
                    for i in 0..blocks.len() {
                        let block = &blocks[(i + t + round) % blocks.len()];
                        assert!(engine.verify_seal(block).is_ok(), "block {}", block.number);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // a seal from one epoch does not carry over to another
    let mut moved = blocks[2].clone();
    moved.number = blocks[1].number;
    assert!(engine.verify_seal(&moved).is_err());
    engine.close().unwrap();
}

