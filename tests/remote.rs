use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use num::bigint::BigUint;
use tiny_http::Response;

use bleichenbacher::attack::Error as AttackError;
use bleichenbacher::cache::QueryCache;
use bleichenbacher::oracle::Error;
use bleichenbacher::vectors;
use bleichenbacher::{Attack, Config, LocalOracle, Oracle, RemoteOracle};

const K: usize = 48;
const TIMEOUT: Duration = Duration::from_secs(5);

/// Loopback oracle service answering `GET /<hex>` with a status and body
struct Server {
    url: String,
    hits: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Server {
    fn spawn<F>(answer: F) -> Self
    where
        F: Fn(&str) -> String + Send + 'static,
    {
        Self::spawn_with_status(move |data| (200, answer(data)))
    }

    fn spawn_with_status<F>(answer: F) -> Self
    where
        F: Fn(&str) -> (u16, String) + Send + 'static,
    {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let url = format!("http://{}:{}", addr.ip(), addr.port());

        let hits = Arc::new(AtomicUsize::new(0));
        let paths = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));

        let (thread_hits, thread_paths, thread_running) = (hits.clone(), paths.clone(), running.clone());
        let worker = thread::spawn(move || {
            while thread_running.load(Ordering::Acquire) {
                let request = match server.recv_timeout(Duration::from_millis(100)) {
                    Ok(Some(request)) => request,
                    _ => continue,
                };

                let path = request.url().to_string();
                thread_hits.fetch_add(1, Ordering::SeqCst);
                let (status, body) = answer(path.trim_start_matches('/'));
                thread_paths.lock().unwrap().push(path);

                let _ = request.respond(Response::from_string(body).with_status_code(status));
            }
        });

        Self {
            url,
            hits,
            paths,
            running,
            worker: Some(worker),
        }
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

// an address with nothing listening on it
fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    format!("http://{}", listener.local_addr().unwrap())
}

#[test]
fn answers_are_memoized() {
    let server = Server::spawn(|_| "1".to_string());
    let mut oracle = RemoteOracle::new(&server.url, K, QueryCache::in_memory(), TIMEOUT).unwrap();

    let c = BigUint::from(0xabcd_u32);
    assert!(oracle.conforming(&c).unwrap());
    assert!(oracle.conforming(&c).unwrap());

    assert_eq!(server.hits(), 1);
    assert_eq!(oracle.cache().len(), 1);

    let paths = server.paths.lock().unwrap();
    assert_eq!(paths[0], format!("/{}abcd", "0".repeat(2 * K - 4)));
}

#[test]
fn only_one_means_conforming() {
    let server = Server::spawn(|data| {
        let body = match data.chars().last() {
            Some('1') => "1",
            Some('2') => "true",
            Some('3') => "11",
            _ => "0",
        };
        body.to_string()
    });
    let mut oracle = RemoteOracle::new(&server.url, K, QueryCache::in_memory(), TIMEOUT).unwrap();

    assert!(oracle.conforming(&BigUint::from(1_u32)).unwrap());
    assert!(!oracle.conforming(&BigUint::from(2_u32)).unwrap());
    assert!(!oracle.conforming(&BigUint::from(3_u32)).unwrap());
    assert!(!oracle.conforming(&BigUint::from(4_u32)).unwrap());
    assert_eq!(server.hits(), 4);
}

#[test]
fn unreachable_oracle_is_an_error() {
    let mut oracle = RemoteOracle::new(&dead_url(), K, QueryCache::in_memory(), TIMEOUT).unwrap();

    match oracle.conforming(&BigUint::from(7_u32)) {
        Err(Error::Transport(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(oracle.cache().is_empty());
}

#[test]
fn server_errors_are_not_answers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let server = Server::spawn_with_status(|data| {
        if data.ends_with('9') {
            (503, "Service Unavailable".to_string())
        } else {
            (404, "0".to_string())
        }
    });

    let mut oracle = RemoteOracle::new(&server.url, K, QueryCache::open(&path), TIMEOUT).unwrap();
    match oracle.conforming(&BigUint::from(9_u32)) {
        Err(Error::Transport(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(oracle.cache().is_empty());

    // a client error still carries an answer
    assert!(!oracle.conforming(&BigUint::from(8_u32)).unwrap());
    assert_eq!(oracle.cache().len(), 1);
    drop(oracle);

    let reloaded = QueryCache::open(&path);
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.get(&format!("{}09", "0".repeat(2 * K - 2))), None);
}

#[test]
fn persisted_cache_warm_starts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let server = Server::spawn(|data| {
        let body = if data.ends_with('5') { "1" } else { "0" };
        body.to_string()
    });

    let mut oracle = RemoteOracle::new(&server.url, K, QueryCache::open(&path), TIMEOUT).unwrap();
    assert!(oracle.conforming(&BigUint::from(5_u32)).unwrap());
    assert!(!oracle.conforming(&BigUint::from(6_u32)).unwrap());
    assert_eq!(server.hits(), 2);

    // pending answers are written when the oracle goes away
    drop(oracle);

    // nothing is listening now, so any answer must come from the file
    let mut restarted = RemoteOracle::new(&dead_url(), K, QueryCache::open(&path), TIMEOUT).unwrap();
    assert_eq!(restarted.cache().len(), 2);
    assert!(restarted.conforming(&BigUint::from(5_u32)).unwrap());
    assert!(!restarted.conforming(&BigUint::from(6_u32)).unwrap());
}

#[test]
fn interrupted_remote_attack_resumes_from_cache() {
    let fixture = vectors::fixed().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");

    let key = fixture.key.clone();
    let server = Server::spawn(move |data| {
        let c = BigUint::from_bytes_be(&hex::decode(data).unwrap_or_default());
        let mut local = LocalOracle::new(key.clone());
        match local.conforming(&c) {
            Ok(true) => "1".to_string(),
            _ => "0".to_string(),
        }
    });

    let config = Config {
        query_limit: Some(50),
        ..Config::default()
    };
    let attack = |url: &str| {
        let oracle = RemoteOracle::new(url, K, QueryCache::open(&path), TIMEOUT).unwrap();
        Attack::new(
            oracle,
            fixture.key.public().clone(),
            fixture.ciphertext.clone(),
            config.clone(),
        )
        .unwrap()
        .run()
    };

    match attack(&server.url) {
        Err(AttackError::Oracle(Error::QueryLimit(50))) => (),
        other => panic!("unexpected result: {:?}", other.map(|r| r.value)),
    }
    assert_eq!(server.hits(), 50);

    // the same 50 queries replay from the cache without a server
    match attack(&dead_url()) {
        Err(AttackError::Oracle(Error::QueryLimit(50))) => (),
        other => panic!("unexpected result: {:?}", other.map(|r| r.value)),
    }
}
