use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use tiller_engine::rate_limit::{FixedWindowLimiter, RateLimitConfig};

#[test]
fn admits_up_to_the_cap_then_rejects() {
    let limiter = FixedWindowLimiter::new(RateLimitConfig {
        window: Duration::from_secs(60),
        max_requests: 100,
    });

    for i in 0..100 {
        assert!(limiter.admit("client-a"), "request {i} should be admitted");
    }
    assert!(!limiter.admit("client-a"), "101st request must be rejected");
    assert!(!limiter.admit("client-a"));
    assert_eq!(limiter.remaining("client-a"), 0);
}

#[test]
fn identities_have_independent_windows() {
    let limiter = FixedWindowLimiter::new(RateLimitConfig {
        window: Duration::from_secs(60),
        max_requests: 1,
    });

    assert!(limiter.admit("client-a"));
    assert!(!limiter.admit("client-a"));
    assert!(limiter.admit("client-b"));
}

#[test]
fn window_expiry_resets_the_counter() {
    let limiter = FixedWindowLimiter::new(RateLimitConfig {
        window: Duration::from_millis(50),
        max_requests: 2,
    });

    assert!(limiter.admit("client-a"));
    assert!(limiter.admit("client-a"));
    assert!(!limiter.admit("client-a"));

    std::thread::sleep(Duration::from_millis(80));
    assert!(limiter.admit("client-a"), "new window should admit again");
}

#[test]
fn concurrent_admits_never_exceed_the_cap() {
    let limiter = Arc::new(FixedWindowLimiter::new(RateLimitConfig {
        window: Duration::from_secs(60),
        max_requests: 50,
    }));
    let admitted = Arc::new(AtomicU32::new(0));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let limiter = limiter.clone();
            let admitted = admitted.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                for _ in 0..20 {
                    if limiter.admit("shared") {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // 160 attempts against a cap of 50: exactly 50 may win.
    assert_eq!(admitted.load(Ordering::SeqCst), 50);
}
