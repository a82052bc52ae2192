use resonance::application::deduplicator::Deduplicator;
use resonance::domain::detection::Detection;
use resonance::domain::market::Interval;
use resonance::infrastructure::mock::sample_detection;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_candidates_admit_exactly_one() {
    let dedup = Arc::new(Deduplicator::new(Duration::from_secs(300), None));
    let detection = sample_detection("BTC-USD", 1_704_067_200_000);

    let mut handles = Vec::new();
    for _ in 0..32 {
        let dedup = dedup.clone();
        let detection = detection.clone();
        handles.push(tokio::spawn(async move { dedup.admit(&detection) }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(dedup.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_keys_do_not_block_each_other() {
    let dedup = Arc::new(Deduplicator::new(Duration::from_secs(300), None));

    let mut handles = Vec::new();
    for i in 0..16 {
        let dedup = dedup.clone();
        let detection = sample_detection(&format!("PAIR{}-USD", i), 0);
        handles.push(tokio::spawn(async move { dedup.admit(&detection) }));
    }

    for handle in handles {
        assert!(handle.await.unwrap());
    }
    assert_eq!(dedup.len(), 16);
}

fn at(timestamp: i64) -> Detection {
    sample_detection("ETH-USD", timestamp)
}

#[test]
fn test_cooldown_window_is_exclusive() {
    let dedup = Deduplicator::new(Duration::from_secs(60), None);

    assert!(dedup.admit(&at(0)));
    // Same bucket, same id
    assert!(!dedup.admit(&at(30_000)));
    // New bucket but exactly at the cool-down boundary
    assert!(!dedup.admit(&at(60_000)));
    // Strictly past the cool-down
    assert!(dedup.admit(&at(120_000)));
}

#[test]
fn test_interval_is_part_of_the_key() {
    let dedup = Deduplicator::new(Duration::from_secs(60), None);
    let one_min = at(0);
    let mut five_min = at(0);
    five_min.interval = Interval::FiveMin;

    assert!(dedup.admit(&one_min));
    assert!(dedup.admit(&five_min));
}
