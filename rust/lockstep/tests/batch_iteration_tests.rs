use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use lockstep::{BatchIterator, Concurrency};

#[test]
fn test_groups_never_overlap_in_time() {
    let items: Vec<usize> = (0..6).collect();
    let windows: Mutex<Vec<(usize, Instant, Instant)>> = Mutex::new(Vec::new());

    let batch = BatchIterator::with_concurrency(&items, Concurrency::new(2).unwrap());
    batch.each(|&i| {
        let started = Instant::now();
        thread::sleep(Duration::from_millis(20));
        windows.lock().unwrap().push((i, started, Instant::now()));
    });

    let windows = windows.into_inner().unwrap();
    assert_eq!(windows.len(), 6);

    // Every element of an earlier group must have finished before any
    // element of a later group started.
    let group_of = |i: usize| i / 2;
    for (i, _, end_i) in &windows {
        for (j, start_j, _) in &windows {
            if group_of(*i) < group_of(*j) {
                assert!(
                    end_i <= start_j,
                    "element {i} was still running when element {j} started"
                );
            }
        }
    }
}

#[test]
fn test_elements_within_a_group_run_concurrently() {
    let items: Vec<usize> = (0..6).collect();
    let batch = BatchIterator::with_concurrency(&items, Concurrency::new(2).unwrap());

    let started = Instant::now();
    batch.each(|_| thread::sleep(Duration::from_millis(50)));
    let elapsed = started.elapsed();

    // Three groups of two run back to back, so three sleeps is the floor.
    // The two sleeps inside each group overlap, which keeps the total well
    // under the six sleeps a serial run would take.
    assert!(elapsed >= Duration::from_millis(150), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(270), "elapsed {elapsed:?}");
}

#[test]
fn test_in_flight_work_never_exceeds_concurrency() {
    let items: Vec<usize> = (0..20).collect();
    let in_flight = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    let batch = BatchIterator::with_concurrency(&items, Concurrency::new(3).unwrap());
    batch.each(|_| {
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        in_flight.fetch_sub(1, Ordering::SeqCst);
    });

    let peak = peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "observed {peak} elements in flight");
    assert!(peak >= 2, "no overlap observed");
}

#[test]
fn test_map_order_is_independent_of_completion_order() {
    let items: Vec<u64> = (0..12).collect();
    let batch = BatchIterator::with_concurrency(&items, Concurrency::new(4).unwrap());

    // Within each group of four, later elements finish first.
    let outputs = batch.map(|&n| {
        thread::sleep(Duration::from_millis(30 - 10 * (n % 4)));
        n * 100
    });

    let expected: Vec<u64> = items.iter().map(|n| n * 100).collect();
    assert_eq!(outputs, expected);
}

#[test]
fn test_detect_with_unit_groups_stops_immediately() {
    let items = vec![1, 2];
    let visited = AtomicUsize::new(0);

    let batch = BatchIterator::with_concurrency(&items, Concurrency::new(1).unwrap());
    let found = batch.detect(|_| {
        visited.fetch_add(1, Ordering::SeqCst);
        true
    });

    assert_eq!(found, Some(&1));
    assert_eq!(visited.load(Ordering::SeqCst), 1);
}

#[test]
fn test_randomized_map_matches_sequential_run() {
    fastrand::seed(7316589120456531044);
    let items: Vec<(u32, u64)> = (0..200)
        .map(|_| (fastrand::u32(..), fastrand::u64(0..4)))
        .collect();
    let expected: Vec<u64> = items.iter().map(|(x, _)| u64::from(*x) * 31).collect();

    let batch = BatchIterator::with_concurrency(&items, Concurrency::new(7).unwrap());
    let outputs = batch.map(|&(x, delay)| {
        thread::sleep(Duration::from_millis(delay));
        u64::from(x) * 31
    });

    assert_eq!(outputs, expected);
}

#[test]
fn test_randomized_select_matches_sequential_filter() {
    fastrand::seed(420013740359);
    let items: Vec<u8> = (0..500).map(|_| fastrand::u8(..)).collect();
    let expected: Vec<u8> = items.iter().copied().filter(|x| x % 5 == 0).collect();

    let batch = BatchIterator::with_concurrency(&items, Concurrency::new(8).unwrap());
    let selected: Vec<u8> = batch.select(|x| x % 5 == 0).into_iter().copied().collect();
    assert_eq!(selected, expected);
}

#[test]
fn test_results_borrow_from_the_input() {
    let items: Vec<String> = ["aa", "bb", "cc", "dd"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let batch = BatchIterator::with_concurrency(&items, Concurrency::new(2).unwrap());

    let found = batch.detect(|s| s.starts_with('c')).unwrap();
    assert!(std::ptr::eq(found, &items[2]));

    let selected = batch.select(|s| !s.is_empty());
    assert_eq!(selected.len(), items.len());
    for (kept, original) in selected.iter().zip(items.iter()) {
        assert!(std::ptr::eq(*kept, original));
    }
}

#[test]
fn test_each_aggregates_through_shared_state() {
    let items: Vec<u64> = (1..=100).collect();
    let total = Mutex::new(0u64);

    let batch = BatchIterator::with_concurrency(&items, Concurrency::new(5).unwrap());
    batch.each(|&n| *total.lock().unwrap() += n);

    assert_eq!(total.into_inner().unwrap(), 5050);
}
