use makstat_rs::RequestGeneration;

#[test]
fn newest_token_wins() {
    let generation = RequestGeneration::new();
    let first = generation.begin();
    assert!(generation.is_current(first));

    // A newer request invalidates the one in flight.
    let second = generation.begin();
    assert!(!generation.is_current(first));
    assert!(generation.is_current(second));
}

#[test]
fn tokens_are_monotonic_across_threads() {
    use std::sync::Arc;

    let generation = Arc::new(RequestGeneration::new());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let generation = Arc::clone(&generation);
        handles.push(std::thread::spawn(move || {
            (0..100).map(|_| generation.begin()).collect::<Vec<u64>>()
        }));
    }
    let mut all: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_unstable();
    all.dedup();
    // No two requests ever share a token.
    assert_eq!(all.len(), 800);

    // Only the newest token is current.
    let newest = *all.last().unwrap();
    assert!(generation.is_current(newest));
    assert!(!generation.is_current(newest - 1));
}
