use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn independent_keys_run_concurrently() {
    let seq: Sequencer<&str> = Sequencer::new();
    let a = seq.acquire("a", || async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        1
    });
    let b = seq.acquire("b", || async { 2 });
    let (a, b) = tokio::join!(a, b);
    assert_eq!((a, b), (1, 2));
}

#[tokio::test]
async fn same_key_calls_run_in_fifo_order_with_no_overlap() {
    let seq: Sequencer<&str> = Sequencer::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));

    for i in 0..5 {
        let order = order.clone();
        let active = active.clone();
        let max_active = max_active.clone();
        seq.acquire("shared", move || async move {
            let now_active = active.fetch_add(1, Ordering::SeqCst) + 1;
            max_active.fetch_max(now_active, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            order.lock().push(i);
            active.fetch_sub(1, Ordering::SeqCst);
        })
        .await;
    }

    assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    assert_eq!(max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_same_key_calls_never_overlap() {
    let seq = Arc::new(Sequencer::<&str>::new());
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for i in 0..10 {
        let seq = seq.clone();
        let active = active.clone();
        let max_active = max_active.clone();
        tasks.push(tokio::spawn(async move {
            seq.acquire("shared", move || async move {
                let now_active = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now_active, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                i
            })
            .await
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }
    assert_eq!(max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn errored_call_does_not_block_next_waiter() {
    let seq: Sequencer<&str> = Sequencer::new();
    let first: Result<(), &str> = seq.acquire("x", || async { Err("boom") }).await;
    assert!(first.is_err());

    let second: Result<(), &str> = seq.acquire("x", || async { Ok(()) }).await;
    assert!(second.is_ok());
}

#[tokio::test]
async fn entry_is_cleaned_up_after_the_last_waiter() {
    let seq: Sequencer<&str> = Sequencer::new();
    seq.acquire("x", || async {}).await;
    assert_eq!(seq.tracked_keys(), 0);
}
