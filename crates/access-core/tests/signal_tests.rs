//! Signal tests exercising cross-thread use.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use access_core::Signal;
use parking_lot::Mutex;

#[test]
fn test_cross_thread_emit_runs_on_emitting_thread() {
    let signal = Arc::new(Signal::<i32>::new());
    let received = Arc::new(Mutex::new(Vec::new()));
    let slot_thread = Arc::new(Mutex::new(None));

    let received_clone = received.clone();
    let slot_thread_clone = slot_thread.clone();
    signal.connect(move |&value| {
        received_clone.lock().push(value);
        *slot_thread_clone.lock() = Some(std::thread::current().id());
    });

    let signal_clone = signal.clone();
    let handle = std::thread::spawn(move || {
        signal_clone.emit(100);
        std::thread::current().id()
    });
    let emitting_thread_id = handle.join().unwrap();

    assert_eq!(*received.lock(), vec![100]);
    assert_eq!(*slot_thread.lock(), Some(emitting_thread_id));
}

#[test]
fn test_emit_from_multiple_threads() {
    let signal = Arc::new(Signal::<usize>::new());
    let counter = Arc::new(AtomicUsize::new(0));

    let counter_clone = counter.clone();
    signal.connect(move |_| {
        counter_clone.fetch_add(1, Ordering::SeqCst);
    });

    let num_threads = 8;
    let emissions_per_thread = 50;

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let signal_clone = signal.clone();
            std::thread::spawn(move || {
                for i in 0..emissions_per_thread {
                    signal_clone.emit(i);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        counter.load(Ordering::SeqCst),
        num_threads * emissions_per_thread
    );
}

#[test]
fn test_static_signal_with_scoped_connection() {
    static EVENTS: OnceLock<Signal<String>> = OnceLock::new();
    let signal = EVENTS.get_or_init(Signal::new);

    let received = Arc::new(Mutex::new(Vec::new()));
    let received_clone = received.clone();
    let guard = signal.connect_scoped(move |s: &String| {
        received_clone.lock().push(s.clone());
    });

    let worker = std::thread::spawn(move || {
        signal.emit("from worker".to_string());
    });
    worker.join().unwrap();

    drop(guard);
    signal.emit("after guard".to_string());

    assert_eq!(*received.lock(), vec!["from worker".to_string()]);
}
