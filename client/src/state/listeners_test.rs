use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

fn recorder() -> (Arc<Mutex<Vec<Option<i32>>>>, impl Fn(Option<&i32>) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |value: Option<&i32>| sink.lock().unwrap().push(value.copied()))
}

#[test]
fn notify_delivers_to_every_listener_in_order() {
    let listeners = Listeners::<i32>::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let a = {
        let order = Arc::clone(&order);
        listeners.subscribe(move |_| order.lock().unwrap().push("a"))
    };
    let b = {
        let order = Arc::clone(&order);
        listeners.subscribe(move |_| order.lock().unwrap().push("b"))
    };

    listeners.notify(Some(&1));
    assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    drop((a, b));
}

#[test]
fn notify_passes_none() {
    let listeners = Listeners::<i32>::new();
    let (seen, listener) = recorder();
    let _sub = listeners.subscribe(listener);

    listeners.notify(None);
    listeners.notify(Some(&5));
    assert_eq!(*seen.lock().unwrap(), vec![None, Some(5)]);
}

#[test]
fn dropping_subscription_unsubscribes() {
    let listeners = Listeners::<i32>::new();
    let (seen, listener) = recorder();
    let sub = listeners.subscribe(listener);
    assert_eq!(listeners.len(), 1);

    drop(sub);
    assert!(listeners.is_empty());
    listeners.notify(Some(&1));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn unsubscribe_only_removes_its_own_listener() {
    let listeners = Listeners::<i32>::new();
    let (seen_a, a) = recorder();
    let (seen_b, b) = recorder();
    let sub_a = listeners.subscribe(a);
    let _sub_b = listeners.subscribe(b);

    sub_a.unsubscribe();
    listeners.notify(Some(&2));
    assert!(seen_a.lock().unwrap().is_empty());
    assert_eq!(*seen_b.lock().unwrap(), vec![Some(2)]);
}

#[test]
fn detached_listener_stays_registered() {
    let listeners = Listeners::<i32>::new();
    let (seen, listener) = recorder();
    listeners.subscribe(listener).detach();

    listeners.notify(Some(&3));
    assert_eq!(*seen.lock().unwrap(), vec![Some(3)]);
    assert_eq!(listeners.len(), 1);
}

#[test]
fn subscription_outliving_registry_is_harmless() {
    let listeners = Listeners::<i32>::new();
    let sub = listeners.subscribe(|_| {});
    drop(listeners);
    sub.unsubscribe();
}

#[test]
fn listener_added_during_notify_misses_that_notification() {
    let listeners = Arc::new(Listeners::<i32>::new());
    let late_calls = Arc::new(AtomicUsize::new(0));
    let late_subs = Arc::new(Mutex::new(Vec::new()));

    let _outer = {
        let registry = Arc::clone(&listeners);
        let late_calls = Arc::clone(&late_calls);
        let late_subs = Arc::clone(&late_subs);
        listeners.subscribe(move |_| {
            let late_calls = Arc::clone(&late_calls);
            let sub = registry.subscribe(move |_| {
                late_calls.fetch_add(1, Ordering::SeqCst);
            });
            late_subs.lock().unwrap().push(sub);
        })
    };

    listeners.notify(Some(&1));
    assert_eq!(late_calls.load(Ordering::SeqCst), 0);

    // The listener added by the first round hears the second one.
    listeners.notify(Some(&2));
    assert_eq!(late_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn listener_may_unsubscribe_itself_during_notify() {
    let listeners = Listeners::<i32>::new();
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    let calls = Arc::new(AtomicUsize::new(0));

    let sub = {
        let slot = Arc::clone(&slot);
        let calls = Arc::clone(&calls);
        listeners.subscribe(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = slot.lock().unwrap().take() {
                sub.unsubscribe();
            }
        })
    };
    *slot.lock().unwrap() = Some(sub);

    listeners.notify(Some(&1));
    listeners.notify(Some(&2));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(listeners.is_empty());
}
