//! Router dispatch, IP lists and status notifications.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use bytes::Bytes;
use parking_lot::Mutex;
use stargate::{
    CONNECTION_STATUS_CHANGED, Dispatch, Error, FAILURE, Frame, NetworkEventRouter, Notification,
    ObserverId, SUCCESS, Star, StarDelegate, Status,
};

use common::{HOST, MockDialer, PORT};

// ============================================================================
// Helpers
// ============================================================================

type Deliveries = Arc<Mutex<Vec<(u32, Bytes)>>>;

fn recording_controller(into: &Deliveries) -> Arc<dyn stargate::Controller> {
    let into = Arc::clone(into);
    Arc::new(move |cmd_id: u32, payload: Bytes| into.lock().push((cmd_id, payload)))
}

fn recording_push(into: &Deliveries) -> Arc<dyn stargate::PushNotifyDelegate> {
    let into = Arc::clone(into);
    Arc::new(move |data: Bytes, cmd_id: u32| into.lock().push((cmd_id, data)))
}

// ============================================================================
// IP Lists
// ============================================================================

#[test]
fn test_add_then_set_ip_list() {
    let router = NetworkEventRouter::new();

    router.add_ip_address("1.1.1.1", "a.test");
    router.add_ip_address("2.2.2.2", "a.test");
    assert_eq!(
        router.ip_list("a.test"),
        Some(vec!["1.1.1.1".to_string(), "2.2.2.2".to_string()])
    );

    router.set_ip_list(["3.3.3.3"], "a.test");
    assert_eq!(router.ip_list("a.test"), Some(vec!["3.3.3.3".to_string()]));
}

#[test]
fn test_unknown_host_stays_absent() {
    let router = NetworkEventRouter::new();

    assert_eq!(router.ip_list("nowhere.test"), None);
    assert_eq!(router.ip_list("nowhere.test"), None);
    assert_eq!(router.remove_host("nowhere.test"), None);
}

#[test]
fn test_set_empty_list_forgets_host() {
    let router = NetworkEventRouter::new();
    router.add_ip_address("1.1.1.1", "a.test");

    router.set_ip_list(Vec::<String>::new(), "a.test");

    assert_eq!(router.ip_list("a.test"), None);
}

#[test]
fn test_concurrent_set_and_read_never_tears() {
    let router = Arc::new(NetworkEventRouter::new());
    let lists: [Vec<String>; 2] = [
        (0..16).map(|i| format!("10.0.0.{i}")).collect(),
        (0..16).map(|i| format!("10.1.0.{i}")).collect(),
    ];
    router.set_ip_list(lists[0].clone(), "a.test");

    let writer = {
        let router = Arc::clone(&router);
        let lists = lists.clone();
        thread::spawn(move || {
            for i in 0..2_000 {
                router.set_ip_list(lists[i % 2].clone(), "a.test");
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let router = Arc::clone(&router);
            let lists = lists.clone();
            thread::spawn(move || {
                for _ in 0..2_000 {
                    let seen = router.ip_list("a.test").unwrap();
                    assert!(seen == lists[0] || seen == lists[1], "torn list: {seen:?}");
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_controller_gets_single_delivery() {
    let router = NetworkEventRouter::new();
    let controller = Deliveries::default();
    let pushes = Deliveries::default();

    router.register_controller(3, recording_controller(&controller));
    router.register_push_receiver("chat", [3, 4], recording_push(&pushes));

    let result = router.on_receive(Frame::new(3, "hi").encode());

    assert_eq!(result, SUCCESS);
    assert_eq!(*controller.lock(), vec![(3, Bytes::from_static(b"hi"))]);
    assert!(pushes.lock().is_empty());
}

#[test]
fn test_push_reaches_every_matching_receiver() {
    let router = NetworkEventRouter::new();
    let chat = Deliveries::default();
    let badge = Deliveries::default();
    let other = Deliveries::default();

    router.register_push_receiver("chat", [10, 11], recording_push(&chat));
    router.register_push_receiver("badge", [11], recording_push(&badge));
    router.register_push_receiver("other", [12], recording_push(&other));

    let dispatch = router.dispatch(&Frame::new(11, "new").encode()).unwrap();

    assert_eq!(dispatch, Dispatch::Push(2));
    assert_eq!(*chat.lock(), vec![(11, Bytes::from_static(b"new"))]);
    assert_eq!(*badge.lock(), vec![(11, Bytes::from_static(b"new"))]);
    assert!(other.lock().is_empty());
}

#[test]
fn test_unclaimed_command_is_dropped() {
    let router = NetworkEventRouter::new();
    router.register_controller(1, Arc::new(|_: u32, _: Bytes| {}));

    assert_eq!(router.on_receive(Frame::new(2, "x").encode()), FAILURE);
    assert!(matches!(
        router.dispatch(&Frame::new(2, "x").encode()),
        Err(Error::UnknownCommand { cmd_id: 2 })
    ));
}

#[test]
fn test_malformed_frame_is_dropped() {
    let router = NetworkEventRouter::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    router.register_controller(
        0,
        Arc::new(move |_: u32, _: Bytes| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    assert_eq!(router.on_receive(Bytes::from_static(&[0, 0])), FAILURE);
    assert_eq!(router.on_receive(Bytes::new()), FAILURE);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_controller_replacement() {
    let router = NetworkEventRouter::new();
    let first = Deliveries::default();
    let second = Deliveries::default();

    assert!(router.register_controller(5, recording_controller(&first)).is_none());
    assert!(router.register_controller(5, recording_controller(&second)).is_some());

    router.on_receive(Frame::new(5, "v2").encode());

    assert!(first.lock().is_empty());
    assert_eq!(second.lock().len(), 1);

    assert!(router.unregister_controller(5).is_some());
    assert_eq!(router.on_receive(Frame::new(5, "gone").encode()), FAILURE);
}

#[test]
fn test_unregister_push_receiver() {
    let router = NetworkEventRouter::new();
    let pushes = Deliveries::default();
    router.register_push_receiver("chat", [7], recording_push(&pushes));

    assert!(router.unregister_push_receiver("chat").is_some());
    assert!(router.unregister_push_receiver("chat").is_none());
    assert_eq!(router.on_receive(Frame::new(7, "").encode()), FAILURE);
}

// ============================================================================
// Notifications
// ============================================================================

#[test]
fn test_status_change_is_posted() {
    let router = NetworkEventRouter::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    router
        .notifications()
        .add_observer(Arc::new(move |n: &Notification| sink.lock().push(*n)));

    router.on_connection_status_changed(Status::Connecting);
    router.on_connection_status_changed(Status::Connected);

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|n| n.name == CONNECTION_STATUS_CHANGED));
    assert_eq!(seen[0].status, Status::Connecting);
    assert_eq!(seen[1].status, Status::Connected);
}

#[test]
fn test_observer_changes_during_publication() {
    let router = NetworkEventRouter::new();
    let center = Arc::clone(router.notifications());
    let calls = Arc::new(AtomicUsize::new(0));
    let own_id: Arc<Mutex<Option<ObserverId>>> = Arc::default();

    let id = center.add_observer({
        let center = Arc::clone(&center);
        let calls = Arc::clone(&calls);
        let own_id = Arc::clone(&own_id);
        Arc::new(move |_: &Notification| {
            calls.fetch_add(1, Ordering::SeqCst);
            // Unsubscribe self and subscribe a newcomer mid-post.
            if let Some(id) = own_id.lock().take() {
                center.remove_observer(id);
                center.add_observer(Arc::new(|_: &Notification| {}));
            }
        })
    });
    *own_id.lock() = Some(id);

    let delivered = center.post(&Notification::connection_status_changed(Status::Error));
    assert_eq!(delivered, 1);
    assert_eq!(center.observer_count(), 1);

    router.on_connection_status_changed(Status::Init);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Router Behind A Star
// ============================================================================

#[tokio::test]
async fn test_router_as_star_delegate() {
    let (dialer, mut peers) = MockDialer::new();
    let router = Arc::new(NetworkEventRouter::new());
    router.set_ip_list(["10.0.0.7"], HOST);

    let statuses = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&statuses);
    router
        .notifications()
        .add_observer(Arc::new(move |n: &Notification| sink.lock().push(n.status)));

    let messages = Deliveries::default();
    router.register_controller(3, recording_controller(&messages));

    let star = Star::builder()
        .server(HOST, PORT)
        .delegate(router.clone())
        .ip_hints(router.clone())
        .dialer(dialer.clone())
        .build()
        .unwrap();

    let peer = common::connect(&star, &mut peers).await;
    assert_eq!(peer.endpoint.ip, "10.0.0.7");

    peer.push(Frame::new(3, "from server").encode());
    peer.push(Frame::new(99, "unclaimed").encode());
    assert!(common::eventually(|| messages.lock().len() == 1).await);

    star.terminate();

    assert_eq!(*messages.lock(), vec![(3, Bytes::from_static(b"from server"))]);
    assert_eq!(
        *statuses.lock(),
        vec![Status::Connecting, Status::Connected, Status::Init]
    );
}
