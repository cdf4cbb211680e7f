use parking_lot::Mutex;
use rask_telemetry_client::supervisor::{
    ConnectionState, ConnectionSupervisor, SupervisorHooks, SupervisorSettings,
};
use rask_telemetry_client::transport::{
    Connection, Connector, LoopbackConnector, TransportError, TransportOptions, close_code,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

fn settings(reconnect: bool) -> SupervisorSettings {
    SupervisorSettings {
        collector_address: "ws://collector:9600".to_string(),
        name: "api-1".to_string(),
        reconnect,
        reconnect_interval: Duration::from_millis(1000),
        transport: TransportOptions::default(),
    }
}

fn message_log() -> (SupervisorHooks, Arc<Mutex<Vec<String>>>) {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    let hooks = SupervisorHooks {
        on_message: Some(Arc::new(move |message: &str| {
            sink.lock().push(message.to_string());
        })),
        ..SupervisorHooks::default()
    };
    (hooks, messages)
}

/// Lets spawned event tasks drain their queues.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Refuses every open, like a collector that is down.
#[derive(Default)]
struct RefusingConnector {
    attempts: AtomicUsize,
}

impl Connector for RefusingConnector {
    fn open(&self, _url: &Url, _options: &TransportOptions) -> Result<Connection, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::ConnectionFailed("connection refused".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn test_is_open_follows_transport_events() {
    let connector = LoopbackConnector::new();
    let supervisor = ConnectionSupervisor::new(
        settings(false),
        Arc::new(connector.clone()),
        SupervisorHooks::default(),
    );

    assert_eq!(supervisor.state(), ConnectionState::Disconnected);
    supervisor.connect("secret").unwrap();
    assert_eq!(supervisor.state(), ConnectionState::Connecting);
    assert!(!supervisor.is_open());

    let handle = connector.last().unwrap();
    handle.fire_open();
    settle().await;
    assert!(supervisor.is_open());

    handle.fire_close(close_code::ABNORMAL);
    settle().await;
    assert!(!supervisor.is_open());
    assert_eq!(supervisor.state(), ConnectionState::Disconnected);
    assert!(!supervisor.reconnect_pending());
}

#[tokio::test]
async fn test_connect_passes_credential_name_and_options() {
    let connector = LoopbackConnector::new();
    let mut settings = settings(true);
    settings.transport = TransportOptions {
        reject_unauthorized: true,
        per_message_deflate: Some(false),
    };
    let supervisor = ConnectionSupervisor::new(
        settings,
        Arc::new(connector.clone()),
        SupervisorHooks::default(),
    );

    supervisor.connect("s3cr&t").unwrap();
    let handle = connector.last().unwrap();
    assert_eq!(handle.url().path(), "/log");
    assert_eq!(handle.query("auth").as_deref(), Some("s3cr&t"));
    assert_eq!(handle.query("name").as_deref(), Some("api-1"));
    assert!(handle.options().reject_unauthorized);
    assert_eq!(handle.options().per_message_deflate, Some(false));
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_after_interval_with_same_credential() {
    let connector = LoopbackConnector::auto_open();
    let (hooks, messages) = message_log();
    let supervisor = ConnectionSupervisor::new(settings(true), Arc::new(connector.clone()), hooks);

    supervisor.connect("secret").unwrap();
    settle().await;
    assert!(supervisor.is_open());

    connector.last().unwrap().fire_close(close_code::ABNORMAL);
    settle().await;
    assert!(!supervisor.is_open());
    assert!(supervisor.reconnect_pending());

    tokio::time::sleep(Duration::from_millis(999)).await;
    assert_eq!(connector.attempts(), 1);

    tokio::time::sleep(Duration::from_millis(2)).await;
    settle().await;
    assert_eq!(connector.attempts(), 2);
    assert_eq!(
        connector.last().unwrap().query("auth").as_deref(),
        Some("secret")
    );
    assert!(supervisor.is_open());
    assert!(!supervisor.reconnect_pending());

    let stats = supervisor.stats();
    assert_eq!(stats.connections_opened, 2);
    assert_eq!(stats.reconnect_attempts, 1);

    assert_eq!(
        *messages.lock(),
        vec![
            "Logger connected.".to_string(),
            "Logger disconnected. Code: 1006".to_string(),
            "Attempting reconnect.".to_string(),
            "Logger connected.".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_new_connect_replaces_pending_reconnect() {
    let connector = LoopbackConnector::auto_open();
    let supervisor = ConnectionSupervisor::new(
        settings(true),
        Arc::new(connector.clone()),
        SupervisorHooks::default(),
    );

    supervisor.connect("secret").unwrap();
    settle().await;
    connector.last().unwrap().fire_close(close_code::ABNORMAL);
    settle().await;
    assert!(supervisor.reconnect_pending());

    supervisor.connect("rotated").unwrap();
    assert!(!supervisor.reconnect_pending());
    settle().await;

    connector.last().unwrap().fire_close(close_code::ABNORMAL);
    settle().await;
    assert!(supervisor.reconnect_pending());

    tokio::time::sleep(Duration::from_millis(5000)).await;
    settle().await;

    // two explicit connects plus exactly one timer-driven attempt
    assert_eq!(connector.attempts(), 3);
    assert_eq!(supervisor.stats().reconnect_attempts, 1);
    assert_eq!(
        connector.last().unwrap().query("auth").as_deref(),
        Some("rotated")
    );
}

#[tokio::test(start_paused = true)]
async fn test_close_hook_replaces_reconnect() {
    let connector = LoopbackConnector::auto_open();
    let codes = Arc::new(Mutex::new(Vec::new()));
    let seen = codes.clone();
    let hooks = SupervisorHooks {
        on_close: Some(Arc::new(move |_: &ConnectionSupervisor, code: u16| {
            seen.lock().push(code);
        })),
        ..SupervisorHooks::default()
    };
    let supervisor = ConnectionSupervisor::new(settings(true), Arc::new(connector.clone()), hooks);

    supervisor.connect("secret").unwrap();
    settle().await;
    connector.last().unwrap().fire_close(4000);
    settle().await;

    assert_eq!(*codes.lock(), vec![4000]);
    assert!(!supervisor.reconnect_pending());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn test_close_hook_can_resume_reconnecting() {
    let connector = LoopbackConnector::auto_open();
    let hooks = SupervisorHooks {
        on_close: Some(Arc::new(|supervisor: &ConnectionSupervisor, _code: u16| {
            supervisor.reconnect().unwrap();
        })),
        ..SupervisorHooks::default()
    };
    let supervisor = ConnectionSupervisor::new(settings(false), Arc::new(connector.clone()), hooks);

    supervisor.connect("secret").unwrap();
    settle().await;
    connector.last().unwrap().fire_close(close_code::ABNORMAL);
    settle().await;

    assert_eq!(connector.attempts(), 2);
    assert!(supervisor.is_open());
}

#[tokio::test]
async fn test_error_hook_receives_transport_errors() {
    let connector = LoopbackConnector::new();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let seen = errors.clone();
    let hooks = SupervisorHooks {
        on_error: Some(Arc::new(
            move |_: &ConnectionSupervisor, error: &TransportError| {
                seen.lock().push(error.clone());
            },
        )),
        ..SupervisorHooks::default()
    };
    let supervisor = ConnectionSupervisor::new(settings(false), Arc::new(connector.clone()), hooks);

    supervisor.connect("secret").unwrap();
    connector.last().unwrap().fire_error("handshake rejected");
    settle().await;

    assert_eq!(
        *errors.lock(),
        vec![TransportError::Protocol("handshake rejected".to_string())]
    );
}

#[tokio::test]
async fn test_error_without_hook_goes_to_message_channel() {
    let connector = LoopbackConnector::new();
    let (hooks, messages) = message_log();
    let supervisor = ConnectionSupervisor::new(settings(false), Arc::new(connector.clone()), hooks);

    supervisor.connect("secret").unwrap();
    connector.last().unwrap().fire_error("tls failure");
    settle().await;

    assert_eq!(
        *messages.lock(),
        vec!["Protocol error: tls failure".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_open_is_reported_and_retried() {
    let connector = LoopbackConnector::auto_open();
    connector.fail_next_open("connection refused");
    let errors = Arc::new(Mutex::new(Vec::new()));
    let seen = errors.clone();
    let hooks = SupervisorHooks {
        on_error: Some(Arc::new(
            move |_: &ConnectionSupervisor, error: &TransportError| {
                seen.lock().push(error.to_string());
            },
        )),
        ..SupervisorHooks::default()
    };
    let supervisor = ConnectionSupervisor::new(settings(true), Arc::new(connector.clone()), hooks);

    supervisor.connect("secret").unwrap();
    assert!(errors.lock().is_empty());
    settle().await;
    assert_eq!(
        *errors.lock(),
        vec!["Connection failed: connection refused".to_string()]
    );
    assert!(supervisor.reconnect_pending());

    tokio::time::sleep(Duration::from_millis(1001)).await;
    settle().await;
    assert_eq!(connector.attempts(), 2);
    assert!(supervisor.is_open());
}

#[tokio::test]
async fn test_close_hook_reconnecting_against_refusing_collector_does_not_nest() {
    const RETRIES: usize = 2_000;

    let connector = Arc::new(RefusingConnector::default());
    let attempts = connector.clone();
    let closes = Arc::new(AtomicUsize::new(0));
    let seen = closes.clone();
    let hooks = SupervisorHooks {
        on_close: Some(Arc::new(move |supervisor: &ConnectionSupervisor, code: u16| {
            assert_eq!(code, close_code::ABNORMAL);
            seen.fetch_add(1, Ordering::SeqCst);
            if attempts.attempts.load(Ordering::SeqCst) < RETRIES {
                supervisor.reconnect().unwrap();
            }
        })),
        on_error: Some(Arc::new(|_: &ConnectionSupervisor, _: &TransportError| {})),
        ..SupervisorHooks::default()
    };
    let supervisor = ConnectionSupervisor::new(settings(false), connector.clone(), hooks);

    supervisor.connect("secret").unwrap();
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(closes.load(Ordering::SeqCst), 0);

    for _ in 0..RETRIES * 4 {
        if closes.load(Ordering::SeqCst) == RETRIES {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert_eq!(connector.attempts.load(Ordering::SeqCst), RETRIES);
    assert_eq!(closes.load(Ordering::SeqCst), RETRIES);
    assert_eq!(supervisor.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_close_from_message_hook_cancels_firing_reconnect() {
    let connector = LoopbackConnector::auto_open();
    let slot: Arc<Mutex<Option<ConnectionSupervisor>>> = Arc::new(Mutex::new(None));
    let target = slot.clone();
    let hooks = SupervisorHooks {
        on_message: Some(Arc::new(move |message: &str| {
            if message == "Attempting reconnect." {
                let supervisor = target.lock().clone();
                if let Some(supervisor) = supervisor {
                    supervisor.close();
                }
            }
        })),
        ..SupervisorHooks::default()
    };
    let supervisor = ConnectionSupervisor::new(settings(true), Arc::new(connector.clone()), hooks);
    *slot.lock() = Some(supervisor.clone());

    supervisor.connect("secret").unwrap();
    settle().await;
    connector.last().unwrap().fire_close(close_code::ABNORMAL);
    settle().await;
    assert!(supervisor.reconnect_pending());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    settle().await;

    assert_eq!(connector.attempts(), 1);
    assert!(!supervisor.is_open());
    assert!(!supervisor.reconnect_pending());
    assert_eq!(supervisor.stats().reconnect_attempts, 0);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn test_invalid_address_never_connects() {
    let connector = LoopbackConnector::new();
    let mut settings = settings(true);
    settings.collector_address = "not a url".to_string();
    let supervisor = ConnectionSupervisor::new(
        settings,
        Arc::new(connector.clone()),
        SupervisorHooks::default(),
    );

    assert!(supervisor.connect("secret").is_err());
    assert_eq!(connector.attempts(), 0);
    assert!(!supervisor.reconnect_pending());
    assert_eq!(supervisor.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_ended_event_stream_counts_as_abnormal_close() {
    let connector = LoopbackConnector::auto_open();
    let (hooks, messages) = message_log();
    let supervisor = ConnectionSupervisor::new(settings(true), Arc::new(connector.clone()), hooks);

    supervisor.connect("secret").unwrap();
    settle().await;
    connector.last().unwrap().drop_events();
    settle().await;

    assert!(!supervisor.is_open());
    assert!(supervisor.reconnect_pending());
    assert!(
        messages
            .lock()
            .contains(&"Logger disconnected. Code: 1006".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_explicit_close_suppresses_reconnect_and_hook() {
    let connector = LoopbackConnector::auto_open();
    let hook_calls = Arc::new(Mutex::new(0usize));
    let calls = hook_calls.clone();
    let hooks = SupervisorHooks {
        on_close: Some(Arc::new(move |_: &ConnectionSupervisor, _code: u16| {
            *calls.lock() += 1;
        })),
        ..SupervisorHooks::default()
    };
    let supervisor = ConnectionSupervisor::new(settings(true), Arc::new(connector.clone()), hooks);

    supervisor.connect("secret").unwrap();
    settle().await;
    let handle = connector.last().unwrap();

    supervisor.close();
    settle().await;

    assert_eq!(handle.closed_with(), Some(close_code::NORMAL));
    assert!(!supervisor.is_open());
    assert!(!supervisor.reconnect_pending());
    assert_eq!(*hook_calls.lock(), 0);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn test_sends_after_close_are_dropped() {
    let connector = LoopbackConnector::auto_open();
    let supervisor = ConnectionSupervisor::new(
        settings(false),
        Arc::new(connector.clone()),
        SupervisorHooks::default(),
    );

    supervisor.connect("secret").unwrap();
    settle().await;
    let frame = rask_telemetry_client::Frame::Text("1|app|hello|".to_string());
    assert_eq!(supervisor.send(frame.clone()), Ok(true));

    connector.last().unwrap().fire_close(close_code::ABNORMAL);
    settle().await;
    assert_eq!(supervisor.send(frame), Ok(false));

    assert_eq!(connector.last().unwrap().frame_count(), 1);
    let stats = supervisor.stats();
    assert_eq!(stats.frames_sent, 1);
    assert_eq!(stats.frames_dropped, 1);
}
