// live-client/tests/reconnect.rs
// Connection lifecycle against the in-memory connector (paused clock)

use std::sync::Arc;
use std::time::Duration;

use live_client::session::USER_ROLE_KEY;
use live_client::{
    AppEvent, ClientConfig, ClientMessage, ConnectionState, EventBus, LiveClient, MemoryConnector,
    MemorySession, SessionStore, TransportConfig,
};
use tokio::sync::broadcast;
use tokio::time::Instant;

fn transport() -> TransportConfig {
    TransportConfig::new().with_heartbeat_interval(Duration::ZERO)
}

fn setup(transport: TransportConfig) -> (LiveClient, MemoryConnector, broadcast::Receiver<AppEvent>) {
    let connector = MemoryConnector::new();
    let bus = EventBus::default();
    let rx = bus.subscribe();
    let session: Arc<dyn SessionStore> = Arc::new(MemorySession::with_token("tok"));
    let config = ClientConfig::new("http://pos.local").with_transport(transport);
    let client = LiveClient::new(config, session, bus, Arc::new(connector.clone()));
    (client, connector, rx)
}

async fn wait_for(
    rx: &mut broadcast::Receiver<AppEvent>,
    pred: impl Fn(&AppEvent) -> bool,
) -> AppEvent {
    tokio::time::timeout(Duration::from_secs(3600), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
            }
        }
    })
    .await
    .expect("event not published")
}

#[tokio::test(start_paused = true)]
async fn test_endpoint_uses_role_and_token() {
    let connector = MemoryConnector::new();
    let session = Arc::new(MemorySession::with_token("abc"));
    session.set(USER_ROLE_KEY, "kitchen").unwrap();
    let client = LiveClient::new(
        ClientConfig::new("http://pos.local").with_transport(transport()),
        session,
        EventBus::default(),
        Arc::new(connector.clone()),
    );

    assert!(client.connect());
    let peer = connector.take_peer().await;
    assert_eq!(peer.url, "ws://pos.local/ws/kitchen?token=abc");
}

#[tokio::test(start_paused = true)]
async fn test_missing_token_publishes_error() {
    let connector = MemoryConnector::new();
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let client = LiveClient::new(
        ClientConfig::default(),
        Arc::new(MemorySession::new()),
        bus,
        Arc::new(connector.clone()),
    );

    assert!(!client.connect());
    let event = wait_for(&mut rx, |e| matches!(e, AppEvent::WebsocketError(_))).await;
    assert_eq!(event, AppEvent::WebsocketError("Missing auth token".into()));
    assert_eq!(connector.attempts(), 0);
    assert!(!client.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_first_reconnect_waits_base_interval() {
    let (client, connector, mut rx) = setup(transport());
    client.connect();

    let peer = connector.take_peer().await;
    wait_for(&mut rx, |e| *e == AppEvent::WebsocketConnected).await;
    assert_eq!(client.state(), ConnectionState::Connected);

    peer.close(1006, "abnormal");
    let event = wait_for(&mut rx, |e| {
        matches!(e, AppEvent::WebsocketDisconnected { .. } | AppEvent::Reconnecting { .. })
    })
    .await;
    assert_eq!(
        event,
        AppEvent::WebsocketDisconnected {
            code: Some(1006),
            reason: "abnormal".into()
        }
    );
    assert_eq!(client.state(), ConnectionState::Disconnected);

    let event = wait_for(&mut rx, |e| matches!(e, AppEvent::Reconnecting { .. })).await;
    assert_eq!(
        event,
        AppEvent::Reconnecting {
            attempt: 1,
            delay: Duration::from_millis(3000)
        }
    );

    let scheduled = Instant::now();
    let _peer = connector.take_peer().await;
    let waited = scheduled.elapsed();
    assert!(waited >= Duration::from_millis(3000), "waited {waited:?}");
    assert!(waited < Duration::from_millis(3100), "waited {waited:?}");

    wait_for(&mut rx, |e| *e == AppEvent::WebsocketConnected).await;
    assert_eq!(client.retry_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_attempts_stop_at_max_then_retry_resets() {
    let transport = transport()
        .with_reconnect_interval(Duration::from_millis(100))
        .with_max_reconnect_attempts(3);
    let (client, connector, mut rx) = setup(transport);
    connector.set_accepting(false);

    client.connect();
    let mut delays = Vec::new();
    loop {
        match wait_for(&mut rx, |e| {
            matches!(e, AppEvent::Reconnecting { .. } | AppEvent::ReconnectFailed { .. })
        })
        .await
        {
            AppEvent::Reconnecting { delay, .. } => delays.push(delay),
            AppEvent::ReconnectFailed { attempts } => {
                assert_eq!(attempts, 3);
                break;
            }
            _ => unreachable!(),
        }
    }
    assert_eq!(
        delays,
        vec![
            Duration::from_millis(100),
            Duration::from_millis(150),
            Duration::from_millis(225)
        ]
    );
    // initial attempt + three scheduled reconnects
    assert_eq!(connector.attempts(), 4);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(connector.attempts(), 4);
    assert!(!client.is_running());

    connector.set_accepting(true);
    assert!(client.retry());
    let _peer = connector.take_peer().await;
    wait_for(&mut rx, |e| *e == AppEvent::WebsocketConnected).await;
    assert_eq!(connector.attempts(), 5);
    assert_eq!(client.retry_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_normal_close_does_not_reconnect() {
    let (client, connector, mut rx) = setup(transport());
    client.connect();

    let peer = connector.take_peer().await;
    peer.close(1000, "bye");
    let event = wait_for(&mut rx, |e| matches!(e, AppEvent::WebsocketDisconnected { .. })).await;
    assert_eq!(
        event,
        AppEvent::WebsocketDisconnected {
            code: Some(1000),
            reason: "bye".into()
        }
    );

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempts(), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_everything() {
    let (client, connector, mut rx) = setup(transport());
    client.connect();
    let _peer = connector.take_peer().await;
    wait_for(&mut rx, |e| *e == AppEvent::WebsocketConnected).await;

    client.disconnect();
    wait_for(&mut rx, |e| matches!(e, AppEvent::WebsocketDisconnected { .. })).await;

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempts(), 1);
    assert!(!client.is_connected());
    assert!(!client.send(&ClientMessage::ping()));
}

#[tokio::test(start_paused = true)]
async fn test_pong_is_not_forwarded() {
    let (client, connector, _rx) = setup(transport());
    let mut inbound = client.take_inbound().unwrap();
    assert!(client.take_inbound().is_none());

    client.connect();
    let peer = connector.take_peer().await;
    peer.send(r#"{"type":"pong"}"#);
    peer.send(r#"{"type":"order_created","data":{"id":1}}"#);
    peer.send(r#"{"type":"order_updated","data":{"id":1}}"#);

    assert_eq!(
        inbound.recv().await.as_deref(),
        Some(r#"{"type":"order_created","data":{"id":1}}"#)
    );
    assert_eq!(
        inbound.recv().await.as_deref(),
        Some(r#"{"type":"order_updated","data":{"id":1}}"#)
    );
    assert!(client.last_message_at().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_sends_ping() {
    let transport = TransportConfig::new().with_heartbeat_interval(Duration::from_secs(30));
    let (client, connector, _rx) = setup(transport);
    client.connect();

    let mut peer = connector.take_peer().await;
    let started = Instant::now();
    let text = peer.recv().await.unwrap();
    let ping: ClientMessage = serde_json::from_str(&text).unwrap();
    assert!(matches!(ping, ClientMessage::Ping { .. }));
    assert!(started.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_subscriptions_resent_after_reconnect() {
    let (client, connector, mut rx) = setup(transport());
    // not connected yet: remembered, not sent
    assert!(!client.subscribe("orders"));
    client.connect();

    let mut peer = connector.take_peer().await;
    assert_eq!(
        peer.recv().await.as_deref(),
        Some(r#"{"type":"subscribe","channel":"orders"}"#)
    );

    peer.close(1011, "restart");
    wait_for(&mut rx, |e| matches!(e, AppEvent::Reconnecting { .. })).await;

    let mut peer = connector.take_peer().await;
    assert_eq!(
        peer.recv().await.as_deref(),
        Some(r#"{"type":"subscribe","channel":"orders"}"#)
    );
    assert_eq!(client.subscriptions(), vec!["orders".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_send_while_connected() {
    let (client, connector, mut rx) = setup(transport());
    assert!(!client.send_text("early".into()));

    client.connect();
    let mut peer = connector.take_peer().await;
    wait_for(&mut rx, |e| *e == AppEvent::WebsocketConnected).await;

    assert!(client.send(&ClientMessage::unsubscribe("menu")));
    assert_eq!(
        peer.recv().await.as_deref(),
        Some(r#"{"type":"unsubscribe","channel":"menu"}"#)
    );
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_disconnect_survives_slow_close() {
    let (client, connector, mut rx) = setup(transport());
    connector.set_close_delay(Duration::from_millis(50));

    client.connect();
    let _old = connector.take_peer().await;
    wait_for(&mut rx, |e| *e == AppEvent::WebsocketConnected).await;

    // navigation: tear down and reconnect while the old close is still in flight
    client.disconnect();
    assert!(client.connect());
    let mut peer = connector.take_peer().await;
    let event = wait_for(&mut rx, |e| {
        matches!(e, AppEvent::WebsocketDisconnected { .. } | AppEvent::WebsocketConnected)
    })
    .await;
    assert!(matches!(event, AppEvent::WebsocketDisconnected { .. }));
    wait_for(&mut rx, |e| *e == AppEvent::WebsocketConnected).await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.state(), ConnectionState::Connected);
    assert!(client.is_running());
    assert!(client.send(&ClientMessage::subscribe("tables")));
    assert_eq!(
        peer.recv().await.as_deref(),
        Some(r#"{"type":"subscribe","channel":"tables"}"#)
    );

    while let Ok(event) = rx.try_recv() {
        assert!(
            !matches!(event, AppEvent::WebsocketDisconnected { .. }),
            "stale loop reported {event:?}"
        );
    }
    assert_eq!(connector.attempts(), 2);
}
