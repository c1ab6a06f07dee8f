//! Ende-zu-Ende-Tests ueber einen echten TCP-Listener

use easyconnect_core::types::{Identity, RoomId};
use easyconnect_protocol::control::{
    ChatEvent, ConnectRequest, ControlMessage, ControlPayload, ErrorCode, HeartbeatRequest,
    VoiceEvent,
};
use easyconnect_protocol::wire::{EingehenderFrame, FrameCodec};
use easyconnect_signaling::{SignalingConfig, SignalingServer, SignalingState, SystemUhr};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_util::codec::Framed;

type Client = Framed<TcpStream, FrameCodec>;

fn id(name: &str) -> Identity {
    Identity::neu(name).unwrap()
}

async fn server_starten(config: SignalingConfig) -> (SocketAddr, Arc<SignalingState>, watch::Sender<bool>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let state = SignalingState::neu(config, Arc::new(SystemUhr), None);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = SignalingServer::neu(Arc::clone(&state), addr);
    tokio::spawn(server.mit_listener(listener, shutdown_rx));
    (addr, state, shutdown_tx)
}

async fn client(addr: SocketAddr) -> Client {
    Framed::new(TcpStream::connect(addr).await.unwrap(), FrameCodec::new())
}

async fn empfangen(client: &mut Client) -> ControlMessage {
    let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("Zeitueberschreitung beim Empfang");
    match frame {
        Some(Ok(EingehenderFrame::Nachricht(msg))) => msg,
        andere => panic!("Erwartet Nachricht, erhalten: {andere:?}"),
    }
}

/// Liest, bis eine Nachricht passt; alles davor wird verworfen
async fn warten_auf<F>(client: &mut Client, mut passt: F) -> ControlMessage
where
    F: FnMut(&ControlPayload) -> bool,
{
    loop {
        let msg = empfangen(client).await;
        if passt(&msg.payload) {
            return msg;
        }
    }
}

async fn verbinden(client: &mut Client, name: &str, raum: &str) {
    client
        .send(ControlMessage::new(
            1,
            ControlPayload::Connect(ConnectRequest {
                username: id(name),
                client_id: None,
                room_id: Some(RoomId::neu(raum).unwrap()),
            }),
        ))
        .await
        .unwrap();
    let antwort = warten_auf(client, |p| !matches!(p, ControlPayload::Ping(_))).await;
    assert!(
        matches!(antwort.payload, ControlPayload::ConnectResponse(_)),
        "Connect fehlgeschlagen: {:?}",
        antwort.payload
    );
}

#[tokio::test]
async fn chat_und_voice_zwischen_zwei_clients() {
    let (addr, _state, _shutdown) = server_starten(SignalingConfig::default()).await;
    let mut alice = client(addr).await;
    let mut bob = client(addr).await;

    verbinden(&mut alice, "alice", "room1").await;
    verbinden(&mut bob, "bob", "room1").await;

    // alice sieht bob beitreten
    warten_auf(&mut alice, |p| {
        matches!(p, ControlPayload::PresenceJoined(i) if i.username == id("bob"))
    })
    .await;

    alice
        .send(ControlMessage::new(
            2,
            ControlPayload::Chat(ChatEvent {
                username: id("alice"),
                room_id: RoomId::neu("room1").unwrap(),
                text: "hallo bob".into(),
            }),
        ))
        .await
        .unwrap();

    for client in [&mut alice, &mut bob] {
        warten_auf(client, |p| {
            matches!(p, ControlPayload::ChatMessage(m) if m.text == "hallo bob")
        })
        .await;
    }

    alice
        .send(ControlMessage::new(
            3,
            ControlPayload::Voice(VoiceEvent {
                username: id("alice"),
                room_id: RoomId::neu("room1").unwrap(),
                is_speaking: true,
                audio_data: Some("AAAA".into()),
            }),
        ))
        .await
        .unwrap();

    for client in [&mut alice, &mut bob] {
        warten_auf(client, |p| {
            matches!(p, ControlPayload::SpeakerChanged(s) if s.username == Some(id("alice")))
        })
        .await;
    }
    let voice = warten_auf(&mut bob, |p| matches!(p, ControlPayload::VoiceData(_))).await;
    match voice.payload {
        ControlPayload::VoiceData(v) => {
            assert_eq!(v.username, id("alice"));
            assert_eq!(v.audio_data.as_deref(), Some("AAAA"));
            assert!(v.is_speaking);
        }
        andere => panic!("Erwartet VoiceData, erhalten: {andere:?}"),
    }

    // Kein Voice-Echo: nach einem Ping-Roundtrip darf alice keine VoiceData gesehen haben
    alice.send(ControlMessage::ping(99, 1)).await.unwrap();
    loop {
        let msg = empfangen(&mut alice).await;
        assert!(!matches!(msg.payload, ControlPayload::VoiceData(_)));
        if matches!(msg.payload, ControlPayload::Pong(_)) {
            break;
        }
    }
}

#[tokio::test]
async fn heartbeat_fuer_unbekannte_identitaet() {
    let (addr, _state, _shutdown) = server_starten(SignalingConfig::default()).await;
    let mut c = client(addr).await;

    c.send(ControlMessage::new(
        7,
        ControlPayload::Heartbeat(HeartbeatRequest {
            username: id("ghost"),
            client_id: None,
        }),
    ))
    .await
    .unwrap();

    let antwort = empfangen(&mut c).await;
    assert_eq!(antwort.request_id, 7);
    assert!(matches!(
        antwort.payload,
        ControlPayload::Error(e) if e.code == ErrorCode::NotConnected
    ));
}

#[tokio::test]
async fn socket_ende_loest_nur_den_kanal() {
    let (addr, state, _shutdown) = server_starten(SignalingConfig::default()).await;
    let mut c = client(addr).await;
    verbinden(&mut c, "alice", "room1").await;
    drop(c);

    // Die Session bleibt bis zur Verdraengung bestehen
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(state.coordinator.session(&id("alice")).is_some());
}

#[tokio::test]
async fn voller_server_lehnt_ab() {
    let mut config = SignalingConfig::default();
    config.coordinator.max_clients = 1;
    let (addr, _state, _shutdown) = server_starten(config).await;

    let mut erster = client(addr).await;
    verbinden(&mut erster, "alice", "room1").await;

    let mut zweiter = client(addr).await;
    let antwort = empfangen(&mut zweiter).await;
    assert!(matches!(
        antwort.payload,
        ControlPayload::Error(e) if e.code == ErrorCode::ServerFull
    ));
}

#[tokio::test]
async fn grosser_chat_verlauf_verhindert_beitritt_nicht() {
    let mut config = SignalingConfig::default();
    config.coordinator.max_chat_laenge = 20_000;
    let (addr, state, _shutdown) = server_starten(config).await;

    state
        .coordinator
        .verbinden(id("alice"), None, Some(RoomId::neu("room1").unwrap()), None)
        .unwrap();
    for i in 0..100 {
        state
            .coordinator
            .chat_ereignis(ChatEvent {
                username: id("alice"),
                room_id: RoomId::neu("room1").unwrap(),
                text: format!("{i:03}{}", "x".repeat(12_000)),
            })
            .unwrap();
    }

    let mut bob = client(addr).await;
    bob.send(ControlMessage::new(
        1,
        ControlPayload::Connect(ConnectRequest {
            username: id("bob"),
            client_id: None,
            room_id: Some(RoomId::neu("room1").unwrap()),
        }),
    ))
    .await
    .unwrap();

    let antwort = warten_auf(&mut bob, |p| !matches!(p, ControlPayload::Ping(_))).await;
    assert_eq!(antwort.request_id, 1);
    match antwort.payload {
        ControlPayload::ConnectResponse(r) => {
            assert!(!r.recent_chat.is_empty());
            assert!(r.recent_chat.len() < 100);
            assert!(r.recent_chat.last().unwrap().text.starts_with("099"));
        }
        andere => panic!("Erwartet ConnectResponse, erhalten: {andere:?}"),
    }
}

#[tokio::test]
async fn zu_grosses_ereignis_trennt_empfaenger_nicht() {
    let mut config = SignalingConfig::default();
    config.coordinator.max_chat_laenge = 2 * 1024 * 1024;
    let (addr, state, _shutdown) = server_starten(config).await;

    let mut bob = client(addr).await;
    verbinden(&mut bob, "bob", "room1").await;
    state
        .coordinator
        .verbinden(id("alice"), None, Some(RoomId::neu("room1").unwrap()), None)
        .unwrap();

    // Die verteilte Nachricht waere mit Zeitstempel groesser als ein Frame
    let ergebnis = state.coordinator.chat_ereignis(ChatEvent {
        username: id("alice"),
        room_id: RoomId::neu("room1").unwrap(),
        text: "x".repeat(1_048_500),
    });
    assert!(matches!(
        ergebnis,
        Err(easyconnect_signaling::SignalingError::UngueltigesEreignis(_))
    ));

    state
        .coordinator
        .chat_ereignis(ChatEvent {
            username: id("alice"),
            room_id: RoomId::neu("room1").unwrap(),
            text: "noch da?".into(),
        })
        .unwrap();
    warten_auf(&mut bob, |p| {
        matches!(p, ControlPayload::ChatMessage(m) if m.text == "noch da?")
    })
    .await;

    bob.send(ControlMessage::ping(42, 1)).await.unwrap();
    warten_auf(&mut bob, |p| matches!(p, ControlPayload::Pong(_))).await;
}
