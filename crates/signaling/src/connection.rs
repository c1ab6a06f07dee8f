//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Eingehende Frames gehen an den Dispatcher, Ereignisse des
//! Coordinators kommen ueber die Send-Queue der Verbindung.
//!
//! ```text
//!  Client --Frame--> FrameCodec --> MessageDispatcher --> Coordinator
//!    ^                                   |                    |
//!    |                                Antwort           Ausgang (Queue)
//!    +----------------------------------+--------------------+
//! ```
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen Ping
//! - Ohne eingehenden Frame innerhalb von `verbindungs_timeout_sek` wird
//!   die Verbindung getrennt
//!
//! Das Ende der Verbindung loest nur den Ereigniskanal. Die Session lebt
//! weiter, bis sie getrennt oder vom Liveness-Sweeper entfernt wird.
//!
//! Eine Nachricht, die der Codec nicht kodieren kann (zu gross), wird
//! verworfen; die Verbindung bleibt bestehen. Eine Antwort wird dann durch
//! einen Fehler mit derselben `request_id` ersetzt.

use easyconnect_protocol::{
    control::{ControlMessage, ErrorCode},
    wire::{EingehenderFrame, FrameCodec},
};
use futures_util::{SinkExt, StreamExt};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::codec::Framed;

use crate::broadcast::SEND_QUEUE_GROESSE;
use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::server_state::SignalingState;

/// Sendet eine Nachricht; `Ok(false)` wenn sie nicht kodierbar war
///
/// Der Codec prueft die Groesse, bevor er in den Puffer schreibt. Nach einem
/// Kodierfehler ist der Stream daher unveraendert und weiter nutzbar.
async fn senden<S>(
    framed: &mut Framed<S, FrameCodec>,
    nachricht: ControlMessage,
    peer_addr: SocketAddr,
) -> io::Result<bool>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match framed.send(nachricht).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            tracing::warn!(peer = %peer_addr, fehler = %e, "Nachricht nicht kodierbar – verworfen");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Verarbeitet eine einzelne TCP-Verbindung
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    pub fn neu(state: Arc<SignalingState>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal
    /// eingeht.
    pub async fn verarbeiten<S>(self, stream: S, mut shutdown_rx: watch::Receiver<bool>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let peer_addr = self.peer_addr;
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek);
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek);

        tracing::info!(peer = %peer_addr, "Neue Verbindung");

        let mut framed = Framed::new(
            stream,
            FrameCodec::with_max_size(self.state.config.max_frame_groesse),
        );

        // Ausgehende Ereignisse (Coordinator -> TCP)
        let (sende_tx, mut sende_rx) = mpsc::channel::<ControlMessage>(SEND_QUEUE_GROESSE);
        let mut ctx = DispatcherContext::neu(peer_addr, sende_tx);
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        let mut letzter_empfang = Instant::now();
        let mut naechster_ping = Instant::now() + keepalive_intervall;
        let mut ping_request_id: u32 = 0;

        loop {
            if Instant::now().duration_since(letzter_empfang) > timeout_dauer {
                tracing::warn!(peer = %peer_addr, "Verbindungs-Timeout");
                break;
            }

            tokio::select! {
                frame = framed.next() => {
                    let antwort = match frame {
                        Some(Ok(EingehenderFrame::Nachricht(nachricht))) => {
                            letzter_empfang = Instant::now();
                            tracing::trace!(
                                peer = %peer_addr,
                                request_id = nachricht.request_id,
                                "Nachricht empfangen"
                            );
                            dispatcher.dispatch(nachricht, &mut ctx)
                        }
                        Some(Ok(EingehenderFrame::Ungueltig { request_id, fehler })) => {
                            letzter_empfang = Instant::now();
                            tracing::warn!(
                                peer = %peer_addr,
                                request_id,
                                fehler = %fehler,
                                "Ungueltiger Frame"
                            );
                            Some(ControlMessage::error(
                                request_id,
                                ErrorCode::MalformedEvent,
                                format!("Ungueltige Nachricht: {fehler}"),
                            ))
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    };

                    if let Some(antwort) = antwort {
                        let request_id = antwort.request_id;
                        let ergebnis = match senden(&mut framed, antwort, peer_addr).await {
                            Ok(false) => {
                                let ersatz = ControlMessage::error(
                                    request_id,
                                    ErrorCode::InternalError,
                                    "Antwort ueberschreitet die maximale Frame-Groesse",
                                );
                                senden(&mut framed, ersatz, peer_addr).await
                            }
                            andere => andere,
                        };
                        if let Err(e) = ergebnis {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Senden fehlgeschlagen");
                            break;
                        }
                    }
                }

                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = senden(&mut framed, ausgehend, peer_addr).await {
                        tracing::warn!(peer = %peer_addr, fehler = %e, "Ereignis-Senden fehlgeschlagen");
                        break;
                    }
                }

                _ = tokio::time::sleep_until(naechster_ping) => {
                    ping_request_id = ping_request_id.wrapping_add(1);
                    let ts = chrono::Utc::now().timestamp_millis().max(0) as u64;
                    if let Err(e) = framed.send(ControlMessage::ping(ping_request_id, ts)).await {
                        tracing::warn!(peer = %peer_addr, fehler = %e, "Ping-Senden fehlgeschlagen");
                        break;
                    }
                    naechster_ping = Instant::now() + keepalive_intervall;
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        let abschied = ControlMessage::error(
                            0,
                            ErrorCode::InternalError,
                            "Server wird heruntergefahren",
                        );
                        let _ = framed.send(abschied).await;
                        break;
                    }
                }
            }
        }

        dispatcher.verbindung_beendet(&ctx);
        tracing::info!(peer = %peer_addr, "Verbindungs-Task beendet");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemUhr;
    use crate::server_state::SignalingConfig;
    use easyconnect_core::types::{Identity, RoomId};
    use chrono::Utc;
    use easyconnect_protocol::control::{ChatEvent, ChatMessage, ConnectRequest, ControlPayload};

    fn state() -> Arc<SignalingState> {
        SignalingState::neu(SignalingConfig::default(), Arc::new(SystemUhr), None)
    }

    fn starten(
        state: &Arc<SignalingState>,
    ) -> (
        Framed<tokio::io::DuplexStream, FrameCodec>,
        watch::Sender<bool>,
        tokio::task::JoinHandle<()>,
    ) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let conn = ClientConnection::neu(Arc::clone(state), "127.0.0.1:6000".parse().unwrap());
        let task = tokio::spawn(conn.verarbeiten(server, shutdown_rx));
        (Framed::new(client, FrameCodec::new()), shutdown_tx, task)
    }

    async fn naechste(framed: &mut Framed<tokio::io::DuplexStream, FrameCodec>) -> ControlMessage {
        match framed.next().await {
            Some(Ok(EingehenderFrame::Nachricht(msg))) => msg,
            andere => panic!("Erwartet Nachricht, erhalten: {andere:?}"),
        }
    }

    #[tokio::test]
    async fn connect_und_chat_ueber_die_verbindung() {
        let state = state();
        let (mut client, _shutdown, _task) = starten(&state);
        let alice = Identity::neu("alice").unwrap();

        client
            .send(ControlMessage::new(
                1,
                ControlPayload::Connect(ConnectRequest {
                    username: alice.clone(),
                    client_id: None,
                    room_id: None,
                }),
            ))
            .await
            .unwrap();

        let antwort = naechste(&mut client).await;
        assert_eq!(antwort.request_id, 1);
        assert!(matches!(antwort.payload, ControlPayload::ConnectResponse(_)));
        assert!(matches!(
            naechste(&mut client).await.payload,
            ControlPayload::PresenceJoined(_)
        ));

        client
            .send(ControlMessage::new(
                2,
                ControlPayload::Chat(ChatEvent {
                    username: alice,
                    room_id: RoomId::standard(),
                    text: "hallo".into(),
                }),
            ))
            .await
            .unwrap();

        // Ack und Echo; Reihenfolge zwischen Antwort und Queue ist nicht festgelegt
        let mut ack = false;
        let mut echo = false;
        for _ in 0..2 {
            match naechste(&mut client).await.payload {
                ControlPayload::Ack => ack = true,
                ControlPayload::ChatMessage(m) => echo = m.text == "hallo",
                andere => panic!("Unerwartet: {andere:?}"),
            }
        }
        assert!(ack && echo);
    }

    #[tokio::test]
    async fn ungueltiger_frame_beendet_verbindung_nicht() {
        use tokio::io::AsyncWriteExt;

        let state = state();
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let conn = ClientConnection::neu(Arc::clone(&state), "127.0.0.1:6001".parse().unwrap());
        tokio::spawn(conn.verarbeiten(server, shutdown_rx));

        let mut client = Framed::new(client, FrameCodec::new());
        let mut roh = 5u32.to_be_bytes().to_vec();
        roh.extend_from_slice(b"{kapu");
        client.get_mut().write_all(&roh).await.unwrap();

        match naechste(&mut client).await.payload {
            ControlPayload::Error(e) => assert_eq!(e.code, ErrorCode::MalformedEvent),
            andere => panic!("Erwartet Error, erhalten: {andere:?}"),
        }

        client.send(ControlMessage::ping(4, 1)).await.unwrap();
        assert!(matches!(
            naechste(&mut client).await.payload,
            ControlPayload::Pong(_)
        ));
    }

    #[tokio::test]
    async fn ungueltige_anfrage_behaelt_request_id() {
        use tokio::io::AsyncWriteExt;

        let state = state();
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let conn = ClientConnection::neu(Arc::clone(&state), "127.0.0.1:6002".parse().unwrap());
        tokio::spawn(conn.verarbeiten(server, shutdown_rx));

        let mut client = Framed::new(client, FrameCodec::new());
        let json = br#"{"request_id":23,"payload":{"type":"connect","username":"  "}}"#;
        let mut roh = (json.len() as u32).to_be_bytes().to_vec();
        roh.extend_from_slice(json);
        client.get_mut().write_all(&roh).await.unwrap();

        let antwort = naechste(&mut client).await;
        assert_eq!(antwort.request_id, 23);
        match antwort.payload {
            ControlPayload::Error(e) => assert_eq!(e.code, ErrorCode::MalformedEvent),
            andere => panic!("Erwartet Error, erhalten: {andere:?}"),
        }
        assert_eq!(state.coordinator.anzahl_sessions(), 0);
    }

    #[tokio::test]
    async fn nicht_kodierbare_nachricht_wird_uebersprungen() {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let mut server = Framed::new(server, FrameCodec::with_max_size(256));
        let mut client = Framed::new(client, FrameCodec::new());
        let peer: SocketAddr = "127.0.0.1:6003".parse().unwrap();

        let gross = ControlMessage::ereignis(ControlPayload::ChatMessage(ChatMessage {
            room_id: RoomId::standard(),
            username: Identity::neu("alice").unwrap(),
            text: "x".repeat(1000),
            timestamp: Utc::now(),
        }));
        assert!(!senden(&mut server, gross, peer).await.unwrap());
        assert!(senden(&mut server, ControlMessage::ping(5, 1), peer)
            .await
            .unwrap());

        // Der Stream ist intakt: als erstes kommt der Ping an
        let msg = naechste(&mut client).await;
        assert_eq!(msg.request_id, 5);
        assert!(matches!(msg.payload, ControlPayload::Ping(_)));
    }

    #[tokio::test]
    async fn shutdown_sendet_abschied() {
        let state = state();
        let (mut client, shutdown, task) = starten(&state);
        shutdown.send(true).unwrap();

        match naechste(&mut client).await.payload {
            ControlPayload::Error(e) => assert_eq!(e.code, ErrorCode::InternalError),
            andere => panic!("Erwartet Abschied, erhalten: {andere:?}"),
        }
        task.await.unwrap();
    }
}
