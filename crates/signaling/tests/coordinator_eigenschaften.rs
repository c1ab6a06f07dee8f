//! Verhaltens-Tests fuer den Coordinator ueber die oeffentliche API

use easyconnect_core::types::{ClientToken, Identity, RoomId};
use easyconnect_protocol::control::{ChatEvent, ControlMessage, ControlPayload, VoiceEvent};
use easyconnect_signaling::{
    ClientSender, Coordinator, CoordinatorConfig, LivenessSweeper, SignalingError, TestUhr,
};
use easyconnect_observability::CoordinatorMetrics;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;

fn id(name: &str) -> Identity {
    Identity::neu(name).unwrap()
}

fn raum(name: &str) -> RoomId {
    RoomId::neu(name).unwrap()
}

fn aufbau() -> (Coordinator, Arc<TestUhr>) {
    let uhr = Arc::new(TestUhr::neu());
    let c = Coordinator::neu(CoordinatorConfig::default(), uhr.clone(), None);
    (c, uhr)
}

fn verbinden_mit_kanal(c: &Coordinator, name: &str, r: &str) -> mpsc::Receiver<ControlMessage> {
    let (kanal, rx) = ClientSender::kanal(id(name));
    c.verbinden(id(name), None, Some(raum(r)), Some(kanal))
        .unwrap();
    rx
}

fn leeren(rx: &mut mpsc::Receiver<ControlMessage>) -> Vec<ControlPayload> {
    let mut payloads = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        payloads.push(msg.payload);
    }
    payloads
}

#[test]
fn doppelte_identitaet_laesst_bestehende_session_unberuehrt() {
    let (c, _) = aufbau();
    let erste = c
        .verbinden(id("alice"), Some(ClientToken::neu("t1").unwrap()), Some(raum("room1")), None)
        .unwrap();

    let zweite = c.verbinden(
        id("alice"),
        Some(ClientToken::neu("t2").unwrap()),
        Some(raum("room2")),
        None,
    );
    assert!(matches!(zweite, Err(SignalingError::IdentitaetVergeben(_))));

    assert_eq!(c.anzahl_sessions(), 1);
    let session = c.session(&id("alice")).unwrap();
    assert_eq!(session.room_id, raum("room1"));
    assert_eq!(erste.client_id.as_str(), "t1");
    assert!(c.mitglieder(&raum("room2")).is_empty());
}

#[test]
fn mitglieder_nach_zwei_connects() {
    let (c, _) = aufbau();
    c.verbinden(id("alice"), Some(ClientToken::neu("t").unwrap()), Some(raum("room1")), None)
        .unwrap();
    c.verbinden(id("bob"), Some(ClientToken::neu("t2").unwrap()), Some(raum("room1")), None)
        .unwrap();
    assert_eq!(c.mitglieder(&raum("room1")), vec![id("alice"), id("bob")]);
}

#[test]
fn disconnect_entfernt_mitglied_und_sprecher() {
    let (c, _) = aufbau();
    let mut bob_rx = verbinden_mit_kanal(&c, "bob", "room1");
    let _alice_rx = verbinden_mit_kanal(&c, "alice", "room1");
    c.sprechen_anfordern(&id("alice"), &raum("room1")).unwrap();
    leeren(&mut bob_rx);

    c.trennen(Some(&id("alice")), None).unwrap();

    assert_eq!(c.mitglieder(&raum("room1")), vec![id("bob")]);
    assert_eq!(c.sprecher(&raum("room1")), None);

    let ereignisse = leeren(&mut bob_rx);
    assert!(ereignisse.iter().any(|p| matches!(
        p,
        ControlPayload::SpeakerChanged(s) if s.username.is_none()
    )));
    assert!(ereignisse.iter().any(|p| matches!(
        p,
        ControlPayload::PresenceLeft(info) if info.username == id("alice")
    )));
}

#[test]
fn verdraengung_nach_disconnect_ist_wirkungslos() {
    let (c, uhr) = aufbau();
    c.verbinden(id("alice"), None, Some(raum("room1")), None)
        .unwrap();
    c.verbinden(id("bob"), None, Some(raum("room1")), None)
        .unwrap();

    uhr.vorstellen(chrono::Duration::seconds(61));
    c.trennen(Some(&id("alice")), None).unwrap();
    c.heartbeat(&id("bob"), None).unwrap();

    let entfernt = c.veraltete_entfernen(Duration::from_secs(60));
    assert!(entfernt.is_empty());
    assert_eq!(c.mitglieder(&raum("room1")), vec![id("bob")]);
    assert_eq!(c.anzahl_sessions(), 1);
}

#[test]
fn heartbeat_haelt_session_am_leben() {
    let (c, uhr) = aufbau();
    c.verbinden(id("alice"), None, None, None).unwrap();
    c.verbinden(id("stumm"), None, None, None).unwrap();
    let sweeper = LivenessSweeper::neu(
        c.clone(),
        Duration::from_secs(30),
        Duration::from_secs(60),
    );

    for _ in 0..10 {
        uhr.vorstellen(chrono::Duration::seconds(30));
        c.heartbeat(&id("alice"), None).unwrap();
        sweeper.durchlauf();
    }

    let namen: Vec<Identity> = c.snapshot().into_iter().map(|s| s.username).collect();
    assert_eq!(namen, vec![id("alice")]);
}

#[test]
fn nur_ein_sprecher_pro_raum() {
    let (c, _) = aufbau();
    for name in ["alice", "bob"] {
        c.verbinden(id(name), None, Some(raum("room1")), None)
            .unwrap();
    }
    c.verbinden(id("carol"), None, Some(raum("room2")), None)
        .unwrap();

    c.sprechen_anfordern(&id("alice"), &raum("room1")).unwrap();
    c.sprechen_anfordern(&id("carol"), &raum("room2")).unwrap();
    let wechsel = c.sprechen_anfordern(&id("bob"), &raum("room1")).unwrap();

    assert_eq!(wechsel.vorher, Some(id("alice")));
    assert_eq!(wechsel.nachher, Some(id("bob")));

    let sprechend: Vec<Identity> = c
        .snapshot()
        .into_iter()
        .filter(|s| s.is_speaking && s.room_id == raum("room1"))
        .map(|s| s.username)
        .collect();
    assert_eq!(sprechend, vec![id("bob")]);
    assert!(!c.session(&id("alice")).unwrap().is_speaking);
    // Anderer Raum bleibt unberuehrt
    assert_eq!(c.sprecher(&raum("room2")), Some(id("carol")));
}

#[test]
fn chat_mit_echo_voice_ohne_echo() {
    let (c, _) = aufbau();
    let mut alice_rx = verbinden_mit_kanal(&c, "alice", "room1");
    let mut bob_rx = verbinden_mit_kanal(&c, "bob", "room1");
    leeren(&mut alice_rx);
    leeren(&mut bob_rx);

    c.chat_ereignis(ChatEvent {
        username: id("alice"),
        room_id: raum("room1"),
        text: "hallo".into(),
    })
    .unwrap();

    for rx in [&mut alice_rx, &mut bob_rx] {
        let ereignisse = leeren(rx);
        assert!(matches!(
            ereignisse.as_slice(),
            [ControlPayload::ChatMessage(m)] if m.text == "hallo"
        ));
    }

    c.voice_ereignis(VoiceEvent {
        username: id("alice"),
        room_id: raum("room1"),
        is_speaking: true,
        audio_data: Some("AAAA".into()),
    })
    .unwrap();

    let alice = leeren(&mut alice_rx);
    let bob = leeren(&mut bob_rx);

    assert!(!alice.iter().any(|p| matches!(p, ControlPayload::VoiceData(_))));
    assert!(bob.iter().any(|p| matches!(p, ControlPayload::VoiceData(_))));
    for ereignisse in [&alice, &bob] {
        assert!(ereignisse.iter().any(|p| matches!(
            p,
            ControlPayload::SpeakerChanged(s)
                if s.room_id == raum("room1") && s.username == Some(id("alice"))
        )));
    }
}

#[test]
fn ereignis_aus_fremdem_raum_wird_nicht_verteilt() {
    let (c, _) = aufbau();
    let mut bob_rx = verbinden_mit_kanal(&c, "bob", "room1");
    c.verbinden(id("mallory"), None, Some(raum("room2")), None)
        .unwrap();
    leeren(&mut bob_rx);

    let ergebnis = c.chat_ereignis(ChatEvent {
        username: id("mallory"),
        room_id: raum("room1"),
        text: "hi".into(),
    });
    assert!(matches!(ergebnis, Err(SignalingError::NichtVerbunden(_))));
    assert!(leeren(&mut bob_rx).is_empty());
}

#[test]
fn chat_verlauf_beim_beitritt() {
    let (c, _) = aufbau();
    c.verbinden(id("alice"), None, Some(raum("room1")), None)
        .unwrap();
    for i in 0..3 {
        c.chat_ereignis(ChatEvent {
            username: id("alice"),
            room_id: raum("room1"),
            text: format!("nachricht {i}"),
        })
        .unwrap();
    }

    let antwort = c
        .verbinden(id("bob"), None, Some(raum("room1")), None)
        .unwrap();
    let texte: Vec<&str> = antwort.recent_chat.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texte, vec!["nachricht 0", "nachricht 1", "nachricht 2"]);
}

#[test]
fn gleichzeitige_connects_mit_derselben_identitaet() {
    const THREADS: usize = 8;

    for runde in 0..20 {
        let (c, _) = aufbau();
        let start = Barrier::new(THREADS);

        let ergebnisse: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|i| {
                    let c = &c;
                    let start = &start;
                    scope.spawn(move || {
                        start.wait();
                        c.verbinden(
                            id("alice"),
                            Some(ClientToken::neu(format!("t{runde}-{i}")).unwrap()),
                            Some(raum(&format!("raum{i}"))),
                            None,
                        )
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let gewinner: Vec<_> = ergebnisse.iter().filter_map(|e| e.as_ref().ok()).collect();
        assert_eq!(gewinner.len(), 1, "Runde {runde}: genau ein Connect gewinnt");
        assert!(ergebnisse
            .iter()
            .filter(|e| e.is_err())
            .all(|e| matches!(e, Err(SignalingError::IdentitaetVergeben(_)))));

        // Die Session gehoert dem Gewinner, nur sein Raum existiert
        assert_eq!(c.anzahl_sessions(), 1);
        assert_eq!(c.anzahl_raeume(), 1);
        let session = c.session(&id("alice")).unwrap();
        assert_eq!(session.room_id, gewinner[0].room_id);
        assert_eq!(c.mitglieder(&session.room_id), vec![id("alice")]);
    }
}

#[test]
fn verdraengung_und_disconnect_gleichzeitig() {
    let uhr = Arc::new(TestUhr::neu());
    let metriken = CoordinatorMetrics::neu().unwrap();
    let c = Coordinator::neu(CoordinatorConfig::default(), uhr.clone(), Some(metriken.clone()));
    let mut bob_rx = verbinden_mit_kanal(&c, "bob", "room1");
    let mut verdraengt = 0u64;

    for runde in 0..50 {
        c.verbinden(id("alice"), None, Some(raum("room1")), None)
            .unwrap();
        c.sprechen_anfordern(&id("alice"), &raum("room1")).unwrap();
        uhr.vorstellen(chrono::Duration::seconds(61));
        c.heartbeat(&id("bob"), None).unwrap();
        leeren(&mut bob_rx);

        let start = Barrier::new(2);
        let (getrennt, entfernt) = thread::scope(|scope| {
            let trennen = scope.spawn(|| {
                start.wait();
                c.trennen(Some(&id("alice")), None)
            });
            let sweep = scope.spawn(|| {
                start.wait();
                c.veraltete_entfernen(Duration::from_secs(60))
            });
            (trennen.join().unwrap(), sweep.join().unwrap())
        });

        // Genau einer der beiden Pfade entfernt alice
        match &getrennt {
            Ok(_) => assert!(entfernt.is_empty(), "Runde {runde}: doppelt entfernt"),
            Err(e) => {
                assert!(matches!(e, SignalingError::NichtGefunden(_)), "Runde {runde}: {e}");
                assert_eq!(entfernt, vec![id("alice")]);
                verdraengt += 1;
            }
        }

        assert_eq!(c.mitglieder(&raum("room1")), vec![id("bob")]);
        assert_eq!(c.anzahl_sessions(), 1);
        assert_eq!(c.sprecher(&raum("room1")), None);
        assert_eq!(metriken.sessions_connected.get(), 1);
        assert_eq!(metriken.rooms_active.get(), 1);

        // bob sieht alice genau einmal gehen
        let ereignisse = leeren(&mut bob_rx);
        let abgaenge = ereignisse
            .iter()
            .filter(|p| matches!(p, ControlPayload::PresenceLeft(i) if i.username == id("alice")))
            .count();
        let freigaben = ereignisse
            .iter()
            .filter(|p| matches!(p, ControlPayload::SpeakerChanged(s) if s.username.is_none()))
            .count();
        assert_eq!(abgaenge, 1, "Runde {runde}");
        assert_eq!(freigaben, 1, "Runde {runde}");
    }
    assert_eq!(metriken.sessions_evicted_total.get(), verdraengt);
}
