//! Wire-Format fuer TCP-Verbindungen
//!
//! Frame-basiertes Protokoll: Length(u32 big-endian) + JSON-Payload.
//!
//! ## Frame-Format
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | Payload    |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der Payload-Bytes an (ohne die 4 Laengen-Bytes).
//! Ein Frame mit ungueltigem Inhalt wird vollstaendig verbraucht und als
//! [`EingehenderFrame::Ungueltig`] geliefert, die Verbindung laeuft weiter.
//! Nur zu grosse Frames sind beim Lesen ein harter Fehler. Beim Schreiben
//! schlaegt eine zu grosse Nachricht fehl, bevor ein Byte im Puffer landet.

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

use crate::control::ControlMessage;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (1 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// EingehenderFrame
// ---------------------------------------------------------------------------

/// Ergebnis des Dekodierens eines vollstaendigen Frames
#[derive(Debug, Clone)]
pub enum EingehenderFrame {
    /// Gueltige Nachricht
    Nachricht(ControlMessage),
    /// Frame war vollstaendig, aber keine gueltige Nachricht
    ///
    /// `request_id` ist 0, wenn sie sich nicht aus dem JSON lesen liess.
    Ungueltig { request_id: u32, fehler: String },
}

/// Liest die `request_id` aus einem Frame, der sonst nicht dekodierbar ist
fn request_id_bergen(payload: &[u8]) -> u32 {
    serde_json::from_slice::<serde_json::Value>(payload)
        .ok()
        .and_then(|wert| wert.get("request_id")?.as_u64())
        .and_then(|id| u32::try_from(id).ok())
        .unwrap_or(0)
}

/// Laenge der JSON-Kodierung eines Werts in Bytes (ohne Laengenfeld)
pub fn kodierte_laenge<T: Serialize + ?Sized>(wert: &T) -> io::Result<usize> {
    let mut zaehler = ByteZaehler(0);
    serde_json::to_writer(&mut zaehler, wert)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(zaehler.0)
}

/// Writer, der nur mitzaehlt
struct ByteZaehler(usize);

impl io::Write for ByteZaehler {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer frame-basierte TCP-Verbindungen
///
/// Implementiert `Encoder<ControlMessage>` und `Decoder` fuer
/// `tokio_util::codec::Framed`.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn zu_gross(laenge: usize, maximum: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Frame zu gross: {laenge} Bytes (Maximum: {maximum} Bytes)"),
    )
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl Decoder for FrameCodec {
    type Item = EingehenderFrame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        // Laenge lesen ohne den Buffer zu veraendern
        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if length > self.max_frame_size {
            return Err(zu_gross(length, self.max_frame_size));
        }

        let total_size = LENGTH_FIELD_SIZE + length;
        if src.len() < total_size {
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_FIELD_SIZE);
        let payload = src.split_to(length);

        // Der Frame ist bereits verbraucht, der naechste bleibt lesbar
        match serde_json::from_slice::<ControlMessage>(&payload) {
            Ok(message) => Ok(Some(EingehenderFrame::Nachricht(message))),
            Err(e) => Ok(Some(EingehenderFrame::Ungueltig {
                request_id: request_id_bergen(&payload),
                fehler: e.to_string(),
            })),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl Encoder<ControlMessage> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: ControlMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {}", e),
            )
        })?;

        if json.len() > self.max_frame_size {
            return Err(zu_gross(json.len(), self.max_frame_size));
        }

        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Direktes Schreiben ohne Framed
// ---------------------------------------------------------------------------

/// Schreibt einen einzelnen Frame in einen `AsyncWrite`
pub async fn write_frame<W>(
    writer: &mut W,
    message: &ControlMessage,
    max_frame_size: usize,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_vec(message).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("JSON-Serialisierung fehlgeschlagen: {}", e),
        )
    })?;

    if json.len() > max_frame_size {
        return Err(zu_gross(json.len(), max_frame_size));
    }

    writer.write_all(&(json.len() as u32).to_be_bytes()).await?;
    writer.write_all(&json).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlPayload;

    fn test_ping_nachricht(request_id: u32) -> ControlMessage {
        ControlMessage::ping(request_id, 999888777)
    }

    fn roh_frame(payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u32(payload.len() as u32);
        buf.put_slice(payload);
        buf
    }

    #[test]
    fn frame_codec_dekodiert_nachricht() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(test_ping_nachricht(42), &mut buf).unwrap();

        let payload_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(buf.len(), LENGTH_FIELD_SIZE + payload_len);

        match codec.decode(&mut buf).unwrap() {
            Some(EingehenderFrame::Nachricht(msg)) => {
                assert_eq!(msg.request_id, 42);
                assert!(matches!(msg.payload, ControlPayload::Ping(_)));
            }
            andere => panic!("Erwartet gueltige Nachricht, erhalten: {andere:?}"),
        }
    }

    #[test]
    fn frame_codec_unvollstaendiger_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(test_ping_nachricht(1), &mut buf).unwrap();

        let half = buf.len() / 2;
        let mut partial = buf.split_to(half);
        assert!(codec.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn frame_codec_zu_wenig_bytes_fuer_laengenfeld() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x00, 0x00][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn ungueltiges_json_wird_verbraucht_und_gemeldet() {
        let mut codec = FrameCodec::new();
        let mut buf = roh_frame(b"{kein json");
        codec.encode(test_ping_nachricht(7), &mut buf).unwrap();

        assert!(matches!(
            codec.decode(&mut buf).unwrap(),
            Some(EingehenderFrame::Ungueltig { request_id: 0, .. })
        ));
        // Der folgende gueltige Frame ist weiterhin lesbar
        match codec.decode(&mut buf).unwrap() {
            Some(EingehenderFrame::Nachricht(msg)) => assert_eq!(msg.request_id, 7),
            andere => panic!("Erwartet gueltige Nachricht, erhalten: {andere:?}"),
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn frame_codec_ablehnung_zu_grosser_frame() {
        let mut codec = FrameCodec::with_max_size(100);
        let mut buf = roh_frame(&[b'x'; 200]);
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn frame_codec_ablehnung_beim_encode_zu_grosse_nachricht() {
        let mut codec = FrameCodec::with_max_size(10);
        let mut buf = BytesMut::new();
        assert!(codec.encode(test_ping_nachricht(1), &mut buf).is_err());
    }

    #[tokio::test]
    async fn write_frame_schreibt_laenge_und_json() {
        let mut buffer: Vec<u8> = Vec::new();
        let nachricht = test_ping_nachricht(99);
        write_frame(&mut buffer, &nachricht, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();

        let laenge = kodierte_laenge(&nachricht).unwrap();
        assert_eq!(buffer.len(), LENGTH_FIELD_SIZE + laenge);

        let mut buf = BytesMut::from(&buffer[..]);
        match FrameCodec::new().decode(&mut buf).unwrap() {
            Some(EingehenderFrame::Nachricht(msg)) => {
                assert_eq!(msg.request_id, 99);
                if let ControlPayload::Ping(p) = msg.payload {
                    assert_eq!(p.timestamp_ms, 999888777);
                } else {
                    panic!("Erwartet Ping-Payload");
                }
            }
            andere => panic!("Erwartet gueltige Nachricht, erhalten: {andere:?}"),
        }
    }

    #[tokio::test]
    async fn write_frame_lehnt_zu_grosse_nachricht_ab() {
        let mut buffer: Vec<u8> = Vec::new();
        assert!(write_frame(&mut buffer, &test_ping_nachricht(1), 10)
            .await
            .is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn kodierte_laenge_entspricht_serialisierung() {
        let nachricht = test_ping_nachricht(3);
        assert_eq!(
            kodierte_laenge(&nachricht).unwrap(),
            serde_json::to_vec(&nachricht).unwrap().len()
        );
    }

    #[test]
    fn request_id_wird_aus_ungueltiger_nachricht_geborgen() {
        let mut codec = FrameCodec::new();
        let mut buf = roh_frame(br#"{"request_id":17,"payload":{"type":"connect","username":""}}"#);
        match codec.decode(&mut buf).unwrap() {
            Some(EingehenderFrame::Ungueltig { request_id, .. }) => assert_eq!(request_id, 17),
            andere => panic!("Erwartet ungueltigen Frame, erhalten: {andere:?}"),
        }
    }

    #[test]
    fn zu_grosse_nachricht_hinterlaesst_puffer_leer() {
        let mut codec = FrameCodec::with_max_size(10);
        let mut buf = BytesMut::new();
        assert!(codec.encode(test_ping_nachricht(1), &mut buf).is_err());
        assert!(buf.is_empty());
    }
}
