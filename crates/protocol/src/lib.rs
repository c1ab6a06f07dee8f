//! easyconnect-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichtentypen, die zwischen Client und
//! Coordinator ausgetauscht werden, sowie das Frame-Format fuer TCP.

pub mod control;
pub mod wire;

pub use control::{ControlMessage, ControlPayload, ErrorCode};
pub use wire::{EingehenderFrame, FrameCodec};
