//! easyconnect-signaling – Session- und Raum-Koordination
//!
//! Dieser Crate haelt den gesamten Laufzeitzustand des Coordinators:
//! Sessions, Raeume, Sprecher-Slots und Chat-Verlauf. Er verteilt Ereignisse
//! an die Mitglieder eines Raums und entfernt stumme Sessions.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)         REST (easyconnect-commander)
//!     |                                        |
//!     v                                        |
//! ClientConnection (pro Verbindung ein Task)   |
//!     |                                        |
//!     v                                        |
//! MessageDispatcher                            |
//!     +-- SessionHandler (Connect, Attach, Disconnect, Heartbeat)
//!     +-- RoomHandler    (JoinRoom, SetSpeaker)
//!     +-- MediaHandler   (Voice, Video, Chat, File)
//!     +-- QueryHandler   (Status, Users, Rooms)
//!     |                                        |
//!     v                                        v
//! Coordinator ---------------------------------+
//!     +-- SessionRegistry  (Identitaet -> Session, Token-Index)
//!     +-- RoomDirectory    (Raum -> Mitglieder, Sprecher-Slot)
//!     +-- ChatVerlauf      (Ringpuffer)
//!     +-- BroadcastRelay   (Zustellung in die Client-Queues)
//!
//! LivenessSweeper – entfernt Sessions ohne Heartbeat
//! ```

pub mod broadcast;
pub mod clock;
pub mod connection;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod history;
pub mod registry;
pub mod rooms;
pub mod server_state;
pub mod speaker;
pub mod sweeper;
pub mod tcp;

// Bequeme Re-Exporte
pub use broadcast::{BroadcastRelay, ClientSender, EreignisArt};
pub use clock::{SystemUhr, TestUhr, Uhr};
pub use connection::ClientConnection;
pub use coordinator::{Coordinator, CoordinatorConfig};
pub use dispatcher::{DispatcherContext, MessageDispatcher};
pub use error::{SignalingError, SignalingResult};
pub use server_state::{SignalingConfig, SignalingState};
pub use speaker::{SprecherSlot, SprecherWechsel};
pub use sweeper::LivenessSweeper;
pub use tcp::SignalingServer;
