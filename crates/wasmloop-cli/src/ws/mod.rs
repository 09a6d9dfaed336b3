//! Minimal WebSocket wire support for the reload channel.
//!
//! Only what a push-only server needs: the HTTP Upgrade handshake and
//! unmasked, unfragmented server-to-client frames (RFC 6455 §5.2).

pub mod frame;
pub mod handshake;

pub use frame::{encode_frame, Frame, Opcode};
pub use handshake::{build_handshake_response, derive_accept_key, parse_handshake, Handshake};
