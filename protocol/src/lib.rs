//! Wire protocol for the edge gateway: `Packet` framing, `Message` framing,
//! handshake JSON bodies, and the `RemoteEnvelope` that crosses the pub/sub
//! fabric between an edge and a worker (`spec.md` §4.1/§6).

mod envelope;
mod error;
mod handshake;
mod message;
mod packet;

pub use envelope::{EnvelopeKind, RemoteEnvelope};
pub use error::CodecError;
pub use handshake::{HandshakeRequest, HandshakeResponse, HandshakeSys};
pub use message::{Message, MessageKind};
pub use packet::{MAX_BODY_LEN, Packet, PacketType};
