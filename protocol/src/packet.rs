use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::CodecError;

/// Largest body a single packet may carry: the 3-byte big-endian length
/// field tops out at `2^24 - 1`.
pub const MAX_BODY_LEN: usize = (1 << 24) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Handshake,
    HandshakeAck,
    Heartbeat,
    Data,
    Kick,
}

impl PacketType {
    fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Handshake),
            1 => Some(Self::HandshakeAck),
            2 => Some(Self::Heartbeat),
            3 => Some(Self::Data),
            4 => Some(Self::Kick),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Handshake => 0,
            Self::HandshakeAck => 1,
            Self::Heartbeat => 2,
            Self::Data => 3,
            Self::Kick => 4,
        }
    }
}

/// One frame of the outer wire protocol: `type(1) | len(3 be) | body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketType,
    pub body: Bytes,
}

impl Packet {
    /// Builds a packet, rejecting bodies that can't fit the 3-byte length
    /// field and Heartbeat bodies that aren't empty.
    pub fn new(kind: PacketType, body: Bytes) -> Result<Self, CodecError> {
        if body.len() > MAX_BODY_LEN {
            return Err(CodecError::MalformedFrame);
        }
        if kind == PacketType::Heartbeat && !body.is_empty() {
            return Err(CodecError::MalformedFrame);
        }
        Ok(Self { kind, body })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + self.body.len());
        buf.put_u8(self.kind.to_u8());
        let len = self.body.len() as u32;
        buf.put_u8((len >> 16) as u8);
        buf.put_u8((len >> 8) as u8);
        buf.put_u8(len as u8);
        buf.put_slice(&self.body);
        buf.freeze()
    }

    /// Tries to pull one frame off the front of `buf`. `Ok(None)` means more
    /// bytes are needed; nothing is consumed in that case.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Packet>, CodecError> {
        if buf.len() < 4 {
            return Ok(None);
        }
        let kind_byte = buf[0];
        let len = ((buf[1] as usize) << 16) | ((buf[2] as usize) << 8) | (buf[3] as usize);
        if buf.len() < 4 + len {
            return Ok(None);
        }
        let kind = PacketType::from_u8(kind_byte).ok_or(CodecError::MalformedFrame)?;
        buf.advance(4);
        let body = buf.split_to(len).freeze();
        if kind == PacketType::Heartbeat && !body.is_empty() {
            return Err(CodecError::MalformedFrame);
        }
        Ok(Some(Packet { kind, body }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let p = Packet::new(PacketType::Data, Bytes::from_static(b"hello")).unwrap();
        let mut buf = BytesMut::from(&p.encode()[..]);
        let decoded = Packet::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, p);
        assert!(buf.is_empty());
    }

    #[test]
    fn incomplete_frame_returns_none() {
        let p = Packet::new(PacketType::Data, Bytes::from_static(b"hello")).unwrap();
        let full = p.encode();
        let mut buf = BytesMut::from(&full[..full.len() - 1]);
        assert_eq!(Packet::decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn max_body_len_accepted_one_over_rejected() {
        let ok = Bytes::from(vec![0u8; MAX_BODY_LEN]);
        assert!(Packet::new(PacketType::Data, ok).is_ok());
        let too_big = Bytes::from(vec![0u8; MAX_BODY_LEN + 1]);
        assert_eq!(
            Packet::new(PacketType::Data, too_big),
            Err(CodecError::MalformedFrame)
        );
    }

    #[test]
    fn heartbeat_with_body_is_malformed() {
        assert_eq!(
            Packet::new(PacketType::Heartbeat, Bytes::from_static(b"x")),
            Err(CodecError::MalformedFrame)
        );

        // Also reject at decode time, in case a peer sneaks one onto the wire.
        let mut buf = BytesMut::new();
        buf.put_u8(2); // Heartbeat
        buf.put_u8(0);
        buf.put_u8(0);
        buf.put_u8(1);
        buf.put_u8(b'x');
        assert_eq!(Packet::decode(&mut buf), Err(CodecError::MalformedFrame));
    }

    #[test]
    fn unknown_type_is_malformed() {
        let mut buf = BytesMut::new();
        buf.put_u8(200);
        buf.put_u8(0);
        buf.put_u8(0);
        buf.put_u8(0);
        assert_eq!(Packet::decode(&mut buf), Err(CodecError::MalformedFrame));
    }
}
