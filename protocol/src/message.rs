use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// High nibble of a Message's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Request,
    Notify,
    Response,
    Push,
}

impl MessageKind {
    fn from_nibble(n: u8) -> Option<Self> {
        match n {
            0 => Some(Self::Request),
            1 => Some(Self::Notify),
            2 => Some(Self::Response),
            3 => Some(Self::Push),
            _ => None,
        }
    }

    fn to_nibble(self) -> u8 {
        match self {
            Self::Request => 0,
            Self::Notify => 1,
            Self::Response => 2,
            Self::Push => 3,
        }
    }

    fn carries_id(self) -> bool {
        matches!(self, Self::Request | Self::Response)
    }

    fn carries_route(self) -> bool {
        matches!(self, Self::Request | Self::Notify | Self::Push)
    }
}

/// Application message carried inside a Data packet's body. Route grammar
/// is `serverType.handler.method`, ASCII, no embedded dots within a
/// segment (enforced by callers that split on `.`, not by this codec).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub id: u32,
    pub route: Option<String>,
    #[serde(with = "serde_bytes_data")]
    pub data: Bytes,
}

mod serde_bytes_data {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, s: S) -> Result<S::Ok, S::Error> {
        serde_bytes::serialize(data.as_ref(), s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Bytes, D::Error> {
        let v: Vec<u8> = serde_bytes::deserialize(d)?;
        Ok(Bytes::from(v))
    }
}

impl Message {
    pub fn request(id: u32, route: impl Into<String>, data: Bytes) -> Self {
        Self {
            kind: MessageKind::Request,
            id,
            route: Some(route.into()),
            data,
        }
    }

    pub fn notify(route: impl Into<String>, data: Bytes) -> Self {
        Self {
            kind: MessageKind::Notify,
            id: 0,
            route: Some(route.into()),
            data,
        }
    }

    pub fn response(id: u32, data: Bytes) -> Self {
        Self {
            kind: MessageKind::Response,
            id,
            route: None,
            data,
        }
    }

    pub fn push(route: impl Into<String>, data: Bytes) -> Self {
        Self {
            kind: MessageKind::Push,
            id: 0,
            route: Some(route.into()),
            data,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + self.data.len() + 16);
        buf.extend_from_slice(&[self.kind.to_nibble() << 4]);
        if self.kind.carries_id() {
            put_varint(&mut buf, self.id);
        }
        if self.kind.carries_route() {
            let route = self.route.as_deref().unwrap_or("");
            let bytes = route.as_bytes();
            buf.extend_from_slice(&[bytes.len() as u8]);
            buf.extend_from_slice(bytes);
        }
        buf.extend_from_slice(&self.data);
        buf.freeze()
    }

    /// Decoding is total: every byte string either decodes or fails with
    /// `MalformedMessage`, never "needs more bytes" (the full body already
    /// arrived as one Data packet's body).
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor { bytes, pos: 0 };
        let first = cursor.take_u8()?;
        let kind = MessageKind::from_nibble(first >> 4).ok_or(CodecError::MalformedMessage)?;

        let id = if kind.carries_id() {
            cursor.take_varint()?
        } else {
            0
        };

        let route = if kind.carries_route() {
            let len = cursor.take_u8()? as usize;
            let raw = cursor.take_n(len)?;
            Some(String::from_utf8(raw.to_vec()).map_err(|_| CodecError::MalformedMessage)?)
        } else {
            None
        };

        let data = Bytes::copy_from_slice(cursor.remainder());

        Ok(Self {
            kind,
            id,
            route,
            data,
        })
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take_u8(&mut self) -> Result<u8, CodecError> {
        let b = *self.bytes.get(self.pos).ok_or(CodecError::MalformedMessage)?;
        self.pos += 1;
        Ok(b)
    }

    fn take_n(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(n).ok_or(CodecError::MalformedMessage)?;
        let slice = self.bytes.get(self.pos..end).ok_or(CodecError::MalformedMessage)?;
        self.pos = end;
        Ok(slice)
    }

    fn take_varint(&mut self) -> Result<u32, CodecError> {
        get_varint(self)
    }

    fn remainder(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

/// LEB128-style varint: 7 data bits per byte, high bit = continuation.
fn put_varint(buf: &mut BytesMut, mut v: u32) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            buf.extend_from_slice(&[byte]);
            break;
        }
        buf.extend_from_slice(&[byte | 0x80]);
    }
}

fn get_varint(cursor: &mut Cursor) -> Result<u32, CodecError> {
    let mut value: u32 = 0;
    let mut shift = 0u32;
    loop {
        if shift >= 35 {
            return Err(CodecError::MalformedMessage);
        }
        let byte = cursor.take_u8()?;
        value |= ((byte & 0x7f) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(msg: Message) {
        let encoded = msg.encode();
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn round_trips_all_kinds() {
        round_trip(Message::request(42, "room.user.enter", Bytes::from_static(b"abc")));
        round_trip(Message::notify("room.user.ready", Bytes::new()));
        round_trip(Message::response(42, Bytes::from_static(b"ok")));
        round_trip(Message::push("room.game.turn", Bytes::from_static(b"xyz")));
    }

    #[test]
    fn varint_round_trips_large_ids() {
        for id in [0u32, 1, 127, 128, 300, u32::MAX] {
            round_trip(Message::request(id, "a.b.c", Bytes::new()));
        }
    }

    #[test]
    fn truncated_route_is_malformed() {
        // kind byte says Request, varint id ok, route_len says 10 but no bytes follow.
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0u8 << 4]);
        put_varint(&mut buf, 1);
        buf.extend_from_slice(&[10u8]);
        assert_eq!(
            Message::decode(&buf),
            Err(CodecError::MalformedMessage)
        );
    }

    #[test]
    fn empty_input_is_malformed() {
        assert_eq!(Message::decode(&[]), Err(CodecError::MalformedMessage));
    }
}
