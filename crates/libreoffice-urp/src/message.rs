//! Request and reply headers.
//!
//! A request names the interface type, target OID and thread id (TID) of the
//! call. Each of those is either repeated from the previous message, taken
//! from a cache slot, or spelled out. Replies only carry the TID.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::cache::{Ring, Slots};
use crate::codec::{Decoder, Encoder};
use crate::error::{Result, UrpError};
use crate::types::Type;

const LONG_HEADER: u8 = 0x80;
const REQUEST: u8 = 0x40;
const NEW_TYPE: u8 = 0x20;
const NEW_OID: u8 = 0x10;
const NEW_TID: u8 = 0x08;
const FUNCTION_ID16: u8 = 0x04;
const MORE_FLAGS: u8 = 0x01;
const EXCEPTION: u8 = 0x20;
const MUST_REPLY: u8 = 0x80;
const SHORT_FUNCTION_ID14: u8 = 0x40;

#[derive(Debug, Clone)]
pub struct Request {
    pub function: u16,
    pub interface: Type,
    pub oid: String,
    pub tid: Vec<u8>,
    pub must_reply: bool,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub tid: Vec<u8>,
    pub exception: bool,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub enum Message {
    Request(Request),
    Reply(Reply),
}

/// Everything the sender of a request decides.
pub struct RequestHead<'a> {
    pub function: u16,
    pub interface: &'a Type,
    pub oid: &'a str,
    pub tid: &'a [u8],
    pub must_reply: bool,
}

#[derive(Debug, Default)]
struct LastSeen {
    interface: Option<Type>,
    oid: Option<String>,
    tid: Option<Vec<u8>>,
}

/// Decoding state for messages from the peer.
pub struct Inbound {
    types: Slots<Type>,
    oids: Slots<String>,
    tids: Slots<Vec<u8>>,
    last: LastSeen,
}

impl Inbound {
    pub fn new() -> Self {
        Self {
            types: Slots::new("type"),
            oids: Slots::new("oid"),
            tids: Slots::new("tid"),
            last: LastSeen::default(),
        }
    }

    /// Decoder for a message body, sharing this side's caches.
    pub fn decoder<'a>(&'a mut self, body: &'a mut Bytes) -> Decoder<'a> {
        Decoder::new(body, &mut self.types, &mut self.oids)
    }

    pub fn decode(&mut self, mut data: Bytes) -> Result<Message> {
        let flags = *data
            .first()
            .ok_or_else(|| UrpError::Protocol("empty message".into()))?;
        data.advance(1);

        if flags & LONG_HEADER == 0 {
            let function = if flags & SHORT_FUNCTION_ID14 != 0 {
                let low = self.decoder(&mut data).u8()?;
                (u16::from(flags & 0x3F) << 8) | u16::from(low)
            } else {
                u16::from(flags & 0x3F)
            };
            return Ok(Message::Request(Request {
                function,
                interface: cached(&self.last.interface, "type")?,
                oid: cached(&self.last.oid, "oid")?,
                tid: cached(&self.last.tid, "tid")?,
                must_reply: true,
                body: data,
            }));
        }

        if flags & REQUEST == 0 {
            let tid = if flags & NEW_TID != 0 {
                self.read_tid(&mut data)?
            } else {
                cached(&self.last.tid, "tid")?
            };
            return Ok(Message::Reply(Reply {
                tid,
                exception: flags & EXCEPTION != 0,
                body: data,
            }));
        }

        let mut must_reply = true;
        if flags & MORE_FLAGS != 0 {
            let more = self.decoder(&mut data).u8()?;
            must_reply = more & MUST_REPLY != 0;
        }
        let function = {
            let mut dec = self.decoder(&mut data);
            if flags & FUNCTION_ID16 != 0 {
                dec.u16()?
            } else {
                u16::from(dec.u8()?)
            }
        };
        let interface = if flags & NEW_TYPE != 0 {
            let ty = self.decoder(&mut data).type_desc()?;
            self.last.interface = Some(ty.clone());
            ty
        } else {
            cached(&self.last.interface, "type")?
        };
        let oid = if flags & NEW_OID != 0 {
            let oid = self.decoder(&mut data).interface()?;
            self.last.oid = Some(oid.clone());
            oid
        } else {
            cached(&self.last.oid, "oid")?
        };
        let tid = if flags & NEW_TID != 0 {
            self.read_tid(&mut data)?
        } else {
            cached(&self.last.tid, "tid")?
        };

        Ok(Message::Request(Request {
            function,
            interface,
            oid,
            tid,
            must_reply,
            body: data,
        }))
    }

    fn read_tid(&mut self, data: &mut Bytes) -> Result<Vec<u8>> {
        let (raw, index) = {
            let mut dec = self.decoder(data);
            let len = dec.compressed()? as usize;
            let raw = dec.raw(len, "tid")?.to_vec();
            (raw, dec.u16()?)
        };
        let tid = if raw.is_empty() && index != crate::cache::NO_SLOT {
            self.tids.fetch(index)?
        } else {
            self.tids.store(index, raw.clone());
            raw
        };
        self.last.tid = Some(tid.clone());
        Ok(tid)
    }
}

impl Default for Inbound {
    fn default() -> Self {
        Self::new()
    }
}

fn cached<T: Clone>(value: &Option<T>, what: &str) -> Result<T> {
    value
        .clone()
        .ok_or_else(|| UrpError::Protocol(format!("header repeats a {what} that was never sent")))
}

/// Encoding state for messages to the peer.
pub struct Outbound {
    types: Ring<Type>,
    oids: Ring<String>,
    tids: Ring<Vec<u8>>,
    last: LastSeen,
}

impl Outbound {
    pub fn new() -> Self {
        Self {
            types: Ring::new(),
            oids: Ring::new(),
            tids: Ring::new(),
            last: LastSeen::default(),
        }
    }

    /// Encoder for a message body, sharing the outgoing OID cache.
    pub fn encoder<'a>(&'a mut self, buf: &'a mut BytesMut) -> Encoder<'a> {
        Encoder::with_oid_cache(buf, &mut self.oids)
    }

    pub fn request(&mut self, head: &RequestHead<'_>, body: &[u8]) -> BytesMut {
        let mut buf = BytesMut::with_capacity(body.len() + 64);
        let new_type = self.last.interface.as_ref() != Some(head.interface);
        let new_oid = self.last.oid.as_deref() != Some(head.oid);
        let new_tid = self.last.tid.as_deref() != Some(head.tid);

        if !(new_type || new_oid || new_tid) && head.must_reply && head.function < 0x4000 {
            if head.function < 0x40 {
                buf.put_u8(head.function as u8);
            } else {
                buf.put_u16(head.function | (u16::from(SHORT_FUNCTION_ID14) << 8));
            }
            buf.put_slice(body);
            return buf;
        }

        let mut flags = LONG_HEADER | REQUEST;
        if new_type {
            flags |= NEW_TYPE;
        }
        if new_oid {
            flags |= NEW_OID;
        }
        if new_tid {
            flags |= NEW_TID;
        }
        if head.function > 0xFF {
            flags |= FUNCTION_ID16;
        }
        if !head.must_reply {
            flags |= MORE_FLAGS;
        }
        buf.put_u8(flags);
        if !head.must_reply {
            buf.put_u8(0);
        }
        if head.function > 0xFF {
            buf.put_u16(head.function);
        } else {
            buf.put_u8(head.function as u8);
        }

        if new_type {
            let slot = self.types.slot_for(head.interface.clone());
            Encoder::new(&mut buf).type_desc(head.interface, Some(slot));
            self.last.interface = Some(head.interface.clone());
        }
        if new_oid {
            self.encoder(&mut buf).interface(head.oid);
            self.last.oid = Some(head.oid.to_owned());
        }
        if new_tid {
            self.write_tid(&mut buf, head.tid);
        }
        buf.put_slice(body);
        buf
    }

    pub fn reply(&mut self, tid: &[u8], exception: bool, body: &[u8]) -> BytesMut {
        let mut buf = BytesMut::with_capacity(body.len() + 16);
        let new_tid = self.last.tid.as_deref() != Some(tid);
        let mut flags = LONG_HEADER;
        if exception {
            flags |= EXCEPTION;
        }
        if new_tid {
            flags |= NEW_TID;
        }
        buf.put_u8(flags);
        if new_tid {
            self.write_tid(&mut buf, tid);
        }
        buf.put_slice(body);
        buf
    }

    fn write_tid(&mut self, buf: &mut BytesMut, tid: &[u8]) {
        let (index, fresh) = self.tids.slot_for(tid.to_vec());
        let mut enc = Encoder::new(buf);
        if fresh {
            enc.compressed(tid.len() as u32);
            buf.put_slice(tid);
        } else {
            enc.compressed(0);
        }
        buf.put_u16(index);
        self.last.tid = Some(tid.to_vec());
    }
}

impl Default for Outbound {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head<'a>(function: u16, interface: &'a Type, oid: &'a str, tid: &'a [u8]) -> RequestHead<'a> {
        RequestHead {
            function,
            interface,
            oid,
            tid,
            must_reply: true,
        }
    }

    #[test]
    fn long_request_then_short_repeat() {
        let text = Type::interface("com.sun.star.text.XText");
        let mut out = Outbound::new();
        let mut inb = Inbound::new();

        let first = out.request(&head(10, &text, "text-1", b"t1"), b"xyz");
        let second = out.request(&head(11, &text, "text-1", b"t1"), b"");
        assert!(second.len() < first.len());
        assert_eq!(second.as_ref(), &[11]);

        let Message::Request(a) = inb.decode(first.freeze()).unwrap() else {
            panic!("expected request");
        };
        assert_eq!(a.function, 10);
        assert_eq!(a.interface, text);
        assert_eq!(a.oid, "text-1");
        assert_eq!(a.tid, b"t1");
        assert_eq!(a.body.as_ref(), b"xyz");

        let Message::Request(b) = inb.decode(second.freeze()).unwrap() else {
            panic!("expected request");
        };
        assert_eq!(b.function, 11);
        assert_eq!(b.oid, "text-1");
    }

    #[test]
    fn one_way_requests_carry_more_flags() {
        let ty = Type::interface("com.sun.star.uno.XInterface");
        let mut out = Outbound::new();
        let mut h = head(2, &ty, "obj", b"t");
        h.must_reply = false;
        let msg = out.request(&h, b"");
        let Message::Request(req) = Inbound::new().decode(msg.freeze()).unwrap() else {
            panic!("expected request");
        };
        assert!(!req.must_reply);
        assert_eq!(req.function, 2);
    }

    #[test]
    fn fourteen_bit_short_function_ids() {
        let ty = Type::interface("com.sun.star.text.XText");
        let mut out = Outbound::new();
        let mut inb = Inbound::new();
        let first = out.request(&head(1, &ty, "o", b"t"), b"");
        let second = out.request(&head(300, &ty, "o", b"t"), b"");
        assert_eq!(second.len(), 2);
        inb.decode(first.freeze()).unwrap();
        let Message::Request(req) = inb.decode(second.freeze()).unwrap() else {
            panic!("expected request");
        };
        assert_eq!(req.function, 300);
    }

    #[test]
    fn replies_reuse_cached_tids() {
        let mut out = Outbound::new();
        let mut inb = Inbound::new();
        let a = out.reply(b"tid-7", false, b"\x01");
        let b = out.reply(b"tid-8", true, b"");
        let c = out.reply(b"tid-7", false, b"");

        for (msg, tid, exc) in [
            (a, &b"tid-7"[..], false),
            (b, &b"tid-8"[..], true),
            (c, &b"tid-7"[..], false),
        ] {
            let Message::Reply(reply) = inb.decode(msg.freeze()).unwrap() else {
                panic!("expected reply");
            };
            assert_eq!(reply.tid, tid);
            assert_eq!(reply.exception, exc);
        }
    }

    #[test]
    fn short_header_without_history_is_rejected() {
        let err = Inbound::new().decode(Bytes::from_static(&[3])).unwrap_err();
        assert!(matches!(err, UrpError::Protocol(_)));
    }
}
