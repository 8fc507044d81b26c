//! Binary encoding of UNO values.
//!
//! Integers are big-endian. Strings and sequence lengths use the compressed
//! number form: one byte below 0xFF, otherwise 0xFF followed by a `u32`.
//! Type descriptors and interface references may refer to cache slots, so the
//! encoder and decoder borrow the connection's caches.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::cache::{Ring, Slots, NO_SLOT};
use crate::error::{Result, UrpError};
use crate::types::{Type, TypeClass, UnoException, UnoValue};

/// Member layouts of the structs this crate knows how to read back.
fn struct_layout(name: &str) -> Option<&'static [TypeClass]> {
    use TypeClass::*;
    Some(match name {
        "com.sun.star.beans.PropertyValue" => &[String, Long, Any, Enum],
        "com.sun.star.beans.NamedValue" | "com.sun.star.bridge.ProtocolProperty" => {
            &[String, Any]
        }
        "com.sun.star.awt.Size" | "com.sun.star.awt.Point" => &[Long, Long],
        // NanoSeconds, Seconds, Minutes, Hours, Day, Month, Year, IsUTC
        "com.sun.star.util.DateTime" => &[
            UnsignedLong,
            UnsignedShort,
            UnsignedShort,
            UnsignedShort,
            UnsignedShort,
            UnsignedShort,
            Short,
            Boolean,
        ],
        "com.sun.star.util.Date" => &[UnsignedShort, UnsignedShort, Short],
        _ => return None,
    })
}

pub struct Encoder<'a> {
    buf: &'a mut BytesMut,
    oids: Option<&'a mut Ring<String>>,
}

impl<'a> Encoder<'a> {
    /// Encoder that always spells interface references out in full.
    pub fn new(buf: &'a mut BytesMut) -> Self {
        Self { buf, oids: None }
    }

    /// Encoder sharing the connection's outgoing OID cache.
    pub fn with_oid_cache(buf: &'a mut BytesMut, oids: &'a mut Ring<String>) -> Self {
        Self {
            buf,
            oids: Some(oids),
        }
    }

    pub fn compressed(&mut self, n: u32) {
        if n < 0xFF {
            self.buf.put_u8(n as u8);
        } else {
            self.buf.put_u8(0xFF);
            self.buf.put_u32(n);
        }
    }

    pub fn string(&mut self, s: &str) {
        self.compressed(s.len() as u32);
        self.buf.put_slice(s.as_bytes());
    }

    /// Type descriptor. `slot` is the cache index to use and whether the
    /// name has to be sent along; `None` sends it uncached.
    pub fn type_desc(&mut self, ty: &Type, slot: Option<(u16, bool)>) {
        let code = ty.class as u8;
        if ty.class.is_simple() {
            self.buf.put_u8(code);
            return;
        }
        match slot {
            Some((index, false)) => {
                self.buf.put_u8(code);
                self.buf.put_u16(index);
            }
            Some((index, true)) => {
                self.buf.put_u8(code | 0x80);
                self.buf.put_u16(index);
                self.string(&ty.name);
            }
            None => {
                self.buf.put_u8(code | 0x80);
                self.buf.put_u16(NO_SLOT);
                self.string(&ty.name);
            }
        }
    }

    pub fn interface(&mut self, oid: &str) {
        match self.oids.as_deref_mut() {
            Some(ring) if !oid.is_empty() => {
                let (index, fresh) = ring.slot_for(oid.to_owned());
                self.string(if fresh { oid } else { "" });
                self.buf.put_u16(index);
            }
            _ => {
                self.string(oid);
                self.buf.put_u16(NO_SLOT);
            }
        }
    }

    pub fn value(&mut self, value: &UnoValue, ty: &Type) -> Result<()> {
        match value {
            UnoValue::Void => {}
            UnoValue::Bool(b) => self.buf.put_u8(u8::from(*b)),
            UnoValue::Byte(n) => self.buf.put_u8(*n),
            UnoValue::Short(n) => self.buf.put_i16(*n),
            UnoValue::UnsignedShort(n) | UnoValue::Char(n) => self.buf.put_u16(*n),
            UnoValue::Long(n) | UnoValue::Enum(n) => self.buf.put_i32(*n),
            UnoValue::UnsignedLong(n) => self.buf.put_u32(*n),
            UnoValue::Hyper(n) => self.buf.put_i64(*n),
            UnoValue::UnsignedHyper(n) => self.buf.put_u64(*n),
            UnoValue::Float(f) => self.buf.put_f32(*f),
            UnoValue::Double(d) => self.buf.put_f64(*d),
            UnoValue::String(s) => self.string(s),
            UnoValue::Type(t) => self.type_desc(t, None),
            UnoValue::Any(any) => {
                self.type_desc(&any.type_desc, None);
                self.value(&any.value, &any.type_desc)?;
            }
            UnoValue::Struct(members) => {
                for member in members {
                    self.value(member, &member.wire_type())?;
                }
            }
            UnoValue::Exception(exc) => {
                self.string(&exc.message);
                self.interface("");
            }
            UnoValue::Sequence(items) => {
                let elem = ty.element().unwrap_or_else(|| {
                    items.first().map(UnoValue::wire_type).unwrap_or_else(Type::any)
                });
                self.compressed(items.len() as u32);
                for item in items {
                    self.value(item, &elem)?;
                }
            }
            UnoValue::Interface(oid) => self.interface(oid),
        }
        Ok(())
    }
}

pub struct Decoder<'a> {
    buf: &'a mut Bytes,
    types: &'a mut Slots<Type>,
    oids: &'a mut Slots<String>,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a mut Bytes, types: &'a mut Slots<Type>, oids: &'a mut Slots<String>) -> Self {
        Self { buf, types, oids }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, n: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(UrpError::Codec(format!(
                "truncated {what}: need {n} bytes, have {}",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.need(1, "byte")?;
        Ok(self.buf.get_u8())
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.need(2, "u16")?;
        Ok(self.buf.get_u16())
    }

    pub fn compressed(&mut self) -> Result<u32> {
        match self.u8()? {
            0xFF => {
                self.need(4, "compressed number")?;
                Ok(self.buf.get_u32())
            }
            n => Ok(u32::from(n)),
        }
    }

    pub fn raw(&mut self, len: usize, what: &str) -> Result<Bytes> {
        self.need(len, what)?;
        Ok(self.buf.copy_to_bytes(len))
    }

    pub fn string(&mut self) -> Result<String> {
        let len = self.compressed()? as usize;
        let bytes = self.raw(len, "string")?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| UrpError::Codec(format!("string is not UTF-8: {e}")))
    }

    /// Type descriptor, resolving cache references.
    pub fn type_desc(&mut self) -> Result<Type> {
        let byte = self.u8()?;
        let class = TypeClass::from_wire(byte).ok_or(UrpError::UnknownTypeClass(byte & 0x7F))?;
        if class.is_simple() {
            return Ok(Type::simple(class));
        }
        let index = self.u16()?;
        if byte & 0x80 != 0 {
            let ty = Type::named(class, self.string()?);
            if index != NO_SLOT {
                self.types.store(index, ty.clone());
            }
            Ok(ty)
        } else {
            self.types.fetch(index)
        }
    }

    pub fn interface(&mut self) -> Result<String> {
        let oid = self.string()?;
        let index = self.u16()?;
        if index == NO_SLOT {
            return Ok(oid);
        }
        if oid.is_empty() {
            self.oids.fetch(index)
        } else {
            self.oids.store(index, oid.clone());
            Ok(oid)
        }
    }

    pub fn value(&mut self, ty: &Type) -> Result<UnoValue> {
        let b = &mut *self.buf;
        macro_rules! fixed {
            ($n:expr, $what:literal, $get:ident, $variant:ident) => {{
                if b.remaining() < $n {
                    return Err(UrpError::Codec(format!("truncated {}", $what)));
                }
                UnoValue::$variant(b.$get())
            }};
        }
        Ok(match ty.class {
            TypeClass::Void => UnoValue::Void,
            TypeClass::Boolean => {
                if b.remaining() < 1 {
                    return Err(UrpError::Codec("truncated boolean".into()));
                }
                UnoValue::Bool(b.get_u8() != 0)
            }
            TypeClass::Byte => fixed!(1, "byte", get_u8, Byte),
            TypeClass::Short => fixed!(2, "short", get_i16, Short),
            TypeClass::UnsignedShort => fixed!(2, "unsigned short", get_u16, UnsignedShort),
            TypeClass::Char => fixed!(2, "char", get_u16, Char),
            TypeClass::Long => fixed!(4, "long", get_i32, Long),
            TypeClass::Enum => fixed!(4, "enum", get_i32, Enum),
            TypeClass::UnsignedLong => fixed!(4, "unsigned long", get_u32, UnsignedLong),
            TypeClass::Hyper => fixed!(8, "hyper", get_i64, Hyper),
            TypeClass::UnsignedHyper => fixed!(8, "unsigned hyper", get_u64, UnsignedHyper),
            TypeClass::Float => fixed!(4, "float", get_f32, Float),
            TypeClass::Double => fixed!(8, "double", get_f64, Double),
            TypeClass::String => UnoValue::String(self.string()?),
            TypeClass::Type => UnoValue::Type(self.type_desc()?),
            TypeClass::Any => {
                let inner = self.type_desc()?;
                let value = self.value(&inner)?;
                UnoValue::any(inner, value)
            }
            TypeClass::Struct => {
                let layout = struct_layout(&ty.name)
                    .ok_or_else(|| UrpError::Codec(format!("no layout for struct {}", ty.name)))?;
                let mut members = Vec::with_capacity(layout.len());
                for class in layout {
                    members.push(self.value(&Type::simple(*class))?);
                }
                UnoValue::Struct(members)
            }
            TypeClass::Exception => {
                // Message and Context; members of derived exceptions are left unread.
                let message = self.string()?;
                self.interface()?;
                UnoValue::Exception(UnoException {
                    type_name: ty.name.clone(),
                    message,
                })
            }
            TypeClass::Sequence => {
                let len = self.compressed()? as usize;
                let elem = ty.element().unwrap_or_else(Type::any);
                if elem.class == TypeClass::Byte {
                    let bytes = self.raw(len, "byte sequence")?;
                    UnoValue::Sequence(bytes.iter().map(|b| UnoValue::Byte(*b)).collect())
                } else {
                    let mut items = Vec::with_capacity(len.min(4096));
                    for _ in 0..len {
                        items.push(self.value(&elem)?);
                    }
                    UnoValue::Sequence(items)
                }
            }
            TypeClass::Interface => UnoValue::Interface(self.interface()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::property_value;
    use pretty_assertions::assert_eq;

    fn caches() -> (Slots<Type>, Slots<String>) {
        (Slots::new("type"), Slots::new("oid"))
    }

    fn decode(bytes: BytesMut, ty: &Type) -> UnoValue {
        let (mut types, mut oids) = caches();
        let mut data = bytes.freeze();
        Decoder::new(&mut data, &mut types, &mut oids).value(ty).unwrap()
    }

    #[test]
    fn compressed_numbers_switch_form_at_255() {
        let mut buf = BytesMut::new();
        let mut enc = Encoder::new(&mut buf);
        enc.compressed(254);
        enc.compressed(255);
        assert_eq!(buf.as_ref(), &[254, 0xFF, 0, 0, 0, 255]);
    }

    #[test]
    fn property_value_sequence_reads_back() {
        let seq = UnoValue::Sequence(vec![
            property_value("Hidden", UnoValue::Bool(true), Type::boolean()),
            property_value("FilterName", "writer8".into(), Type::string()),
        ]);
        let ty = Type::sequence_of("com.sun.star.beans.PropertyValue");
        let mut buf = BytesMut::new();
        Encoder::new(&mut buf).value(&seq, &ty).unwrap();
        assert_eq!(decode(buf, &ty), seq);
    }

    #[test]
    fn any_types_resolve_through_cache() {
        let ty = Type::interface("com.sun.star.text.XText");
        let mut buf = BytesMut::new();
        let mut enc = Encoder::new(&mut buf);
        // first occurrence fills slot 5, second refers to it
        enc.type_desc(&ty, Some((5, true)));
        enc.interface("oid-a");
        enc.type_desc(&ty, Some((5, false)));
        enc.interface("oid-b");

        let (mut types, mut oids) = caches();
        let mut data = buf.freeze();
        let mut dec = Decoder::new(&mut data, &mut types, &mut oids);
        let first = dec.value(&Type::any()).unwrap();
        let second = dec.value(&Type::any()).unwrap();
        assert_eq!(first, UnoValue::any(ty.clone(), UnoValue::Interface("oid-a".into())));
        assert_eq!(second, UnoValue::any(ty, UnoValue::Interface("oid-b".into())));
    }

    #[test]
    fn cached_interface_references() {
        let mut ring = Ring::new();
        let mut buf = BytesMut::new();
        {
            let mut enc = Encoder::with_oid_cache(&mut buf, &mut ring);
            enc.interface("doc-1");
            enc.interface("doc-1");
            enc.interface("");
        }
        let (mut types, mut oids) = caches();
        let mut data = buf.freeze();
        let mut dec = Decoder::new(&mut data, &mut types, &mut oids);
        assert_eq!(dec.interface().unwrap(), "doc-1");
        assert_eq!(dec.interface().unwrap(), "doc-1");
        assert_eq!(dec.interface().unwrap(), "");
        assert_eq!(dec.remaining(), 0);
    }

    #[test]
    fn date_time_struct() {
        let mut buf = BytesMut::new();
        buf.put_u32(0);
        for part in [5u16, 4, 3, 17, 6] {
            buf.put_u16(part);
        }
        buf.put_i16(2024);
        buf.put_u8(0);
        let value = decode(buf, &Type::structure("com.sun.star.util.DateTime"));
        let members = value.members().unwrap();
        assert_eq!(members.len(), 8);
        assert_eq!(members[6], UnoValue::Short(2024));
    }

    #[test]
    fn unknown_struct_is_an_error() {
        let (mut types, mut oids) = caches();
        let mut data = Bytes::from_static(&[0, 0]);
        let err = Decoder::new(&mut data, &mut types, &mut oids)
            .value(&Type::structure("com.sun.star.text.Mystery"))
            .unwrap_err();
        assert!(err.to_string().contains("com.sun.star.text.Mystery"));
    }

    #[test]
    fn truncated_long_fails() {
        let (mut types, mut oids) = caches();
        let mut data = Bytes::from_static(&[0, 1]);
        assert!(Decoder::new(&mut data, &mut types, &mut oids)
            .value(&Type::long())
            .is_err());
    }
}
