//! UNO type descriptions and values as they travel over URP.

use std::fmt;

/// Wire code of a UNO type (lower seven bits of a type byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeClass {
    Void = 0,
    Char = 1,
    Boolean = 2,
    Byte = 3,
    Short = 4,
    UnsignedShort = 5,
    Long = 6,
    UnsignedLong = 7,
    Hyper = 8,
    UnsignedHyper = 9,
    Float = 10,
    Double = 11,
    String = 12,
    Type = 13,
    Any = 14,
    Enum = 15,
    Struct = 17,
    Exception = 19,
    Sequence = 20,
    Interface = 22,
}

const ALL_CLASSES: [TypeClass; 20] = [
    TypeClass::Void,
    TypeClass::Char,
    TypeClass::Boolean,
    TypeClass::Byte,
    TypeClass::Short,
    TypeClass::UnsignedShort,
    TypeClass::Long,
    TypeClass::UnsignedLong,
    TypeClass::Hyper,
    TypeClass::UnsignedHyper,
    TypeClass::Float,
    TypeClass::Double,
    TypeClass::String,
    TypeClass::Type,
    TypeClass::Any,
    TypeClass::Enum,
    TypeClass::Struct,
    TypeClass::Exception,
    TypeClass::Sequence,
    TypeClass::Interface,
];

impl TypeClass {
    pub fn from_wire(byte: u8) -> Option<Self> {
        let code = byte & 0x7F;
        ALL_CLASSES.iter().copied().find(|c| *c as u8 == code)
    }

    /// Simple types travel as a single byte and are never cached.
    pub fn is_simple(self) -> bool {
        (self as u8) <= TypeClass::Any as u8
    }

    /// Classify an IDL type name such as `long`, `[]string` or
    /// `com.sun.star.text.XText`.
    ///
    /// Names of enums cannot be told apart from structs by spelling alone;
    /// callers that marshal enums build their `Type` explicitly.
    pub fn from_name(name: &str) -> Self {
        match name {
            "" | "void" => TypeClass::Void,
            "char" => TypeClass::Char,
            "boolean" => TypeClass::Boolean,
            "byte" => TypeClass::Byte,
            "short" => TypeClass::Short,
            "unsigned short" => TypeClass::UnsignedShort,
            "long" => TypeClass::Long,
            "unsigned long" => TypeClass::UnsignedLong,
            "hyper" => TypeClass::Hyper,
            "unsigned hyper" => TypeClass::UnsignedHyper,
            "float" => TypeClass::Float,
            "double" => TypeClass::Double,
            "string" => TypeClass::String,
            "type" => TypeClass::Type,
            "any" => TypeClass::Any,
            n if n.starts_with("[]") => TypeClass::Sequence,
            n if n.rsplit('.').next().is_some_and(|last| last.starts_with('X')) => {
                TypeClass::Interface
            }
            _ => TypeClass::Struct,
        }
    }
}

/// A type class plus, for the complex classes, its fully qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    pub class: TypeClass,
    pub name: String,
}

impl Type {
    pub fn simple(class: TypeClass) -> Self {
        Self {
            class,
            name: String::new(),
        }
    }

    pub fn named(class: TypeClass, name: impl Into<String>) -> Self {
        Self {
            class,
            name: name.into(),
        }
    }

    pub fn void() -> Self {
        Self::simple(TypeClass::Void)
    }

    pub fn boolean() -> Self {
        Self::simple(TypeClass::Boolean)
    }

    pub fn short() -> Self {
        Self::simple(TypeClass::Short)
    }

    pub fn long() -> Self {
        Self::simple(TypeClass::Long)
    }

    pub fn float() -> Self {
        Self::simple(TypeClass::Float)
    }

    pub fn string() -> Self {
        Self::simple(TypeClass::String)
    }

    pub fn any() -> Self {
        Self::simple(TypeClass::Any)
    }

    pub fn meta() -> Self {
        Self::simple(TypeClass::Type)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::named(TypeClass::Interface, name)
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::named(TypeClass::Enum, name)
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Self::named(TypeClass::Struct, name)
    }

    pub fn sequence_of(element: &str) -> Self {
        Self::named(TypeClass::Sequence, format!("[]{element}"))
    }

    /// Element type of a sequence type, if this is one.
    pub fn element(&self) -> Option<Type> {
        let inner = self.name.strip_prefix("[]")?;
        let class = TypeClass::from_name(inner);
        Some(if class.is_simple() {
            Type::simple(class)
        } else {
            Type::named(class, inner)
        })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{:?}", self.class)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// Any value that can cross the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum UnoValue {
    Void,
    Bool(bool),
    Byte(u8),
    Short(i16),
    UnsignedShort(u16),
    Long(i32),
    UnsignedLong(u32),
    Hyper(i64),
    UnsignedHyper(u64),
    Float(f32),
    Double(f64),
    Char(u16),
    String(String),
    Type(Type),
    Any(Box<Any>),
    Enum(i32),
    /// Struct members in declaration order, base struct members first.
    Struct(Vec<UnoValue>),
    Exception(UnoException),
    Sequence(Vec<UnoValue>),
    /// Remote object reference by OID; the empty string is the null reference.
    Interface(String),
}

impl UnoValue {
    pub fn any(type_desc: Type, value: UnoValue) -> Self {
        UnoValue::Any(Box::new(Any { type_desc, value }))
    }

    pub fn null() -> Self {
        UnoValue::Interface(String::new())
    }

    /// Strip any number of `Any` wrappers.
    pub fn unwrap_any(&self) -> &UnoValue {
        match self {
            UnoValue::Any(inner) => inner.value.unwrap_any(),
            other => other,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.unwrap_any() {
            UnoValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.unwrap_any() {
            UnoValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of any of the 8/16/32-bit integral variants and enums.
    pub fn as_i64(&self) -> Option<i64> {
        match self.unwrap_any() {
            UnoValue::Byte(n) => Some(i64::from(*n)),
            UnoValue::Short(n) => Some(i64::from(*n)),
            UnoValue::UnsignedShort(n) => Some(i64::from(*n)),
            UnoValue::Long(n) | UnoValue::Enum(n) => Some(i64::from(*n)),
            UnoValue::UnsignedLong(n) => Some(i64::from(*n)),
            UnoValue::Hyper(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.unwrap_any() {
            UnoValue::Float(f) => Some(f64::from(*f)),
            UnoValue::Double(d) => Some(*d),
            other => other.as_i64().map(|n| n as f64),
        }
    }

    /// OID of a non-null interface reference, looking through `Any`.
    pub fn oid(&self) -> Option<&str> {
        match self.unwrap_any() {
            UnoValue::Interface(oid) if !oid.is_empty() => Some(oid),
            _ => None,
        }
    }

    pub fn members(&self) -> Option<&[UnoValue]> {
        match self.unwrap_any() {
            UnoValue::Struct(members) => Some(members),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[UnoValue]> {
        match self.unwrap_any() {
            UnoValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Wire type implied by the variant. Used for struct members, which carry
    /// no type tags of their own.
    pub fn wire_type(&self) -> Type {
        let class = match self {
            UnoValue::Void => TypeClass::Void,
            UnoValue::Bool(_) => TypeClass::Boolean,
            UnoValue::Byte(_) => TypeClass::Byte,
            UnoValue::Short(_) => TypeClass::Short,
            UnoValue::UnsignedShort(_) => TypeClass::UnsignedShort,
            UnoValue::Long(_) => TypeClass::Long,
            UnoValue::UnsignedLong(_) => TypeClass::UnsignedLong,
            UnoValue::Hyper(_) => TypeClass::Hyper,
            UnoValue::UnsignedHyper(_) => TypeClass::UnsignedHyper,
            UnoValue::Float(_) => TypeClass::Float,
            UnoValue::Double(_) => TypeClass::Double,
            UnoValue::Char(_) => TypeClass::Char,
            UnoValue::String(_) => TypeClass::String,
            UnoValue::Type(_) => TypeClass::Type,
            UnoValue::Any(_) => TypeClass::Any,
            UnoValue::Enum(_) => TypeClass::Enum,
            UnoValue::Struct(_) => TypeClass::Struct,
            UnoValue::Exception(_) => TypeClass::Exception,
            UnoValue::Sequence(items) => {
                return match items.first() {
                    Some(UnoValue::String(_)) => Type::sequence_of("string"),
                    Some(UnoValue::Byte(_)) => Type::sequence_of("byte"),
                    _ => Type::sequence_of("any"),
                }
            }
            UnoValue::Interface(_) => TypeClass::Interface,
        };
        Type::simple(class)
    }
}

impl From<&str> for UnoValue {
    fn from(s: &str) -> Self {
        UnoValue::String(s.to_owned())
    }
}

impl From<String> for UnoValue {
    fn from(s: String) -> Self {
        UnoValue::String(s)
    }
}

impl From<bool> for UnoValue {
    fn from(b: bool) -> Self {
        UnoValue::Bool(b)
    }
}

impl From<i32> for UnoValue {
    fn from(n: i32) -> Self {
        UnoValue::Long(n)
    }
}

/// A value tagged with its own type.
#[derive(Debug, Clone, PartialEq)]
pub struct Any {
    pub type_desc: Type,
    pub value: UnoValue,
}

/// A UNO exception. Only the base `com.sun.star.uno.Exception` members are
/// decoded; derived members are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct UnoException {
    pub type_name: String,
    pub message: String,
}

/// Build a `com.sun.star.beans.PropertyValue` (Name, Handle, Value, State).
pub fn property_value(name: &str, value: UnoValue, type_desc: Type) -> UnoValue {
    UnoValue::Struct(vec![
        UnoValue::String(name.to_owned()),
        UnoValue::Long(0),
        UnoValue::any(type_desc, value),
        UnoValue::Enum(0),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_idl_names() {
        assert_eq!(TypeClass::from_name("long"), TypeClass::Long);
        assert_eq!(TypeClass::from_name("[]string"), TypeClass::Sequence);
        assert_eq!(
            TypeClass::from_name("com.sun.star.text.XTextRange"),
            TypeClass::Interface
        );
        assert_eq!(
            TypeClass::from_name("com.sun.star.beans.PropertyValue"),
            TypeClass::Struct
        );
    }

    #[test]
    fn sequence_element_types() {
        let seq = Type::sequence_of("com.sun.star.beans.PropertyValue");
        let elem = seq.element().unwrap();
        assert_eq!(elem.class, TypeClass::Struct);
        assert_eq!(elem.name, "com.sun.star.beans.PropertyValue");

        let strings = Type::sequence_of("string").element().unwrap();
        assert_eq!(strings, Type::string());
        assert!(Type::long().element().is_none());
    }

    #[test]
    fn accessors_look_through_any() {
        let v = UnoValue::any(Type::interface("com.sun.star.text.XText"), UnoValue::Interface("oid-1".into()));
        assert_eq!(v.oid(), Some("oid-1"));
        assert_eq!(UnoValue::any(Type::long(), UnoValue::Long(7)).as_i64(), Some(7));
        assert_eq!(UnoValue::null().oid(), None);
        assert_eq!(UnoValue::Short(3).as_f64(), Some(3.0));
    }

    #[test]
    fn wire_classes_round_trip() {
        for class in ALL_CLASSES {
            assert_eq!(TypeClass::from_wire(class as u8), Some(class));
        }
        assert_eq!(TypeClass::from_wire(16), None);
        assert!(TypeClass::Any.is_simple());
        assert!(!TypeClass::Enum.is_simple());
    }
}
