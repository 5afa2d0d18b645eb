//! Declared types of parameters, return values and fields

use std::fmt;

use serde::Serialize;

use crate::vm::failure::Failure;
use crate::vm::value::Value;

/// Value-like primitive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// Boolean
    Bool,
    /// 32-bit integer
    I32,
    /// 64-bit integer
    I64,
    /// 64-bit float
    F64,
    /// Character
    Char,
}

impl PrimitiveKind {
    /// Keyword used in rendered descriptors
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::I32 => "i32",
            PrimitiveKind::I64 => "i64",
            PrimitiveKind::F64 => "f64",
            PrimitiveKind::Char => "char",
        }
    }
}

/// Name of the root class; every value, boxed if value-like, conforms to it
pub const ROOT_CLASS: &str = "lang.Object";

/// A declared type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum TypeRef {
    /// No value
    Void,
    /// Value-like primitive
    Primitive(PrimitiveKind),
    /// String reference
    Str,
    /// List reference
    List,
    /// Interception handler reference
    Handler,
    /// Class reference by full name
    Class(String),
}

impl TypeRef {
    /// `bool`
    pub const BOOL: TypeRef = TypeRef::Primitive(PrimitiveKind::Bool);
    /// `i32`
    pub const I32: TypeRef = TypeRef::Primitive(PrimitiveKind::I32);
    /// `i64`
    pub const I64: TypeRef = TypeRef::Primitive(PrimitiveKind::I64);
    /// `f64`
    pub const F64: TypeRef = TypeRef::Primitive(PrimitiveKind::F64);
    /// `char`
    pub const CHAR: TypeRef = TypeRef::Primitive(PrimitiveKind::Char);

    /// Class type by full name
    pub fn class(name: impl Into<String>) -> Self {
        TypeRef::Class(name.into())
    }

    /// Parse a type keyword or class path
    pub fn parse(text: &str) -> Self {
        match text {
            "void" => TypeRef::Void,
            "bool" => TypeRef::BOOL,
            "i32" => TypeRef::I32,
            "i64" => TypeRef::I64,
            "f64" => TypeRef::F64,
            "char" => TypeRef::CHAR,
            "str" => TypeRef::Str,
            "list" => TypeRef::List,
            "handler" => TypeRef::Handler,
            other => TypeRef::Class(other.to_string()),
        }
    }

    /// Whether values of this type are stored inline (never null)
    pub fn is_value_like(&self) -> bool {
        matches!(self, TypeRef::Primitive(_))
    }

    /// The referenced class name, if this is a class type
    pub fn class_name(&self) -> Option<&str> {
        match self {
            TypeRef::Class(name) => Some(name),
            _ => None,
        }
    }

    /// Zero-equivalent for value-like types, null for reference-like types
    pub fn default_value(&self) -> Value {
        match self {
            TypeRef::Primitive(PrimitiveKind::Bool) => Value::Bool(false),
            TypeRef::Primitive(PrimitiveKind::I32) => Value::I32(0),
            TypeRef::Primitive(PrimitiveKind::I64) => Value::I64(0),
            TypeRef::Primitive(PrimitiveKind::F64) => Value::F64(0.0),
            TypeRef::Primitive(PrimitiveKind::Char) => Value::Char('\0'),
            _ => Value::Null,
        }
    }

    /// Whether `value` may be passed where this type is declared, without conversion
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeRef::Void, _) => false,
            (TypeRef::Primitive(kind), v) => match kind {
                PrimitiveKind::Bool => matches!(v, Value::Bool(_)),
                PrimitiveKind::I32 => matches!(v, Value::I32(_)),
                PrimitiveKind::I64 => matches!(v, Value::I32(_) | Value::I64(_)),
                PrimitiveKind::F64 => matches!(v, Value::I32(_) | Value::I64(_) | Value::F64(_)),
                PrimitiveKind::Char => matches!(v, Value::Char(_)),
            },
            (_, Value::Null) => true,
            (TypeRef::Class(name), _) if name == ROOT_CLASS => true,
            (TypeRef::Str, Value::Str(_)) => true,
            (TypeRef::List, Value::List(_)) => true,
            (TypeRef::Handler, Value::Handler(_)) => true,
            (TypeRef::Class(name), Value::Object(o)) => o.class().is_subclass_of(name),
            _ => false,
        }
    }

    /// Convert a value produced by a handler back to this declared type
    ///
    /// Numerics widen; `null` cannot become a value-like type.
    pub fn coerce(&self, value: Value) -> Result<Value, Failure> {
        match self {
            TypeRef::Void => Ok(Value::Null),
            TypeRef::Primitive(kind) => {
                let converted = match (kind, &value) {
                    (_, Value::Null) => {
                        return Err(Failure::null_pointer(format!(
                            "cannot convert null to {}",
                            kind.keyword()
                        )))
                    }
                    (PrimitiveKind::Bool, Value::Bool(_)) => Some(value.clone()),
                    (PrimitiveKind::Char, Value::Char(_)) => Some(value.clone()),
                    (PrimitiveKind::I32, Value::I32(_)) => Some(value.clone()),
                    (PrimitiveKind::I64, v) => v.as_i64().map(Value::I64),
                    (PrimitiveKind::F64, v) => v.as_f64().map(Value::F64),
                    _ => None,
                };
                converted.ok_or_else(|| {
                    Failure::class_cast(format!(
                        "cannot convert {} to {}",
                        value.type_name(),
                        kind.keyword()
                    ))
                })
            }
            _ if self.accepts(&value) => Ok(value),
            _ => Err(Failure::class_cast(format!(
                "cannot convert {} to {}",
                value.type_name(),
                self
            ))),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::Primitive(kind) => f.write_str(kind.keyword()),
            TypeRef::Str => f.write_str("str"),
            TypeRef::List => f.write_str("list"),
            TypeRef::Handler => f.write_str("handler"),
            TypeRef::Class(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_keywords() {
        for text in ["void", "bool", "i32", "i64", "f64", "char", "str", "list", "handler"] {
            assert_eq!(TypeRef::parse(text).to_string(), text);
        }
        assert_eq!(TypeRef::parse("lang.Object"), TypeRef::class("lang.Object"));
    }

    #[test]
    fn test_default_values() {
        assert_eq!(TypeRef::I32.default_value(), Value::I32(0));
        assert_eq!(TypeRef::BOOL.default_value(), Value::Bool(false));
        assert_eq!(TypeRef::Str.default_value(), Value::Null);
        assert_eq!(TypeRef::class("lang.Object").default_value(), Value::Null);
    }

    #[test]
    fn test_coerce_widens_and_rejects_null() {
        assert_eq!(TypeRef::I64.coerce(Value::I32(3)).unwrap(), Value::I64(3));
        assert_eq!(TypeRef::F64.coerce(Value::I32(2)).unwrap(), Value::F64(2.0));
        assert_eq!(TypeRef::Void.coerce(Value::I32(2)).unwrap(), Value::Null);

        let err = TypeRef::I32.coerce(Value::Null).unwrap_err();
        assert_eq!(err.kind().name(), "NullPointer");

        let err = TypeRef::I32.coerce(Value::str("x")).unwrap_err();
        assert_eq!(err.kind().name(), "ClassCast");
    }

    #[test]
    fn test_reference_types_accept_null() {
        assert_eq!(TypeRef::Str.coerce(Value::Null).unwrap(), Value::Null);
        assert!(TypeRef::List.accepts(&Value::Null));
        assert!(!TypeRef::I32.accepts(&Value::Null));
    }

    #[test]
    fn test_root_class_boxes_everything() {
        let root = TypeRef::class(ROOT_CLASS);
        assert!(root.accepts(&Value::I32(1)));
        assert!(root.accepts(&Value::str("s")));
        assert_eq!(root.coerce(Value::Bool(true)).unwrap(), Value::Bool(true));
    }
}
