//! Conversion of raw stored values into typed values.
//!
//! # Compatibility
//! ```text
//! declared String → String
//! declared Int    → i16 | i32 | i64
//! declared Double → f32 | f64 | Decimal
//! declared Bool   → bool
//! ```
//!
//! # Design Decisions
//! - One parser per declared type, looked up from a registry keyed by
//!   [`ConfigType`]; no coercion across families
//! - The caller names the wanted representation statically through the
//!   [`ConfigValue`] implementation of the requested type
//! - Converted values are stored as [`TypedValue`] so the reader can cache
//!   them independently of the requested Rust type

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::error::{ReaderError, ReaderResult};
use crate::model::ConfigType;

/// Concrete representation a caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    String,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    Bool,
}

impl Representation {
    /// Declared type family this representation belongs to.
    pub fn family(&self) -> ConfigType {
        match self {
            Representation::String => ConfigType::String,
            Representation::Int16 | Representation::Int32 | Representation::Int64 => ConfigType::Int,
            Representation::Float32 | Representation::Float64 | Representation::Decimal => {
                ConfigType::Double
            }
            Representation::Bool => ConfigType::Bool,
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Representation::String => "string",
            Representation::Int16 => "i16",
            Representation::Int32 => "i32",
            Representation::Int64 => "i64",
            Representation::Float32 => "f32",
            Representation::Float64 => "f64",
            Representation::Decimal => "decimal",
            Representation::Bool => "bool",
        };
        f.write_str(name)
    }
}

impl FromStr for Representation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(Representation::String),
            "i16" => Ok(Representation::Int16),
            "i32" | "int" => Ok(Representation::Int32),
            "i64" | "long" => Ok(Representation::Int64),
            "f32" | "float" => Ok(Representation::Float32),
            "f64" | "double" => Ok(Representation::Float64),
            "decimal" => Ok(Representation::Decimal),
            "bool" | "boolean" => Ok(Representation::Bool),
            other => Err(format!("unknown representation '{}'", other)),
        }
    }
}

/// A converted value, tagged with its representation.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    Bool(bool),
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::String(v) => write!(f, "{}", v),
            TypedValue::Int16(v) => write!(f, "{}", v),
            TypedValue::Int32(v) => write!(f, "{}", v),
            TypedValue::Int64(v) => write!(f, "{}", v),
            TypedValue::Float32(v) => write!(f, "{}", v),
            TypedValue::Float64(v) => write!(f, "{}", v),
            TypedValue::Decimal(v) => write!(f, "{}", v),
            TypedValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Rust types that can be read out of the configuration cache.
pub trait ConfigValue: Sized + Clone + Send + Sync + 'static {
    /// Representation requested when reading this type.
    const REPRESENTATION: Representation;

    /// Extract `Self` from a typed value of the same representation.
    fn from_typed(value: &TypedValue) -> Option<Self>;
}

macro_rules! impl_config_value {
    ($ty:ty, $variant:ident) => {
        impl ConfigValue for $ty {
            const REPRESENTATION: Representation = Representation::$variant;

            fn from_typed(value: &TypedValue) -> Option<Self> {
                match value {
                    TypedValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

impl_config_value!(String, String);
impl_config_value!(i16, Int16);
impl_config_value!(i32, Int32);
impl_config_value!(i64, Int64);
impl_config_value!(f32, Float32);
impl_config_value!(f64, Float64);
impl_config_value!(Decimal, Decimal);
impl_config_value!(bool, Bool);

type Parser = fn(&str, Representation) -> Option<TypedValue>;

/// Parser registered for a declared type.
fn parser_for(declared: ConfigType) -> Parser {
    match declared {
        ConfigType::String => parse_string,
        ConfigType::Int => parse_int,
        ConfigType::Double => parse_double,
        ConfigType::Bool => parse_bool,
    }
}

fn parse_string(raw: &str, requested: Representation) -> Option<TypedValue> {
    match requested {
        Representation::String => Some(TypedValue::String(raw.to_string())),
        _ => None,
    }
}

fn parse_int(raw: &str, requested: Representation) -> Option<TypedValue> {
    let raw = raw.trim();
    match requested {
        Representation::Int16 => raw.parse().ok().map(TypedValue::Int16),
        Representation::Int32 => raw.parse().ok().map(TypedValue::Int32),
        Representation::Int64 => raw.parse().ok().map(TypedValue::Int64),
        _ => None,
    }
}

fn parse_double(raw: &str, requested: Representation) -> Option<TypedValue> {
    let raw = raw.trim();
    match requested {
        Representation::Float32 => raw.parse().ok().map(TypedValue::Float32),
        Representation::Float64 => raw.parse().ok().map(TypedValue::Float64),
        Representation::Decimal => Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .ok()
            .map(TypedValue::Decimal),
        _ => None,
    }
}

fn parse_bool(raw: &str, requested: Representation) -> Option<TypedValue> {
    if requested != Representation::Bool {
        return None;
    }
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(TypedValue::Bool(true))
    } else if raw.eq_ignore_ascii_case("false") {
        Some(TypedValue::Bool(false))
    } else {
        None
    }
}

/// Convert a raw value declared as `declared` into the `requested` representation.
pub fn convert_raw(
    raw_value: &str,
    declared: ConfigType,
    requested: Representation,
) -> ReaderResult<TypedValue> {
    parser_for(declared)(raw_value, requested).ok_or_else(|| ReaderError::TypeMismatch {
        raw_value: raw_value.to_string(),
        declared,
        requested,
    })
}

/// Convert a raw value straight into the Rust type `T`.
pub fn convert<T: ConfigValue>(raw_value: &str, declared: ConfigType) -> ReaderResult<T> {
    let typed = convert_raw(raw_value, declared, T::REPRESENTATION)?;
    T::from_typed(&typed).ok_or_else(|| ReaderError::TypeMismatch {
        raw_value: raw_value.to_string(),
        declared,
        requested: T::REPRESENTATION,
    })
}
