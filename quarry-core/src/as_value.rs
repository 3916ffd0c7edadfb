use crate::{Error, Result, Value};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Conversion between Rust types and driver-level [`Value`]s.
///
/// `zero_value` is the value a NULL column materialises to when the engine
/// scans null-tolerantly; `is_zero` drives field-SQL contribution gating.
pub trait AsValue {
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
    fn zero_value() -> Self
    where
        Self: Sized;
    fn is_zero(&self) -> bool {
        false
    }
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

/// Scan a column value into a declared type, mapping NULL to the type's zero
/// value.
pub fn scan_value<T: AsValue>(value: Value) -> Result<T> {
    if value.is_null() {
        Ok(T::zero_value())
    } else {
        T::try_from_value(value)
    }
}

macro_rules! impl_as_value_int {
    ($source:ty, $variant:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $variant(None)
            }
            fn as_value(self) -> Value {
                $variant(Some(self))
            }
            fn zero_value() -> Self {
                0
            }
            fn is_zero(&self) -> bool {
                *self == 0
            }
            fn try_from_value(value: Value) -> Result<Self> {
                #[allow(unreachable_patterns)]
                let wide: i128 = match value {
                    $variant(Some(v)) => return Ok(v),
                    Value::Int8(Some(v)) => v as i128,
                    Value::Int16(Some(v)) => v as i128,
                    Value::Int32(Some(v)) => v as i128,
                    Value::Int64(Some(v)) => v as i128,
                    Value::UInt8(Some(v)) => v as i128,
                    Value::UInt16(Some(v)) => v as i128,
                    Value::UInt32(Some(v)) => v as i128,
                    Value::UInt64(Some(v)) => v as i128,
                    Value::Boolean(Some(v)) => v as i128,
                    Value::Float32(Some(v)) if v.fract() == 0.0 => v as i128,
                    Value::Float64(Some(v)) if v.fract() == 0.0 => v as i128,
                    Value::Varchar(Some(ref v)) => v
                        .trim()
                        .parse::<i128>()
                        .map_err(|_| Error::conversion(&value, stringify!($source)))?,
                    _ => return Err(Error::conversion(&value, stringify!($source))),
                };
                <$source>::try_from(wide).map_err(|_| Error::Conversion {
                    value: wide.to_string(),
                    target: stringify!($source),
                })
            }
        }
    };
}

impl_as_value_int!(i8, Value::Int8);
impl_as_value_int!(i16, Value::Int16);
impl_as_value_int!(i32, Value::Int32);
impl_as_value_int!(i64, Value::Int64);
impl_as_value_int!(u8, Value::UInt8);
impl_as_value_int!(u16, Value::UInt16);
impl_as_value_int!(u32, Value::UInt32);
impl_as_value_int!(u64, Value::UInt64);

macro_rules! impl_as_value_float {
    ($source:ty, $variant:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $variant(None)
            }
            fn as_value(self) -> Value {
                $variant(Some(self))
            }
            fn zero_value() -> Self {
                0.0
            }
            fn is_zero(&self) -> bool {
                *self == 0.0
            }
            fn try_from_value(value: Value) -> Result<Self> {
                #[allow(unreachable_patterns)]
                let result = match value {
                    $variant(Some(v)) => v,
                    Value::Float32(Some(v)) => v as $source,
                    Value::Float64(Some(v)) => v as $source,
                    Value::Int8(Some(v)) => v as $source,
                    Value::Int16(Some(v)) => v as $source,
                    Value::Int32(Some(v)) => v as $source,
                    Value::Int64(Some(v)) => v as $source,
                    Value::UInt8(Some(v)) => v as $source,
                    Value::UInt16(Some(v)) => v as $source,
                    Value::UInt32(Some(v)) => v as $source,
                    Value::UInt64(Some(v)) => v as $source,
                    Value::Varchar(Some(ref v)) => v
                        .trim()
                        .parse::<$source>()
                        .map_err(|_| Error::conversion(&value, stringify!($source)))?,
                    _ => return Err(Error::conversion(&value, stringify!($source))),
                };
                Ok(result)
            }
        }
    };
}

impl_as_value_float!(f32, Value::Float32);
impl_as_value_float!(f64, Value::Float64);

impl AsValue for bool {
    fn as_empty_value() -> Value {
        Value::Boolean(None)
    }
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
    fn zero_value() -> Self {
        false
    }
    fn is_zero(&self) -> bool {
        !*self
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(match value {
            Value::Boolean(Some(v)) => v,
            Value::Int8(Some(v)) => v != 0,
            Value::Int16(Some(v)) => v != 0,
            Value::Int32(Some(v)) => v != 0,
            Value::Int64(Some(v)) => v != 0,
            Value::UInt8(Some(v)) => v != 0,
            Value::UInt16(Some(v)) => v != 0,
            Value::UInt32(Some(v)) => v != 0,
            Value::UInt64(Some(v)) => v != 0,
            Value::Varchar(Some(ref v)) => match v.trim() {
                "1" => true,
                "0" => false,
                other => other
                    .parse::<bool>()
                    .map_err(|_| Error::conversion(&value, "bool"))?,
            },
            _ => return Err(Error::conversion(&value, "bool")),
        })
    }
}

impl AsValue for String {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
    fn zero_value() -> Self {
        String::new()
    }
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(match value {
            Value::Varchar(Some(v)) => v,
            Value::Boolean(Some(v)) => v.to_string(),
            Value::Int8(Some(v)) => v.to_string(),
            Value::Int16(Some(v)) => v.to_string(),
            Value::Int32(Some(v)) => v.to_string(),
            Value::Int64(Some(v)) => v.to_string(),
            Value::UInt8(Some(v)) => v.to_string(),
            Value::UInt16(Some(v)) => v.to_string(),
            Value::UInt32(Some(v)) => v.to_string(),
            Value::UInt64(Some(v)) => v.to_string(),
            Value::Float32(Some(v)) => v.to_string(),
            Value::Float64(Some(v)) => v.to_string(),
            Value::Uuid(Some(v)) => v.to_string(),
            _ => return Err(Error::conversion(&value, "String")),
        })
    }
}

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn zero_value() -> Self {
        Vec::new()
    }
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v.into_vec()),
            Value::Varchar(Some(v)) => Ok(v.into_bytes()),
            _ => Err(Error::conversion(&value, "Vec<u8>")),
        }
    }
}

macro_rules! impl_as_value_temporal {
    ($source:ty, $variant:path, $zero:expr) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $variant(None)
            }
            fn as_value(self) -> Value {
                $variant(Some(self))
            }
            fn zero_value() -> Self {
                $zero
            }
            fn is_zero(&self) -> bool {
                *self == $zero
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $variant(Some(v)) => Ok(v),
                    _ => Err(Error::conversion(&value, stringify!($source))),
                }
            }
        }
    };
}

impl_as_value_temporal!(Date, Value::Date, Date::MIN);
impl_as_value_temporal!(Time, Value::Time, Time::MIDNIGHT);
impl_as_value_temporal!(PrimitiveDateTime, Value::Timestamp, PrimitiveDateTime::MIN);
impl_as_value_temporal!(
    OffsetDateTime,
    Value::TimestampWithTimezone,
    OffsetDateTime::UNIX_EPOCH
);

impl AsValue for Uuid {
    fn as_empty_value() -> Value {
        Value::Uuid(None)
    }
    fn as_value(self) -> Value {
        Value::Uuid(Some(self))
    }
    fn zero_value() -> Self {
        Uuid::nil()
    }
    fn is_zero(&self) -> bool {
        self.is_nil()
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Uuid(Some(v)) => Ok(v),
            Value::Varchar(Some(ref v)) => {
                Uuid::parse_str(v).map_err(|_| Error::conversion(&value, "Uuid"))
            }
            _ => Err(Error::conversion(&value, "Uuid")),
        }
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn zero_value() -> Self {
        None
    }
    fn is_zero(&self) -> bool {
        self.is_none()
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::try_from_value(value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_round_trip() {
        let val: Value = 42i32.as_value();
        assert_eq!(val, Value::Int32(Some(42)));
        assert_eq!(i32::try_from_value(val).unwrap(), 42);
        assert_eq!(i64::try_from_value(7i32.as_value()).unwrap(), 7);
        assert_eq!(i8::try_from_value(99u8.as_value()).unwrap(), 99);
        assert!(i8::try_from_value(300i64.as_value()).is_err());
    }

    #[test]
    fn int_from_text() {
        assert_eq!(i64::try_from_value(Value::from("100")).unwrap(), 100);
        assert!(i64::try_from_value(Value::from("abc")).is_err());
    }

    #[test]
    fn bool_from_ints() {
        assert!(bool::try_from_value(8i16.as_value()).unwrap());
        assert!(!bool::try_from_value(0i64.as_value()).unwrap());
        assert!(bool::try_from_value(0.5f32.as_value()).is_err());
    }

    #[test]
    fn null_scans_to_zero() {
        assert_eq!(scan_value::<String>(Value::Null).unwrap(), "");
        assert_eq!(scan_value::<i64>(Value::Varchar(None)).unwrap(), 0);
        assert_eq!(scan_value::<bool>(Value::Null).unwrap(), false);
        assert_eq!(scan_value::<Option<i32>>(Value::Null).unwrap(), None);
        assert_eq!(scan_value::<Option<i32>>(5i32.as_value()).unwrap(), Some(5));
    }

    #[test]
    fn zero_detection() {
        assert!(0i64.is_zero());
        assert!(!3i64.is_zero());
        assert!(String::new().is_zero());
        assert!(None::<String>.is_zero());
        assert!(!Some("x".to_string()).is_zero());
    }
}
