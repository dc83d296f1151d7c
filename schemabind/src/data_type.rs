// Copyright 2025 Oxide Computer Company

//! Classification of described types into OpenAPI data types.

use crate::describe::Kind;
use crate::describe::TypeDescriptor;
use std::fmt;

/// Semantic data type of a described type, as documented in the OpenAPI
/// "Data Types" table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Long,
    Float,
    Double,
    String,
    Byte,
    Binary,
    Boolean,
    Date,
    DateTime,
    Duration,
    Password,
    /// Object, array or map; the schema builder handles these structurally.
    Complex,
    /// No wire representation.
    Unsupported,
    /// Type and format strings supplied by a self-describing type.
    Custom { kind: String, format: String },
}

impl DataType {
    /// Convenience constructor for self-describing types.
    pub fn custom<K: Into<String>, F: Into<String>>(kind: K, format: F) -> Self {
        DataType::Custom { kind: kind.into(), format: format.into() }
    }

    /// Classifies `ty`, dereferencing one level of nullability first.
    /// Whether the type was nullable is left for the caller to record.
    pub fn classify(ty: &TypeDescriptor) -> DataType {
        if let Some(dt) = ty.data_type() {
            return dt.clone();
        }
        match ty.kind() {
            Kind::Nullable(inner) => Self::classify_direct(&inner()),
            _ => Self::classify_direct(ty),
        }
    }

    fn classify_direct(ty: &TypeDescriptor) -> DataType {
        if let Some(dt) = ty.data_type() {
            return dt.clone();
        }
        match ty.kind() {
            Kind::Bool => DataType::Boolean,
            Kind::Int { bits } | Kind::Uint { bits } if *bits < 64 => {
                DataType::Integer
            }
            Kind::Int { .. } | Kind::Uint { .. } => DataType::Long,
            Kind::Float { bits } if *bits < 64 => DataType::Float,
            Kind::Float { .. } => DataType::Double,
            Kind::Char | Kind::String => DataType::String,
            Kind::Bytes => DataType::Byte,
            Kind::DateTime => DataType::DateTime,
            Kind::Date => DataType::Date,
            Kind::Duration => DataType::Duration,
            Kind::Nullable(_)
            | Kind::Seq(_)
            | Kind::Array(..)
            | Kind::Map(..)
            | Kind::Struct(_) => DataType::Complex,
            Kind::Function
            | Kind::Channel
            | Kind::RawPointer
            | Kind::Dynamic
            | Kind::Complex => DataType::Unsupported,
        }
    }

    /// The OpenAPI `type` string.
    pub fn type_str(&self) -> &str {
        match self {
            DataType::Integer | DataType::Long => "integer",
            DataType::Float | DataType::Double => "number",
            DataType::Boolean => "boolean",
            DataType::String
            | DataType::Byte
            | DataType::Binary
            | DataType::Date
            | DataType::DateTime
            | DataType::Duration
            | DataType::Password
            | DataType::Complex => "string",
            DataType::Unsupported => "",
            DataType::Custom { kind, .. } => kind,
        }
    }

    /// The OpenAPI `format` string, empty when there is none.
    pub fn format(&self) -> &str {
        match self {
            DataType::Integer => "int32",
            DataType::Long => "int64",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Byte => "byte",
            DataType::Binary => "binary",
            DataType::Date => "date",
            DataType::DateTime => "date-time",
            DataType::Duration => "duration",
            DataType::Password => "password",
            DataType::String
            | DataType::Boolean
            | DataType::Complex
            | DataType::Unsupported => "",
            DataType::Custom { format, .. } => format,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format() {
            "" => write!(f, "{}", self.type_str()),
            format => write!(f, "{} ({})", self.type_str(), format),
        }
    }
}

#[cfg(test)]
mod test {
    use super::DataType;
    use crate::describe::Describe;
    use crate::describe::Kind;
    use crate::describe::TypeDescriptor;
    use std::collections::BTreeMap;

    struct Uuid;

    impl Describe for Uuid {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::new::<Uuid>(Kind::String)
                .with_data_type(DataType::custom("string", "uuid"))
        }
    }

    #[test]
    fn test_classify_primitives() {
        let cases = vec![
            (bool::describe(), DataType::Boolean),
            (i8::describe(), DataType::Integer),
            (u32::describe(), DataType::Integer),
            (i64::describe(), DataType::Long),
            (usize::describe(), DataType::Long),
            (f32::describe(), DataType::Float),
            (f64::describe(), DataType::Double),
            (String::describe(), DataType::String),
            (char::describe(), DataType::String),
            (bytes::Bytes::describe(), DataType::Byte),
            (chrono::NaiveDate::describe(), DataType::Date),
            (
                <chrono::DateTime<chrono::Utc>>::describe(),
                DataType::DateTime,
            ),
            (std::time::Duration::describe(), DataType::Duration),
        ];
        for (ty, expected) in cases {
            assert_eq!(DataType::classify(&ty), expected, "{}", ty);
        }
    }

    #[test]
    fn test_classify_dereferences_once() {
        assert_eq!(
            DataType::classify(&<Option<u16>>::describe()),
            DataType::Integer
        );
        assert_eq!(
            DataType::classify(&<Option<Vec<u16>>>::describe()),
            DataType::Complex
        );
    }

    #[test]
    fn test_classify_complex_and_unsupported() {
        assert_eq!(
            DataType::classify(&<BTreeMap<String, u8>>::describe()),
            DataType::Complex
        );
        assert_eq!(
            DataType::classify(&<[i32; 3]>::describe()),
            DataType::Complex
        );
        assert_eq!(
            DataType::classify(&<fn() -> u8>::describe()),
            DataType::Unsupported
        );
        assert_eq!(
            DataType::classify(&<*mut u8>::describe()),
            DataType::Unsupported
        );
        assert_eq!(
            DataType::classify(&<std::sync::mpsc::Receiver<u8>>::describe()),
            DataType::Unsupported
        );
        assert_eq!(
            DataType::classify(&<Box<dyn std::any::Any>>::describe()),
            DataType::Unsupported
        );
    }

    #[test]
    fn test_self_describing_wins() {
        let dt = DataType::classify(&Uuid::describe());
        assert_eq!(dt.type_str(), "string");
        assert_eq!(dt.format(), "uuid");
        assert_eq!(dt.to_string(), "string (uuid)");
        assert_eq!(
            DataType::classify(&<Option<Uuid>>::describe()),
            DataType::custom("string", "uuid")
        );
    }

    #[test]
    fn test_type_and_format_strings() {
        assert_eq!(DataType::Long.type_str(), "integer");
        assert_eq!(DataType::Long.format(), "int64");
        assert_eq!(DataType::Duration.type_str(), "string");
        assert_eq!(DataType::Duration.format(), "duration");
        assert_eq!(DataType::Boolean.format(), "");
        assert_eq!(DataType::Password.format(), "password");
    }
}
