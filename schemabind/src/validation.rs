// Copyright 2025 Oxide Computer Company

//! Translation of `validate` tags into schema bounds.
//!
//! Only the options with a schema equivalent are considered: `len`, `min`,
//! `max`, `gt`, `gte`, `lt`, `lte` and `eq` with an integer argument, plus a
//! handful of string formats.  Everything else (custom validators, options
//! following `dive` or `keys`, which apply to elements) is ignored.

use crate::describe::Kind;
use openapiv3::SchemaKind;
use openapiv3::Type;

/// What a bound applies to, decided by the field's Rust type rather than by
/// the generated schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Countable {
    /// Numeric value.
    Number,
    /// String length.
    Length,
    /// Sequence item count.
    Items,
    /// Map entry count.
    Properties,
    Other,
}

impl Countable {
    fn of(kind: &Kind) -> Countable {
        match kind {
            Kind::Int { .. } | Kind::Uint { .. } | Kind::Float { .. } => {
                Countable::Number
            }
            Kind::String => Countable::Length,
            Kind::Seq(_) | Kind::Array(..) => Countable::Items,
            Kind::Map(..) => Countable::Properties,
            _ => Countable::Other,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Bound {
    Min,
    Max,
}

/// Applies the bounds of a `validate` tag to `schema`, whose field is of
/// kind `kind` (with nullability already stripped).  Returns the string
/// format named by the tag, if any.
pub(crate) fn apply_validation(
    schema: &mut SchemaKind,
    kind: &Kind,
    validate: &str,
) -> Option<&'static str> {
    let countable = Countable::of(kind);
    let mut format = None;

    for option in validate.split(',').map(str::trim) {
        if option == "dive" || option == "keys" {
            break;
        }
        // Alternatives are joined with `|`; each is applied.
        for part in option.split('|') {
            let (key, value) = match part.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (part, None),
            };
            let Some(value) = value else {
                if let Some(f) = string_format(key) {
                    format = Some(f);
                }
                continue;
            };
            let Ok(n) = value.parse::<i64>() else {
                continue;
            };
            match key {
                "len" => {
                    set_bound(schema, countable, Bound::Min, n);
                    set_bound(schema, countable, Bound::Max, n);
                }
                "max" | "lte" => set_bound(schema, countable, Bound::Max, n),
                "min" | "gte" => set_bound(schema, countable, Bound::Min, n),
                "lt" => {
                    set_bound(schema, countable, Bound::Max, n.saturating_sub(1))
                }
                "gt" => {
                    set_bound(schema, countable, Bound::Min, n.saturating_add(1))
                }
                // Equality of plain values has no OpenAPI 3.0 equivalent.
                "eq" if matches!(
                    countable,
                    Countable::Items | Countable::Properties
                ) =>
                {
                    set_bound(schema, countable, Bound::Min, n);
                    set_bound(schema, countable, Bound::Max, n);
                }
                _ => (),
            }
        }
    }

    format
}

fn string_format(option: &str) -> Option<&'static str> {
    match option {
        "email" => Some("email"),
        "uuid" => Some("uuid"),
        "url" | "uri" => Some("uri"),
        "hostname" => Some("hostname"),
        "ipv4" => Some("ipv4"),
        "ipv6" => Some("ipv6"),
        "datetime" => Some("date-time"),
        _ => None,
    }
}

fn set_bound(schema: &mut SchemaKind, countable: Countable, bound: Bound, n: i64) {
    let SchemaKind::Type(ty) = schema else {
        return;
    };
    // Sizes cannot be negative.
    let size = usize::try_from(n).ok();
    match (countable, ty, bound) {
        (Countable::Number, Type::Integer(int), Bound::Min) => {
            int.minimum = Some(n)
        }
        (Countable::Number, Type::Integer(int), Bound::Max) => {
            int.maximum = Some(n)
        }
        // Bounds are small integers; the conversion is exact for them.
        (Countable::Number, Type::Number(num), Bound::Min) => {
            num.minimum = Some(n as f64)
        }
        (Countable::Number, Type::Number(num), Bound::Max) => {
            num.maximum = Some(n as f64)
        }
        (Countable::Length, Type::String(s), Bound::Min) if size.is_some() => {
            s.min_length = size
        }
        (Countable::Length, Type::String(s), Bound::Max) if size.is_some() => {
            s.max_length = size
        }
        (Countable::Items, Type::Array(a), Bound::Min) if size.is_some() => {
            a.min_items = size
        }
        (Countable::Items, Type::Array(a), Bound::Max) if size.is_some() => {
            a.max_items = size
        }
        (Countable::Properties, Type::Object(o), Bound::Min)
            if size.is_some() =>
        {
            o.min_properties = size
        }
        (Countable::Properties, Type::Object(o), Bound::Max)
            if size.is_some() =>
        {
            o.max_properties = size
        }
        _ => (),
    }
}

#[cfg(test)]
mod test {
    use super::apply_validation;
    use crate::describe::Describe;
    use openapiv3::SchemaKind;
    use openapiv3::Type;
    use std::collections::HashMap;

    fn integer() -> SchemaKind {
        SchemaKind::Type(Type::Integer(Default::default()))
    }

    fn string() -> SchemaKind {
        SchemaKind::Type(Type::String(Default::default()))
    }

    fn array() -> SchemaKind {
        SchemaKind::Type(Type::Array(openapiv3::ArrayType {
            items: None,
            min_items: None,
            max_items: None,
            unique_items: false,
        }))
    }

    fn object() -> SchemaKind {
        SchemaKind::Type(Type::Object(Default::default()))
    }

    #[test]
    fn test_numeric_bounds() {
        let mut schema = integer();
        apply_validation(&mut schema, i32::describe().kind(), "gt=0,lt=100");
        let SchemaKind::Type(Type::Integer(int)) = &schema else {
            panic!("unexpected schema {:?}", schema);
        };
        assert_eq!(int.minimum, Some(1));
        assert_eq!(int.maximum, Some(99));
        assert!(!int.exclusive_minimum);

        let mut schema = integer();
        apply_validation(&mut schema, u8::describe().kind(), "len=4,eq=7");
        let SchemaKind::Type(Type::Integer(int)) = &schema else {
            panic!("unexpected schema {:?}", schema);
        };
        assert_eq!((int.minimum, int.maximum), (Some(4), Some(4)));

        let mut schema = SchemaKind::Type(Type::Number(Default::default()));
        apply_validation(&mut schema, f64::describe().kind(), "gte=-1,lte=1");
        let SchemaKind::Type(Type::Number(num)) = &schema else {
            panic!("unexpected schema {:?}", schema);
        };
        assert_eq!((num.minimum, num.maximum), (Some(-1.0), Some(1.0)));

        let mut schema = integer();
        apply_validation(
            &mut schema,
            i64::describe().kind(),
            "gt=9223372036854775807,lt=-9223372036854775808",
        );
        let SchemaKind::Type(Type::Integer(int)) = &schema else {
            panic!("unexpected schema {:?}", schema);
        };
        assert_eq!((int.minimum, int.maximum), (Some(i64::MAX), Some(i64::MIN)));
    }

    #[test]
    fn test_string_bounds_and_format() {
        let mut schema = string();
        let format = apply_validation(
            &mut schema,
            String::describe().kind(),
            "required,email,min=3,max=64,eq=5,min=-1",
        );
        assert_eq!(format, Some("email"));
        let SchemaKind::Type(Type::String(s)) = &schema else {
            panic!("unexpected schema {:?}", schema);
        };
        assert_eq!((s.min_length, s.max_length), (Some(3), Some(64)));
    }

    #[test]
    fn test_container_bounds() {
        let mut schema = array();
        apply_validation(
            &mut schema,
            <Vec<String>>::describe().kind(),
            "eq=3,dive,len=10",
        );
        let SchemaKind::Type(Type::Array(a)) = &schema else {
            panic!("unexpected schema {:?}", schema);
        };
        assert_eq!((a.min_items, a.max_items), (Some(3), Some(3)));

        let mut schema = object();
        apply_validation(
            &mut schema,
            <HashMap<String, u8>>::describe().kind(),
            "min=1|max=5,keys,min=2",
        );
        let SchemaKind::Type(Type::Object(o)) = &schema else {
            panic!("unexpected schema {:?}", schema);
        };
        assert_eq!((o.min_properties, o.max_properties), (Some(1), Some(5)));
    }

    #[test]
    fn test_ignored_options() {
        let mut schema = string();
        let format = apply_validation(
            &mut schema,
            String::describe().kind(),
            "omitempty,max=abc,oneof=a b",
        );
        assert_eq!(format, None);
        assert_eq!(schema, string());
    }
}
