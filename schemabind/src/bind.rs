// Copyright 2025 Oxide Computer Company

//! Binding request parameters into described input structs.
//!
//! The binder reads the same field tags the generator documents: a field
//! tagged `query = "limit"` is documented as the `limit` query parameter and
//! filled from it at request time, using the same text grammar.  Body fields
//! are left alone; decoding the body is up to the caller.

use crate::config::BinderConfig;
use crate::convert::Converter;
use crate::convert::Value;
use crate::describe::Describe;
use crate::describe::FieldAccess;
use crate::describe::FieldDescriptor;
use crate::describe::Kind;
use crate::describe::TypeDescriptor;
use crate::error::BindError;
use crate::error::BindErrorKind;
use crate::error::GenerationError;
use crate::fields::extract_fields;
use crate::fields::ExtractMode;
use crate::fields::ExtractedField;
use crate::fields::Location;
use crate::fields::Placement;
use crate::fields::TAG_DEFAULT;
use crate::fields::TAG_ENUM;
use crate::logging::discard_logger;
use slog::Logger;
use std::any::Any;
use std::collections::BTreeMap;
use std::time::Duration;

/// Conversion from a bound [`Value`] into a field type.
///
/// Implemented for the types the converter produces values for.  Derived
/// setters call it for every parameter field, so the type of such a field
/// must implement it.
pub trait FromParam: Sized {
    fn from_param(value: Value) -> Result<Self, String>;
}

macro_rules! from_param_int {
    ($($t:ty),+) => {
        $(
            impl FromParam for $t {
                fn from_param(value: Value) -> Result<Self, String> {
                    match value {
                        Value::Int(i) => <$t>::try_from(i)
                            .map_err(|e| e.to_string()),
                        Value::Uint(u) => <$t>::try_from(u)
                            .map_err(|e| e.to_string()),
                        other => Err(other.unexpected("integer")),
                    }
                }
            }
        )+
    };
}

from_param_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromParam for f64 {
    fn from_param(value: Value) -> Result<Self, String> {
        match value {
            Value::Float(f) => Ok(f),
            other => Err(other.unexpected("number")),
        }
    }
}

impl FromParam for f32 {
    fn from_param(value: Value) -> Result<Self, String> {
        // The converter checked the range for 32-bit targets.
        f64::from_param(value).map(|f| f as f32)
    }
}

macro_rules! from_param_variant {
    ($t:ty, $variant:ident, $expected:literal) => {
        impl FromParam for $t {
            fn from_param(value: Value) -> Result<Self, String> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(other.unexpected($expected)),
                }
            }
        }
    };
}

from_param_variant!(bool, Bool, "boolean");
from_param_variant!(char, Char, "character");
from_param_variant!(String, String, "string");
from_param_variant!(bytes::Bytes, Bytes, "bytes");
from_param_variant!(chrono::NaiveDate, Date, "date");
from_param_variant!(Duration, Duration, "duration");
from_param_variant!(chrono::DateTime<chrono::FixedOffset>, DateTime, "date-time");

impl FromParam for chrono::DateTime<chrono::Utc> {
    fn from_param(value: Value) -> Result<Self, String> {
        chrono::DateTime::<chrono::FixedOffset>::from_param(value)
            .map(|dt| dt.with_timezone(&chrono::Utc))
    }
}

impl FromParam for chrono::DateTime<chrono::Local> {
    fn from_param(value: Value) -> Result<Self, String> {
        chrono::DateTime::<chrono::FixedOffset>::from_param(value)
            .map(|dt| dt.with_timezone(&chrono::Local))
    }
}

impl<T: FromParam> FromParam for Option<T> {
    fn from_param(value: Value) -> Result<Self, String> {
        T::from_param(value).map(Some)
    }
}

impl<T: FromParam> FromParam for Box<T> {
    fn from_param(value: Value) -> Result<Self, String> {
        T::from_param(value).map(Box::new)
    }
}

impl<T: FromParam> FromParam for Vec<T> {
    fn from_param(value: Value) -> Result<Self, String> {
        match value {
            Value::List(values) => {
                values.into_iter().map(T::from_param).collect()
            }
            other => Err(other.unexpected("list")),
        }
    }
}

impl<T: FromParam, const N: usize> FromParam for [T; N] {
    fn from_param(value: Value) -> Result<Self, String> {
        Vec::<T>::from_param(value)?.try_into().map_err(|values: Vec<T>| {
            format!("expected {} values, found {}", N, values.len())
        })
    }
}

/// Raw parameter values of one request.
pub trait ParamSource {
    fn path(&self, name: &str) -> Option<&str>;
    /// Every value of a query parameter, in request order.
    fn query(&self, name: &str) -> Vec<&str>;
    /// Every value of a header, in request order.  Names are matched
    /// case-insensitively.
    fn header(&self, name: &str) -> Vec<&str>;
}

/// A [`ParamSource`] over the parts of an `http` request and the path
/// parameters matched by the router.
#[derive(Clone, Debug, Default)]
pub struct RequestParams {
    path: BTreeMap<String, String>,
    query: Vec<(String, String)>,
    headers: http::HeaderMap,
}

impl RequestParams {
    pub fn new(
        uri: &http::Uri,
        headers: &http::HeaderMap,
        path: BTreeMap<String, String>,
    ) -> Self {
        let query = uri
            .query()
            .map(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();
        RequestParams { path, query, headers: headers.clone() }
    }

    pub fn from_parts(
        parts: &http::request::Parts,
        path: BTreeMap<String, String>,
    ) -> Self {
        Self::new(&parts.uri, &parts.headers, path)
    }
}

impl ParamSource for RequestParams {
    fn path(&self, name: &str) -> Option<&str> {
        self.path.get(name).map(String::as_str)
    }

    fn query(&self, name: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    fn header(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }
}

/// Turns binding failures into responses.
pub trait ErrorHook: Send + Sync {
    fn render(&self, error: &BindError) -> (http::StatusCode, serde_json::Value);
}

/// Renders `{ "message", "field", "type" }` with the error's status code.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultErrorHook;

impl ErrorHook for DefaultErrorHook {
    fn render(&self, error: &BindError) -> (http::StatusCode, serde_json::Value) {
        (
            error.status_code(),
            serde_json::json!({
                "message": error.to_string(),
                "field": error.field,
                "type": error.type_name,
            }),
        )
    }
}

/// Fills the parameter fields of input structs from requests.
///
/// A binder holds no per-request state and can be shared between any
/// number of concurrent requests.
pub struct Binder {
    config: BinderConfig,
    log: Logger,
    converter: Converter,
    error_hook: Box<dyn ErrorHook>,
}

impl Default for Binder {
    fn default() -> Self {
        Binder::new(BinderConfig::default(), discard_logger())
    }
}

impl Binder {
    pub fn new(config: BinderConfig, log: Logger) -> Self {
        let converter = if config.lenient_booleans {
            Converter::lenient()
        } else {
            Converter::strict()
        };
        Binder {
            config,
            log,
            converter,
            error_hook: Box::new(DefaultErrorHook),
        }
    }

    pub fn with_error_hook<H: ErrorHook + 'static>(mut self, hook: H) -> Self {
        self.error_hook = Box::new(hook);
        self
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// Renders `error` with the configured [`ErrorHook`].
    pub fn render_error(
        &self,
        error: &BindError,
    ) -> (http::StatusCode, serde_json::Value) {
        self.error_hook.render(error)
    }

    /**
     * Fills the parameter fields of `target` from `source`, in declaration
     * order.  Stops at the first field that cannot be bound; fields bound
     * before it keep their new values.
     */
    pub fn bind<T: Describe>(
        &self,
        target: &mut T,
        source: &dyn ParamSource,
    ) -> Result<(), BindError> {
        self.bind_described(&T::describe(), target, source)
    }

    /// Like [`Binder::bind()`], for a target only known by its descriptor.
    pub fn bind_described(
        &self,
        ty: &TypeDescriptor,
        target: &mut dyn Any,
        source: &dyn ParamSource,
    ) -> Result<(), BindError> {
        let extraction = extract_fields(ty, ExtractMode::Input, "json")
            .map_err(|error| match error {
                GenerationError::ConflictingLocation { field, type_name } => {
                    BindError {
                        field,
                        type_name,
                        kind: BindErrorKind::Unassignable(
                            "conflicting parameter locations".to_string(),
                        ),
                    }
                }
                other => BindError {
                    field: String::new(),
                    type_name: ty.rust_name().to_string(),
                    kind: BindErrorKind::Unassignable(other.to_string()),
                },
            })?;

        for field in &extraction.fields {
            let Placement::Parameter { location, name } = &field.placement
            else {
                continue;
            };
            if let Err(kind) = self.bind_field(field, *location, name, target, source)
            {
                let error = BindError {
                    field: field.field.name().to_string(),
                    type_name: field.owner.to_string(),
                    kind,
                };
                slog::debug!(self.log, "failed to bind parameter";
                    "field" => &error.field,
                    "type" => &error.type_name,
                    "error" => %error.kind,
                );
                return Err(error);
            }
        }
        Ok(())
    }

    fn bind_field(
        &self,
        field: &ExtractedField,
        location: Location,
        name: &str,
        target: &mut dyn Any,
        source: &dyn ParamSource,
    ) -> Result<(), BindErrorKind> {
        let mut raw: Vec<&str> = match location {
            Location::Path => source.path(name).into_iter().collect(),
            Location::Query => source.query(name),
            Location::Header => source.header(name),
        };
        // Routers and clients send empty strings for absent path and header
        // values.
        if location != Location::Query {
            raw.retain(|value| !value.is_empty());
        }

        let (inner, _) = field.ty.strip_nullable();
        let element = match inner.kind() {
            Kind::Seq(elem) | Kind::Array(elem, _) => Some(elem()),
            _ => None,
        };

        if raw.is_empty() {
            match field.field.tag_value(TAG_DEFAULT) {
                Some(default) if element.is_some() => {
                    raw = default.split(',').collect();
                }
                Some(default) => raw.push(default),
                None if field.required => {
                    return Err(BindErrorKind::Missing {
                        location,
                        name: name.to_string(),
                    });
                }
                None => return Ok(()),
            }
        }

        if let Some(allowed) = field.field.tag_value(TAG_ENUM) {
            let allowed =
                allowed.trim().split(',').map(str::to_string).collect::<Vec<_>>();
            if let Some(value) =
                raw.iter().find(|value| !allowed.iter().any(|a| a == *value))
            {
                return Err(BindErrorKind::NotInEnum {
                    value: value.to_string(),
                    allowed,
                });
            }
        }

        let value = match (&element, inner.kind()) {
            (Some(elem), kind) => {
                if let Kind::Array(_, len) = kind {
                    if raw.len() != *len {
                        return Err(BindErrorKind::LengthMismatch {
                            expected: *len,
                            found: raw.len(),
                        });
                    }
                }
                let values = raw
                    .iter()
                    .map(|value| self.converter.convert(value, elem))
                    .collect::<Result<Vec<_>, _>>()?;
                Value::List(values)
            }
            (None, _) => {
                if raw.len() > 1 {
                    return Err(BindErrorKind::TooManyValues { count: raw.len() });
                }
                self.converter.convert(raw[0], &inner)?
            }
        };

        let slot = embedded_target(target, &field.embedding)
            .map_err(BindErrorKind::Unassignable)?;
        match field.field.access() {
            Some(FieldAccess::Assign(assign)) => {
                assign(slot, value).map_err(BindErrorKind::Unassignable)
            }
            _ => Err(BindErrorKind::Unassignable(
                "field has no setter".to_string(),
            )),
        }
    }
}

/// Walks the chain of embedded fields leading to a field, creating absent
/// optional structs on the way.
fn embedded_target<'a>(
    root: &'a mut dyn Any,
    embedding: &[FieldDescriptor],
) -> Result<&'a mut dyn Any, String> {
    let mut current = root;
    for field in embedding {
        let Some(FieldAccess::Embedded(access)) = field.access() else {
            return Err(format!("embedded field {} is not reachable", field.name()));
        };
        current = access(current).ok_or_else(|| {
            format!("embedded field {} is not reachable", field.name())
        })?;
    }
    Ok(current)
}
