// Copyright 2025 Oxide Computer Company

//! Error types for document generation and request binding.
//!
//! There are three tiers of errors here:
//!
//! * [`GenerationError`] describes a problem with one piece of the generated
//!   document: an unsupported field type, a default that does not parse, a
//!   duplicated parameter, and so on.  These are not fatal.  The
//!   [`crate::Generator`] records them in order, logs them, keeps going with
//!   the rest of the document (leaving the offending schema out), and hands
//!   them back from [`crate::Generator::errors()`].  Consumers are expected to
//!   check that list at startup, before serving any traffic.
//!
//! * [`AddOperationError`] is returned by
//!   [`crate::Generator::add_operation()`] when an operation cannot be
//!   registered at all.  These reflect mistakes in how routes were declared;
//!   nothing about the operation is inserted in the document.
//!
//! * [`BindError`] is produced per request by the [`crate::Binder`] and
//!   always identifies the offending field and the struct it belongs to.  It
//!   is a client error: see [`BindError::status_code()`] and
//!   [`crate::ErrorHook`] for turning it into a response.

use crate::convert::ConversionError;
use crate::fields::Location;
use thiserror::Error;

/// A non-fatal problem found while generating the document.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("encountered unsupported type {type_name}")]
    UnsupportedType { type_name: String },

    #[error("encountered type {type_name} with unsupported data type {data_type:?}")]
    UnsupportedDataType { type_name: String, data_type: String },

    #[error("map type {type_name} has keys of type {key}, expected a string type")]
    MapKeyNotString { type_name: String, key: String },

    #[error("field {field} of type {type_name} has conflicting parameter locations")]
    ConflictingLocation { field: String, type_name: String },

    #[error(
        "duplicate parameter found in type {type_name}: \
        name={name}, location={location}"
    )]
    DuplicateParameter { type_name: String, name: String, location: Location },

    #[error("duplicate request body property {name} found in type {type_name}")]
    DuplicateBodyProperty { type_name: String, name: String },

    #[error("response with code {code} already exists in operation {operation}")]
    DuplicateResponse { operation: String, code: String },

    #[error("invalid response code {code:?} in operation {operation}")]
    InvalidStatusCode { operation: String, code: String },

    #[error(
        "field {field} of type {type_name} cannot be required and have a \
        default value"
    )]
    RequiredWithDefault { field: String, type_name: String },

    #[error(
        "default value of field {field} in type {type_name} cannot be \
        converted to the field's type"
    )]
    DefaultConversion {
        field: String,
        type_name: String,
        #[source]
        error: ConversionError,
    },

    #[error(
        "enum value of field {field} in type {type_name} cannot be converted \
        to the field's type"
    )]
    EnumConversion {
        field: String,
        type_name: String,
        #[source]
        error: ConversionError,
    },

    #[error("invalid example")]
    Example(#[source] FieldError),

    #[error("skipped recursive embedding of type {type_name} for field {field}")]
    RecursiveEmbedding { type_name: String, field: String },

    #[error("inline type {type_name} contains itself")]
    RecursiveInline { type_name: String },

    #[error(
        "path parameters of {path} do not match the path fields of type \
        {type_name}: path has {in_path:?}, type has {in_type:?}"
    )]
    PathParameterMismatch {
        path: String,
        type_name: String,
        in_path: Vec<String>,
        in_type: Vec<String>,
    },

    #[error(
        "schema name {name} is already used by {existing}; \
        {rejected} is named {fallback} instead"
    )]
    NameCollision {
        name: String,
        existing: String,
        rejected: String,
        fallback: String,
    },
}

/// A problem attributed to one field of one type.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("field {name} of type {type_name}: {message}")]
pub struct FieldError {
    pub name: String,
    pub type_name: String,
    pub message: String,
}

/// An operation that could not be added to the document.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AddOperationError {
    #[error("input type {type_name} is not a struct")]
    InputNotStruct { type_name: String },

    #[error("operation {method} {path} is already defined")]
    DuplicateOperation { path: String, method: String },

    #[error("field {field} of type {type_name} has conflicting parameter locations")]
    ConflictingLocation { field: String, type_name: String },

    #[error("response {code} has both an example and named examples")]
    ExampleConflict { code: String },

    #[error("method {method} cannot be described")]
    UnsupportedMethod { method: String },
}

/// A request value that could not be bound into its target field.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("cannot bind field {field} of type {type_name}: {kind}")]
pub struct BindError {
    pub field: String,
    pub type_name: String,
    pub kind: BindErrorKind,
}

impl BindError {
    /// Every binding failure is the client's fault.
    pub fn status_code(&self) -> http::StatusCode {
        http::StatusCode::BAD_REQUEST
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BindErrorKind {
    #[error("required {location} parameter {name:?} is missing")]
    Missing { location: Location, name: String },

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("value {value:?} is not one of {allowed:?}")]
    NotInEnum { value: String, allowed: Vec<String> },

    #[error("expected a single value, found {count}")]
    TooManyValues { count: usize },

    #[error("expected {expected} values, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("field cannot be assigned: {0}")]
    Unassignable(String),
}
