// Copyright 2025 Oxide Computer Company

//! Schemabind documents HTTP APIs as OpenAPI 3 documents, generated from the
//! Rust types that handlers take and return, and binds request parameters
//! into those same types.
//!
//! The two halves share a vocabulary of field tags.  A field tagged
//! `#[openapi(query = "limit")]` is documented as the `limit` query
//! parameter of every operation that takes its struct as input, and is
//! filled from the `limit` query parameter when a request is bound.  As a
//! result the document cannot drift away from what the server accepts.
//!
//! ## Describing types
//!
//! Rust has no runtime reflection, so types taking part in either half
//! implement [`Describe`].  The derive handles structs:
//!
//! ```
//! use schemabind::Describe;
//!
//! /// A pet in the store.
//! #[derive(Default, Describe)]
//! pub struct Pet {
//!     /// Unique identifier.
//!     pub id: u64,
//!     #[openapi(validate = "required,max=64", example = "Rex")]
//!     pub name: String,
//!     #[openapi(enum = "available,sold")]
//!     pub status: Option<String>,
//!     #[serde(rename = "tag_list")]
//!     pub tags: Vec<String>,
//! }
//!
//! #[derive(Default, Describe)]
//! pub struct ListPets {
//!     #[openapi(query = "limit", default = "20", validate = "max=100")]
//!     pub limit: u32,
//!     #[openapi(header = "X-Request-Id,required")]
//!     pub request_id: String,
//! }
//! ```
//!
//! Field tags:
//!
//! * `path`, `query`, `header`: the field is a parameter in that location,
//!   under the given name (defaulting to the field name).  Path parameters
//!   are required; the others are required with a `,required` suffix.
//! * `validate`: `required`, and the bounds `len`, `min`, `max`, `lt`, `lte`,
//!   `gt`, `gte`, `eq` (sizes only), plus some string formats.  Options after
//!   `dive` or `keys` apply to elements and are ignored.
//! * `default`, `enum` (comma-separated), `example`: raw text converted to
//!   the field's type.
//! * `description`, `deprecated`, `format`.
//! * `binding = "-"` keeps a field out of the request body; `json = "-"`
//!   (or `#[serde(skip)]`) hides it from the body; `json = "name"` (or
//!   `#[serde(rename = "name")]`) renames it.
//! * `#[openapi(embed)]` (or `#[serde(flatten)]`) expands a struct's fields
//!   in place.
//!
//! Doc comments become descriptions.  Outside the derive, [`Describe`] is
//! implemented for the standard scalar, string, sequence and map types, for
//! `chrono` dates and times, `std::time::Duration` and `bytes::Bytes`.
//!
//! ## Generating a document
//!
//! A [`Generator`] is fed one operation at a time, typically while routes are
//! registered at startup.  See [`Generator::add_operation()`].  Problems that
//! do not prevent the rest of the document from being generated are
//! collected rather than returned: check [`Generator::errors()`] before
//! serving the document.
//!
//! ## Binding requests
//!
//! A [`Binder`] fills the parameter fields of an input struct from a
//! [`ParamSource`], such as [`RequestParams`] built from an `http` request.
//! Failures are [`BindError`]s, rendered into client error responses by the
//! binder's [`ErrorHook`].
//!
//! ## Logging
//!
//! Both take a `slog::Logger`.  [`ConfigLogging`] builds one from
//! configuration; see [`ConfigSchemabind`] for embedding schemabind's
//! configuration into an application's.

mod bind;
mod config;
mod convert;
mod data_type;
mod describe;
mod error;
mod fields;
mod generator;
mod logging;
mod operation;
mod schema;
mod validation;

pub use bind::Binder;
pub use bind::DefaultErrorHook;
pub use bind::ErrorHook;
pub use bind::FromParam;
pub use bind::ParamSource;
pub use bind::RequestParams;
pub use config::BinderConfig;
pub use config::ConfigSchemabind;
pub use config::GeneratorConfig;
pub use config::CONTENT_TYPE_JSON;
pub use convert::format_duration;
pub use convert::parse_bool;
pub use convert::parse_duration;
pub use convert::ConversionError;
pub use convert::Converter;
pub use convert::Value;
pub use data_type::DataType;
pub use describe::access_mismatch;
pub use describe::Describe;
pub use describe::ExampleParser;
pub use describe::FieldAccess;
pub use describe::FieldDescriptor;
pub use describe::Kind;
pub use describe::SchemaName;
pub use describe::TypeDescriptor;
pub use describe::TypeRef;
pub use error::AddOperationError;
pub use error::BindError;
pub use error::BindErrorKind;
pub use error::FieldError;
pub use error::GenerationError;
pub use fields::extract_fields;
pub use fields::ExtractMode;
pub use fields::ExtractedField;
pub use fields::Extraction;
pub use fields::Location;
pub use fields::Placement;
pub use generator::Generator;
pub use logging::discard_logger;
pub use logging::ConfigLogging;
pub use logging::ConfigLoggingIfExists;
pub use logging::ConfigLoggingLevel;
pub use operation::rewrite_path;
pub use operation::OperationInfo;
pub use operation::OperationResponse;
pub use operation::ResponseHeader;
pub use operation::XCodeSample;

// Consumers of the document need the model it is expressed in.
pub use openapiv3;

extern crate schemabind_derive;

/// Derives [`Describe`] for a struct with named fields.
///
/// Field attributes are `#[openapi(key = "value", ...)]` tags (see the
/// crate documentation for their meaning) and the flag `#[openapi(embed)]`.
/// `#[serde(rename)]`, `#[serde(skip)]` and `#[serde(flatten)]` are
/// honored.  On the struct, `#[openapi(rename = "Name")]` sets the schema
/// name and `#[openapi(inline)]` keeps the struct out of the components.
///
/// Public fields tagged with a location get a setter for the [`Binder`];
/// their types must implement [`FromParam`].  Public embedded fields get an
/// accessor and must be structs, `Option`s of structs (created with
/// `Default` when absent) or `Box`es of either.
pub use schemabind_derive::Describe;
