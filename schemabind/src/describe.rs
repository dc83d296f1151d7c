// Copyright 2025 Oxide Computer Company

//! Type descriptors: the introspection surface walked by the generator and
//! the binder.
//!
//! Rust has no runtime reflection, so every type that participates in schema
//! generation or request binding implements [`Describe`], which produces a
//! [`TypeDescriptor`].  Most consumers derive it with
//! `#[derive(schemabind::Describe)]`; the descriptors for standard library
//! and well-known third-party types live here.
//!
//! Descriptors refer to element, key, value and field types lazily through
//! [`TypeRef`] function pointers.  A struct that contains itself (directly,
//! through a `Vec`, an `Option<Box<_>>`, ...) is therefore describable without
//! infinite recursion: the cycle only gets followed as far as the consumer of
//! the descriptor chooses to follow it.

use crate::data_type::DataType;
use crate::convert::Value;
use indexmap::IndexMap;
use std::any::Any;
use std::any::TypeId;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;

/// Lazily produces the descriptor of a related type.
pub type TypeRef = fn() -> TypeDescriptor;

/// Parses the raw text of an `example` tag into the JSON value documented for
/// the type.  Returns a human-readable message on failure.
pub type ExampleParser = fn(&str) -> Result<serde_json::Value, String>;

/// A type that can describe its own structure.
pub trait Describe: 'static {
    fn describe() -> TypeDescriptor;
}

/// Structural kind of a described type.
#[derive(Clone, Debug)]
pub enum Kind {
    Bool,
    Int { bits: u32 },
    Uint { bits: u32 },
    Float { bits: u32 },
    Char,
    String,
    /// Byte sequence, carried as base64 text.
    Bytes,
    /// Point in time.
    DateTime,
    /// Calendar date.
    Date,
    Duration,
    /// A value that may be absent (`Option<T>`).
    Nullable(TypeRef),
    /// Variable-length sequence.
    Seq(TypeRef),
    /// Fixed-length sequence.
    Array(TypeRef, usize),
    /// Key/value mapping.
    Map(TypeRef, TypeRef),
    Struct(Vec<FieldDescriptor>),

    // The remaining kinds have no wire representation.
    Function,
    Channel,
    RawPointer,
    /// Untyped sum type such as `dyn Any`.
    Dynamic,
    Complex,
}

/// How the schema name of a described type is determined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaName {
    /// Derived from the Rust type path.
    Derived,
    /// Explicitly chosen by the type.
    Explicit(String),
    /// Never named: always inlined, never registered as a component.
    Anonymous,
}

/// Describes one Rust type.
#[derive(Clone)]
pub struct TypeDescriptor {
    id: TypeId,
    rust_name: &'static str,
    name: SchemaName,
    kind: Kind,
    data_type: Option<DataType>,
    example_parser: Option<ExampleParser>,
    description: Option<String>,
}

impl TypeDescriptor {
    pub fn new<T: ?Sized + 'static>(kind: Kind) -> Self {
        TypeDescriptor {
            id: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
            name: SchemaName::Derived,
            kind,
            data_type: None,
            example_parser: None,
            description: None,
        }
    }

    /// Describes a struct with the given fields.
    pub fn structure<T: 'static>(fields: Vec<FieldDescriptor>) -> Self {
        Self::new::<T>(Kind::Struct(fields))
    }

    /// Uses `name` as the schema name instead of one derived from the type.
    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        self.name = SchemaName::Explicit(name.into());
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.name = SchemaName::Anonymous;
        self
    }

    /// Makes the type self-describing: `data_type` wins over anything
    /// inferred from its kind.
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn with_example_parser(mut self, parser: ExampleParser) -> Self {
        self.example_parser = Some(parser);
        self
    }

    /// Documents the type.  Shown on the component of a named struct.
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    pub fn schema_name(&self) -> &SchemaName {
        &self.name
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn data_type(&self) -> Option<&DataType> {
        self.data_type.as_ref()
    }

    pub fn example_parser(&self) -> Option<ExampleParser> {
        self.example_parser
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn fields(&self) -> Option<&[FieldDescriptor]> {
        match &self.kind {
            Kind::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// Strips every `Nullable` layer, returning the innermost descriptor and
    /// whether anything was stripped.
    pub fn strip_nullable(&self) -> (TypeDescriptor, bool) {
        let mut current = self.clone();
        let mut nullable = false;
        while let Kind::Nullable(inner) = current.kind {
            current = inner();
            nullable = true;
        }
        (current, nullable)
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.kind, Kind::Struct(_))
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("rust_name", &self.rust_name)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("data_type", &self.data_type)
            .field("example_parser", &self.example_parser.is_some())
            .field("description", &self.description)
            .finish()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rust_name)
    }
}

/// How the binder reaches a field inside a live value.
#[derive(Clone, Copy)]
pub enum FieldAccess {
    /// Stores a converted value into the field of the given struct.
    Assign(fn(&mut dyn Any, Value) -> Result<(), String>),
    /// Returns the embedded struct, creating it first if it is absent.
    Embedded(fn(&mut dyn Any) -> Option<&mut dyn Any>),
}

impl fmt::Debug for FieldAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldAccess::Assign(_) => f.write_str("Assign"),
            FieldAccess::Embedded(_) => f.write_str("Embedded"),
        }
    }
}

/// One declared field of a struct.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    name: String,
    ty: Option<TypeRef>,
    embedded: bool,
    tags: IndexMap<String, String>,
    access: Option<FieldAccess>,
}

impl FieldDescriptor {
    /// An exported field.
    pub fn new<S: Into<String>>(name: S, ty: TypeRef) -> Self {
        FieldDescriptor {
            name: name.into(),
            ty: Some(ty),
            embedded: false,
            tags: IndexMap::new(),
            access: None,
        }
    }

    /// A field that is not visible outside its type.  Its type is never
    /// described.
    pub fn private<S: Into<String>>(name: S) -> Self {
        FieldDescriptor {
            name: name.into(),
            ty: None,
            embedded: false,
            tags: IndexMap::new(),
            access: None,
        }
    }

    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    pub fn tag<K: Into<String>, V: Into<String>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_assign(
        mut self,
        assign: fn(&mut dyn Any, Value) -> Result<(), String>,
    ) -> Self {
        self.access = Some(FieldAccess::Assign(assign));
        self
    }

    pub fn with_embedded_access(
        mut self,
        access: fn(&mut dyn Any) -> Option<&mut dyn Any>,
    ) -> Self {
        self.access = Some(FieldAccess::Embedded(access));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Describes the field's type.  `None` for private fields.
    pub fn ty(&self) -> Option<TypeDescriptor> {
        self.ty.map(|ty| ty())
    }

    pub fn is_exported(&self) -> bool {
        self.ty.is_some()
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub fn tags(&self) -> &IndexMap<String, String> {
        &self.tags
    }

    /// Returns the value of a tag, `None` if the tag is absent.  A present
    /// tag may have an empty value.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn access(&self) -> Option<FieldAccess> {
        self.access
    }
}

/// Produces the error message used by derived accessors when handed a value
/// of the wrong type.
pub fn access_mismatch<T: 'static>() -> String {
    format!("value is not a {}", std::any::type_name::<T>())
}

macro_rules! describe_primitive {
    ($kind:expr, $($t:ty),+) => {
        $(
            impl Describe for $t {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::new::<$t>($kind)
                }
            }
        )+
    };
}

describe_primitive!(Kind::Bool, bool);
describe_primitive!(Kind::Char, char);
describe_primitive!(Kind::String, String);
describe_primitive!(Kind::Int { bits: 8 }, i8);
describe_primitive!(Kind::Int { bits: 16 }, i16);
describe_primitive!(Kind::Int { bits: 32 }, i32);
describe_primitive!(Kind::Int { bits: 64 }, i64, isize);
describe_primitive!(Kind::Uint { bits: 8 }, u8);
describe_primitive!(Kind::Uint { bits: 16 }, u16);
describe_primitive!(Kind::Uint { bits: 32 }, u32);
describe_primitive!(Kind::Uint { bits: 64 }, u64, usize);
describe_primitive!(Kind::Float { bits: 32 }, f32);
describe_primitive!(Kind::Float { bits: 64 }, f64);
describe_primitive!(Kind::Bytes, bytes::Bytes);
describe_primitive!(Kind::Duration, std::time::Duration);
describe_primitive!(Kind::Date, chrono::NaiveDate);
describe_primitive!(
    Kind::DateTime,
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::FixedOffset>,
    chrono::DateTime<chrono::Local>
);
describe_primitive!(Kind::Dynamic, dyn Any, dyn Any + Send + Sync);
// Arbitrary JSON may take any shape, so no single schema describes it.
describe_primitive!(Kind::Dynamic, serde_json::Value);

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Nullable(T::describe))
    }
}

impl<T: Describe + ?Sized> Describe for Box<T> {
    fn describe() -> TypeDescriptor {
        T::describe()
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Seq(T::describe))
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Array(T::describe, N))
    }
}

impl<K: Describe, V: Describe, S: 'static> Describe for HashMap<K, V, S> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Map(K::describe, V::describe))
    }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Map(K::describe, V::describe))
    }
}

impl<K: Describe, V: Describe, S: 'static> Describe for IndexMap<K, V, S> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Map(K::describe, V::describe))
    }
}

impl<T: ?Sized + 'static> Describe for *const T {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::RawPointer)
    }
}

impl<T: ?Sized + 'static> Describe for *mut T {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::RawPointer)
    }
}

impl<R: 'static> Describe for fn() -> R {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Function)
    }
}

impl<A: 'static, R: 'static> Describe for fn(A) -> R {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Function)
    }
}

impl<T: 'static> Describe for std::sync::mpsc::Sender<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Channel)
    }
}

impl<T: 'static> Describe for std::sync::mpsc::SyncSender<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Channel)
    }
}

impl<T: 'static> Describe for std::sync::mpsc::Receiver<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Channel)
    }
}
