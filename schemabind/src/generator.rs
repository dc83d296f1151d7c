// Copyright 2025 Oxide Computer Company

//! The document generator: owns the OpenAPI document under construction, its
//! component registry, and the list of problems found so far.

use crate::config::GeneratorConfig;
use crate::convert::Converter;
use crate::data_type::DataType;
use crate::describe::Describe;
use crate::describe::TypeDescriptor;
use crate::error::GenerationError;
use crate::logging::discard_logger;
use heck::ToUpperCamelCase;
use slog::Logger;
use std::any::TypeId;
use std::collections::HashMap;
use std::collections::HashSet;
use std::io::Write;

const SCHEMA_REFERENCE_PREFIX: &str = "#/components/schemas/";

/// Builds an OpenAPI document from described types.
///
/// A generator is meant to be driven from a single thread while routes are
/// registered at startup: each call to [`Generator::add_operation()`] adds
/// one operation and whatever component schemas its types need.  Problems
/// that do not prevent the rest of the document from being generated are
/// accumulated and returned by [`Generator::errors()`]; check that list
/// before serving the document.
///
/// ```
/// use schemabind::Describe;
/// use schemabind::Generator;
/// use schemabind::OperationInfo;
///
/// #[derive(Describe)]
/// pub struct GetPet {
///     #[openapi(path = "id")]
///     pub id: u64,
/// }
///
/// #[derive(Describe)]
/// pub struct Pet {
///     pub id: u64,
///     pub name: String,
/// }
///
/// let mut generator = Generator::default();
/// generator
///     .add_operation(
///         "/pets/:id",
///         http::Method::GET,
///         Some("pets"),
///         Some(GetPet::describe),
///         Some(Pet::describe),
///         &OperationInfo::new(200).id("getPet"),
///     )
///     .unwrap();
/// assert!(generator.errors().is_empty());
/// let document = generator.json().unwrap();
/// assert!(document["paths"]["/pets/{id}"]["get"].is_object());
/// ```
pub struct Generator {
    pub(crate) config: GeneratorConfig,
    pub(crate) log: Logger,
    pub(crate) api: openapiv3::OpenAPI,
    pub(crate) converter: Converter,
    /// Schema name assigned to each named type seen so far.
    type_names: HashMap<TypeId, String>,
    /// Type owning each assigned schema name, with its Rust name.
    name_owners: HashMap<String, (TypeId, &'static str)>,
    data_types: HashMap<TypeId, DataType>,
    /// Anonymous structs whose schema is being built.
    pub(crate) inline_in_progress: HashSet<TypeId>,
    errors: Vec<GenerationError>,
}

impl Default for Generator {
    fn default() -> Self {
        Generator::new(GeneratorConfig::default(), discard_logger())
    }
}

impl Generator {
    pub fn new(config: GeneratorConfig, log: Logger) -> Self {
        let api = openapiv3::OpenAPI {
            openapi: config.openapi_version.clone(),
            components: Some(openapiv3::Components::default()),
            ..Default::default()
        };
        Generator {
            config,
            log,
            api,
            converter: Converter::strict(),
            type_names: HashMap::new(),
            name_owners: HashMap::new(),
            data_types: HashMap::new(),
            inline_in_progress: HashSet::new(),
            errors: Vec::new(),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The document generated so far.
    pub fn api(&self) -> &openapiv3::OpenAPI {
        &self.api
    }

    /// Problems found so far, in the order they were found.
    pub fn errors(&self) -> &[GenerationError] {
        &self.errors
    }

    pub fn set_info(&mut self, info: openapiv3::Info) {
        self.api.info = info;
    }

    pub fn set_servers(&mut self, servers: Vec<openapiv3::Server>) {
        self.api.servers = servers;
    }

    /// Adds a document-level tag.  Adding a tag that already exists replaces
    /// its description.
    pub fn add_tag<S: AsRef<str>>(&mut self, name: S, description: Option<String>) {
        let name = name.as_ref();
        match self.api.tags.iter_mut().find(|tag| tag.name == name) {
            Some(tag) => tag.description = description,
            None => self.api.tags.push(openapiv3::Tag {
                name: name.to_string(),
                description,
                ..Default::default()
            }),
        }
    }

    pub fn add_security_scheme<S: Into<String>>(
        &mut self,
        name: S,
        scheme: openapiv3::SecurityScheme,
    ) {
        self.components_mut()
            .security_schemes
            .insert(name.into(), openapiv3::ReferenceOr::Item(scheme));
    }

    /// Sets the security requirements applying to every operation.  An
    /// empty list is kept as `[]` in the document.
    pub fn set_security(
        &mut self,
        security: Option<Vec<openapiv3::SecurityRequirement>>,
    ) {
        self.api.security = security;
    }

    /**
     * Pins the schema name used for `T`.  Fails if the name is already used
     * by another type, or if `T` was already given a different name.
     */
    pub fn override_type_name<T: Describe>(
        &mut self,
        name: &str,
    ) -> Result<(), String> {
        let id = TypeId::of::<T>();
        let rust_name = std::any::type_name::<T>();
        if let Some((owner, owner_name)) = self.name_owners.get(name) {
            if *owner != id {
                return Err(format!(
                    "schema name {} is already used by {}",
                    name, owner_name
                ));
            }
        }
        if let Some(existing) = self.type_names.get(&id) {
            if existing != name {
                return Err(format!(
                    "type {} is already named {}",
                    rust_name, existing
                ));
            }
        }
        self.type_names.insert(id, name.to_string());
        self.name_owners.insert(name.to_string(), (id, rust_name));
        Ok(())
    }

    /// Replaces the classification of `T` for this generator.
    pub fn override_data_type<T: Describe>(&mut self, data_type: DataType) {
        self.data_types.insert(TypeId::of::<T>(), data_type);
    }

    /// Renders the document as JSON.
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.api)
    }

    /// Writes the document as pretty-printed JSON.
    pub fn to_writer(&self, out: &mut dyn Write) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(&mut *out, &self.api)?;
        writeln!(out).map_err(serde_json::Error::io)
    }

    /// Renders the document as YAML.
    pub fn yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.api)
    }

    /// Follows `schema` through component references.
    pub fn resolve_schema<'a>(
        &'a self,
        schema: &'a openapiv3::ReferenceOr<openapiv3::Schema>,
    ) -> Option<&'a openapiv3::Schema> {
        let mut current = schema;
        // A chain longer than the registry has to be a cycle.
        let limit = self.components().map_or(0, |c| c.schemas.len());
        for _ in 0..=limit {
            match current {
                openapiv3::ReferenceOr::Item(schema) => return Some(schema),
                openapiv3::ReferenceOr::Reference { reference } => {
                    let name =
                        reference.strip_prefix(SCHEMA_REFERENCE_PREFIX)?;
                    current = self.components()?.schemas.get(name)?;
                }
            }
        }
        None
    }

    pub(crate) fn components(&self) -> Option<&openapiv3::Components> {
        self.api.components.as_ref()
    }

    pub(crate) fn components_mut(&mut self) -> &mut openapiv3::Components {
        self.api.components.get_or_insert_with(openapiv3::Components::default)
    }

    pub(crate) fn record(&mut self, error: GenerationError) {
        slog::warn!(self.log, "document generation problem";
            "error" => %error);
        self.errors.push(error);
    }

    pub(crate) fn classify(&self, ty: &TypeDescriptor) -> DataType {
        match self.data_types.get(&ty.id()) {
            Some(data_type) => data_type.clone(),
            None => DataType::classify(ty),
        }
    }

    /// Returns the component name of `ty`, or `None` for anonymous types.
    /// The first type to claim a name keeps it; later claimants fall back to
    /// their full Rust path and the collision is recorded.
    pub(crate) fn schema_name(&mut self, ty: &TypeDescriptor) -> Option<String> {
        if let Some(name) = self.type_names.get(&ty.id()) {
            return Some(name.clone());
        }
        let candidate = match ty.schema_name() {
            crate::describe::SchemaName::Anonymous => return None,
            crate::describe::SchemaName::Explicit(name) => name.clone(),
            crate::describe::SchemaName::Derived => {
                derive_name(ty.rust_name(), self.config.full_schema_names)
            }
        };

        let name = match self.name_owners.get(&candidate) {
            Some((owner, owner_name)) if *owner != ty.id() => {
                let fallback = sanitize(&ty.rust_name().replace("::", "."));
                let existing = owner_name.to_string();
                self.record(GenerationError::NameCollision {
                    name: candidate,
                    existing,
                    rejected: ty.rust_name().to_string(),
                    fallback: fallback.clone(),
                });
                fallback
            }
            _ => candidate,
        };
        self.type_names.insert(ty.id(), name.clone());
        self.name_owners.insert(name.clone(), (ty.id(), ty.rust_name()));
        Some(name)
    }
}

pub(crate) fn schema_reference(name: &str) -> String {
    format!("{}{}", SCHEMA_REFERENCE_PREFIX, name)
}

/// Derives a component name from a Rust type path: `models::Pet` becomes
/// `ModelsPet` (or `Pet` when `full` is false), and generic arguments are
/// appended by their short names: `Page<models::Pet>` becomes `Page-Pet`.
fn derive_name(rust_name: &str, full: bool) -> String {
    let (base, args) = split_generics(rust_name);
    let mut segments = base.rsplit("::");
    let ident = segments.next().unwrap_or(base);
    let mut name = match (full, segments.next()) {
        (true, Some(module)) => {
            format!("{}{}", module.to_upper_camel_case(), ident)
        }
        _ => ident.to_string(),
    };
    for arg in args {
        name.push('-');
        name.push_str(&derive_name(arg, false));
    }
    sanitize(&name)
}

fn split_generics(rust_name: &str) -> (&str, Vec<&str>) {
    let (Some(open), true) = (rust_name.find('<'), rust_name.ends_with('>'))
    else {
        return (rust_name, Vec::new());
    };
    let inner = &rust_name[open + 1..rust_name.len() - 1];
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => (),
        }
    }
    args.push(inner[start..].trim());
    (&rust_name[..open], args)
}

/// Component names may only contain `[A-Za-z0-9._-]`.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
