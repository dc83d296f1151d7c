// Copyright 2025 Oxide Computer Company

//! Walking the fields of described structs.
//!
//! Both the generator and the binder see a struct through
//! [`extract_fields()`]: a flat, ordered list of fields where embedded
//! structs have been expanded in place, private fields are gone, and each
//! field has been placed either in a parameter location or in the body.

use crate::describe::FieldDescriptor;
use crate::describe::TypeDescriptor;
use crate::error::GenerationError;
use std::any::TypeId;
use std::collections::BTreeSet;
use std::fmt;

pub const TAG_VALIDATE: &str = "validate";
pub const TAG_DEFAULT: &str = "default";
pub const TAG_ENUM: &str = "enum";
pub const TAG_DESCRIPTION: &str = "description";
pub const TAG_DEPRECATED: &str = "deprecated";
pub const TAG_FORMAT: &str = "format";
pub const TAG_EXAMPLE: &str = "example";
/// `binding = "-"` keeps a field out of the request body.
pub const TAG_BINDING: &str = "binding";
/// Value of the serialization and binding tags that hides a field.
pub const SKIP: &str = "-";

/// Where a parameter is read from.  The declaration order is the order in
/// which parameters are listed in an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Location {
    Path,
    Query,
    Header,
}

impl Location {
    pub const ALL: [Location; 3] =
        [Location::Path, Location::Query, Location::Header];

    /// Name of the field tag declaring this location.
    pub fn tag(&self) -> &'static str {
        match self {
            Location::Path => "path",
            Location::Query => "query",
            Location::Header => "header",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// How the fields of a struct are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractMode {
    /// Operation input: location tags make parameters, the rest is body.
    Input,
    /// Plain payload: every field is a body property.
    Body,
}

/// Where an extracted field ends up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    Parameter { location: Location, name: String },
    Body { name: String },
}

#[derive(Clone, Debug)]
pub struct ExtractedField {
    pub field: FieldDescriptor,
    pub ty: TypeDescriptor,
    /// Rust name of the struct declaring the field.
    pub owner: &'static str,
    pub placement: Placement,
    pub required: bool,
    /// Embedded fields traversed to reach `field`, outermost first.
    pub embedding: Vec<FieldDescriptor>,
}

impl ExtractedField {
    /// The name the field is documented and bound under.
    pub fn public_name(&self) -> &str {
        match &self.placement {
            Placement::Parameter { name, .. } => name,
            Placement::Body { name } => name,
        }
    }
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub fields: Vec<ExtractedField>,
    /// Recursive embeddings and duplicated names.  Duplicates are left out
    /// of `fields`; the first occurrence wins.
    pub warnings: Vec<GenerationError>,
}

/**
 * Flattens the fields of the struct `ty`.
 *
 * `serialization_tag` names the tag holding body property names (`json` for
 * JSON bodies).  Fails only when a field declares more than one location.
 */
pub fn extract_fields(
    ty: &TypeDescriptor,
    mode: ExtractMode,
    serialization_tag: &str,
) -> Result<Extraction, GenerationError> {
    let mut walker = Walker {
        mode,
        serialization_tag,
        extraction: Extraction::default(),
        seen_parameters: BTreeSet::new(),
        seen_properties: BTreeSet::new(),
    };
    let mut ancestors = vec![ty.id()];
    walker.walk(ty, &mut ancestors, &mut Vec::new())?;
    Ok(walker.extraction)
}

struct Walker<'a> {
    mode: ExtractMode,
    serialization_tag: &'a str,
    extraction: Extraction,
    seen_parameters: BTreeSet<(Location, String)>,
    seen_properties: BTreeSet<String>,
}

impl Walker<'_> {
    fn walk(
        &mut self,
        ty: &TypeDescriptor,
        ancestors: &mut Vec<TypeId>,
        embedding: &mut Vec<FieldDescriptor>,
    ) -> Result<(), GenerationError> {
        let Some(fields) = ty.fields() else {
            return Ok(());
        };
        for field in fields {
            let Some(field_ty) = field.ty() else {
                continue;
            };

            if field.is_embedded() {
                let (inner, _) = field_ty.strip_nullable();
                if !inner.is_struct() {
                    continue;
                }
                if ancestors.contains(&inner.id()) {
                    self.extraction.warnings.push(
                        GenerationError::RecursiveEmbedding {
                            type_name: inner.rust_name().to_string(),
                            field: field.name().to_string(),
                        },
                    );
                    continue;
                }
                ancestors.push(inner.id());
                embedding.push(field.clone());
                let result = self.walk(&inner, ancestors, embedding);
                embedding.pop();
                ancestors.pop();
                result?;
                continue;
            }

            let location = match self.mode {
                ExtractMode::Input => field_location(field, ty)?,
                ExtractMode::Body => None,
            };

            let placement = match location {
                Some(location) => {
                    let name = parameter_name(field, location);
                    if !self.seen_parameters.insert((location, name.clone())) {
                        self.extraction.warnings.push(
                            GenerationError::DuplicateParameter {
                                type_name: ty.rust_name().to_string(),
                                name,
                                location,
                            },
                        );
                        continue;
                    }
                    Placement::Parameter { location, name }
                }
                None => {
                    if self.mode == ExtractMode::Input
                        && field.tag_value(TAG_BINDING) == Some(SKIP)
                    {
                        continue;
                    }
                    let Some(name) =
                        serialized_name(field, self.serialization_tag)
                    else {
                        continue;
                    };
                    if !self.seen_properties.insert(name.clone()) {
                        self.extraction.warnings.push(
                            GenerationError::DuplicateBodyProperty {
                                type_name: ty.rust_name().to_string(),
                                name,
                            },
                        );
                        continue;
                    }
                    Placement::Body { name }
                }
            };

            self.extraction.fields.push(ExtractedField {
                field: field.clone(),
                ty: field_ty,
                owner: ty.rust_name(),
                required: is_required(field, location),
                placement,
                embedding: embedding.clone(),
            });
        }
        Ok(())
    }
}

/// Returns the single location declared by `field`, if any.
pub fn field_location(
    field: &FieldDescriptor,
    owner: &TypeDescriptor,
) -> Result<Option<Location>, GenerationError> {
    let mut declared =
        Location::ALL.into_iter().filter(|l| field.tag_value(l.tag()).is_some());
    match (declared.next(), declared.next()) {
        (None, _) => Ok(None),
        (Some(location), None) => Ok(Some(location)),
        (Some(_), Some(_)) => Err(GenerationError::ConflictingLocation {
            field: field.name().to_string(),
            type_name: owner.rust_name().to_string(),
        }),
    }
}

/// Splits a location tag value such as `"limit,required"` into the name
/// and its options.  An empty name falls back to the field's own name.
fn parse_location_tag<'a>(
    field: &'a FieldDescriptor,
    location: Location,
) -> (&'a str, impl Iterator<Item = &'a str>) {
    let raw = field.tag_value(location.tag()).unwrap_or_default();
    let mut parts = raw.split(',').map(str::trim);
    let name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => field.name(),
    };
    (name, parts)
}

pub fn parameter_name(field: &FieldDescriptor, location: Location) -> String {
    parse_location_tag(field, location).0.to_string()
}

/// Whether the `validate` tag marks the field as required.  Options after
/// `dive` or `keys` apply to elements, not to the field itself.
pub fn validate_requires(field: &FieldDescriptor) -> bool {
    field
        .tag_value(TAG_VALIDATE)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .take_while(|option| *option != "dive" && *option != "keys")
        .any(|option| option == "required")
}

/// Path parameters are always required.  Other fields are required when
/// their location tag carries the `required` option or when the `validate`
/// tag says so.
pub fn is_required(field: &FieldDescriptor, location: Option<Location>) -> bool {
    match location {
        Some(Location::Path) => true,
        Some(location) => {
            parse_location_tag(field, location).1.any(|o| o == "required")
                || validate_requires(field)
        }
        None => validate_requires(field),
    }
}

/// Name of a body property, `None` when the serialization tag hides it.
pub fn serialized_name(field: &FieldDescriptor, tag: &str) -> Option<String> {
    let name = field
        .tag_value(tag)
        .and_then(|raw| raw.split(',').next())
        .map(str::trim)
        .unwrap_or_default();
    match name {
        "" => Some(field.name().to_string()),
        SKIP => None,
        name => Some(name.to_string()),
    }
}
