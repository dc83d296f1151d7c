// Copyright 2025 Oxide Computer Company

//! Building schemas from type descriptors.
//!
//! Named structs are registered as components and referenced; everything
//! else is inlined.  A struct's name is registered before its fields are
//! visited, so that a type reachable from itself produces a reference to the
//! component under construction rather than an endless descent.

use crate::convert::parse_bool;
use crate::convert::ConversionError;
use crate::convert::Value;
use crate::data_type::DataType;
use crate::describe::Kind;
use crate::describe::TypeDescriptor;
use crate::error::FieldError;
use crate::error::GenerationError;
use crate::fields::extract_fields;
use crate::fields::ExtractMode;
use crate::fields::ExtractedField;
use crate::fields::TAG_DEFAULT;
use crate::fields::TAG_DEPRECATED;
use crate::fields::TAG_DESCRIPTION;
use crate::fields::TAG_ENUM;
use crate::fields::TAG_EXAMPLE;
use crate::fields::TAG_FORMAT;
use crate::fields::TAG_VALIDATE;
use crate::generator::schema_reference;
use crate::generator::Generator;
use crate::validation::apply_validation;
use openapiv3::ReferenceOr;
use openapiv3::Schema;
use openapiv3::SchemaData;
use openapiv3::SchemaKind;
use openapiv3::Type;
use openapiv3::VariantOrUnknownOrEmpty;

impl Generator {
    /**
     * Returns the schema of `ty`: a reference for named structs, which are
     * registered as components on first use, and an inline schema for
     * anything else.  Returns `None` after recording an error if the type
     * (or something it contains) has no schema.
     */
    pub fn build_schema(
        &mut self,
        ty: &TypeDescriptor,
    ) -> Option<ReferenceOr<Schema>> {
        let (inner, nullable) = ty.strip_nullable();
        let schema = match self.classify(&inner) {
            DataType::Unsupported => {
                self.record(GenerationError::UnsupportedType {
                    type_name: inner.rust_name().to_string(),
                });
                return None;
            }
            DataType::Complex => match inner.kind() {
                Kind::Map(key, value) => self.map_schema(&inner, *key, *value),
                Kind::Seq(elem) => self.array_schema(*elem, None),
                Kind::Array(elem, len) => self.array_schema(*elem, Some(*len)),
                Kind::Struct(_) => self.struct_schema(&inner),
                _ => {
                    self.record(GenerationError::UnsupportedType {
                        type_name: inner.rust_name().to_string(),
                    });
                    None
                }
            },
            data_type => match leaf_schema(&data_type) {
                Some(schema) => Some(ReferenceOr::Item(schema)),
                None => {
                    self.record(GenerationError::UnsupportedDataType {
                        type_name: inner.rust_name().to_string(),
                        data_type: data_type.to_string(),
                    });
                    None
                }
            },
        }?;

        if !nullable {
            return Some(schema);
        }
        let mut item = into_item(schema);
        item.schema_data.nullable = true;
        Some(ReferenceOr::Item(item))
    }

    fn map_schema(
        &mut self,
        ty: &TypeDescriptor,
        key: fn() -> TypeDescriptor,
        value: fn() -> TypeDescriptor,
    ) -> Option<ReferenceOr<Schema>> {
        let key = key();
        let mut object = openapiv3::ObjectType::default();
        if self.classify(&key) == DataType::String {
            let value = self.build_schema(&value())?;
            object.additional_properties = Some(
                openapiv3::AdditionalProperties::Schema(Box::new(value)),
            );
        } else {
            self.record(GenerationError::MapKeyNotString {
                type_name: ty.rust_name().to_string(),
                key: key.rust_name().to_string(),
            });
        }
        Some(ReferenceOr::Item(Schema {
            schema_data: SchemaData::default(),
            schema_kind: SchemaKind::Type(Type::Object(object)),
        }))
    }

    fn array_schema(
        &mut self,
        elem: fn() -> TypeDescriptor,
        len: Option<usize>,
    ) -> Option<ReferenceOr<Schema>> {
        let items = self.build_schema(&elem())?;
        Some(ReferenceOr::Item(Schema {
            schema_data: SchemaData::default(),
            schema_kind: SchemaKind::Type(Type::Array(openapiv3::ArrayType {
                items: Some(box_reference_or(items)),
                min_items: len,
                max_items: len,
                unique_items: false,
            })),
        }))
    }

    fn struct_schema(
        &mut self,
        ty: &TypeDescriptor,
    ) -> Option<ReferenceOr<Schema>> {
        let Some(name) = self.schema_name(ty) else {
            // Without a component to point at, a struct reaching itself
            // would be inlined forever.
            if !self.inline_in_progress.insert(ty.id()) {
                self.record(GenerationError::RecursiveInline {
                    type_name: ty.rust_name().to_string(),
                });
                return None;
            }
            let mut schema = self.object_schema(ty);
            self.inline_in_progress.remove(&ty.id());
            schema.schema_data.description = ty.description().map(String::from);
            return Some(ReferenceOr::Item(schema));
        };
        let reference = ReferenceOr::Reference {
            reference: schema_reference(&name),
        };
        if self.components_mut().schemas.contains_key(&name) {
            return Some(reference);
        }

        // Register first: fields reaching back to this type find the name
        // and stop there.
        let placeholder = Schema {
            schema_data: SchemaData::default(),
            schema_kind: SchemaKind::Type(Type::Object(Default::default())),
        };
        self.components_mut()
            .schemas
            .insert(name.clone(), ReferenceOr::Item(placeholder));
        let mut schema = self.object_schema(ty);
        schema.schema_data.description = ty.description().map(String::from);
        self.components_mut().schemas.insert(name, ReferenceOr::Item(schema));
        Some(reference)
    }

    /// Builds the object schema listing every body property of `ty`.
    pub(crate) fn object_schema(&mut self, ty: &TypeDescriptor) -> Schema {
        let extraction = match extract_fields(
            ty,
            ExtractMode::Body,
            self.config.serialization_tag(),
        ) {
            Ok(extraction) => extraction,
            Err(error) => {
                self.record(error);
                Default::default()
            }
        };
        for warning in extraction.warnings {
            self.record(warning);
        }
        self.properties_schema(&extraction.fields)
    }

    /// Builds an object schema from already extracted fields.  Fields whose
    /// schema cannot be built are left out.
    pub(crate) fn properties_schema(
        &mut self,
        fields: &[ExtractedField],
    ) -> Schema {
        let mut object = openapiv3::ObjectType::default();
        for field in fields {
            let Some(schema) = self.field_schema(field) else {
                continue;
            };
            let name = field.public_name().to_string();
            if field.required {
                object.required.push(name.clone());
            }
            object.properties.insert(name, box_reference_or(schema));
        }
        Schema {
            schema_data: SchemaData::default(),
            schema_kind: SchemaKind::Type(Type::Object(object)),
        }
    }

    /**
     * Builds the schema of one field and applies the field's tags to it.
     *
     * Constraints (bounds, formats, enums) only apply to inline schemas.
     * Annotations (description, deprecation, default, example) apply to
     * references too, through an `allOf` wrapper, so that the shared
     * component is left alone.
     */
    pub(crate) fn field_schema(
        &mut self,
        field: &ExtractedField,
    ) -> Option<ReferenceOr<Schema>> {
        let mut schema = self.build_schema(&field.ty)?;
        let (inner, _) = field.ty.strip_nullable();
        let descriptor = &field.field;

        if let ReferenceOr::Item(item) = &mut schema {
            let validated_format = descriptor
                .tag_value(TAG_VALIDATE)
                .and_then(|v| {
                    apply_validation(&mut item.schema_kind, inner.kind(), v)
                });
            if let Some(format) =
                descriptor.tag_value(TAG_FORMAT).or(validated_format)
            {
                set_format(&mut item.schema_kind, format);
            }
        }

        if let Some(raw) = descriptor.tag_value(TAG_ENUM) {
            self.apply_enum_tag(field, &inner, raw, &mut schema);
        }

        let mut data = SchemaData {
            description: descriptor
                .tag_value(TAG_DESCRIPTION)
                .map(String::from),
            deprecated: descriptor
                .tag_value(TAG_DEPRECATED)
                .and_then(parse_bool)
                .unwrap_or(false),
            ..Default::default()
        };

        if let Some(raw) = descriptor.tag_value(TAG_DEFAULT) {
            if field.required {
                self.record(GenerationError::RequiredWithDefault {
                    field: descriptor.name().to_string(),
                    type_name: field.owner.to_string(),
                });
            } else {
                match self.converter.convert(raw, &field.ty) {
                    Ok(value) => data.default = Some(value.to_json()),
                    Err(error) => {
                        self.record(GenerationError::DefaultConversion {
                            field: descriptor.name().to_string(),
                            type_name: field.owner.to_string(),
                            error,
                        })
                    }
                }
            }
        }

        if let Some(raw) = descriptor.tag_value(TAG_EXAMPLE) {
            let parsed = match inner.example_parser() {
                Some(parser) => parser(raw),
                None => self
                    .converter
                    .convert(raw, &field.ty)
                    .map(|value| value.to_json())
                    .map_err(|error| error.to_string()),
            };
            match parsed {
                Ok(example) => data.example = Some(example),
                Err(message) => {
                    self.record(GenerationError::Example(FieldError {
                        name: descriptor.name().to_string(),
                        type_name: field.owner.to_string(),
                        message,
                    }))
                }
            }
        }

        if data == SchemaData::default() {
            return Some(schema);
        }
        let mut item = into_item(schema);
        let target = &mut item.schema_data;
        target.description = data.description.or(target.description.take());
        target.deprecated |= data.deprecated;
        target.default = data.default.or(target.default.take());
        target.example = data.example.or(target.example.take());
        Some(ReferenceOr::Item(item))
    }

    /// Converts the values of an `enum` tag and lists them on the schema.
    /// For sequences the values describe the elements, so they go on the
    /// items schema.
    fn apply_enum_tag(
        &mut self,
        field: &ExtractedField,
        inner: &TypeDescriptor,
        raw: &str,
        schema: &mut ReferenceOr<Schema>,
    ) {
        let (value_ty, target) = match inner.kind() {
            Kind::Seq(elem) | Kind::Array(elem, _) => {
                let target = match schema {
                    ReferenceOr::Item(Schema {
                        schema_kind:
                            SchemaKind::Type(Type::Array(openapiv3::ArrayType {
                                items: Some(ReferenceOr::Item(items)),
                                ..
                            })),
                        ..
                    }) => Some(&mut items.schema_kind),
                    _ => None,
                };
                (elem(), target)
            }
            _ => {
                let target = match schema {
                    ReferenceOr::Item(item) => Some(&mut item.schema_kind),
                    ReferenceOr::Reference { .. } => None,
                };
                (inner.clone(), target)
            }
        };

        let converted = raw
            .split(',')
            .map(|value| self.converter.convert(value, &value_ty))
            .collect::<Result<Vec<_>, _>>()
            .and_then(|values| {
                let target = target.ok_or_else(|| {
                    enum_error(raw, &value_ty, "schema cannot list values")
                })?;
                set_enum(target, &values)
                    .map_err(|reason| enum_error(raw, &value_ty, reason))
            });
        if let Err(error) = converted {
            self.record(GenerationError::EnumConversion {
                field: field.field.name().to_string(),
                type_name: field.owner.to_string(),
                error,
            });
        }
    }
}

fn enum_error<R: Into<String>>(
    raw: &str,
    ty: &TypeDescriptor,
    reason: R,
) -> ConversionError {
    ConversionError {
        value: raw.to_string(),
        target: ty.rust_name().to_string(),
        reason: reason.into(),
    }
}

fn set_enum(kind: &mut SchemaKind, values: &[Value]) -> Result<(), String> {
    let SchemaKind::Type(ty) = kind else {
        return Err("schema cannot list values".to_string());
    };
    match ty {
        Type::String(s) => {
            s.enumeration = values
                .iter()
                .map(|value| match value.to_json() {
                    serde_json::Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                })
                .collect();
        }
        Type::Integer(int) => {
            int.enumeration = values
                .iter()
                .map(|value| match value {
                    Value::Int(i) => Ok(Some(*i)),
                    Value::Uint(u) => i64::try_from(*u)
                        .map(Some)
                        .map_err(|_| format!("{} does not fit in int64", u)),
                    other => Err(other.unexpected("integer")),
                })
                .collect::<Result<_, _>>()?;
        }
        Type::Number(num) => {
            num.enumeration = values
                .iter()
                .map(|value| match value {
                    Value::Float(f) => Ok(Some(*f)),
                    Value::Int(i) => Ok(Some(*i as f64)),
                    Value::Uint(u) => Ok(Some(*u as f64)),
                    other => Err(other.unexpected("number")),
                })
                .collect::<Result<_, _>>()?;
        }
        Type::Boolean(b) => {
            b.enumeration = values
                .iter()
                .map(|value| match value {
                    Value::Bool(b) => Ok(Some(*b)),
                    other => Err(other.unexpected("boolean")),
                })
                .collect::<Result<_, _>>()?;
        }
        Type::Object(_) | Type::Array(_) => {
            return Err("schema cannot list values".to_string());
        }
    }
    Ok(())
}

/// Makes `schema` an inline schema that can carry annotations, wrapping a
/// reference in a single-element `allOf`.
fn into_item(schema: ReferenceOr<Schema>) -> Schema {
    match schema {
        ReferenceOr::Item(schema) => schema,
        reference @ ReferenceOr::Reference { .. } => Schema {
            schema_data: SchemaData::default(),
            schema_kind: SchemaKind::AllOf { all_of: vec![reference] },
        },
    }
}

/// Inline schema for a primitive data type, `None` if the type string is
/// not one OpenAPI knows.
fn leaf_schema(data_type: &DataType) -> Option<Schema> {
    let format = data_type.format();
    let ty = match data_type.type_str() {
        "integer" => Type::Integer(openapiv3::IntegerType {
            format: integer_format(format),
            ..Default::default()
        }),
        "number" => Type::Number(openapiv3::NumberType {
            format: number_format(format),
            ..Default::default()
        }),
        "string" => Type::String(openapiv3::StringType {
            format: string_format(format),
            ..Default::default()
        }),
        "boolean" => Type::Boolean(openapiv3::BooleanType::default()),
        "object" => Type::Object(openapiv3::ObjectType::default()),
        "array" => Type::Array(openapiv3::ArrayType {
            items: None,
            min_items: None,
            max_items: None,
            unique_items: false,
        }),
        _ => return None,
    };
    Some(Schema {
        schema_data: SchemaData::default(),
        schema_kind: SchemaKind::Type(ty),
    })
}

/// Replaces the format of a primitive schema.
fn set_format(kind: &mut SchemaKind, format: &str) {
    match kind {
        SchemaKind::Type(Type::Integer(int)) => int.format = integer_format(format),
        SchemaKind::Type(Type::Number(num)) => num.format = number_format(format),
        SchemaKind::Type(Type::String(s)) => s.format = string_format(format),
        _ => (),
    }
}

fn integer_format(
    format: &str,
) -> VariantOrUnknownOrEmpty<openapiv3::IntegerFormat> {
    match format {
        "" => VariantOrUnknownOrEmpty::Empty,
        "int32" => VariantOrUnknownOrEmpty::Item(openapiv3::IntegerFormat::Int32),
        "int64" => VariantOrUnknownOrEmpty::Item(openapiv3::IntegerFormat::Int64),
        other => VariantOrUnknownOrEmpty::Unknown(other.to_string()),
    }
}

fn number_format(
    format: &str,
) -> VariantOrUnknownOrEmpty<openapiv3::NumberFormat> {
    match format {
        "" => VariantOrUnknownOrEmpty::Empty,
        "float" => VariantOrUnknownOrEmpty::Item(openapiv3::NumberFormat::Float),
        "double" => {
            VariantOrUnknownOrEmpty::Item(openapiv3::NumberFormat::Double)
        }
        other => VariantOrUnknownOrEmpty::Unknown(other.to_string()),
    }
}

fn string_format(
    format: &str,
) -> VariantOrUnknownOrEmpty<openapiv3::StringFormat> {
    match format {
        "" => VariantOrUnknownOrEmpty::Empty,
        "date" => VariantOrUnknownOrEmpty::Item(openapiv3::StringFormat::Date),
        "date-time" => {
            VariantOrUnknownOrEmpty::Item(openapiv3::StringFormat::DateTime)
        }
        "password" => {
            VariantOrUnknownOrEmpty::Item(openapiv3::StringFormat::Password)
        }
        "byte" => VariantOrUnknownOrEmpty::Item(openapiv3::StringFormat::Byte),
        "binary" => {
            VariantOrUnknownOrEmpty::Item(openapiv3::StringFormat::Binary)
        }
        other => VariantOrUnknownOrEmpty::Unknown(other.to_string()),
    }
}

pub(crate) fn box_reference_or<T>(r: ReferenceOr<T>) -> ReferenceOr<Box<T>> {
    match r {
        ReferenceOr::Item(schema) => ReferenceOr::boxed_item(schema),
        ReferenceOr::Reference { reference } => {
            ReferenceOr::Reference { reference }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::data_type::DataType;
    use crate::describe::Describe;
    use crate::describe::FieldDescriptor;
    use crate::describe::TypeDescriptor;
    use crate::error::GenerationError;
    use crate::generator::Generator;
    use serde_json::json;
    use std::collections::HashMap;

    fn schema_json(generator: &mut Generator, ty: TypeDescriptor) -> serde_json::Value {
        let schema = generator.build_schema(&ty).unwrap();
        serde_json::to_value(schema).unwrap()
    }

    fn component(generator: &Generator, name: &str) -> serde_json::Value {
        let schema = &generator.api().components.as_ref().unwrap().schemas[name];
        serde_json::to_value(schema).unwrap()
    }

    #[test]
    fn test_primitives() {
        let mut generator = Generator::default();
        assert_eq!(
            schema_json(&mut generator, i8::describe()),
            json!({ "type": "integer", "format": "int32" })
        );
        assert_eq!(
            schema_json(&mut generator, usize::describe()),
            json!({ "type": "integer", "format": "int64" })
        );
        assert_eq!(
            schema_json(&mut generator, <Option<Option<f32>>>::describe()),
            json!({ "type": "number", "format": "float", "nullable": true })
        );
        assert_eq!(
            schema_json(&mut generator, std::time::Duration::describe()),
            json!({ "type": "string", "format": "duration" })
        );
        assert_eq!(
            schema_json(&mut generator, <[bool; 2]>::describe()),
            json!({
                "type": "array",
                "items": { "type": "boolean" },
                "minItems": 2,
                "maxItems": 2,
            })
        );
        assert_eq!(
            schema_json(&mut generator, <HashMap<String, u16>>::describe()),
            json!({
                "type": "object",
                "additionalProperties": { "type": "integer", "format": "int32" },
            })
        );
        assert!(generator.errors().is_empty());
    }

    #[test]
    fn test_unsupported() {
        let mut generator = Generator::default();
        assert!(generator.build_schema(&<Vec<*const u8>>::describe()).is_none());
        assert!(generator
            .build_schema(&<HashMap<String, fn() -> u8>>::describe())
            .is_none());
        assert_eq!(generator.errors().len(), 2);
        assert!(generator.errors().iter().all(|e| matches!(
            e,
            GenerationError::UnsupportedType { .. }
        )));

        let custom = u32::describe()
            .with_data_type(DataType::custom("widget", "shiny"));
        assert!(generator.build_schema(&custom).is_none());
        assert!(matches!(
            &generator.errors()[2],
            GenerationError::UnsupportedDataType { data_type, .. }
                if data_type == "widget (shiny)"
        ));
    }

    #[test]
    fn test_map_key_not_string() {
        let mut generator = Generator::default();
        assert_eq!(
            schema_json(&mut generator, <HashMap<u32, String>>::describe()),
            json!({ "type": "object" })
        );
        assert!(matches!(
            &generator.errors()[..],
            [GenerationError::MapKeyNotString { .. }]
        ));
    }

    #[test]
    fn test_override_data_type() {
        let mut generator = Generator::default();
        generator.override_data_type::<u64>(DataType::String);
        assert_eq!(
            schema_json(&mut generator, <Vec<u64>>::describe()),
            json!({ "type": "array", "items": { "type": "string" } })
        );
        assert_eq!(
            schema_json(
                &mut generator,
                String::describe().with_data_type(DataType::Password)
            ),
            json!({ "type": "string", "format": "password" })
        );
    }

    struct Tree;

    impl Describe for Tree {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::structure::<Tree>(vec![
                FieldDescriptor::new("label", String::describe)
                    .tag("json", "label")
                    .tag("validate", "required"),
                FieldDescriptor::new("children", <Vec<Tree>>::describe)
                    .tag("json", "children"),
                FieldDescriptor::new("parent", <Option<Box<Tree>>>::describe)
                    .tag("json", "parent")
                    .tag("description", "Enclosing tree"),
            ])
            .named("Tree")
        }
    }

    #[test]
    fn test_recursive_struct() {
        let mut generator = Generator::default();
        let first = schema_json(&mut generator, Tree::describe());
        assert_eq!(first, json!({ "$ref": "#/components/schemas/Tree" }));
        let second = schema_json(&mut generator, Tree::describe());
        assert_eq!(first, second);
        assert_eq!(generator.api().components.as_ref().unwrap().schemas.len(), 1);
        assert!(generator.errors().is_empty());

        assert_eq!(
            component(&generator, "Tree"),
            json!({
                "type": "object",
                "properties": {
                    "label": { "type": "string" },
                    "children": {
                        "type": "array",
                        "items": { "$ref": "#/components/schemas/Tree" },
                    },
                    "parent": {
                        "allOf": [{ "$ref": "#/components/schemas/Tree" }],
                        "nullable": true,
                        "description": "Enclosing tree",
                    },
                },
                "required": ["label"],
            })
        );
    }

    struct Node;

    impl Describe for Node {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::structure::<Node>(vec![
                FieldDescriptor::new("name", String::describe)
                    .tag("json", "name"),
                FieldDescriptor::new("children", <Vec<Node>>::describe)
                    .tag("json", "children"),
            ])
            .anonymous()
        }
    }

    #[test]
    fn test_recursive_inline_struct() {
        let mut generator = Generator::default();
        let schema = schema_json(&mut generator, Node::describe());
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": { "name": { "type": "string" } },
            })
        );
        assert!(generator.api().components.as_ref().unwrap().schemas.is_empty());
        assert!(matches!(
            &generator.errors()[..],
            [GenerationError::RecursiveInline { type_name }]
                if type_name.ends_with("Node")
        ));

        // Nothing is left marked in progress.
        schema_json(&mut generator, Node::describe());
        assert_eq!(generator.errors().len(), 2);
    }

    struct Settings;

    impl Describe for Settings {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::structure::<Settings>(vec![
                FieldDescriptor::new("color", String::describe)
                    .tag("enum", "red,green")
                    .tag("default", "red")
                    .tag("validate", "min=3,email")
                    .tag("format", "color"),
                FieldDescriptor::new("sizes", <Vec<u8>>::describe)
                    .tag("enum", "1,2,3")
                    .tag("validate", "max=2,dive,max=3"),
                FieldDescriptor::new("retries", u8::describe)
                    .tag("default", "300")
                    .tag("example", "5")
                    .tag("deprecated", "true"),
                FieldDescriptor::new("level", i8::describe)
                    .tag("enum", "1,x"),
                FieldDescriptor::new("id", u32::describe)
                    .tag("default", "1")
                    .tag("validate", "required"),
                FieldDescriptor::new("mail", String::describe)
                    .tag("validate", "email"),
            ])
            .anonymous()
        }
    }

    #[test]
    fn test_field_tags() {
        let mut generator = Generator::default();
        let schema = schema_json(&mut generator, Settings::describe());
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "color": {
                        "type": "string",
                        "format": "color",
                        "minLength": 3,
                        "enum": ["red", "green"],
                        "default": "red",
                    },
                    "sizes": {
                        "type": "array",
                        "items": {
                            "type": "integer",
                            "format": "int32",
                            "enum": [1, 2, 3],
                        },
                        "maxItems": 2,
                    },
                    "retries": {
                        "type": "integer",
                        "format": "int32",
                        "deprecated": true,
                        "example": 5,
                    },
                    "level": { "type": "integer", "format": "int32" },
                    "id": { "type": "integer", "format": "int32" },
                    "mail": { "type": "string", "format": "email" },
                },
                "required": ["id"],
            })
        );

        // Anonymous structs are never registered.
        assert!(generator.api().components.as_ref().unwrap().schemas.is_empty());

        let errors = generator.errors();
        assert_eq!(errors.len(), 3, "{:?}", errors);
        assert!(matches!(
            &errors[0],
            GenerationError::DefaultConversion { field, .. } if field == "retries"
        ));
        assert!(matches!(
            &errors[1],
            GenerationError::EnumConversion { field, .. } if field == "level"
        ));
        assert!(matches!(
            &errors[2],
            GenerationError::RequiredWithDefault { field, .. } if field == "id"
        ));
    }

    struct Stamp;

    impl Describe for Stamp {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::new::<Stamp>(crate::describe::Kind::String)
                .with_data_type(DataType::DateTime)
                .with_example_parser(|raw| match raw {
                    "now" => Ok(json!("2024-05-01T10:00:00Z")),
                    other => Err(format!("unknown stamp {:?}", other)),
                })
        }
    }

    struct Event;

    impl Describe for Event {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::structure::<Event>(vec![
                FieldDescriptor::new("at", Stamp::describe)
                    .tag("example", "now"),
                FieldDescriptor::new("until", Stamp::describe)
                    .tag("example", "later"),
                FieldDescriptor::new("after", std::time::Duration::describe)
                    .tag("example", "1h30m"),
            ])
            .anonymous()
        }
    }

    #[test]
    fn test_examples() {
        let mut generator = Generator::default();
        let schema = schema_json(&mut generator, Event::describe());
        assert_eq!(
            schema["properties"]["at"],
            json!({
                "type": "string",
                "format": "date-time",
                "example": "2024-05-01T10:00:00Z",
            })
        );
        assert_eq!(
            schema["properties"]["until"],
            json!({ "type": "string", "format": "date-time" })
        );
        assert_eq!(schema["properties"]["after"]["example"], "1h30m0s");

        let errors = generator.errors();
        assert_eq!(errors.len(), 1);
        let GenerationError::Example(error) = &errors[0] else {
            panic!("unexpected error {:?}", errors[0]);
        };
        assert_eq!(error.name, "until");
        assert_eq!(error.message, "unknown stamp \"later\"");
    }
}
