// Copyright 2025 Oxide Computer Company

//! Describing operations: turning an input type into parameters and a
//! request body, an output type into responses, and filing the result under
//! its path and method.

use crate::convert::parse_bool;
use crate::data_type::DataType;
use crate::describe::Describe;
use crate::describe::TypeRef;
use crate::error::AddOperationError;
use crate::error::GenerationError;
use crate::fields::extract_fields;
use crate::fields::ExtractMode;
use crate::fields::ExtractedField;
use crate::fields::Location;
use crate::fields::Placement;
use crate::fields::TAG_DEPRECATED;
use crate::fields::TAG_DESCRIPTION;
use crate::generator::Generator;
use indexmap::IndexMap;
use openapiv3::ReferenceOr;
use std::collections::BTreeSet;

/// Everything known about an operation besides its input and output types.
#[derive(Clone, Debug)]
pub struct OperationInfo {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    /// Status code of the response carrying the output type.
    pub status_code: u16,
    pub status_description: Option<String>,
    /// Headers of the response carrying the output type.
    pub headers: Vec<ResponseHeader>,
    /// Responses besides the one carrying the output type.
    pub responses: Vec<OperationResponse>,
    /// `Some(vec![])` documents an operation that needs no security,
    /// overriding any document-level requirement.
    pub security: Option<Vec<openapiv3::SecurityRequirement>>,
    /// Replaces the input type handed to
    /// [`Generator::add_operation()`].
    pub input_model: Option<TypeRef>,
    pub x_code_samples: Vec<XCodeSample>,
    pub x_internal: bool,
    pub extensions: IndexMap<String, serde_json::Value>,
}

impl OperationInfo {
    pub fn new(status_code: u16) -> Self {
        OperationInfo {
            id: None,
            summary: None,
            description: None,
            deprecated: false,
            status_code,
            status_description: None,
            headers: Vec::new(),
            responses: Vec::new(),
            security: None,
            input_model: None,
            x_code_samples: Vec::new(),
            x_internal: false,
            extensions: IndexMap::new(),
        }
    }

    pub fn id<T: ToString>(mut self, id: T) -> Self {
        self.id.replace(id.to_string());
        self
    }

    pub fn summary<T: ToString>(mut self, summary: T) -> Self {
        self.summary.replace(summary.to_string());
        self
    }

    pub fn description<T: ToString>(mut self, description: T) -> Self {
        self.description.replace(description.to_string());
        self
    }

    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    pub fn status_description<T: ToString>(mut self, description: T) -> Self {
        self.status_description.replace(description.to_string());
        self
    }

    pub fn header(mut self, header: ResponseHeader) -> Self {
        self.headers.push(header);
        self
    }

    pub fn response(mut self, response: OperationResponse) -> Self {
        self.responses.push(response);
        self
    }

    pub fn security(
        mut self,
        security: Vec<openapiv3::SecurityRequirement>,
    ) -> Self {
        self.security = Some(security);
        self
    }

    pub fn input_model(mut self, model: TypeRef) -> Self {
        self.input_model = Some(model);
        self
    }

    pub fn code_sample(mut self, sample: XCodeSample) -> Self {
        self.x_code_samples.push(sample);
        self
    }

    pub fn internal(mut self, internal: bool) -> Self {
        self.x_internal = internal;
        self
    }

    pub fn extension<K: ToString>(
        mut self,
        key: K,
        value: serde_json::Value,
    ) -> Self {
        self.extensions.insert(key.to_string(), value);
        self
    }
}

/// A header sent with a response.  Without a model it is documented as a
/// string.
#[derive(Clone, Debug)]
pub struct ResponseHeader {
    pub name: String,
    pub description: Option<String>,
    pub model: Option<TypeRef>,
}

impl ResponseHeader {
    pub fn new<S: ToString>(name: S) -> Self {
        ResponseHeader { name: name.to_string(), description: None, model: None }
    }

    pub fn description<T: ToString>(mut self, description: T) -> Self {
        self.description.replace(description.to_string());
        self
    }

    pub fn model(mut self, model: TypeRef) -> Self {
        self.model = Some(model);
        self
    }
}

/// An additional response of an operation.
#[derive(Clone, Debug)]
pub struct OperationResponse {
    /// `default`, a range such as `4XX`, or a status code.
    pub code: String,
    /// Defaults to the canonical reason of the status code.
    pub description: Option<String>,
    pub model: Option<TypeRef>,
    pub headers: Vec<ResponseHeader>,
    pub example: Option<serde_json::Value>,
    pub examples: IndexMap<String, openapiv3::Example>,
}

impl OperationResponse {
    pub fn new<S: ToString>(code: S) -> Self {
        OperationResponse {
            code: code.to_string(),
            description: None,
            model: None,
            headers: Vec::new(),
            example: None,
            examples: IndexMap::new(),
        }
    }

    pub fn description<T: ToString>(mut self, description: T) -> Self {
        self.description.replace(description.to_string());
        self
    }

    pub fn model(mut self, model: TypeRef) -> Self {
        self.model = Some(model);
        self
    }

    pub fn header(mut self, header: ResponseHeader) -> Self {
        self.headers.push(header);
        self
    }

    pub fn example(mut self, example: serde_json::Value) -> Self {
        self.example = Some(example);
        self
    }

    pub fn named_example<S: ToString>(
        mut self,
        name: S,
        example: openapiv3::Example,
    ) -> Self {
        self.examples.insert(name.to_string(), example);
        self
    }
}

/// A code sample, rendered in the `x-codeSamples` extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XCodeSample {
    pub lang: String,
    pub label: String,
    pub source: String,
}

/// Where a response goes in an operation's `responses`.
#[derive(Clone, Debug, PartialEq, Eq)]
enum ResponseKey {
    Default,
    Status(openapiv3::StatusCode),
}

impl ResponseKey {
    fn parse(code: &str) -> Option<ResponseKey> {
        if code == "default" {
            return Some(ResponseKey::Default);
        }
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !(b'1'..=b'5').contains(&bytes[0]) {
            return None;
        }
        let class = u16::from(bytes[0] - b'0');
        if bytes[1..].eq_ignore_ascii_case(b"XX") {
            return Some(ResponseKey::Status(openapiv3::StatusCode::Range(
                class,
            )));
        }
        match code.parse::<u16>() {
            Ok(n) => Some(ResponseKey::Status(openapiv3::StatusCode::Code(n))),
            Err(_) => None,
        }
    }
}

impl Generator {
    /**
     * Documents the operation `method path`.
     *
     * `path` uses colon-style placeholders (`/pets/:id`), which are rewritten
     * to the brace style of the document.  The fields of `input` become
     * parameters or request body properties according to their tags; the
     * body is dropped for GET, HEAD and DELETE.  `output` is the schema of
     * the response with `info.status_code`.
     *
     * Problems confined to part of the operation are recorded (see
     * [`Generator::errors()`]) and the rest of the operation is still
     * documented.  The errors returned here leave the document untouched.
     */
    pub fn add_operation(
        &mut self,
        path: &str,
        method: http::Method,
        tag: Option<&str>,
        input: Option<TypeRef>,
        output: Option<TypeRef>,
        info: &OperationInfo,
    ) -> Result<(), AddOperationError> {
        let path = rewrite_path(path);
        if !is_documented_method(&method) {
            return Err(AddOperationError::UnsupportedMethod {
                method: method.to_string(),
            });
        }
        if self.operation_exists(&path, &method) {
            return Err(AddOperationError::DuplicateOperation {
                path,
                method: method.to_string(),
            });
        }
        if let Some(response) = info
            .responses
            .iter()
            .find(|r| r.example.is_some() && !r.examples.is_empty())
        {
            return Err(AddOperationError::ExampleConflict {
                code: response.code.clone(),
            });
        }

        let fields = match info.input_model.or(input) {
            Some(input) => self.input_fields(&path, input)?,
            None => Vec::new(),
        };

        let op_name = match &info.id {
            Some(id) => id.clone(),
            None => format!("{} {}", method, path),
        };
        let mut operation = openapiv3::Operation {
            operation_id: info.id.clone(),
            summary: info.summary.clone(),
            description: info.description.clone(),
            tags: tag.map(|t| vec![t.to_string()]).unwrap_or_default(),
            deprecated: info.deprecated,
            security: info.security.clone(),
            extensions: info.extensions.clone(),
            ..Default::default()
        };
        if !info.x_code_samples.is_empty() {
            let samples = info
                .x_code_samples
                .iter()
                .map(|sample| {
                    serde_json::json!({
                        "lang": sample.lang,
                        "label": sample.label,
                        "source": sample.source,
                    })
                })
                .collect();
            operation
                .extensions
                .insert("x-codeSamples".to_string(), serde_json::Value::Array(samples));
        }
        if info.x_internal {
            operation
                .extensions
                .insert("x-internal".to_string(), serde_json::Value::Bool(true));
        }

        let allow_body = !matches!(
            method,
            http::Method::GET | http::Method::HEAD | http::Method::DELETE
        );
        let (parameters, body): (Vec<_>, Vec<_>) = fields
            .into_iter()
            .partition(|f| matches!(f.placement, Placement::Parameter { .. }));
        operation.parameters = self.parameters(parameters);
        if allow_body && !body.is_empty() {
            operation.request_body = Some(ReferenceOr::Item(self.request_body(&body)));
        }

        let mut default_response = OperationResponse::new(info.status_code);
        default_response.description = info.status_description.clone();
        default_response.model = output;
        default_response.headers = info.headers.clone();
        self.add_response(&mut operation.responses, &op_name, &default_response);
        for response in &info.responses {
            self.add_response(&mut operation.responses, &op_name, response);
        }

        slog::debug!(self.log, "added operation";
            "method" => %method,
            "path" => &path,
            "parameters" => operation.parameters.len(),
        );

        let item = self
            .api
            .paths
            .paths
            .entry(path)
            .or_insert_with(|| ReferenceOr::Item(openapiv3::PathItem::default()));
        if let ReferenceOr::Item(item) = item {
            if let Some(slot) = method_slot(item, &method) {
                *slot = Some(operation);
            }
        }
        Ok(())
    }

    fn operation_exists(&self, path: &str, method: &http::Method) -> bool {
        match self.api.paths.paths.get(path) {
            Some(ReferenceOr::Item(item)) => {
                let mut item = item.clone();
                method_slot(&mut item, method).is_some_and(|slot| slot.is_some())
            }
            Some(ReferenceOr::Reference { .. }) => true,
            None => false,
        }
    }

    /// Extracts the fields of an operation's input type.  Nothing is recorded
    /// unless the input is usable.  Path placeholders without a matching
    /// field (and the reverse) are recorded but do not stop the operation.
    fn input_fields(
        &mut self,
        path: &str,
        input: TypeRef,
    ) -> Result<Vec<ExtractedField>, AddOperationError> {
        let (ty, _) = input().strip_nullable();
        if !ty.is_struct() {
            return Err(AddOperationError::InputNotStruct {
                type_name: ty.rust_name().to_string(),
            });
        }

        let extraction = match extract_fields(
            &ty,
            ExtractMode::Input,
            self.config.serialization_tag(),
        ) {
            Ok(extraction) => extraction,
            Err(error) => {
                self.record(error.clone());
                return Err(match error {
                    GenerationError::ConflictingLocation { field, type_name } => {
                        AddOperationError::ConflictingLocation { field, type_name }
                    }
                    _ => AddOperationError::InputNotStruct {
                        type_name: ty.rust_name().to_string(),
                    },
                });
            }
        };

        let in_path = path_placeholders(path);
        let in_type = extraction
            .fields
            .iter()
            .filter_map(|f| match &f.placement {
                Placement::Parameter { location: Location::Path, name } => {
                    Some(name.clone())
                }
                _ => None,
            })
            .collect::<BTreeSet<_>>();
        for warning in extraction.warnings {
            self.record(warning);
        }
        if in_path != in_type {
            self.record(GenerationError::PathParameterMismatch {
                path: path.to_string(),
                type_name: ty.rust_name().to_string(),
                in_path: in_path.into_iter().collect(),
                in_type: in_type.into_iter().collect(),
            });
        }
        Ok(extraction.fields)
    }

    /// Documents parameter fields, ordered by location and then by name.
    fn parameters(
        &mut self,
        mut fields: Vec<ExtractedField>,
    ) -> Vec<ReferenceOr<openapiv3::Parameter>> {
        fields.sort_by_key(|f| match &f.placement {
            Placement::Parameter { location, name } => {
                (Some(*location), name.clone())
            }
            Placement::Body { name } => (None, name.clone()),
        });

        let mut parameters = Vec::new();
        for field in &fields {
            let Placement::Parameter { location, name } = &field.placement
            else {
                continue;
            };
            let Some(schema) = self.field_schema(field) else {
                continue;
            };
            let parameter_data = openapiv3::ParameterData {
                name: name.clone(),
                description: field
                    .field
                    .tag_value(TAG_DESCRIPTION)
                    .map(String::from),
                required: field.required,
                deprecated: field
                    .field
                    .tag_value(TAG_DEPRECATED)
                    .and_then(parse_bool)
                    .filter(|deprecated| *deprecated),
                format: openapiv3::ParameterSchemaOrContent::Schema(schema),
                example: None,
                examples: IndexMap::new(),
                extensions: IndexMap::new(),
                explode: None,
            };
            let parameter = match location {
                Location::Path => openapiv3::Parameter::Path {
                    parameter_data,
                    style: openapiv3::PathStyle::Simple,
                },
                Location::Query => {
                    let (inner, _) = field.ty.strip_nullable();
                    let flag = self.classify(&inner) == DataType::Boolean;
                    openapiv3::Parameter::Query {
                        parameter_data,
                        allow_reserved: false,
                        style: openapiv3::QueryStyle::Form,
                        allow_empty_value: flag.then_some(true),
                    }
                }
                Location::Header => openapiv3::Parameter::Header {
                    parameter_data,
                    style: openapiv3::HeaderStyle::Simple,
                },
            };
            parameters.push(ReferenceOr::Item(parameter));
        }
        parameters
    }

    fn request_body(&mut self, fields: &[ExtractedField]) -> openapiv3::RequestBody {
        let schema = self.properties_schema(fields);
        let mut content = IndexMap::new();
        content.insert(
            self.config.media_type.clone(),
            openapiv3::MediaType {
                schema: Some(ReferenceOr::Item(schema)),
                ..Default::default()
            },
        );
        openapiv3::RequestBody {
            content,
            required: fields.iter().any(|f| f.required),
            ..Default::default()
        }
    }

    /// Adds one response, recording an error and skipping it if its code is
    /// invalid or already taken.
    fn add_response(
        &mut self,
        responses: &mut openapiv3::Responses,
        op_name: &str,
        response: &OperationResponse,
    ) {
        let invalid = || GenerationError::InvalidStatusCode {
            operation: op_name.to_string(),
            code: response.code.clone(),
        };
        let Some(key) = ResponseKey::parse(&response.code) else {
            self.record(invalid());
            return;
        };
        let taken = match &key {
            ResponseKey::Default => responses.default.is_some(),
            ResponseKey::Status(code) => responses.responses.contains_key(code),
        };
        if taken {
            self.record(GenerationError::DuplicateResponse {
                operation: op_name.to_string(),
                code: response.code.clone(),
            });
            return;
        }

        let description = match (&response.description, &key) {
            (Some(description), _) => description.clone(),
            (None, ResponseKey::Status(openapiv3::StatusCode::Code(n))) => {
                match http::StatusCode::from_u16(*n)
                    .ok()
                    .and_then(|status| status.canonical_reason())
                {
                    Some(reason) => reason.to_string(),
                    None => {
                        self.record(invalid());
                        return;
                    }
                }
            }
            (None, _) => String::new(),
        };

        let mut content = IndexMap::new();
        let schema = response.model.and_then(|model| self.build_schema(&model()));
        if schema.is_some()
            || response.example.is_some()
            || !response.examples.is_empty()
        {
            content.insert(
                self.config.media_type.clone(),
                openapiv3::MediaType {
                    schema,
                    example: response.example.clone(),
                    examples: response
                        .examples
                        .iter()
                        .map(|(name, example)| {
                            (name.clone(), ReferenceOr::Item(example.clone()))
                        })
                        .collect(),
                    ..Default::default()
                },
            );
        }

        let mut headers = IndexMap::new();
        for header in &response.headers {
            let schema = match header.model {
                Some(model) => self.build_schema(&model()),
                None => self.build_schema(&String::describe()),
            };
            let Some(schema) = schema else {
                continue;
            };
            headers.insert(
                header.name.clone(),
                ReferenceOr::Item(openapiv3::Header {
                    description: header.description.clone(),
                    style: openapiv3::HeaderStyle::Simple,
                    required: false,
                    deprecated: None,
                    format: openapiv3::ParameterSchemaOrContent::Schema(schema),
                    example: None,
                    examples: IndexMap::new(),
                    extensions: IndexMap::new(),
                }),
            );
        }

        let item = ReferenceOr::Item(openapiv3::Response {
            description,
            headers,
            content,
            ..Default::default()
        });
        match key {
            ResponseKey::Default => responses.default = Some(item),
            ResponseKey::Status(code) => {
                responses.responses.insert(code, item);
            }
        }
    }
}

fn is_documented_method(method: &http::Method) -> bool {
    method_slot(&mut openapiv3::PathItem::default(), method).is_some()
}

fn method_slot<'a>(
    item: &'a mut openapiv3::PathItem,
    method: &http::Method,
) -> Option<&'a mut Option<openapiv3::Operation>> {
    match *method {
        http::Method::GET => Some(&mut item.get),
        http::Method::PUT => Some(&mut item.put),
        http::Method::POST => Some(&mut item.post),
        http::Method::DELETE => Some(&mut item.delete),
        http::Method::OPTIONS => Some(&mut item.options),
        http::Method::HEAD => Some(&mut item.head),
        http::Method::PATCH => Some(&mut item.patch),
        http::Method::TRACE => Some(&mut item.trace),
        _ => None,
    }
}

/// Rewrites `/:name` placeholders as `/{name}`.
pub fn rewrite_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn path_placeholders(path: &str) -> BTreeSet<String> {
    path.split('/')
        .filter_map(|segment| {
            segment.strip_prefix('{').and_then(|s| s.strip_suffix('}'))
        })
        .map(String::from)
        .collect()
}
