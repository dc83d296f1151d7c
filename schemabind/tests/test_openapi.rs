// Copyright 2025 Oxide Computer Company

//! Tests for documents generated from derived descriptors.

use http::Method;
use schemabind::AddOperationError;
use schemabind::Describe;
use schemabind::GenerationError;
use schemabind::Generator;
use schemabind::GeneratorConfig;
use schemabind::OperationInfo;
use schemabind::OperationResponse;
use schemabind::ResponseHeader;
use schemabind::XCodeSample;
use serde_json::json;
use std::collections::BTreeMap;
use std::collections::HashMap;

fn short_names() -> Generator {
    let config = GeneratorConfig { full_schema_names: false, ..Default::default() };
    Generator::new(config, schemabind::discard_logger())
}

#[derive(Default, Describe)]
pub struct GetThing {
    #[openapi(path = "a")]
    pub a: i64,
}

#[derive(Default, Describe)]
pub struct Thing {
    pub x: String,
    pub y: i64,
}

#[test]
fn test_path_parameter_and_response() {
    let mut generator = short_names();
    generator
        .add_operation(
            "/test/:a",
            Method::GET,
            None,
            Some(GetThing::describe),
            Some(Thing::describe),
            &OperationInfo::new(200),
        )
        .unwrap();
    assert!(generator.errors().is_empty(), "{:?}", generator.errors());

    let document = generator.json().unwrap();
    let operation = &document["paths"]["/test/{a}"]["get"];
    let parameters = operation["parameters"].as_array().unwrap();
    assert_eq!(parameters.len(), 1);
    assert_eq!(parameters[0]["name"], "a");
    assert_eq!(parameters[0]["in"], "path");
    assert_eq!(parameters[0]["required"], true);
    assert_eq!(
        parameters[0]["schema"],
        json!({ "type": "integer", "format": "int64" })
    );
    assert!(operation.get("requestBody").is_none());

    let response = &operation["responses"]["200"];
    assert_eq!(response["description"], "OK");
    assert_eq!(
        response["content"]["application/json"]["schema"],
        json!({ "$ref": "#/components/schemas/Thing" })
    );
    assert_eq!(
        document["components"]["schemas"]["Thing"],
        json!({
            "type": "object",
            "properties": {
                "x": { "type": "string" },
                "y": { "type": "integer", "format": "int64" },
            },
        })
    );
}

#[test]
fn test_duplicate_operation() {
    let mut generator = short_names();
    let first = OperationInfo::new(200).id("first");
    let second = OperationInfo::new(200).id("second");
    generator
        .add_operation("/things", Method::GET, None, None, None, &first)
        .unwrap();
    let error = generator
        .add_operation("/things", Method::GET, None, None, None, &second)
        .unwrap_err();
    assert_eq!(
        error,
        AddOperationError::DuplicateOperation {
            path: "/things".to_string(),
            method: "GET".to_string(),
        }
    );

    let document = generator.json().unwrap();
    assert_eq!(document["paths"]["/things"]["get"]["operationId"], "first");

    // Another method on the same path is a different operation.
    generator
        .add_operation("/things", Method::POST, None, None, None, &second)
        .unwrap();
    let document = generator.json().unwrap();
    assert_eq!(document["paths"]["/things"]["post"]["operationId"], "second");
}

#[derive(Default, Describe)]
pub struct Confused {
    #[openapi(path = "id", query = "id")]
    pub id: String,
}

#[test]
fn test_conflicting_location() {
    let mut generator = short_names();
    let error = generator
        .add_operation(
            "/things/:id",
            Method::GET,
            None,
            Some(Confused::describe),
            None,
            &OperationInfo::new(200),
        )
        .unwrap_err();
    assert!(matches!(
        error,
        AddOperationError::ConflictingLocation { ref field, .. } if field == "id"
    ));
    assert!(matches!(
        generator.errors(),
        [GenerationError::ConflictingLocation { .. }]
    ));
    assert!(generator.api().paths.paths.is_empty());
}

#[test]
fn test_path_mismatch() {
    let mut generator = short_names();
    generator
        .add_operation(
            "/things/:b",
            Method::GET,
            None,
            Some(GetThing::describe),
            None,
            &OperationInfo::new(200),
        )
        .unwrap();
    assert_eq!(
        generator.errors(),
        &[GenerationError::PathParameterMismatch {
            path: "/things/{b}".to_string(),
            type_name: std::any::type_name::<GetThing>().to_string(),
            in_path: vec!["b".to_string()],
            in_type: vec!["a".to_string()],
        }]
    );
    let document = generator.json().unwrap();
    let parameters = &document["paths"]["/things/{b}"]["get"]["parameters"];
    assert_eq!(parameters[0]["name"], "a");
    assert_eq!(parameters[0]["in"], "path");
}

#[derive(Default, Describe)]
pub struct Twins {
    #[openapi(json = "a")]
    pub first: String,
    #[openapi(json = "a")]
    pub second: i64,
    pub third: bool,
}

#[test]
fn test_duplicate_body_property() {
    let mut generator = short_names();
    generator.build_schema(&Twins::describe()).unwrap();
    let document = generator.json().unwrap();
    assert_eq!(
        document["components"]["schemas"]["Twins"]["properties"],
        json!({
            "a": { "type": "string" },
            "third": { "type": "boolean" },
        })
    );
    assert_eq!(
        generator.errors(),
        &[GenerationError::DuplicateBodyProperty {
            type_name: std::any::type_name::<Twins>().to_string(),
            name: "a".to_string(),
        }]
    );
}

#[test]
fn test_input_not_struct() {
    let mut generator = short_names();
    let error = generator
        .add_operation(
            "/count",
            Method::POST,
            None,
            Some(u32::describe),
            None,
            &OperationInfo::new(200),
        )
        .unwrap_err();
    assert_eq!(
        error,
        AddOperationError::InputNotStruct { type_name: "u32".to_string() }
    );
    assert!(generator.api().paths.paths.is_empty());
    assert!(generator.errors().is_empty());

    // The path is still free for a valid registration.
    let info = OperationInfo::new(200);
    generator
        .add_operation("/count", Method::POST, None, None, None, &info)
        .unwrap();
    assert_eq!(generator.api().paths.paths.len(), 1);
}

/// A node of an outline.
#[derive(Default, Describe)]
#[openapi(inline)]
pub struct Outline {
    pub title: String,
    pub children: Vec<Outline>,
}

#[test]
fn test_recursive_inline() {
    let mut generator = short_names();
    let schema = generator.build_schema(&Outline::describe()).unwrap();
    assert_eq!(
        serde_json::to_value(&schema).unwrap(),
        json!({
            "type": "object",
            "description": "A node of an outline.",
            "properties": { "title": { "type": "string" } },
        })
    );
    assert_eq!(
        generator.errors(),
        &[GenerationError::RecursiveInline {
            type_name: std::any::type_name::<Outline>().to_string(),
        }]
    );
}

#[derive(Default, Describe)]
pub struct Inventory {
    pub counts: HashMap<u32, String>,
    pub labels: BTreeMap<String, u8>,
}

#[test]
fn test_map_keys() {
    let mut generator = short_names();
    let schema = generator.build_schema(&Inventory::describe()).unwrap();
    assert_eq!(
        serde_json::to_value(&schema).unwrap(),
        json!({ "$ref": "#/components/schemas/Inventory" })
    );
    let document = generator.json().unwrap();
    let properties = &document["components"]["schemas"]["Inventory"]["properties"];
    assert_eq!(properties["counts"], json!({ "type": "object" }));
    assert_eq!(
        properties["labels"],
        json!({
            "type": "object",
            "additionalProperties": { "type": "integer", "format": "int32" },
        })
    );
    assert!(matches!(
        generator.errors(),
        [GenerationError::MapKeyNotString { .. }]
    ));
}

#[derive(Default, Describe)]
pub struct Filter {
    /// Colors to match.
    #[openapi(query = "color", enum = "red,green")]
    pub colors: Vec<String>,
    #[openapi(query = "size", enum = "5,300")]
    pub size: Option<u8>,
}

#[test]
fn test_enums() {
    let mut generator = short_names();
    generator
        .add_operation(
            "/things",
            Method::GET,
            None,
            Some(Filter::describe),
            None,
            &OperationInfo::new(200),
        )
        .unwrap();

    let document = generator.json().unwrap();
    let parameters = &document["paths"]["/things"]["get"]["parameters"];
    assert_eq!(parameters[0]["name"], "color");
    assert_eq!(parameters[0]["description"], "Colors to match.");
    assert_eq!(parameters[0]["schema"]["type"], "array");
    assert_eq!(
        parameters[0]["schema"]["items"],
        json!({ "type": "string", "enum": ["red", "green"] })
    );

    // 300 does not fit in a u8: the enum is dropped and the error recorded.
    assert_eq!(parameters[1]["name"], "size");
    assert!(parameters[1]["schema"].get("enum").is_none());
    assert!(matches!(
        generator.errors(),
        [GenerationError::EnumConversion { field, .. }] if field == "size"
    ));
}

#[derive(Default, Describe)]
pub struct Node {
    pub label: String,
    #[openapi(embed)]
    pub again: Option<Box<Node>>,
    pub children: Vec<Node>,
}

#[test]
fn test_recursion_terminates() {
    let mut generator = short_names();
    let first = generator.build_schema(&Node::describe()).unwrap();
    let snapshot = generator.json().unwrap();

    // Building the same type again changes nothing.
    let second = generator.build_schema(&Node::describe()).unwrap();
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
    assert_eq!(generator.json().unwrap(), snapshot);

    assert_eq!(
        snapshot["components"]["schemas"]["Node"],
        json!({
            "type": "object",
            "properties": {
                "label": { "type": "string" },
                "children": {
                    "type": "array",
                    "items": { "$ref": "#/components/schemas/Node" },
                },
            },
        })
    );
    assert!(matches!(
        generator.errors(),
        [GenerationError::RecursiveEmbedding { field, .. }] if field == "again"
    ));
}

/// A page of results.
#[derive(Default, Describe)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[openapi(description = "Token for the next page.")]
    pub next_page: Option<String>,
}

#[derive(Default, Describe)]
pub struct ListThings {
    #[openapi(query = "limit", default = 20, validate = "min=1,max=100")]
    pub limit: u32,
    #[openapi(header = "X-Request-Id,required")]
    pub request_id: String,
    #[openapi(query = "verbose")]
    pub verbose: bool,
}

#[derive(Default, Describe)]
pub struct CreateThing {
    #[openapi(path = "owner")]
    pub owner: String,
    #[openapi(validate = "required,max=64")]
    pub name: String,
    #[serde(rename = "size_in_bytes")]
    pub size: Option<u64>,
    #[serde(skip)]
    pub cached: bool,
    #[openapi(binding = "-")]
    pub computed: String,
}

#[test]
fn test_full_document() {
    let mut generator = short_names();
    generator.add_tag("things", Some("Things in the store".to_string()));
    generator
        .add_operation(
            "/things",
            Method::GET,
            Some("things"),
            Some(ListThings::describe),
            Some(<Page<Thing>>::describe),
            &OperationInfo::new(200)
                .id("listThings")
                .summary("List things")
                .header(
                    ResponseHeader::new("X-Total")
                        .description("Number of things")
                        .model(u64::describe),
                )
                .response(
                    OperationResponse::new("default")
                        .description("Unexpected error"),
                )
                .response(OperationResponse::new("5XX")),
        )
        .unwrap();
    generator
        .add_operation(
            "/owners/:owner/things",
            Method::POST,
            Some("things"),
            Some(CreateThing::describe),
            Some(Thing::describe),
            &OperationInfo::new(201)
                .id("createThing")
                .deprecated(true)
                .code_sample(XCodeSample {
                    lang: "shell".to_string(),
                    label: "curl".to_string(),
                    source: "curl -X POST /owners/me/things".to_string(),
                })
                .internal(true)
                .security(vec![])
                .response(
                    OperationResponse::new("409")
                        .example(json!({ "message": "exists" })),
                ),
        )
        .unwrap();
    assert!(generator.errors().is_empty(), "{:?}", generator.errors());

    let document = generator.json().unwrap();
    assert_eq!(document["openapi"], "3.0.3");
    assert_eq!(
        document["tags"],
        json!([{ "name": "things", "description": "Things in the store" }])
    );

    let list = &document["paths"]["/things"]["get"];
    assert_eq!(list["tags"], json!(["things"]));
    assert_eq!(list["summary"], "List things");
    let names = list["parameters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["limit", "verbose", "X-Request-Id"]);
    assert_eq!(
        list["parameters"][0]["schema"],
        json!({
            "type": "integer",
            "format": "int32",
            "minimum": 1,
            "maximum": 100,
            "default": 20,
        })
    );
    assert_eq!(list["parameters"][1]["allowEmptyValue"], true);
    assert_eq!(list["parameters"][2]["in"], "header");
    assert_eq!(list["parameters"][2]["required"], true);
    assert_eq!(
        list["responses"]["200"]["headers"]["X-Total"]["schema"],
        json!({ "type": "integer", "format": "int64" })
    );
    assert_eq!(
        list["responses"]["200"]["content"]["application/json"]["schema"],
        json!({ "$ref": "#/components/schemas/Page-Thing" })
    );
    assert_eq!(list["responses"]["default"]["description"], "Unexpected error");
    assert!(list["responses"]["5XX"].is_object());

    let page = &document["components"]["schemas"]["Page-Thing"];
    assert_eq!(page["description"], "A page of results.");
    assert_eq!(
        page["properties"]["next_page"],
        json!({
            "type": "string",
            "nullable": true,
            "description": "Token for the next page.",
        })
    );

    let create = &document["paths"]["/owners/{owner}/things"]["post"];
    assert_eq!(create["deprecated"], true);
    assert_eq!(create["security"], json!([]));
    assert_eq!(create["x-internal"], true);
    assert_eq!(create["x-codeSamples"][0]["lang"], "shell");
    assert_eq!(create["responses"]["201"]["description"], "Created");
    assert_eq!(
        create["responses"]["409"],
        json!({
            "description": "Conflict",
            "content": {
                "application/json": { "example": { "message": "exists" } },
            },
        })
    );
    assert_eq!(
        create["requestBody"],
        json!({
            "content": {
                "application/json": {
                    "schema": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string", "maxLength": 64 },
                            "size_in_bytes": {
                                "type": "integer",
                                "format": "int64",
                                "nullable": true,
                            },
                        },
                        "required": ["name"],
                    },
                },
            },
            "required": true,
        })
    );
}

#[test]
fn test_response_errors() {
    let mut generator = short_names();
    let info = OperationInfo::new(200)
        .id("getThing")
        .response(OperationResponse::new("200"))
        .response(OperationResponse::new("299"))
        .response(OperationResponse::new("OK"));
    generator
        .add_operation("/thing", Method::GET, None, None, None, &info)
        .unwrap();
    assert_eq!(
        generator.errors(),
        &[
            GenerationError::DuplicateResponse {
                operation: "getThing".to_string(),
                code: "200".to_string(),
            },
            GenerationError::InvalidStatusCode {
                operation: "getThing".to_string(),
                code: "299".to_string(),
            },
            GenerationError::InvalidStatusCode {
                operation: "getThing".to_string(),
                code: "OK".to_string(),
            },
        ]
    );

    let conflicting = OperationInfo::new(200).response(
        OperationResponse::new("404")
            .example(json!("missing"))
            .named_example(
                "gone",
                schemabind::openapiv3::Example {
                    value: Some(json!("gone")),
                    ..Default::default()
                },
            ),
    );
    let error = generator
        .add_operation("/other", Method::GET, None, None, None, &conflicting)
        .unwrap_err();
    assert_eq!(
        error,
        AddOperationError::ExampleConflict { code: "404".to_string() }
    );
}

mod first {
    use schemabind::Describe;

    #[derive(Describe)]
    pub struct Item {
        pub a: u8,
    }
}

mod second {
    use schemabind::Describe;

    #[derive(Describe)]
    #[openapi(rename = "SecondItem")]
    pub struct Item {
        pub b: u8,
    }
}

#[test]
fn test_component_names() {
    let mut generator = Generator::default();
    generator.build_schema(&first::Item::describe()).unwrap();
    generator.build_schema(&second::Item::describe()).unwrap();
    generator.build_schema(&Thing::describe()).unwrap();
    let schemas = &generator.api().components.as_ref().unwrap().schemas;
    let names = schemas.keys().map(String::as_str).collect::<Vec<_>>();
    assert_eq!(names, vec!["FirstItem", "SecondItem", "TestOpenapiThing"]);
    assert!(generator.errors().is_empty(), "{:?}", generator.errors());
}

#[test]
fn test_yaml() {
    let mut generator = short_names();
    generator
        .add_operation(
            "/test/:a",
            Method::GET,
            None,
            Some(GetThing::describe),
            Some(Thing::describe),
            &OperationInfo::new(200),
        )
        .unwrap();
    let yaml = generator.yaml().unwrap();
    let reparsed: serde_json::Value = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(reparsed, generator.json().unwrap());
}
