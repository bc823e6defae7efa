use hono_openapi_from_source::{
    cli::{generate, GenerateConfig},
    detector::FrameworkDetector,
    extractor::{routes::HonoExtractor, HttpMethod, RouteExtractor},
    openapi_builder::OpenApiBuilder,
    parser::{AstParser, ParsedFile},
    scanner::FileScanner,
    serializer::{serialize_json, serialize_yaml},
    type_resolver::TypeResolver,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

/// Helper function to create a temporary test project
fn create_test_project(files: Vec<(&str, &str)>) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&file_path, content).expect("Failed to write test file");
    }

    temp_dir
}

fn parse(name: &str, code: &str) -> ParsedFile {
    AstParser::parse_source(Path::new(name), code).expect("Failed to parse source")
}

fn document(files: &[ParsedFile]) -> Value {
    serde_json::to_value(generate(files, &GenerateConfig::default())).unwrap()
}

/// Schema of the 200 response of `method` on `path` for `media_type`.
fn ok_schema<'d>(doc: &'d Value, path: &str, method: &str, media_type: &str) -> &'d Value {
    &doc["paths"][path][method]["responses"]["200"]["content"][media_type]["schema"]
}

fn fixture_document() -> Value {
    document(&[parse("src/index.ts", include_str!("fixtures/hono_app.ts"))])
}

#[test]
fn test_end_to_end_single_route() {
    let files = [parse(
        "index.ts",
        "app.get('/:id', ctx => ctx.json({ user: ctx.req.param('id') }))",
    )];
    let doc = document(&files);

    assert_eq!(
        doc["paths"]["/{id}"]["get"],
        json!({
            "parameters": [
                {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}
            ],
            "responses": {
                "200": {
                    "description": "OK",
                    "content": {
                        "application/json": {
                            "schema": {
                                "type": "object",
                                "properties": {"user": {"type": "string"}},
                                "required": ["user"]
                            }
                        }
                    }
                }
            }
        })
    );
}

#[test]
fn test_fixture_end_to_end_generation() {
    let temp_dir = create_test_project(vec![
        ("src/index.ts", include_str!("fixtures/hono_app.ts")),
        ("src/broken.ts", "app.get('/broken', (c => {"),
        ("node_modules/hono/dist/index.js", "export class Hono {}"),
    ]);

    // Step 1: Scan directory
    let scan_result = FileScanner::new(vec![temp_dir.path().to_string_lossy().into_owned()])
        .scan()
        .expect("Failed to scan directory");
    assert_eq!(scan_result.files.len(), 2, "node_modules must be skipped");

    // Step 2: Parse files, the broken one is skipped
    let parsed_files: Vec<_> = AstParser::parse_files(&scan_result.files)
        .into_iter()
        .filter_map(Result::ok)
        .collect();
    assert_eq!(parsed_files.len(), 1);

    // Step 3: Detect framework usage
    let detection = FrameworkDetector::detect(&parsed_files);
    assert_eq!(detection.framework_files.len(), 1);

    // Step 4: Extract routes
    let type_resolver = TypeResolver::new(&parsed_files);
    let routes = HonoExtractor::new(&type_resolver).extract_routes(&parsed_files);
    let summary: Vec<(HttpMethod, &str)> =
        routes.iter().map(|r| (r.method, r.path.as_str())).collect();
    assert_eq!(
        summary,
        vec![
            (HttpMethod::Get, "/health"),
            (HttpMethod::Get, "/users/:id"),
            (HttpMethod::Post, "/users"),
            (HttpMethod::Get, "/users"),
            (HttpMethod::Delete, "/users/:id"),
            (HttpMethod::Get, "/legacy"),
        ]
    );

    // Step 5: Build and serialize
    let mut builder = OpenApiBuilder::new();
    builder.add_routes(&routes);
    let doc = builder.build();

    let yaml = serialize_yaml(&doc).expect("Failed to serialize to YAML");
    assert!(yaml.contains("/users/{id}:"));
    let json = serialize_json(&doc).expect("Failed to serialize to JSON");
    let parsed: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["openapi"], "3.0.0");
    assert_eq!(parsed["paths"].as_object().unwrap().len(), 4);
}

#[test]
fn test_multi_status_responses() {
    let doc = fixture_document();
    let responses = doc["paths"]["/users"]["post"]["responses"].as_object().unwrap();
    let statuses: Vec<&String> = responses.keys().collect();
    assert_eq!(statuses, vec!["201", "422"]);
    assert_eq!(responses["201"]["description"], "Created");
    assert_eq!(
        responses["422"]["content"]["application/json"]["schema"],
        json!({
            "type": "object",
            "properties": {"error": {"type": "string"}},
            "required": ["error"]
        })
    );
}

#[test]
fn test_validated_request_body() {
    let doc = fixture_document();
    assert_eq!(
        doc["paths"]["/users"]["post"]["requestBody"],
        json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "email": {"type": "string"},
                            "tags": {"type": "array", "items": {"type": "string"}}
                        },
                        "required": ["name", "tags"]
                    }
                }
            }
        })
    );
}

#[test]
fn test_query_parameters() {
    let doc = fixture_document();
    assert_eq!(
        doc["paths"]["/users"]["get"]["parameters"],
        json!([
            {"name": "page", "in": "query", "required": true, "schema": {"type": "string"}},
            {"name": "q", "in": "query", "required": false, "schema": {"type": "string"}},
            {"name": "size", "in": "query", "required": false, "schema": {"type": "string"}}
        ])
    );
}

#[test]
fn test_recursive_type_and_nullable_collapse() {
    let doc = fixture_document();
    let schema = ok_schema(&doc, "/users/{id}", "get", "application/json");

    assert_eq!(schema["required"], json!(["id", "manager", "name", "roles"]));
    assert_eq!(schema["properties"]["email"], json!({"type": "string"}));
    assert_eq!(
        schema["properties"]["roles"],
        json!({"type": "array", "items": {"type": "string"}})
    );
    assert_eq!(
        schema["properties"]["manager"],
        json!({"description": "...recursive...", "nullable": true})
    );
}

#[test]
fn test_nullable_union_of_one_type() {
    let files = [parse(
        "index.ts",
        r#"
            type Lookup = { hit: string | undefined; score: number | null }
            app.get('/lookup', (c) => {
                const result: Lookup = find()
                return c.json(result)
            })
        "#,
    )];
    let doc = document(&files);
    let schema = ok_schema(&doc, "/lookup", "get", "application/json");
    assert_eq!(schema["properties"]["hit"], json!({"type": "string", "nullable": true}));
    assert_eq!(schema["properties"]["score"], json!({"type": "number", "nullable": true}));
}

#[test]
fn test_no_content_and_legacy_responses() {
    let doc = fixture_document();
    assert_eq!(
        doc["paths"]["/users/{id}"]["delete"]["responses"],
        json!({"204": {"description": "No Content"}})
    );
    assert_eq!(
        *ok_schema(&doc, "/legacy", "get", "application/json"),
        json!({"type": "array", "items": {"type": "string"}})
    );
    assert_eq!(
        *ok_schema(&doc, "/health", "get", "text/plain"),
        json!({"type": "string"})
    );
}

#[test]
fn test_empty_input_yields_empty_paths() {
    let files = [parse("util.ts", "export const add = (a: number, b: number) => a + b")];
    let doc = document(&files);
    assert_eq!(doc["paths"], json!({}));

    let doc = document(&[]);
    assert_eq!(doc["paths"], json!({}));
}

#[test]
fn test_generation_is_idempotent() {
    let first = serialize_json(&generate(
        &[parse("src/index.ts", include_str!("fixtures/hono_app.ts"))],
        &GenerateConfig::default(),
    ))
    .unwrap();
    let second = serialize_json(&generate(
        &[parse("src/index.ts", include_str!("fixtures/hono_app.ts"))],
        &GenerateConfig::default(),
    ))
    .unwrap();
    assert_eq!(first, second);
}
