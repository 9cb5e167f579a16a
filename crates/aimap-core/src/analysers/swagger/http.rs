//! `.http` request templates, one file per tag.

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::{ApiSpec, Endpoint, Schema, MAX_REF_DEPTH};
use crate::error::Result;

/// Lowercase, with spaces and slashes turned into dashes.
pub fn sanitize_tag(tag: &str) -> String {
    tag.to_lowercase().replace([' ', '/'], "-")
}

/// Write every tag's template under `out_dir`; returns the files written.
pub fn write_files(spec: &ApiSpec, out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();
    for (tag, endpoints) in spec.endpoints_by_tag() {
        let path = out_dir.join(format!("{}.http", sanitize_tag(&tag)));
        fs::write(&path, render_file(spec, &tag, &endpoints))?;
        log::debug!("wrote {} ({} requests)", path.display(), endpoints.len());
        written.push(path);
    }
    Ok(written)
}

pub fn render_file(spec: &ApiSpec, tag: &str, endpoints: &[Endpoint<'_>]) -> String {
    let mut out = format!("### {} Endpoints\n\n", tag);
    let _ = writeln!(out, "@baseUrl = {}", spec.base_url());
    out.push_str("@authToken = {{$dotenv AUTH_TOKEN}}\n\n");

    for endpoint in endpoints {
        let op = endpoint.operation;
        if let Some(title) = op.description.as_ref().or(op.summary.as_ref()) {
            let _ = writeln!(out, "### {}", title.lines().next().unwrap_or_default());
        }
        let _ = writeln!(out, "# @name {}", endpoint.name());

        let _ = write!(
            out,
            "{} {{{{baseUrl}}}}{}",
            endpoint.method.to_uppercase(),
            endpoint.path
        );
        let query = query_string(endpoint);
        if !query.is_empty() {
            let _ = write!(out, "?{}", query);
        }
        out.push('\n');

        out.push_str("Content-Type: application/json\n");
        if op.security.as_ref().map_or(true, |s| !s.is_empty()) {
            out.push_str("Authorization: Bearer {{authToken}}\n");
        }

        if let Some(body) = request_body(spec, endpoint) {
            out.push('\n');
            out.push_str(&body);
            out.push('\n');
        }
        out.push_str("\n###\n\n");
    }
    out
}

fn query_string(endpoint: &Endpoint<'_>) -> String {
    endpoint
        .parameters()
        .filter(|p| p.location == "query")
        .map(|p| {
            let example = p
                .example
                .as_ref()
                .or_else(|| p.schema.as_ref().and_then(|s| s.example.as_ref()));
            match example {
                Some(Value::String(s)) => format!("{}={}", p.name, s),
                Some(v) => format!("{}={}", p.name, v),
                None => format!("{}={{{{{}}}}}", p.name, p.name),
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// JSON body from the declared example, else one synthesised from the schema.
pub fn request_body(spec: &ApiSpec, endpoint: &Endpoint<'_>) -> Option<String> {
    let value = if let Some(body) = &endpoint.operation.request_body {
        let (_, media) = body.content.iter().find(|(ct, _)| ct.contains("json"))?;
        match (&media.example, &media.schema) {
            (Some(example), _) => example.clone(),
            (None, Some(schema)) => example_value(spec, schema, 0),
            (None, None) => Value::Object(Map::new()),
        }
    } else {
        let param = endpoint.parameters().find(|p| p.location == "body")?;
        match &param.schema {
            Some(schema) => example_value(spec, schema, 0),
            None => Value::Object(Map::new()),
        }
    };
    serde_json::to_string_pretty(&value).ok()
}

/// Example JSON for a schema; `$ref` chains deeper than the limit yield `null`.
pub fn example_value(spec: &ApiSpec, schema: &Schema, depth: usize) -> Value {
    if let Some(reference) = &schema.reference {
        if depth >= MAX_REF_DEPTH {
            return Value::Null;
        }
        return match spec.resolve(reference) {
            Some(target) => example_value(spec, target, depth + 1),
            None => {
                log::warn!("unresolved schema reference {}", reference);
                Value::Null
            }
        };
    }
    if let Some(example) = &schema.example {
        return example.clone();
    }
    if let Some(first) = schema.enumeration.first() {
        return first.clone();
    }

    match schema.schema_type.as_deref() {
        Some("object") | None if !schema.properties.is_empty() => Value::Object(
            schema
                .properties
                .iter()
                .map(|(name, prop)| (name.clone(), example_value(spec, prop, depth)))
                .collect(),
        ),
        Some("object") => Value::Object(Map::new()),
        Some("array") => Value::Array(
            schema
                .items
                .as_deref()
                .map(|items| vec![example_value(spec, items, depth)])
                .unwrap_or_default(),
        ),
        Some("string") => Value::String(
            match schema.format.as_deref() {
                Some("date-time") => "2024-01-01T00:00:00Z",
                Some("date") => "2024-01-01",
                Some("email") => "user@example.com",
                Some("uuid") => "00000000-0000-0000-0000-000000000000",
                _ => "string",
            }
            .to_string(),
        ),
        Some("integer") | Some("number") => Value::from(0),
        Some("boolean") => Value::Bool(false),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SPEC: &str = r##"{
        "openapi": "3.0.0",
        "servers": [{ "url": "https://api.example.com" }],
        "paths": {
            "/users": {
                "get": {
                    "tags": ["User Admin"],
                    "summary": "List users",
                    "parameters": [
                        { "name": "page", "in": "query", "schema": { "type": "integer", "example": 2 } },
                        { "name": "q", "in": "query" }
                    ]
                },
                "post": {
                    "tags": ["User Admin"],
                    "operationId": "createUser",
                    "security": [],
                    "requestBody": {
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/User" } }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "User": {
                    "type": "object",
                    "properties": {
                        "email": { "type": "string", "format": "email" },
                        "roles": { "type": "array", "items": { "type": "string", "enum": ["admin", "user"] } },
                        "manager": { "$ref": "#/components/schemas/User" }
                    }
                }
            }
        }
    }"##;

    #[test]
    fn tag_file_names() {
        assert_eq!(sanitize_tag("User Admin"), "user-admin");
        assert_eq!(sanitize_tag("v1/Pets"), "v1-pets");
    }

    #[test]
    fn request_blocks() {
        let spec = ApiSpec::parse(SPEC).unwrap();
        let groups = spec.endpoints_by_tag();
        let out = render_file(&spec, "User Admin", &groups["User Admin"]);

        assert!(out.starts_with("### User Admin Endpoints\n\n@baseUrl = https://api.example.com\n"));
        assert!(out.contains(
            "### List users\n# @name get_users\nGET {{baseUrl}}/users?page=2&q={{q}}\nContent-Type: application/json\nAuthorization: Bearer {{authToken}}\n\n###\n"
        ));
        assert!(out.contains("# @name createUser\nPOST {{baseUrl}}/users\nContent-Type: application/json\n\n{"));
    }

    #[test]
    fn recursive_refs_stop_at_depth_limit() {
        let spec = ApiSpec::parse(SPEC).unwrap();
        let schema = Schema {
            reference: Some("#/components/schemas/User".into()),
            ..Default::default()
        };
        let value = example_value(&spec, &schema, 0);
        assert_eq!(value["email"], json!("user@example.com"));
        assert_eq!(value["roles"], json!(["admin"]));

        let mut depth = 0;
        let mut cursor = &value;
        while let Some(next) = cursor.get("manager") {
            if next.is_null() {
                break;
            }
            cursor = next;
            depth += 1;
        }
        assert_eq!(depth, MAX_REF_DEPTH - 1);
    }

    #[test]
    fn swagger2_body_parameter() {
        let spec = ApiSpec::parse(
            r##"{"swagger": "2.0", "paths": {"/pets": {"post": {"parameters": [
                {"name": "pet", "in": "body", "schema": {"type": "object", "properties": {"name": {"type": "string"}}}}
            ]}}}}"##,
        )
        .unwrap();
        let endpoints = spec.endpoints();
        assert_eq!(
            request_body(&spec, &endpoints[0]).as_deref(),
            Some("{\n  \"name\": \"string\"\n}")
        );
    }

    #[test]
    fn writes_one_file_per_tag() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ApiSpec::parse(SPEC).unwrap();
        let files = write_files(&spec, &dir.path().join("http-client")).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("user-admin.http"));
    }
}
