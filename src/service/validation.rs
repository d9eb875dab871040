//! Request body decoding and JSON-Schema (Draft 4) validation.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// One step in the location of an offending value: an object key or an array index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// One failed schema constraint.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub message: String,
    pub path: Vec<PathSegment>,
}

/// Malformed JSON in a request body. Distinct from a schema violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BodyDecodeError {
    pub message: String,
    /// Byte offset into the raw body.
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for BodyDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}, column {})", self.message, self.line, self.column)
    }
}

impl std::error::Error for BodyDecodeError {}

/// A Draft 4 schema compiled once at registration and shared across requests.
#[derive(Clone)]
pub struct JsonSchema {
    raw: Value,
    compiled: Arc<jsonschema::Validator>,
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema").field("raw", &self.raw).finish()
    }
}

impl JsonSchema {
    /// Compile a schema document. The error string is the compiler's message.
    pub fn compile(raw: Value) -> Result<Self, String> {
        let compiled = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft4)
            .build(&raw)
            .map_err(|e| e.to_string())?;
        Ok(Self {
            raw,
            compiled: Arc::new(compiled),
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// All violations, in the validator's traversal order. Empty means valid.
    pub fn validate(&self, value: &Value) -> Vec<ValidationIssue> {
        self.compiled
            .iter_errors(value)
            .map(|error| ValidationIssue {
                message: error.to_string(),
                path: pointer_to_path(value, &error.instance_path.to_string()),
            })
            .collect()
    }
}

/// Validate `value` against `schema`, reporting every violation.
pub fn validate(value: &Value, schema: &JsonSchema) -> Vec<ValidationIssue> {
    schema.validate(value)
}

/// Decode a raw request body into JSON.
pub fn decode_body(raw: &[u8]) -> Result<Value, BodyDecodeError> {
    serde_json::from_slice(raw).map_err(|e| BodyDecodeError {
        message: e.to_string(),
        position: byte_offset(raw, e.line(), e.column()),
        line: e.line(),
        column: e.column(),
    })
}

/// serde_json reports 1-based line and column; convert to a 0-based byte offset.
fn byte_offset(raw: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = raw
        .split(|b| *b == b'\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    (line_start + column.saturating_sub(1)).min(raw.len())
}

/// Split a JSON pointer into segments, typing each as an index when it addresses an array.
fn pointer_to_path(instance: &Value, pointer: &str) -> Vec<PathSegment> {
    let mut path = Vec::new();
    let mut current = Some(instance);
    for raw in pointer.split('/').skip(1) {
        let token = raw.replace("~1", "/").replace("~0", "~");
        match current {
            Some(Value::Array(items)) => match token.parse::<usize>() {
                Ok(i) => {
                    current = items.get(i);
                    path.push(PathSegment::Index(i));
                }
                Err(_) => {
                    current = None;
                    path.push(PathSegment::Key(token));
                }
            },
            Some(Value::Object(map)) => {
                current = map.get(&token);
                path.push(PathSegment::Key(token));
            }
            _ => {
                current = None;
                path.push(PathSegment::Key(token));
            }
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cat_schema() -> JsonSchema {
        JsonSchema::compile(json!({
            "type": "object",
            "properties": {
                "breed": {"type": "string"},
                "name": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["breed", "name"]
        }))
        .unwrap()
    }

    #[test]
    fn reports_every_missing_required_field() {
        let issues = validate(&json!({}), &cat_schema());
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.path.is_empty()));
        assert!(issues[0].message.contains("breed") || issues[1].message.contains("breed"));
        assert!(issues.iter().any(|i| i.message.contains("name")));
    }

    #[test]
    fn valid_document_has_no_issues() {
        let issues = validate(&json!({"breed": "tabby", "name": "muffins"}), &cat_schema());
        assert!(issues.is_empty());
    }

    #[test]
    fn nested_paths_type_array_indices() {
        let doc = json!({"breed": "tabby", "name": "muffins", "tags": ["ok", 7]});
        let issues = validate(&doc, &cat_schema());
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].path,
            vec![PathSegment::Key("tags".into()), PathSegment::Index(1)]
        );
    }

    #[test]
    fn numeric_object_keys_stay_keys() {
        let doc = json!({"10": {"a": 1}});
        assert_eq!(
            pointer_to_path(&doc, "/10/a"),
            vec![PathSegment::Key("10".into()), PathSegment::Key("a".into())]
        );
        assert_eq!(
            pointer_to_path(&json!({"a/b": 1}), "/a~1b"),
            vec![PathSegment::Key("a/b".into())]
        );
    }

    #[test]
    fn uncompilable_schema_is_rejected() {
        assert!(JsonSchema::compile(json!({"type": 12})).is_err());
    }

    #[test]
    fn decode_failure_locates_the_error() {
        let raw = b"{\n  \"name\": }";
        let err = decode_body(raw).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 11);
        assert_eq!(err.position, 12);
        assert_eq!(raw[err.position], b'}');
    }

    #[test]
    fn empty_body_is_a_decode_error() {
        let err = decode_body(b"").unwrap_err();
        assert_eq!(err.position, 0);
        assert!(err.message.contains("EOF"));
    }
}
