//! Parse resource descriptions from in-memory values, YAML text, files, or a directory.

use crate::config::resolved::{NamedDefinition, ResourceDefinition};
use crate::config::types::*;
use crate::error::DefinitionError;
use crate::service::JsonSchema;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;

const IDENTIFIER_SEGMENT: &str = r"^/\{([A-Za-z_][A-Za-z0-9_\-]*)\}$";
const DESCRIPTION_EXTENSIONS: &[&str] = &["raml", "yaml", "yml"];

/// Build a resource definition from a parsed description.
pub fn parse(description: &Value) -> Result<ResourceDefinition, DefinitionError> {
    let collection: ResourceNode = serde_json::from_value(description.clone())
        .map_err(|e| DefinitionError::Load(format!("description must be a mapping: {}", e)))?;

    let collection_type = collection
        .type_
        .as_ref()
        .ok_or_else(|| DefinitionError::UnsupportedCollectionType("<none>".into()))?;
    let collection_params = match (
        collection_type.params_for(COLLECTION),
        collection_type.params_for(READ_ONLY_COLLECTION),
    ) {
        (Some(params), _) => Some(params),
        (None, Some(_)) => None,
        (None, None) => {
            return Err(DefinitionError::UnsupportedCollectionType(
                collection_type.declared(),
            ))
        }
    };

    let re = Regex::new(IDENTIFIER_SEGMENT).map_err(|e| DefinitionError::Load(e.to_string()))?;
    let (bracketed, others): (Vec<&str>, Vec<&str>) = collection
        .sub_paths()
        .into_iter()
        .partition(|p| re.is_match(p));
    let sub_path = match (bracketed.as_slice(), others.first()) {
        ([only], None) => *only,
        ([_], Some(extra)) => return Err(DefinitionError::UnexpectedSubPath(extra.to_string())),
        ([], Some(malformed)) => {
            return Err(DefinitionError::IdentifierPathShape(malformed.to_string()))
        }
        (many, _) => return Err(DefinitionError::IdentifierPathCount(many.len())),
    };
    let identifier_field = identifier_from_segment(&re, sub_path)?;

    let item_value = collection.rest.get(sub_path).cloned().unwrap_or(Value::Null);
    let item: ResourceNode = match item_value {
        Value::Null => ResourceNode {
            type_: None,
            rest: Map::new(),
        },
        other => serde_json::from_value(other)
            .map_err(|e| DefinitionError::Load(format!("item node {}: {}", sub_path, e)))?,
    };
    let item_type = item
        .type_
        .as_ref()
        .ok_or_else(|| DefinitionError::UnsupportedItemType("<none>".into()))?;
    let item_params = match (
        item_type.params_for(COLLECTION_ITEM),
        item_type.params_for(READ_ONLY_COLLECTION_ITEM),
    ) {
        (Some(params), _) => Some(params),
        (None, Some(_)) => None,
        (None, None) => return Err(DefinitionError::UnsupportedItemType(item_type.declared())),
    };

    let create_schema = collection_params
        .map(|params| schema_field(&params, NEW_ITEM_SCHEMA))
        .transpose()?;
    let update_schema = item_params
        .map(|params| schema_field(&params, UPDATE_ITEM_SCHEMA))
        .transpose()?;

    Ok(ResourceDefinition::new(
        create_schema,
        update_schema,
        identifier_field,
    ))
}

/// Parse a YAML (or RAML) document, then [`parse`] it.
pub fn from_yaml_str(source: &str) -> Result<ResourceDefinition, DefinitionError> {
    let value: Value =
        serde_yaml::from_str(source).map_err(|e| DefinitionError::Load(e.to_string()))?;
    parse(&value)
}

pub fn from_file(path: impl AsRef<Path>) -> Result<ResourceDefinition, DefinitionError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .map_err(|e| DefinitionError::Load(format!("{}: {}", path.display(), e)))?;
    from_yaml_str(&source)
}

impl ResourceDefinition {
    pub fn parse(description: &Value) -> Result<Self, DefinitionError> {
        parse(description)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, DefinitionError> {
        from_yaml_str(source)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DefinitionError> {
        from_file(path)
    }
}

/// Load every `.raml`/`.yaml`/`.yml` file in `dir`. Base path is `/` + file stem.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<NamedDefinition>, DefinitionError> {
    let dir = dir.as_ref();
    tracing::info!(dir = %dir.display(), "loading resource descriptions");
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| DefinitionError::Load(format!("{}: {}", dir.display(), e)))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect();
    entries.sort();

    let mut out = Vec::new();
    for path in entries {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if path.is_dir() {
            tracing::info!(file = %file_name, "skipping directory");
            continue;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !DESCRIPTION_EXTENSIONS.contains(&ext) {
            tracing::info!(file = %file_name, "skipping file without description extension");
            continue;
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!(file = %file_name, "loading");
        let definition = from_file(&path)?;
        out.push(NamedDefinition {
            base_path: format!("/{}", name),
            name,
            definition,
        });
    }
    Ok(out)
}

fn identifier_from_segment(re: &Regex, segment: &str) -> Result<String, DefinitionError> {
    re.captures(segment)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| DefinitionError::IdentifierPathShape(segment.to_string()))
}

/// A schema field is a JSON-encoded string, or an inline mapping used as-is.
fn schema_field(params: &Map<String, Value>, field: &'static str) -> Result<JsonSchema, DefinitionError> {
    let raw = match params.get(field) {
        Some(Value::String(s)) => serde_json::from_str(s).map_err(|e| DefinitionError::SchemaJson {
            field,
            message: e.to_string(),
        })?,
        Some(v @ Value::Object(_)) => v.clone(),
        _ => return Err(DefinitionError::MissingSchema(field)),
    };
    JsonSchema::compile(raw).map_err(|message| DefinitionError::InvalidSchema { field, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceKind;
    use serde_json::json;

    const CATS: &str = r#"
#%RAML 1.0
type:
  collection:
    newItemSchema: |
      {"type": "object",
       "properties": {"breed": {"type": "string"}, "name": {"type": "string"}},
       "required": ["breed", "name"]}
/{catId}:
  type:
    collection-item:
      updateItemSchema: '{"type": "object", "properties": {"name": {"type": "string"}}}'
"#;

    #[test]
    fn parses_writable_collection() {
        let def = from_yaml_str(CATS).unwrap();
        assert_eq!(def.kind(), ResourceKind::Writable);
        assert_eq!(def.item_kind(), ResourceKind::Writable);
        assert_eq!(def.identifier_field(), "catId");
        assert_eq!(def.create_schema().unwrap().raw()["required"], json!(["breed", "name"]));
        assert!(def.update_schema().is_some());
    }

    #[test]
    fn parses_read_only_collection() {
        let def = parse(&json!({
            "type": "read-only-collection",
            "/{id}": {"type": "read-only-collection-item"}
        }))
        .unwrap();
        assert_eq!(def.kind(), ResourceKind::ReadOnly);
        assert_eq!(def.item_kind(), ResourceKind::ReadOnly);
        assert!(def.create_schema().is_none());
        assert!(def.update_schema().is_none());
        assert_eq!(def.identifier_field(), "id");
    }

    #[test]
    fn read_only_collection_with_writable_items() {
        let def = parse(&json!({
            "type": {"read-only-collection": {}},
            "/{id}": {"type": {"collection-item": {"updateItemSchema": {"type": "object"}}}}
        }))
        .unwrap();
        assert_eq!(def.kind(), ResourceKind::ReadOnly);
        assert_eq!(def.item_kind(), ResourceKind::Writable);
    }

    #[test]
    fn rejects_unknown_collection_type() {
        let err = parse(&json!({"type": "things", "/{id}": {"type": "collection-item"}})).unwrap_err();
        assert!(matches!(err, DefinitionError::UnsupportedCollectionType(_)));
        let err = parse(&json!({"/{id}": {"type": "collection-item"}})).unwrap_err();
        assert!(matches!(err, DefinitionError::UnsupportedCollectionType(_)));
    }

    #[test]
    fn rejects_unknown_item_type() {
        let err = parse(&json!({
            "type": "read-only-collection",
            "/{id}": {"type": "collection"}
        }))
        .unwrap_err();
        assert!(matches!(err, DefinitionError::UnsupportedItemType(_)));
    }

    #[test]
    fn requires_exactly_one_identifier_sub_path() {
        let err = parse(&json!({"type": "read-only-collection"})).unwrap_err();
        assert!(matches!(err, DefinitionError::IdentifierPathCount(0)));
        let err = parse(&json!({
            "type": "read-only-collection",
            "/{id}": {"type": "read-only-collection-item"},
            "/{other}": {"type": "read-only-collection-item"}
        }))
        .unwrap_err();
        assert!(matches!(err, DefinitionError::IdentifierPathCount(2)));
    }

    #[test]
    fn sibling_paths_are_named_in_the_error() {
        let err = parse(&json!({
            "type": "read-only-collection",
            "/{id}": {"type": "read-only-collection-item"},
            "/search": {"type": "read-only-collection-item"}
        }))
        .unwrap_err();
        assert!(matches!(err, DefinitionError::UnexpectedSubPath(ref p) if p == "/search"));
    }

    #[test]
    fn identifier_segment_must_be_bracketed() {
        for seg in ["/id", "/{id}/more", "/{}", "/{a}{b}"] {
            let err = parse(&json!({
                "type": "read-only-collection",
                seg: {"type": "read-only-collection-item"}
            }))
            .unwrap_err();
            assert!(matches!(err, DefinitionError::IdentifierPathShape(_)), "{}", seg);
        }
    }

    #[test]
    fn writable_kinds_need_parsable_schemas() {
        let err = parse(&json!({
            "type": "collection",
            "/{id}": {"type": "read-only-collection-item"}
        }))
        .unwrap_err();
        assert!(matches!(err, DefinitionError::MissingSchema(NEW_ITEM_SCHEMA)));

        let err = parse(&json!({
            "type": {"collection": {"newItemSchema": "{not json"}},
            "/{id}": {"type": "read-only-collection-item"}
        }))
        .unwrap_err();
        assert!(matches!(err, DefinitionError::SchemaJson { field: NEW_ITEM_SCHEMA, .. }));

        let err = parse(&json!({
            "type": "read-only-collection",
            "/{id}": {"type": {"collection-item": {}}}
        }))
        .unwrap_err();
        assert!(matches!(err, DefinitionError::MissingSchema(UPDATE_ITEM_SCHEMA)));
    }

    #[test]
    fn loads_a_directory_of_descriptions() {
        let dir = std::env::temp_dir().join(format!("schema-resource-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("cats.raml"), CATS).unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();
        let loaded = load_dir(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "cats");
        assert_eq!(loaded[0].base_path, "/cats");
    }
}
