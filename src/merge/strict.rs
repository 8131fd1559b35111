//! Strict field recognition for overlay documents.
//!
//! The documents are checked against the JSON schema `k8s-openapi` publishes
//! for the target kind. Deserializing straight into the typed object would
//! silently ignore unknown keys.

use schemars::{
    gen::SchemaSettings,
    schema::{RootSchema, Schema, SchemaObject, SingleOrVec},
    JsonSchema,
};
use serde_json::Value;

/// Dotted paths of every field in `document` the schema of `K` does not know.
pub fn unknown_fields<K: JsonSchema>(document: &Value) -> Vec<String> {
    let settings = SchemaSettings::draft07();
    let definitions_path = settings.definitions_path.clone();
    let root = settings.into_generator().into_root_schema_for::<K>();

    let walker = SchemaWalker {
        root: &root,
        definitions_path: &definitions_path,
    };

    let mut unknown = Vec::new();
    walker.visit(&root.schema, document, "", &mut unknown);
    unknown.sort();
    unknown
}

enum Property<'a> {
    Known(&'a Schema),
    /// Free-form object, anything goes below this point
    Free,
    Unknown,
}

struct SchemaWalker<'a> {
    root: &'a RootSchema,
    definitions_path: &'a str,
}

impl<'a> SchemaWalker<'a> {
    fn resolve(&self, schema: &'a Schema) -> Option<&'a SchemaObject> {
        match schema {
            Schema::Bool(_) => None,
            Schema::Object(object) => self.resolve_object(object),
        }
    }

    fn resolve_object(&self, object: &'a SchemaObject) -> Option<&'a SchemaObject> {
        let Some(reference) = object.reference.as_deref() else {
            return Some(object);
        };

        let name = reference.strip_prefix(self.definitions_path)?;
        self.root
            .definitions
            .get(name)
            .and_then(|schema| self.resolve(schema))
    }

    fn visit(&self, object: &'a SchemaObject, value: &Value, path: &str, unknown: &mut Vec<String>) {
        let Some(object) = self.resolve_object(object) else {
            return;
        };

        match value {
            Value::Object(fields) => {
                for (key, field) in fields {
                    let field_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };

                    match self.property(object, key) {
                        Property::Known(schema) => {
                            if let Some(schema) = self.resolve(schema) {
                                self.visit(schema, field, &field_path, unknown);
                            }
                        }
                        Property::Free => {}
                        Property::Unknown => unknown.push(field_path),
                    }
                }
            }
            Value::Array(items) => {
                let Some(item_schemas) = object.array.as_ref().and_then(|array| array.items.as_ref())
                else {
                    return;
                };

                for (index, item) in items.iter().enumerate() {
                    let item_schema = match item_schemas {
                        SingleOrVec::Single(schema) => Some(schema.as_ref()),
                        SingleOrVec::Vec(schemas) => schemas.get(index),
                    };

                    if let Some(schema) = item_schema.and_then(|schema| self.resolve(schema)) {
                        self.visit(schema, item, &format!("{path}[{index}]"), unknown);
                    }
                }
            }
            _ => {}
        }
    }

    fn property(&self, object: &'a SchemaObject, key: &str) -> Property<'a> {
        if let Some(validation) = object.object.as_deref() {
            if let Some(schema) = validation.properties.get(key) {
                return Property::Known(schema);
            }

            return match validation.additional_properties.as_deref() {
                Some(Schema::Bool(false)) => Property::Unknown,
                Some(schema) => Property::Known(schema),
                None if validation.properties.is_empty() => Property::Free,
                None => Property::Unknown,
            };
        }

        let Some(subschemas) = object.subschemas.as_deref() else {
            return Property::Free;
        };

        let mut declared = false;
        for schema in [&subschemas.all_of, &subschemas.any_of, &subschemas.one_of]
            .into_iter()
            .flatten()
            .flatten()
        {
            let Some(candidate) = self.resolve(schema) else {
                continue;
            };

            match self.property(candidate, key) {
                Property::Unknown => declared = true,
                found => return found,
            }
        }

        if declared {
            Property::Unknown
        } else {
            Property::Free
        }
    }
}
