//! Turns Go type declarations into schemas.
//!
//! Named struct types become definitions, keyed by `package.Name`. A
//! placeholder is stored before a struct's fields are resolved, so cyclic
//! types end in a `$ref` to the definition being built.

use log::{debug, warn};

use crate::annotation::{doc_options, DocOptions};
use crate::config::EmbeddedFields;
use crate::declarations::{FieldDecl, RegisteredType, StructType, TypeExpr, TypeName, TypeRegistry};
use crate::document::{append_description, definition_key, definition_ref, push_required};
use crate::error::{ParserError, Result};
use crate::models::{Document, Schema};
use crate::tokenizer::split_words;
use crate::validator::References;
use crate::vocabulary::{type_format, Vocabulary};

/// Where a type expression is being resolved.
#[derive(Clone, Copy)]
struct Scope<'s> {
    /// Package unqualified names belong to
    package: &'s str,
    /// Definition being built, for error messages
    owner: &'s str,
}

fn type_override(name: &str) -> Schema {
    match type_format(name) {
        Some((type_, format)) => Schema::primitive(type_, format),
        None => Schema {
            type_: Some(name.to_string()),
            ..Default::default()
        },
    }
}

fn is_byte(expr: &TypeExpr) -> bool {
    matches!(expr, TypeExpr::Named(TypeName { package: None, name }) if name == "byte" || name == "uint8")
}

/// Presentation name of a field member, `None` when the field is excluded.
fn field_name(field: &FieldDecl, member: &str, options: &DocOptions) -> Option<String> {
    if let Some(json) = field.tag_value("json") {
        match json.split(',').next().unwrap_or_default() {
            "-" => return None,
            "" => {}
            name => return Some(name.to_string()),
        }
    }
    match options.name.as_deref() {
        Some("-") => None,
        Some(name) if !name.is_empty() => Some(name.to_string()),
        _ => Some(member.to_string()),
    }
}

pub struct TypeResolver<'a> {
    registry: &'a TypeRegistry,
    vocabulary: &'a Vocabulary,
    embedded: EmbeddedFields,
}

impl<'a> TypeResolver<'a> {
    pub fn new(registry: &'a TypeRegistry, vocabulary: &'a Vocabulary, embedded: EmbeddedFields) -> Self {
        Self {
            registry,
            vocabulary,
            embedded,
        }
    }

    /// Resolves every type whose doc comment carries `@DefinitionModel`.
    pub fn resolve_models(&self, doc: &mut Document, refs: &mut References) -> Result<()> {
        for (qualified, registered) in self.registry.iter() {
            if doc_options(self.vocabulary, &registered.decl.doc).definition_model {
                debug!("Resolving definition model {}", qualified);
                self.define(doc, refs, qualified, registered)?;
            }
        }
        Ok(())
    }

    /// Materializes every referenced definition that no annotation declared.
    /// Resolving one definition may reference more, so the list is walked
    /// until it stops growing.
    pub fn resolve_references(&self, doc: &mut Document, refs: &mut References) -> Result<()> {
        let mut index = 0;
        while index < refs.definitions.len() {
            let name = refs.definitions[index].clone();
            index += 1;
            if doc.has_definition(&name) || refs.is_external(&name) {
                continue;
            }

            match self.registry.find(&name) {
                Some(registered) => self.define(doc, refs, &name, registered)?,
                None => match name.rsplit_once('.') {
                    Some((package, _)) if !self.registry.has_package(package) => {
                        refs.mark_external(&name)
                    }
                    _ => debug!("No declaration found for {}", name),
                },
            }
        }
        Ok(())
    }

    /// Builds the definition `key` from `registered` unless it already exists.
    pub fn define(
        &self,
        doc: &mut Document,
        refs: &mut References,
        key: &str,
        registered: &RegisteredType,
    ) -> Result<()> {
        if doc.has_definition(key) {
            return Ok(());
        }
        doc.definitions.insert(key.to_string(), Schema::default());

        let decl = &registered.decl;
        let qualified = format!("{}.{}", registered.package, decl.name);
        let scope = Scope {
            package: &registered.package,
            owner: &qualified,
        };
        let options = doc_options(self.vocabulary, &decl.doc);

        let mut schema = match &decl.ty {
            TypeExpr::Struct(body) => {
                let mut visiting = vec![qualified.clone()];
                self.struct_schema(doc, refs, scope, body, &mut visiting)?
            }
            other => {
                let mut schema = match &options.type_ {
                    Some(type_) => type_override(type_),
                    None => self.schema_for(doc, refs, scope, other)?,
                };
                if !options.enum_values.is_empty() {
                    schema.enum_values = options.enum_values.clone();
                }
                schema
            }
        };
        if let Some(description) = &options.description {
            append_description(&mut schema.description, description);
        }

        debug!("Resolved definition {}", key);
        doc.definitions.insert(key.to_string(), schema);
        Ok(())
    }

    fn schema_for(
        &self,
        doc: &mut Document,
        refs: &mut References,
        scope: Scope<'_>,
        expr: &TypeExpr,
    ) -> Result<Schema> {
        match expr {
            TypeExpr::Named(name) => self.named_schema(doc, refs, scope, name),
            TypeExpr::Pointer(inner) => self.schema_for(doc, refs, scope, inner),
            TypeExpr::Slice(inner) if is_byte(inner) => Ok(Schema::primitive("string", Some("byte"))),
            TypeExpr::Slice(inner) => Ok(Schema {
                type_: Some("array".to_string()),
                items: Some(Box::new(self.schema_for(doc, refs, scope, inner)?)),
                ..Default::default()
            }),
            TypeExpr::Map { value, .. } => Ok(Schema {
                type_: Some("object".to_string()),
                additionalProperties: Some(Box::new(self.schema_for(doc, refs, scope, value)?)),
                ..Default::default()
            }),
            TypeExpr::Struct(body) => {
                let mut visiting = Vec::new();
                self.struct_schema(doc, refs, scope, body, &mut visiting)
            }
            TypeExpr::Interface => Ok(Schema::primitive("object", None)),
            TypeExpr::Unsupported(shape) => Err(ParserError::TypeShapeError {
                type_name: scope.owner.to_string(),
                shape: shape.clone(),
            }),
        }
    }

    fn named_schema(
        &self,
        doc: &mut Document,
        refs: &mut References,
        scope: Scope<'_>,
        name: &TypeName,
    ) -> Result<Schema> {
        if name.package.is_none() && name.name == "any" {
            return Ok(Schema::primitive("object", None));
        }
        if let Some((type_, format)) = type_format(&name.to_string()) {
            return Ok(Schema::primitive(type_, format));
        }

        let qualified = name.qualify(scope.package);
        let Some(registered) = self.registry.get(&qualified) else {
            let key = definition_key(&name.to_string());
            refs.use_definition(&key);
            match &name.package {
                Some(package) if !self.registry.has_package(package) => refs.mark_external(&key),
                _ => warn!("Type {} used by {} is not declared", qualified, scope.owner),
            }
            return Ok(Schema::reference(definition_ref(&key)));
        };

        if let Some(schema) = self.alias_schema(registered) {
            return Ok(schema);
        }

        self.define(doc, refs, &qualified, registered)?;
        refs.use_definition(&qualified);
        Ok(Schema::reference(definition_ref(&qualified)))
    }

    /// Named aliases of primitives are inlined with their own doc options.
    fn alias_schema(&self, registered: &RegisteredType) -> Option<Schema> {
        let TypeExpr::Named(target) = &registered.decl.ty else {
            return None;
        };
        let (type_, format) = type_format(&target.to_string())?;
        let options = doc_options(self.vocabulary, &registered.decl.doc);

        let mut schema = match &options.type_ {
            Some(override_type) => type_override(override_type),
            None => Schema::primitive(type_, format),
        };
        schema.description = options.description;
        schema.enum_values = options.enum_values;
        Some(schema)
    }

    fn struct_schema(
        &self,
        doc: &mut Document,
        refs: &mut References,
        scope: Scope<'_>,
        body: &StructType,
        visiting: &mut Vec<String>,
    ) -> Result<Schema> {
        let mut schema = Schema::primitive("object", None);
        let mut composed = Vec::new();

        for field in &body.fields {
            let embedded_name = field
                .tag_value("json")
                .and_then(|json| json.split(',').next())
                .filter(|name| !name.is_empty());

            if field.is_embedded() && embedded_name.is_none() {
                self.embed(doc, refs, scope, field, &mut schema, &mut composed, visiting)?;
                continue;
            }

            let options = doc_options(self.vocabulary, &field.doc);
            let members: Vec<String> = if field.is_embedded() {
                vec![field.ty.to_string()]
            } else {
                field.names.clone()
            };
            for member in &members {
                let Some(name) = field_name(field, member, &options) else {
                    debug!("Field {} of {} is excluded", member, scope.owner);
                    continue;
                };
                let (property, required) = self.field_schema(doc, refs, scope, field, &options)?;
                if required {
                    push_required(&mut schema.required, &name);
                }
                schema.properties.insert(name, property);
            }
        }

        if composed.is_empty() {
            return Ok(schema);
        }
        let mut all_of = vec![schema];
        all_of.extend(composed);
        Ok(Schema {
            allOf: all_of,
            ..Default::default()
        })
    }

    /// Schema of one field with doc-comment and `swagger` tag overrides
    /// applied, plus whether it is required.
    fn field_schema(
        &self,
        doc: &mut Document,
        refs: &mut References,
        scope: Scope<'_>,
        field: &FieldDecl,
        options: &DocOptions,
    ) -> Result<(Schema, bool)> {
        let mut required = options.required;
        let mut type_name = options.type_.clone();
        let mut format = None;
        let mut description = options.description.clone();
        let mut enum_values = options.enum_values.clone();

        if let Some(tag) = field.tag_value("swagger") {
            for part in tag.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let (key, value) = part.split_once('=').unwrap_or((part, ""));
                match key {
                    "required" => required = value != "false",
                    "type" => type_name = Some(value.to_string()),
                    "format" => format = Some(value.to_string()),
                    "description" | "desc" => append_description(&mut description, value),
                    "enum" => enum_values = split_words(value),
                    other => debug!("Ignoring swagger tag option {}", other),
                }
            }
        }

        let mut schema = match &type_name {
            Some(type_) => type_override(type_),
            None => self.schema_for(doc, refs, scope, &field.ty)?,
        };
        if !schema.is_reference() {
            if format.is_some() {
                schema.format = format;
            }
            if let Some(description) = &description {
                append_description(&mut schema.description, description);
            }
            if !enum_values.is_empty() {
                schema.enum_values = enum_values;
            }
        }
        Ok((schema, required))
    }

    #[allow(clippy::too_many_arguments)]
    fn embed(
        &self,
        doc: &mut Document,
        refs: &mut References,
        scope: Scope<'_>,
        field: &FieldDecl,
        schema: &mut Schema,
        composed: &mut Vec<Schema>,
        visiting: &mut Vec<String>,
    ) -> Result<()> {
        let mut ty = &field.ty;
        while let TypeExpr::Pointer(inner) = ty {
            ty = inner;
        }
        let TypeExpr::Named(name) = ty else {
            warn!("Embedded field {} in {} is not a named type, skipping", ty, scope.owner);
            return Ok(());
        };

        let qualified = name.qualify(scope.package);
        let Some(registered) = self.registry.get(&qualified) else {
            warn!(
                "Embedded type {} in {} is not declared in the scanned sources, skipping",
                name, scope.owner
            );
            return Ok(());
        };

        let TypeExpr::Struct(body) = &registered.decl.ty else {
            // A non-struct embedded type is a property named after the type.
            let property = self.named_schema(doc, refs, scope, name)?;
            schema.properties.insert(name.name.clone(), property);
            return Ok(());
        };

        match self.embedded {
            EmbeddedFields::Inline => {
                if visiting.contains(&qualified) {
                    debug!("Embedding cycle through {}, skipping", qualified);
                    return Ok(());
                }
                visiting.push(qualified);
                let inner_scope = Scope {
                    package: &registered.package,
                    owner: scope.owner,
                };
                let promoted = self.struct_schema(doc, refs, inner_scope, body, visiting)?;
                visiting.pop();

                for (key, value) in promoted.properties {
                    schema.properties.insert(key, value);
                }
                for required in &promoted.required {
                    push_required(&mut schema.required, required);
                }
            }
            EmbeddedFields::Compose => {
                self.define(doc, refs, &qualified, registered)?;
                refs.use_definition(&qualified);
                composed.push(Schema::reference(definition_ref(&qualified)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::go_source::parse_source;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn registry(sources: &[(&str, &str)]) -> TypeRegistry {
        let files: Vec<_> = sources
            .iter()
            .map(|(path, text)| parse_source(*path, text).unwrap())
            .collect();
        TypeRegistry::from_files(&files)
    }

    fn resolve(registry: &TypeRegistry, embedded: EmbeddedFields) -> Result<Document> {
        let vocabulary = Vocabulary::standard();
        let resolver = TypeResolver::new(registry, &vocabulary, embedded);
        let mut doc = Document::new();
        let mut refs = References::default();
        resolver.resolve_models(&mut doc, &mut refs)?;
        resolver.resolve_references(&mut doc, &mut refs)?;
        doc.merge_compositions()?;
        Ok(doc)
    }

    fn definition(doc: &Document, name: &str) -> serde_json::Value {
        serde_json::to_value(&doc.definitions[name]).unwrap()
    }

    #[test]
    fn test_self_reference_resolves_to_ref() {
        let registry = registry(&[(
            "tree.go",
            r#"package tree

// @DefinitionModel
type Node struct {
	Value    int     `json:"value"`
	Next     *Node   `json:"next"`
	Children []*Node `json:"children"`
}
"#,
        )]);
        let doc = resolve(&registry, EmbeddedFields::Inline).unwrap();

        assert_eq!(
            definition(&doc, "tree.Node"),
            json!({
                "type": "object",
                "properties": {
                    "value": { "type": "integer", "format": "int32" },
                    "next": { "$ref": "#/definitions/tree.Node" },
                    "children": { "type": "array", "items": { "$ref": "#/definitions/tree.Node" } }
                }
            })
        );
    }

    #[test]
    fn test_embedded_members_are_promoted() {
        let registry = registry(&[(
            "models.go",
            r#"package models

type Base struct {
	ID   int64  `json:"id"`
	Kind string `json:"kind"`
}

// @DefinitionModel
type User struct {
	Name string `json:"name"`
	Base
	Kind int `json:"kind"`
}
"#,
        )]);
        let doc = resolve(&registry, EmbeddedFields::Inline).unwrap();
        let user = &doc.definitions["models.User"];

        let names: Vec<&str> = user.properties.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["id", "kind", "name"]);
        assert_eq!(user.properties["kind"].type_.as_deref(), Some("integer"));
        assert!(!doc.definitions.contains_key("models.Base"));
    }

    #[test]
    fn test_compose_mode_merges_embedded_definitions() {
        let registry = registry(&[(
            "models.go",
            r#"package models

// Base carries the audit fields.
// @Description Audit fields
type Base struct {
	// @Required
	ID int64 `json:"id"`
}

// @DefinitionModel
type User struct {
	*Base
	Name string `json:"name" swagger:"required"`
}
"#,
        )]);
        let doc = resolve(&registry, EmbeddedFields::Compose).unwrap();
        let user = &doc.definitions["models.User"];

        assert!(user.allOf.is_empty());
        assert_eq!(user.required, vec!["name", "id"]);
        assert_eq!(user.description.as_deref(), Some("Audit fields"));
        assert!(user.properties.contains_key("id"));
        assert!(doc.definitions.contains_key("models.Base"));
    }

    #[test]
    fn test_maps_slices_and_overrides() {
        let registry = registry(&[(
            "models.go",
            r#"package models

import "time"

// Status of an order.
// @Enum pending shipped
type Status string

// @DefinitionModel
type Order struct {
	Labels   map[string]string `json:"labels"`
	Payload  []byte            `json:"payload"`
	Extra    interface{}       `json:"extra"`
	Status   Status            `json:"status"`
	Created  time.Time         `json:"created_at"`
	Secret   string            `json:"-"`
	Internal string
	// @Name -
	Hidden string
	// @Name renamed
	// @Description The total
	Total float64 `swagger:"required,format=money"`
	Price int     `swagger:"type=string,desc=price as text,enum=1 2"`
}
"#,
        )]);
        let doc = resolve(&registry, EmbeddedFields::Inline).unwrap();

        assert_eq!(
            definition(&doc, "models.Order"),
            json!({
                "type": "object",
                "properties": {
                    "labels": { "type": "object", "additionalProperties": { "type": "string" } },
                    "payload": { "type": "string", "format": "byte" },
                    "extra": { "type": "object" },
                    "status": { "type": "string", "enum": ["pending", "shipped"] },
                    "created_at": { "type": "string", "format": "date-time" },
                    "Internal": { "type": "string" },
                    "renamed": { "type": "number", "format": "money", "description": "The total" },
                    "Price": { "type": "string", "description": "price as text", "enum": ["1", "2"] }
                },
                "required": ["renamed"]
            })
        );
    }

    #[test]
    fn test_overrides_skip_referenced_fields() {
        let registry = registry(&[(
            "p.go",
            r#"package p

type Owner struct {
	ID string
}

// @DefinitionModel
type Pet struct {
	Owner Owner `swagger:"required,format=uuid,desc=who owns it,enum=a b"`
}
"#,
        )]);
        let doc = resolve(&registry, EmbeddedFields::Inline).unwrap();

        assert_eq!(
            definition(&doc, "p.Pet"),
            json!({
                "type": "object",
                "properties": {
                    "Owner": { "$ref": "#/definitions/p.Owner" }
                },
                "required": ["Owner"]
            })
        );
    }

    #[test]
    fn test_cross_package_references() {
        let registry = registry(&[
            (
                "api/handler.go",
                r#"package api

import "example.com/app/models"
import "github.com/google/uuid"

// @DefinitionModel
type Reply struct {
	User  models.User `json:"user"`
	Trace uuid.UUID   `json:"trace"`
}
"#,
            ),
            (
                "models/user.go",
                "package models\n\ntype User struct {\n\tName string `json:\"name\"`\n}\n",
            ),
        ]);
        let vocabulary = Vocabulary::standard();
        let resolver = TypeResolver::new(&registry, &vocabulary, EmbeddedFields::Inline);
        let mut doc = Document::new();
        let mut refs = References::default();
        resolver.resolve_models(&mut doc, &mut refs).unwrap();

        assert!(doc.definitions.contains_key("models.User"));
        assert_eq!(
            doc.definitions["api.Reply"].properties["user"].ref_.as_deref(),
            Some("#/definitions/models.User")
        );
        assert!(refs.is_external("uuid.UUID"));
        assert!(crate::validator::validate(&doc, &refs).is_ok());
    }

    #[test]
    fn test_referenced_names_resolve_on_demand() {
        let registry = registry(&[(
            "models.go",
            "package models\n\ntype Pet struct {\n\tOwner Owner `json:\"owner\"`\n}\n\ntype Owner struct {\n\tName string\n}\n",
        )]);
        let vocabulary = Vocabulary::standard();
        let resolver = TypeResolver::new(&registry, &vocabulary, EmbeddedFields::Inline);
        let mut doc = Document::new();
        let mut refs = References::default();
        refs.use_definition("Pet");
        refs.use_definition("Missing");
        resolver.resolve_references(&mut doc, &mut refs).unwrap();

        assert!(doc.definitions.contains_key("Pet"));
        assert!(doc.definitions.contains_key("models.Owner"));
        assert!(!doc.definitions.contains_key("Missing"));
        assert!(!refs.is_external("Missing"));
    }

    #[test]
    fn test_unsupported_shape_is_fatal() {
        let registry = registry(&[(
            "h.go",
            "package h\n\n// @DefinitionModel\ntype Handler struct {\n\tOnDone func(error)\n}\n",
        )]);
        let err = resolve(&registry, EmbeddedFields::Inline).unwrap_err();
        assert!(matches!(
            err,
            ParserError::TypeShapeError { ref type_name, .. } if type_name == "h.Handler"
        ));
    }
}
