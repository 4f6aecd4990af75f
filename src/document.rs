//! Accumulation primitives over a [`Document`], shared by the annotation
//! parser and the type resolver.

use std::collections::BTreeMap;

use log::debug;

use crate::error::{ParserError, Result};
use crate::models::{
    Document, HttpMethod, Operation, Parameter, PathItem, Response, Schema, SecurityScheme,
};

pub const DEFINITIONS_PREFIX: &str = "#/definitions/";
pub const PARAMETERS_PREFIX: &str = "#/parameters/";
pub const RESPONSES_PREFIX: &str = "#/responses/";

/// Key under which a referenced definition is stored.
///
/// Import-path qualified names keep only their last path segment, so
/// `github.com/acme/models.User` becomes `models.User`.
pub fn definition_key(raw: &str) -> String {
    raw.trim()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

pub fn definition_ref(name: &str) -> String {
    format!("{}{}", DEFINITIONS_PREFIX, name)
}

/// Appends `text` to an additive description field.
pub fn append_description(target: &mut Option<String>, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    match target {
        Some(existing) if !existing.is_empty() => {
            existing.push('\n');
            existing.push_str(text);
        }
        _ => *target = Some(text.to_string()),
    }
}

/// Adds `name` to a required list unless already present.
pub fn push_required(required: &mut Vec<String>, name: &str) {
    if !required.iter().any(|existing| existing == name) {
        required.push(name.to_string());
    }
}

impl PathItem {
    /// The slot holding the operation for `method`.
    pub fn operation_slot(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Patch => &mut self.patch,
        }
    }

    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path_mut(&mut self, route: &str) -> &mut PathItem {
        self.paths.entry(route.to_string()).or_default()
    }

    /// Starts a fresh operation for `method` on `route`, replacing any earlier one.
    pub fn start_operation(&mut self, route: &str, method: HttpMethod) -> &mut Operation {
        let slot = self.path_mut(route).operation_slot(method);
        if slot.is_some() {
            debug!("Overwriting {} {} with a later declaration", method, route);
        }
        slot.insert(Operation::default())
    }

    pub fn operation_mut(&mut self, route: &str, method: HttpMethod) -> &mut Operation {
        self.path_mut(route)
            .operation_slot(method)
            .get_or_insert_with(Operation::default)
    }

    pub fn definition_mut(&mut self, name: &str) -> &mut Schema {
        self.definitions.entry(name.to_string()).or_default()
    }

    pub fn has_definition(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn register_parameter(&mut self, name: &str, parameter: Parameter) {
        if self.parameters.insert(name.to_string(), parameter).is_some() {
            debug!("Global parameter {} redeclared", name);
        }
    }

    pub fn register_response(&mut self, name: &str, response: Response) {
        if self.responses.insert(name.to_string(), response).is_some() {
            debug!("Global response {} redeclared", name);
        }
    }

    pub fn security_scheme_mut(&mut self, name: &str) -> &mut SecurityScheme {
        self.securityDefinitions.entry(name.to_string()).or_default()
    }

    /// Flattens every `allOf` definition into a single object schema.
    ///
    /// Property sets are unioned with the earliest source winning, required
    /// lists are concatenated and the description comes from the first
    /// source that has one.
    pub fn merge_compositions(&mut self) -> Result<()> {
        let composite: Vec<String> = self
            .definitions
            .iter()
            .filter(|(_, schema)| !schema.allOf.is_empty())
            .map(|(name, _)| name.clone())
            .collect();

        for name in composite {
            let merged = self.flatten(&name, &mut Vec::new())?;
            self.definitions.insert(name, merged);
        }
        Ok(())
    }

    fn flatten(&self, name: &str, visiting: &mut Vec<String>) -> Result<Schema> {
        let schema = self.definitions.get(name).cloned().unwrap_or_default();
        if schema.allOf.is_empty() || visiting.iter().any(|seen| seen == name) {
            return Ok(schema);
        }
        visiting.push(name.to_string());

        let mut merged = Schema {
            type_: Some("object".to_string()),
            description: schema.description.clone(),
            ..Default::default()
        };
        let mut properties = BTreeMap::new();

        for part in &schema.allOf {
            let source = match part.ref_.as_deref() {
                Some(target) => {
                    let target = target.trim_start_matches(DEFINITIONS_PREFIX);
                    if !self.definitions.contains_key(target) {
                        return Err(ParserError::CompositeMergeError {
                            definition: name.to_string(),
                            missing: target.to_string(),
                        });
                    }
                    self.flatten(target, visiting)?
                }
                None => part.clone(),
            };

            if merged.description.is_none() {
                merged.description = source.description.clone();
            }
            for (key, value) in source.properties {
                properties.entry(key).or_insert(value);
            }
            for required in &source.required {
                push_required(&mut merged.required, required);
            }
        }

        visiting.pop();
        merged.properties = properties;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn object(props: &[(&str, &str)], required: &[&str]) -> Schema {
        Schema {
            type_: Some("object".to_string()),
            properties: props
                .iter()
                .map(|(name, ty)| (name.to_string(), Schema::primitive(ty, None)))
                .collect(),
            required: required.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_definition_key_strips_import_path() {
        assert_eq!(definition_key("github.com/acme/models.User"), "models.User");
        assert_eq!(definition_key("Widget"), "Widget");
    }

    #[test]
    fn test_append_description_is_additive() {
        let mut description = None;
        append_description(&mut description, "first");
        append_description(&mut description, "second");
        append_description(&mut description, "   ");
        assert_eq!(description.as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn test_redeclared_method_overwrites_operation() {
        let mut doc = Document::new();
        doc.start_operation("/users", HttpMethod::Get).summary = Some("old".into());
        doc.start_operation("/users", HttpMethod::Get);

        let op = doc.paths["/users"].operation(HttpMethod::Get).unwrap();
        assert_eq!(op.summary, None);
    }

    #[test]
    fn test_merge_compositions_unions_properties() {
        let mut doc = Document::new();
        let mut base = object(&[("id", "integer"), ("name", "integer")], &["id"]);
        base.description = Some("base".into());
        doc.definitions.insert("models.Base".into(), base);

        let own = object(&[("name", "string")], &["name"]);
        doc.definitions.insert(
            "models.User".into(),
            Schema {
                allOf: vec![own, Schema::reference(definition_ref("models.Base"))],
                ..Default::default()
            },
        );

        doc.merge_compositions().unwrap();

        let user = &doc.definitions["models.User"];
        assert!(user.allOf.is_empty());
        assert_eq!(user.description.as_deref(), Some("base"));
        assert_eq!(user.required, vec!["name".to_string(), "id".to_string()]);
        assert_eq!(user.properties["name"].type_.as_deref(), Some("string"));
        assert_eq!(user.properties["id"].type_.as_deref(), Some("integer"));
        assert!(doc.definitions.contains_key("models.Base"));
    }

    #[test]
    fn test_merge_compositions_missing_target_is_fatal() {
        let mut doc = Document::new();
        doc.definitions.insert(
            "models.User".into(),
            Schema {
                allOf: vec![Schema::reference(definition_ref("models.Gone"))],
                ..Default::default()
            },
        );

        let err = doc.merge_compositions().unwrap_err();
        assert!(matches!(
            err,
            ParserError::CompositeMergeError { ref missing, .. } if missing == "models.Gone"
        ));
    }
}
