use log::{debug, warn};

use crate::error::{DanglingReference, ParserError, ReferenceKind, Result};
use crate::models::Document;

/// Names referenced through `$ref` during a run, in first-use order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References {
    pub definitions: Vec<String>,
    pub parameters: Vec<String>,
    pub responses: Vec<String>,
    /// Definitions whose source package was never scanned
    pub external: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|existing| existing == name) {
        list.push(name.to_string());
    }
}

impl References {
    pub fn use_definition(&mut self, name: &str) {
        push_unique(&mut self.definitions, name);
    }

    pub fn use_parameter(&mut self, name: &str) {
        push_unique(&mut self.parameters, name);
    }

    pub fn use_response(&mut self, name: &str) {
        push_unique(&mut self.responses, name);
    }

    pub fn mark_external(&mut self, name: &str) {
        if !self.external.iter().any(|existing| existing == name) {
            warn!(
                "Package for definition {} was not scanned, skipping it",
                name
            );
            self.external.push(name.to_string());
        }
    }

    pub fn is_external(&self, name: &str) -> bool {
        self.external.iter().any(|existing| existing == name)
    }
}

/// Checks every recorded reference against the document's dictionaries.
///
/// All dangling names are collected and reported in one error.
pub fn validate(doc: &Document, references: &References) -> Result<()> {
    let mut missing = Vec::new();

    for name in &references.definitions {
        if references.is_external(name) {
            continue;
        }
        if !doc.definitions.contains_key(name) {
            missing.push(DanglingReference {
                kind: ReferenceKind::Definition,
                name: name.clone(),
            });
        }
    }
    for name in &references.parameters {
        if !doc.parameters.contains_key(name) {
            missing.push(DanglingReference {
                kind: ReferenceKind::Parameter,
                name: name.clone(),
            });
        }
    }
    for name in &references.responses {
        if !doc.responses.contains_key(name) {
            missing.push(DanglingReference {
                kind: ReferenceKind::Response,
                name: name.clone(),
            });
        }
    }

    if missing.is_empty() {
        debug!(
            "Validated {} definition, {} parameter and {} response references",
            references.definitions.len(),
            references.parameters.len(),
            references.responses.len()
        );
        return Ok(());
    }
    Err(ParserError::DanglingReferences(missing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Parameter, Schema};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_all_dangling_references_are_reported() {
        let mut doc = Document::new();
        doc.definitions.insert("Widget".into(), Schema::default());

        let mut refs = References::default();
        refs.use_definition("Widget");
        refs.use_definition("Gadget");
        refs.use_parameter("userParam");
        refs.use_response("notFound");
        refs.use_response("notFound");

        let err = validate(&doc, &refs).unwrap_err();
        let ParserError::DanglingReferences(missing) = &err else {
            panic!("unexpected error: {}", err);
        };
        assert_eq!(
            missing.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            vec!["Gadget", "userParam", "notFound"]
        );
        assert_eq!(
            err.to_string(),
            "Unresolved references: cannot find `Gadget` in definitions; \
             cannot find `userParam` in parameters; cannot find `notFound` in responses"
        );
    }

    #[test]
    fn test_registered_and_external_references_pass() {
        let mut doc = Document::new();
        doc.parameters.insert("userParam".into(), Parameter::default());

        let mut refs = References::default();
        refs.use_parameter("userParam");
        refs.use_definition("uuid.UUID");
        refs.mark_external("uuid.UUID");

        assert!(validate(&doc, &refs).is_ok());
    }
}
