//! The declaration tree consumed by the annotation parser and type resolver.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use log::debug;

/// One `//` comment line with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLine {
    pub line: usize,
    pub text: String,
}

impl CommentLine {
    pub fn new(line: usize, text: impl Into<String>) -> Self {
        Self {
            line,
            text: text.into(),
        }
    }
}

/// A run of adjacent comment lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentGroup {
    pub lines: Vec<CommentLine>,
}

impl CommentGroup {
    pub fn first_line(&self) -> usize {
        self.lines.first().map(|l| l.line).unwrap_or_default()
    }

    pub fn last_line(&self) -> usize {
        self.lines.last().map(|l| l.line).unwrap_or_default()
    }
}

/// A type name, optionally package qualified (`time.Time`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub package: Option<String>,
    pub name: String,
}

impl TypeName {
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            package: None,
            name: name.into(),
        }
    }

    pub fn qualified(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: Some(package.into()),
            name: name.into(),
        }
    }

    /// `package.Name`, using `current` for unqualified names.
    pub fn qualify(&self, current: &str) -> String {
        format!("{}.{}", self.package.as_deref().unwrap_or(current), self.name)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => write!(f, "{}.{}", package, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Shape of a declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// Primitive or named type
    Named(TypeName),
    Pointer(Box<TypeExpr>),
    /// Slices and fixed-size arrays
    Slice(Box<TypeExpr>),
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    Struct(StructType),
    Interface,
    /// Anything the reader recognised but the resolver cannot model
    Unsupported(String),
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{}", name),
            TypeExpr::Pointer(inner) => write!(f, "*{}", inner),
            TypeExpr::Slice(inner) => write!(f, "[]{}", inner),
            TypeExpr::Map { key, value } => write!(f, "map[{}]{}", key, value),
            TypeExpr::Struct(_) => f.write_str("struct{...}"),
            TypeExpr::Interface => f.write_str("interface{}"),
            TypeExpr::Unsupported(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructType {
    pub fields: Vec<FieldDecl>,
}

/// A struct field. Embedded fields have no names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub names: Vec<String>,
    pub ty: TypeExpr,
    pub tag: Option<StructTag>,
    pub doc: Vec<CommentLine>,
}

impl FieldDecl {
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tag.as_ref().and_then(|tag| tag.get(key))
    }
}

/// Raw struct tag text, e.g. `json:"id,omitempty" swagger:"required"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructTag(pub String);

impl StructTag {
    /// Value for `key`, following the `key:"value"` convention.
    pub fn get(&self, key: &str) -> Option<&str> {
        let mut rest = self.0.trim();
        while !rest.is_empty() {
            let colon = rest.find(':')?;
            let name = rest[..colon].trim();
            let after = &rest[colon + 1..];
            let body = after.strip_prefix('"')?;
            let end = closing_quote(body)?;
            if name == key {
                return Some(&body[..end]);
            }
            rest = body[end + 1..].trim_start();
        }
        None
    }
}

fn closing_quote(text: &str) -> Option<usize> {
    let mut escaped = false;
    for (index, c) in text.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(index),
            _ => escaped = false,
        }
    }
    None
}

/// `type Name <expr>` with its doc comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub doc: Vec<CommentLine>,
    pub line: usize,
}

/// Everything the core needs from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub package: String,
    pub comments: Vec<CommentGroup>,
    pub types: Vec<TypeDecl>,
}

/// A type declaration together with the package it lives in.
#[derive(Debug, Clone)]
pub struct RegisteredType {
    pub package: String,
    pub decl: TypeDecl,
}

/// All type declarations of a scan, keyed by `package.Name`.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, RegisteredType>,
    packages: BTreeSet<String>,
}

impl TypeRegistry {
    pub fn from_files(files: &[SourceFile]) -> Self {
        let mut registry = Self::default();
        for file in files {
            registry.packages.insert(file.package.clone());
            for decl in &file.types {
                let key = format!("{}.{}", file.package, decl.name);
                if registry.types.contains_key(&key) {
                    debug!("Duplicate type {} in {:?}, keeping the first", key, file.path);
                    continue;
                }
                registry.types.insert(
                    key,
                    RegisteredType {
                        package: file.package.clone(),
                        decl: decl.clone(),
                    },
                );
            }
        }
        registry
    }

    pub fn get(&self, qualified: &str) -> Option<&RegisteredType> {
        self.types.get(qualified)
    }

    /// Looks up a referenced name. Unqualified names match only when exactly
    /// one package declares them.
    pub fn find(&self, name: &str) -> Option<&RegisteredType> {
        if name.contains('.') {
            return self.types.get(name);
        }
        let mut matches = self
            .types
            .values()
            .filter(|registered| registered.decl.name == name);
        let first = matches.next()?;
        if matches.next().is_some() {
            debug!("Type name {} is ambiguous across packages", name);
            return None;
        }
        Some(first)
    }

    pub fn has_package(&self, package: &str) -> bool {
        self.packages.contains(package)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RegisteredType)> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_tag_lookup() {
        let tag = StructTag(r#"json:"id,omitempty" swagger:"required,desc=the id""#.into());
        assert_eq!(tag.get("json"), Some("id,omitempty"));
        assert_eq!(tag.get("swagger"), Some("required,desc=the id"));
        assert_eq!(tag.get("xml"), None);
    }

    #[test]
    fn test_struct_tag_with_escaped_quote() {
        let tag = StructTag(r#"doc:"say \"hi\"" json:"x""#.into());
        assert_eq!(tag.get("json"), Some("x"));
    }

    #[test]
    fn test_registry_unqualified_lookup() {
        let decl = |name: &str| TypeDecl {
            name: name.to_string(),
            ty: TypeExpr::Named(TypeName::local("string")),
            doc: Vec::new(),
            line: 1,
        };
        let files = vec![
            SourceFile {
                package: "models".into(),
                types: vec![decl("User"), decl("ID")],
                ..Default::default()
            },
            SourceFile {
                package: "api".into(),
                types: vec![decl("ID")],
                ..Default::default()
            },
        ];
        let registry = TypeRegistry::from_files(&files);

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.find("User").map(|t| t.package.as_str()), Some("models"));
        assert!(registry.find("ID").is_none());
        assert!(registry.find("api.ID").is_some());
        assert!(registry.has_package("api"));
        assert!(!registry.has_package("time"));
    }
}
