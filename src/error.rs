use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which dictionary a dangling reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReferenceKind {
    Definition,
    Parameter,
    Response,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Definition => write!(f, "definitions"),
            ReferenceKind::Parameter => write!(f, "parameters"),
            ReferenceKind::Response => write!(f, "responses"),
        }
    }
}

/// A `$ref` whose target was never registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub kind: ReferenceKind,
    pub name: String,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot find `{}` in {}", self.name, self.kind)
    }
}

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to read {path:?}: {source}")]
    IOError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {directive} arguments: {text}")]
    AnnotationParseError { directive: String, text: String },

    #[error("Invalid number for `{key}` in {directive}: {value:?}")]
    NumberParseError {
        directive: String,
        key: String,
        value: String,
    },

    #[error("Unsupported method `{method}`: {text}")]
    MethodParseError { method: String, text: String },

    #[error("{directive} appears before any @Method in path {route}")]
    MissingMethodError { directive: String, route: String },

    #[error("Unsupported type shape `{shape}` for {type_name}")]
    TypeShapeError { type_name: String, shape: String },

    #[error("Cannot merge composite definition {definition}: {missing} is not defined")]
    CompositeMergeError { definition: String, missing: String },

    #[error("Unresolved references: {}", join_references(.0))]
    DanglingReferences(Vec<DanglingReference>),

    #[error("Invalid Go source {path:?} at line {line}: {message}")]
    SourceParseError {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Invalid config {path:?}: {message}")]
    ConfigError { path: PathBuf, message: String },

    #[error("{path:?}: {source}")]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<ParserError>,
    },
}

impl ParserError {
    pub(crate) fn annotation(directive: &str, text: &str) -> Self {
        Self::AnnotationParseError {
            directive: directive.to_string(),
            text: text.to_string(),
        }
    }

    pub(crate) fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Self::InFile {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Strips any file wrapper.
    pub fn root(&self) -> &ParserError {
        match self {
            Self::InFile { source, .. } => source.root(),
            other => other,
        }
    }
}

fn join_references(references: &[DanglingReference]) -> String {
    references
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T, E = ParserError> = std::result::Result<T, E>;
