//! The annotation keyword table and the fixed lookup tables used while
//! parsing (MIME shorthands, primitive type formats).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    // Block headers
    Swagger,
    SecurityDefinition,
    GlobalParam,
    GlobalResponse,
    Path,
    Definition,
    DefinitionModel,

    // Document info
    Title,
    Description,
    BasePath,
    Host,
    Term,
    Contact,
    License,
    Version,
    Schemes,
    Consumes,
    Produces,
    Security,

    // Security schemes
    Name,
    Type,
    In,
    Flow,
    AuthorizationUrl,
    TokenUrl,
    Scopes,

    // Operations
    Method,
    Summary,
    OperationId,
    Tags,
    Deprecated,
    Param,
    Response,

    // Definitions
    Property,
    Required,
    Enum,
    Items,
}

impl Tag {
    pub const ALL: [Tag; 37] = [
        Tag::Swagger,
        Tag::SecurityDefinition,
        Tag::GlobalParam,
        Tag::GlobalResponse,
        Tag::Path,
        Tag::Definition,
        Tag::DefinitionModel,
        Tag::Title,
        Tag::Description,
        Tag::BasePath,
        Tag::Host,
        Tag::Term,
        Tag::Contact,
        Tag::License,
        Tag::Version,
        Tag::Schemes,
        Tag::Consumes,
        Tag::Produces,
        Tag::Security,
        Tag::Name,
        Tag::Type,
        Tag::In,
        Tag::Flow,
        Tag::AuthorizationUrl,
        Tag::TokenUrl,
        Tag::Scopes,
        Tag::Method,
        Tag::Summary,
        Tag::OperationId,
        Tag::Tags,
        Tag::Deprecated,
        Tag::Param,
        Tag::Response,
        Tag::Property,
        Tag::Required,
        Tag::Enum,
        Tag::Items,
    ];

    /// The canonical keyword, `@` included.
    pub fn keyword(self) -> &'static str {
        match self {
            Tag::Swagger => "@Swagger",
            Tag::SecurityDefinition => "@SecurityDefinition",
            Tag::GlobalParam => "@GlobalParam",
            Tag::GlobalResponse => "@GlobalResponse",
            Tag::Path => "@Path",
            Tag::Definition => "@Definition",
            Tag::DefinitionModel => "@DefinitionModel",
            Tag::Title => "@Title",
            Tag::Description => "@Description",
            Tag::BasePath => "@BasePath",
            Tag::Host => "@Host",
            Tag::Term => "@Term",
            Tag::Contact => "@Contact",
            Tag::License => "@License",
            Tag::Version => "@Version",
            Tag::Schemes => "@Schemes",
            Tag::Consumes => "@Consumes",
            Tag::Produces => "@Produces",
            Tag::Security => "@Security",
            Tag::Name => "@Name",
            Tag::Type => "@Type",
            Tag::In => "@In",
            Tag::Flow => "@Flow",
            Tag::AuthorizationUrl => "@AuthorizationUrl",
            Tag::TokenUrl => "@TokenUrl",
            Tag::Scopes => "@Scopes",
            Tag::Method => "@Method",
            Tag::Summary => "@Summary",
            Tag::OperationId => "@OperationId",
            Tag::Tags => "@Tags",
            Tag::Deprecated => "@Deprecated",
            Tag::Param => "@Param",
            Tag::Response => "@Response",
            Tag::Property => "@Property",
            Tag::Required => "@Required",
            Tag::Enum => "@Enum",
            Tag::Items => "@Items",
        }
    }
}

/// Maps annotation keywords to tags.
///
/// The standard table is exact-match on the canonical keywords. Older
/// annotation styles (all-caps tags, other spellings) are supported through
/// case-insensitive matching and aliases rather than separate parsers.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    keywords: HashMap<String, Tag>,
    case_insensitive: bool,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::standard()
    }
}

impl Vocabulary {
    pub fn standard() -> Self {
        let keywords = Tag::ALL
            .iter()
            .map(|tag| (tag.keyword().to_string(), *tag))
            .collect();
        Self {
            keywords,
            case_insensitive: false,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.keywords = self
            .keywords
            .into_iter()
            .map(|(keyword, tag)| (keyword.to_lowercase(), tag))
            .collect();
        self.case_insensitive = true;
        self
    }

    /// Adds another keyword for `tag`. A missing `@` is added.
    pub fn with_alias(mut self, keyword: &str, tag: Tag) -> Self {
        let mut keyword = if keyword.starts_with('@') {
            keyword.to_string()
        } else {
            format!("@{}", keyword)
        };
        if self.case_insensitive {
            keyword = keyword.to_lowercase();
        }
        self.keywords.insert(keyword, tag);
        self
    }

    pub fn lookup(&self, keyword: &str) -> Option<Tag> {
        if self.case_insensitive {
            self.keywords.get(&keyword.to_lowercase()).copied()
        } else {
            self.keywords.get(keyword).copied()
        }
    }
}

/// Expands a media-type shorthand (`json`, `xml`, `form`...) to its MIME string.
/// Anything else is returned unchanged.
pub fn mime_type(shorthand: &str) -> String {
    match shorthand {
        "json" => "application/json",
        "xml" => "application/xml",
        "html" => "text/html",
        "text" | "plain" => "text/plain",
        "form" => "application/x-www-form-urlencoded",
        "multipart" => "multipart/form-data",
        "octet-stream" | "binary" => "application/octet-stream",
        other => other,
    }
    .to_string()
}

/// Swagger `(type, format)` for a primitive type name, `None` if the name
/// isn't a known primitive.
pub fn type_format(name: &str) -> Option<(&'static str, Option<&'static str>)> {
    let pair = match name {
        "string" => ("string", None),
        "int" | "int32" => ("integer", Some("int32")),
        "int8" | "int16" | "uint8" | "uint16" | "rune" => ("integer", Some("int32")),
        "int64" | "uint" | "uint32" | "uint64" => ("integer", Some("int64")),
        "float32" => ("number", Some("float")),
        "float64" => ("number", Some("double")),
        "bool" => ("boolean", None),
        "byte" => ("string", Some("byte")),
        "date-time" | "time.Time" | "Time" => ("string", Some("date-time")),
        "date" => ("string", Some("date")),
        "object" => ("object", None),
        "array" => ("array", None),
        _ => return None,
    };
    Some(pair)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_vocabulary_is_case_sensitive() {
        let vocabulary = Vocabulary::standard();
        assert_eq!(vocabulary.lookup("@Path"), Some(Tag::Path));
        assert_eq!(vocabulary.lookup("@PATH"), None);
        assert_eq!(vocabulary.lookup("@Unknown"), None);
    }

    #[test]
    fn test_case_insensitive_vocabulary_and_aliases() {
        let vocabulary = Vocabulary::standard()
            .case_insensitive()
            .with_alias("Router", Tag::Path);
        assert_eq!(vocabulary.lookup("@PATH"), Some(Tag::Path));
        assert_eq!(vocabulary.lookup("@router"), Some(Tag::Path));
        assert_eq!(vocabulary.lookup("@globalparam"), Some(Tag::GlobalParam));
    }

    #[test]
    fn test_every_tag_is_in_the_standard_table() {
        let vocabulary = Vocabulary::standard();
        for tag in Tag::ALL {
            assert_eq!(vocabulary.lookup(tag.keyword()), Some(tag));
        }
    }

    #[test]
    fn test_mime_shorthands() {
        assert_eq!(mime_type("json"), "application/json");
        assert_eq!(mime_type("form"), "application/x-www-form-urlencoded");
        assert_eq!(mime_type("image/png"), "image/png");
    }

    #[test]
    fn test_type_format_table() {
        assert_eq!(type_format("int64"), Some(("integer", Some("int64"))));
        assert_eq!(type_format("time.Time"), Some(("string", Some("date-time"))));
        assert_eq!(type_format("User"), None);
    }
}
