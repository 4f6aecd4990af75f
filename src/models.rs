#![allow(non_snake_case)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const SWAGGER_VERSION: &str = "2.0";

pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

/// Represents a complete Swagger 2.0 document
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Document {
    pub swagger: String,
    pub info: Info,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basePath: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub schemes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub consumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub produces: Vec<String>,
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub definitions: BTreeMap<String, Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub security: Vec<SecurityRequirement>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub securityDefinitions: BTreeMap<String, SecurityScheme>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub parameters: BTreeMap<String, Parameter>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub responses: BTreeMap<String, Response>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            swagger: SWAGGER_VERSION.to_string(),
            info: Info::default(),
            host: None,
            basePath: None,
            schemes: Vec::new(),
            consumes: Vec::new(),
            produces: Vec::new(),
            paths: BTreeMap::new(),
            definitions: BTreeMap::new(),
            security: Vec::new(),
            securityDefinitions: BTreeMap::new(),
            parameters: BTreeMap::new(),
            responses: BTreeMap::new(),
        }
    }
}

/// Information about the API
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Info {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termsOfService: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    pub version: String,
}

/// Contact information for the API
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// License information for the API
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct License {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// HTTP verbs an operation can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            "HEAD" => Ok(Self::Head),
            "PATCH" => Ok(Self::Patch),
            other => Err(format!("unsupported method: {}", other)),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
            Self::Patch => "PATCH",
        };
        f.write_str(name)
    }
}

/// A single path item with all its operations
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<Parameter>,
}

/// An operation (endpoint) of the API
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operationId: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub consumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub produces: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub responses: BTreeMap<String, Response>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub schemes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub security: Vec<SecurityRequirement>,
}

/// Parameter for an operation, either local or a `$ref` to a global one
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Parameter {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub ref_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_type: Option<String>, // query, header, path, formData, body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowEmptyValue: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(flatten)]
    pub constraints: Constraints,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty", default)]
    pub enum_values: Vec<String>,
}

/// Numeric validation keywords shared by parameters and items
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxLength: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minLength: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxItems: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minItems: Option<i64>,
}

impl Constraints {
    /// Field for one of the numeric keys, `None` if `key` isn't numeric.
    pub fn slot_mut(&mut self, key: &str) -> Option<&mut Option<i64>> {
        match key {
            "maximum" => Some(&mut self.maximum),
            "minimum" => Some(&mut self.minimum),
            "maxLength" => Some(&mut self.maxLength),
            "minLength" => Some(&mut self.minLength),
            "maxItems" => Some(&mut self.maxItems),
            "minItems" => Some(&mut self.minItems),
            _ => None,
        }
    }
}

/// Item description of a non-body array parameter
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Items {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub ref_: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(flatten)]
    pub constraints: Constraints,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty", default)]
    pub enum_values: Vec<String>,
}

/// Recursive type shape used for payloads and named definitions
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Schema {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub ref_: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty", default)]
    pub enum_values: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub properties: BTreeMap<String, Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additionalProperties: Option<Box<Schema>>,
    // Transient, flattened by `Document::merge_compositions`
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub allOf: Vec<Schema>,
}

impl Schema {
    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            ref_: Some(target.into()),
            ..Default::default()
        }
    }

    pub fn primitive(type_: &str, format: Option<&str>) -> Self {
        Self {
            type_: Some(type_.to_string()),
            format: format.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn is_reference(&self) -> bool {
        self.ref_.is_some()
    }
}

/// API response, or a `$ref` to a global one
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Response {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub ref_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub headers: BTreeMap<String, Header>,
}

/// Response header
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Header {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Security scheme definition
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SecurityScheme {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>, // basic, apiKey, oauth2
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorizationUrl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenUrl: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub scopes: BTreeMap<String, String>,
}
