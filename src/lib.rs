pub mod annotation;
pub mod config;
pub mod declarations;
pub mod document;
pub mod error;
pub mod generator;
pub mod go_source;
pub mod models;
pub mod resolver;
pub mod scanner;
pub mod tokenizer;
pub mod validator;
pub mod vocabulary;

use std::path::{Path, PathBuf};

use log::{debug, info};

pub use config::Config;
pub use error::{ParserError, Result};
pub use models::Document;

use annotation::AnnotationParser;
use declarations::{SourceFile, TypeRegistry};
use resolver::TypeResolver;
use validator::References;
use vocabulary::Vocabulary;

/// Builds a Swagger document from the Go sources under one directory.
///
/// Every call to [`Parser::parse`] starts from an empty document.
pub struct Parser {
    base: PathBuf,
    config: Config,
    vocabulary: Vocabulary,
}

impl Parser {
    pub fn new(base: impl Into<PathBuf>, config: Config) -> Self {
        let vocabulary = config.vocabulary();
        Self {
            base: base.into(),
            config,
            vocabulary,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn parse(&self) -> Result<Document> {
        let files = scanner::collect_go_files(&self.base, &self.config.scan_options())?;
        info!("Scanning {} Go files under {:?}", files.len(), self.base);

        let sources = files
            .iter()
            .map(|path| go_source::read_source(path))
            .collect::<Result<Vec<_>>>()?;
        self.parse_sources(&sources)
    }

    /// Runs annotation parsing, type resolution and validation over
    /// already-read sources, in order.
    pub fn parse_sources(&self, sources: &[SourceFile]) -> Result<Document> {
        let mut doc = Document::new();
        let mut references = References::default();

        let mut annotations = AnnotationParser::new(&self.vocabulary, &mut references);
        for source in sources {
            debug!("Reading annotations in {:?}", source.path);
            for group in &source.comments {
                annotations
                    .read_zone(&mut doc, &group.lines)
                    .map_err(|err| err.in_file(&source.path))?;
            }
        }

        let registry = TypeRegistry::from_files(sources);
        debug!("Registered {} type declarations", registry.len());
        let resolver = TypeResolver::new(&registry, &self.vocabulary, self.config.embedded_fields);
        resolver.resolve_models(&mut doc, &mut references)?;
        resolver.resolve_references(&mut doc, &mut references)?;

        doc.merge_compositions()?;
        validator::validate(&doc, &references)?;

        info!(
            "Parsed {} paths and {} definitions",
            doc.paths.len(),
            doc.definitions.len()
        );
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;
    use crate::config::EmbeddedFields;
    use crate::generator::Generator;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    const TYPES: &str = r#"package shop

// @DefinitionModel
// @Description abcde
type Hello1 string

// @DefinitionModel
type Hello3 float64

// @DefinitionModel
type Hello4 []string

// @DefinitionModel
type Hello5 map[string]int

// @DefinitionModel
type Hello6 Hello8

// @DefinitionModel
type Hello7 *Hello8

// @DefinitionModel
type Hello8 struct {
	// @Description comment e
	// @Required
	Name string
}

// @DefinitionModel
type Hello9 struct {
	// @Name ebola1
	// @Description ssssss
	// @Required
	E *Hello8

	// @Required
	A Hello8

	*Hello8
	test int

	// @Name -
	private int

	// @Required
	mapping map[string]int
}
"#;

    const API: &str = r#"package shop

// @Swagger
// @Title Api
// @Description Super api
// @Term Dont use
// @Contact name="witoo harianto" url=http://www.plimble.com email=witooh@gmail.com
// @License name="Apache 2.0" url=http://google.com
// @Version 1.1.1
// @Schemes http https ws
// @Consumes json xml
// @Produces json xml
// @Security petstore_auth=write:pets,read:pets
//
// @SecurityDefinition petstore_auth
// @Type oauth2
// @Flow password
// @TokenUrl http://swagger.io/api/oauth/token
// @Scopes write:pets="modify pets in your account" read:pets="read your pets"
//
// @GlobalParam 	userParam		 name=user		required description="sadsadsad"		in=body schema.$ref=Witoo
// @GlobalParam 	userParam2		 name=user		required description="sadsadsad"		in=body schema.$ref=Jack
//
// @GlobalResponse notFound desc="Entity not found." schema.$ref=Witoo
// @GlobalResponse notFound2 desc="Entity not found." schema.$ref=Jack
//
// @Path /user/jack/{id}
// @Method GET
// @Param name=id required description="sadsadsad" in=path type=string
// @Param $ref=userParam2
// @Produces json
// @Consumes json
// @Summary this is summary
// @Description this is description
// @Deprecated
// @Schemes http https
// @OperationId GetStart
// @Tags a b c
// @Security petstore_auth=write:pets,read:pets
// @Response 200 desc=123123 schema.$ref=NotFound
// @Response 404 $ref=notFound
func GetJack() {
	// {
}
"#;

    const ENTITIES: &str = r#"package models

type Witoo struct {
	Name string `json:"name"`
}

type Jack struct {
	Friend *Witoo `json:"friend"`
}

type NotFound struct {
	Message string `json:"message"`
}
"#;

    fn fixture() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        write(dir.path(), "api.go", API);
        write(dir.path(), "types.go", TYPES);
        write(dir.path(), "models/entities.go", ENTITIES);
        dir
    }

    #[test]
    fn test_parse_annotated_project() {
        let dir = fixture();
        let doc = Parser::new(dir.path(), Config::default()).parse().unwrap();

        assert_eq!(doc.info.title, "Api");
        assert_eq!(doc.info.termsOfService.as_deref(), Some("Dont use"));
        assert_eq!(doc.schemes, vec!["http", "https", "ws"]);
        assert_eq!(doc.consumes, vec!["application/json", "application/xml"]);
        assert_eq!(
            doc.securityDefinitions["petstore_auth"].tokenUrl.as_deref(),
            Some("http://swagger.io/api/oauth/token")
        );
        assert_eq!(doc.parameters["userParam"].required, Some(true));
        assert_eq!(doc.parameters["userParam"].description.as_deref(), Some("sadsadsad"));

        let op = doc.paths["/user/jack/{id}"].get.as_ref().unwrap();
        assert_eq!(op.operationId.as_deref(), Some("GetStart"));
        assert_eq!(op.tags, vec!["a", "b", "c"]);
        assert_eq!(op.parameters.len(), 2);
        assert_eq!(op.parameters[1].ref_.as_deref(), Some("#/parameters/userParam2"));
        assert_eq!(op.responses["200"].description.as_deref(), Some("123123"));

        let names: Vec<&str> = doc.definitions.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "Jack",
                "NotFound",
                "Witoo",
                "models.Witoo",
                "shop.Hello1",
                "shop.Hello3",
                "shop.Hello4",
                "shop.Hello5",
                "shop.Hello6",
                "shop.Hello7",
                "shop.Hello8",
                "shop.Hello9",
            ]
        );

        let definitions = serde_json::to_value(&doc.definitions).unwrap();
        assert_eq!(
            definitions["shop.Hello1"],
            json!({ "type": "string", "description": "abcde" })
        );
        assert_eq!(
            definitions["shop.Hello3"],
            json!({ "type": "number", "format": "double" })
        );
        assert_eq!(
            definitions["shop.Hello6"],
            json!({ "$ref": "#/definitions/shop.Hello8" })
        );
        assert_eq!(
            definitions["shop.Hello9"],
            json!({
                "type": "object",
                "properties": {
                    "ebola1": { "$ref": "#/definitions/shop.Hello8" },
                    "A": { "$ref": "#/definitions/shop.Hello8" },
                    "Name": { "type": "string", "description": "comment e" },
                    "test": { "type": "integer", "format": "int32" },
                    "mapping": {
                        "type": "object",
                        "additionalProperties": { "type": "integer", "format": "int32" }
                    }
                },
                "required": ["ebola1", "A", "Name", "mapping"]
            })
        );
        assert_eq!(
            definitions["Jack"]["properties"]["friend"],
            json!({ "$ref": "#/definitions/models.Witoo" })
        );
    }

    #[test]
    fn test_dangling_definition_aborts_the_run() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "main.go",
            r#"package main

// @GlobalParam userParam name=user required in=body schema.$ref=Widget
//
// @Path /users
// @Method POST
// @Param $ref=userParam
// @Response 200 $ref=created
func main() {}
"#,
        );

        let err = Parser::new(dir.path(), Config::default()).parse().unwrap_err();
        let ParserError::DanglingReferences(missing) = &err else {
            panic!("unexpected error: {}", err);
        };
        let names: Vec<&str> = missing.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Widget", "created"]);
    }

    #[test]
    fn test_forward_reference_to_later_file() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "a_routes.go",
            "package app\n\n// @Path /widgets\n// @Method GET\n// @Response 200 schema.type=array schema.items.$ref=Widget\nfunc List() {}\n",
        );
        write(
            dir.path(),
            "z_models.go",
            "package app\n\n// @Definition Widget\n// @Property id type=int64 required\n//\n",
        );

        let doc = Parser::new(dir.path(), Config::default()).parse().unwrap();
        assert_eq!(doc.definitions["Widget"].required, vec!["id"]);
    }

    #[test]
    fn test_annotation_errors_name_the_file() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "bad.go",
            "package app\n\n// @Path /x\n// @Method FETCH\nfunc X() {}\n",
        );

        let err = Parser::new(dir.path(), Config::default()).parse().unwrap_err();
        assert!(matches!(err, ParserError::InFile { .. }));
        assert!(matches!(err.root(), ParserError::MethodParseError { .. }));
        assert!(err.to_string().contains("bad.go"));
    }

    #[test]
    fn test_compose_mode_end_to_end() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "models.go",
            r#"package app

type Audit struct {
	Created string `json:"created" swagger:"required"`
}

// @DefinitionModel
type Account struct {
	Audit
	Email string `json:"email"`
}
"#,
        );

        let config = Config {
            embedded_fields: EmbeddedFields::Compose,
            ..Default::default()
        };
        let doc = Parser::new(dir.path(), config).parse().unwrap();
        let json = Generator::new(&doc, "swagger").to_json().unwrap();

        assert!(!json.contains("allOf"));
        let account = &doc.definitions["app.Account"];
        assert_eq!(account.required, vec!["created"]);
        assert!(account.properties.contains_key("email"));
        assert!(account.properties.contains_key("created"));
    }

    #[test]
    fn test_each_parse_starts_fresh() {
        let dir = fixture();
        let parser = Parser::new(dir.path(), Config::default());

        let first = Generator::new(&parser.parse().unwrap(), "swagger").to_json().unwrap();
        let second = Generator::new(&parser.parse().unwrap(), "swagger").to_json().unwrap();
        assert_eq!(first, second);
    }
}
