//! The annotation-block parser.
//!
//! A comment group is scanned for header directives (`@Swagger`,
//! `@SecurityDefinition`, `@GlobalParam`, `@GlobalResponse`, `@Path`,
//! `@Definition`). Multi-line blocks run until a bare `//` line or the end of
//! the group. Every block handler returns how many lines it consumed, header
//! included and terminator excluded, and [`AnnotationParser::read_zone`]
//! resumes right after them.

use log::{debug, warn};
use url::Url;

use crate::declarations::CommentLine;
use crate::document::{
    append_description, definition_key, definition_ref, push_required, PARAMETERS_PREFIX,
    RESPONSES_PREFIX,
};
use crate::error::{ParserError, Result};
use crate::models::{
    Document, HttpMethod, Items, Operation, Parameter, Response, Schema,
};
use crate::tokenizer::{
    find_tag_start, is_terminator, parse_key_value_run, parse_number, scope_map, split_tag_and_rest,
    split_words, KeyValues,
};
use crate::validator::References;
use crate::vocabulary::{mime_type, type_format, Tag, Vocabulary};

/// Decodes a comment line into its tag, the keyword as written, and the
/// remaining text. Unknown keywords yield `None`.
pub fn directive<'t>(vocabulary: &Vocabulary, text: &'t str) -> Option<(Tag, &'t str, &'t str)> {
    let start = find_tag_start(text)?;
    let (keyword, rest) = split_tag_and_rest(&text[start..]);
    vocabulary.lookup(keyword).map(|tag| (tag, keyword, rest))
}

/// Number of lines before the block terminator. The header line at index 0
/// always belongs to the block.
fn block_len(lines: &[CommentLine]) -> usize {
    lines
        .iter()
        .skip(1)
        .position(|line| is_terminator(&line.text))
        .map_or(lines.len(), |offset| offset + 1)
}

/// `(type, format)` for a `type=` value. Unknown names pass through as the type.
fn apply_type(value: &str) -> (Option<String>, Option<String>) {
    match type_format(value) {
        Some((type_, format)) => (Some(type_.to_string()), format.map(str::to_string)),
        None => (Some(value.to_string()), None),
    }
}

fn is_required(value: &str) -> bool {
    !value.trim().eq_ignore_ascii_case("false")
}

fn warn_invalid_url(directive: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        if let Err(err) = Url::parse(value) {
            warn!("{} has an invalid URL {:?}: {}", directive, value, err);
        }
    }
}

/// Options read from a declaration's own doc comment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocOptions {
    pub name: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    pub type_: Option<String>,
    pub enum_values: Vec<String>,
    pub definition_model: bool,
}

pub fn doc_options(vocabulary: &Vocabulary, lines: &[CommentLine]) -> DocOptions {
    let mut options = DocOptions::default();
    for line in lines {
        let Some((tag, _, rest)) = directive(vocabulary, &line.text) else {
            continue;
        };
        match tag {
            Tag::Name if options.name.is_none() => options.name = Some(rest.to_string()),
            Tag::Description => append_description(&mut options.description, rest),
            Tag::Required => options.required = true,
            Tag::Type => options.type_ = Some(rest.to_string()),
            Tag::Enum => options.enum_values = split_words(rest),
            Tag::DefinitionModel => options.definition_model = true,
            _ => {}
        }
    }
    options
}

pub struct AnnotationParser<'a> {
    vocabulary: &'a Vocabulary,
    references: &'a mut References,
}

impl<'a> AnnotationParser<'a> {
    pub fn new(vocabulary: &'a Vocabulary, references: &'a mut References) -> Self {
        Self {
            vocabulary,
            references,
        }
    }

    fn directive<'t>(&self, text: &'t str) -> Option<(Tag, &'t str, &'t str)> {
        directive(self.vocabulary, text)
    }

    /// Scans one comment group, dispatching every header directive.
    pub fn read_zone(&mut self, doc: &mut Document, lines: &[CommentLine]) -> Result<()> {
        let mut i = 0;
        while i < lines.len() {
            let rest = &lines[i..];
            let consumed = match self.directive(&rest[0].text).map(|(tag, ..)| tag) {
                Some(Tag::Swagger) => self.parse_swagger(doc, rest)?,
                Some(Tag::SecurityDefinition) => self.parse_security_definition(doc, rest)?,
                Some(Tag::GlobalParam) => self.parse_global_param(doc, &rest[0])?,
                Some(Tag::GlobalResponse) => self.parse_global_response(doc, &rest[0])?,
                Some(Tag::Path) => self.parse_path(doc, rest)?,
                Some(Tag::Definition) => self.parse_definition(doc, rest)?,
                _ => 1,
            };
            i += consumed.max(1);
        }
        Ok(())
    }

    pub fn parse_swagger(&mut self, doc: &mut Document, lines: &[CommentLine]) -> Result<usize> {
        let end = block_len(lines);
        for line in &lines[..end] {
            let Some((tag, keyword, rest)) = self.directive(&line.text) else {
                continue;
            };
            match tag {
                Tag::Swagger => {}
                Tag::Title => doc.info.title = rest.to_string(),
                Tag::Description => append_description(&mut doc.info.description, rest),
                Tag::BasePath => doc.basePath = Some(rest.to_string()),
                Tag::Host => doc.host = Some(rest.to_string()),
                Tag::Term => doc.info.termsOfService = Some(rest.to_string()),
                Tag::Version => doc.info.version = rest.to_string(),
                Tag::Contact => {
                    let values = parse_key_value_run(rest, '=');
                    let contact = doc.info.contact.get_or_insert_with(Default::default);
                    if let Some(name) = values.get("name") {
                        contact.name = Some(name.to_string());
                    }
                    if let Some(url) = values.get("url") {
                        contact.url = Some(url.to_string());
                    }
                    if let Some(email) = values.get("email") {
                        contact.email = Some(email.to_string());
                    }
                    warn_invalid_url(keyword, contact.url.as_deref());
                }
                Tag::License => {
                    let values = parse_key_value_run(rest, '=');
                    let license = doc.info.license.get_or_insert_with(Default::default);
                    if let Some(name) = values.get("name") {
                        license.name = Some(name.to_string());
                    }
                    if let Some(url) = values.get("url") {
                        license.url = Some(url.to_string());
                    }
                    warn_invalid_url(keyword, license.url.as_deref());
                }
                Tag::Schemes => doc.schemes = split_words(rest),
                Tag::Consumes => doc.consumes = split_words(rest).iter().map(|m| mime_type(m)).collect(),
                Tag::Produces => doc.produces = split_words(rest).iter().map(|m| mime_type(m)).collect(),
                Tag::Security => doc.security.push(scope_map(rest)),
                _ => debug!("Ignoring {} in @Swagger block", keyword),
            }
        }
        Ok(end)
    }

    pub fn parse_security_definition(
        &mut self,
        doc: &mut Document,
        lines: &[CommentLine],
    ) -> Result<usize> {
        let end = block_len(lines);
        let mut current = String::new();

        for line in &lines[..end] {
            let Some((tag, keyword, rest)) = self.directive(&line.text) else {
                continue;
            };
            if tag == Tag::SecurityDefinition {
                if rest.is_empty() {
                    return Err(ParserError::annotation(keyword, &line.text));
                }
                current = rest.to_string();
                doc.security_scheme_mut(&current);
                continue;
            }

            let scheme = doc.security_scheme_mut(&current);
            match tag {
                Tag::Name => scheme.name = Some(rest.to_string()),
                Tag::Type => scheme.type_ = Some(rest.to_string()),
                Tag::Description => append_description(&mut scheme.description, rest),
                Tag::In => scheme.in_type = Some(rest.to_string()),
                Tag::Flow => scheme.flow = Some(rest.to_string()),
                Tag::AuthorizationUrl => {
                    scheme.authorizationUrl = Some(rest.to_string());
                    warn_invalid_url(keyword, Some(rest));
                }
                Tag::TokenUrl => {
                    scheme.tokenUrl = Some(rest.to_string());
                    warn_invalid_url(keyword, Some(rest));
                }
                Tag::Scopes => {
                    for (scope, description) in parse_key_value_run(rest, '=').iter() {
                        scheme.scopes.insert(scope.to_string(), description.to_string());
                    }
                }
                _ => debug!("Ignoring {} in @SecurityDefinition block", keyword),
            }
        }
        Ok(end)
    }

    /// Splits `@Global... <name> <key=value...>`.
    fn global_parts<'t>(&self, line: &'t CommentLine) -> Result<(&'t str, &'t str, &'t str)> {
        let text = find_tag_start(&line.text).map_or("", |start| &line.text[start..]);
        let (keyword, remainder) = split_tag_and_rest(text);
        let (name, rest) = split_tag_and_rest(remainder);
        if name.is_empty() || rest.is_empty() {
            return Err(ParserError::annotation(keyword, &line.text));
        }
        Ok((keyword, name, rest))
    }

    pub fn parse_global_param(&mut self, doc: &mut Document, line: &CommentLine) -> Result<usize> {
        let (keyword, name, rest) = self.global_parts(line)?;
        let parameter = self.parse_param(keyword, &parse_key_value_run(rest, '='))?;
        doc.register_parameter(name, parameter);
        Ok(1)
    }

    pub fn parse_global_response(&mut self, doc: &mut Document, line: &CommentLine) -> Result<usize> {
        let (keyword, name, rest) = self.global_parts(line)?;
        let response = self.parse_response(keyword, &parse_key_value_run(rest, '='))?;
        doc.register_response(name, response);
        Ok(1)
    }

    pub fn parse_path(&mut self, doc: &mut Document, lines: &[CommentLine]) -> Result<usize> {
        let end = block_len(lines);
        let mut route = String::new();
        let mut method: Option<HttpMethod> = None;

        for line in &lines[..end] {
            let Some((tag, keyword, rest)) = self.directive(&line.text) else {
                continue;
            };
            match tag {
                Tag::Path => {
                    if rest.is_empty() {
                        return Err(ParserError::annotation(keyword, &line.text));
                    }
                    route = rest.to_string();
                    doc.path_mut(&route);
                    method = None;
                }
                Tag::Method => {
                    let verb = rest.to_uppercase().parse::<HttpMethod>().map_err(|_| {
                        ParserError::MethodParseError {
                            method: rest.to_string(),
                            text: line.text.clone(),
                        }
                    })?;
                    doc.start_operation(&route, verb);
                    method = Some(verb);
                }
                Tag::Param if method.is_none() => {
                    let parameter = self.parse_param(keyword, &parse_key_value_run(rest, '='))?;
                    doc.path_mut(&route).parameters.push(parameter);
                }
                Tag::Param
                | Tag::Response
                | Tag::Security
                | Tag::Tags
                | Tag::Summary
                | Tag::Description
                | Tag::Consumes
                | Tag::Produces
                | Tag::Schemes
                | Tag::OperationId
                | Tag::Deprecated => {
                    let Some(verb) = method else {
                        return Err(ParserError::MissingMethodError {
                            directive: keyword.to_string(),
                            route,
                        });
                    };
                    let operation = doc.operation_mut(&route, verb);
                    self.apply_operation_tag(operation, tag, keyword, rest, &line.text)?;
                }
                _ => debug!("Ignoring {} in @Path block {}", keyword, route),
            }
        }
        Ok(end)
    }

    fn apply_operation_tag(
        &mut self,
        operation: &mut Operation,
        tag: Tag,
        keyword: &str,
        rest: &str,
        text: &str,
    ) -> Result<()> {
        match tag {
            Tag::Param => {
                let parameter = self.parse_param(keyword, &parse_key_value_run(rest, '='))?;
                operation.parameters.push(parameter);
            }
            Tag::Response => {
                let (code, remainder) = split_tag_and_rest(rest);
                if code.is_empty() {
                    return Err(ParserError::annotation(keyword, text));
                }
                let response = self.parse_response(keyword, &parse_key_value_run(remainder, '='))?;
                operation.responses.insert(code.to_string(), response);
            }
            Tag::Security => operation.security.push(scope_map(rest)),
            Tag::Tags => operation.tags = split_words(rest),
            Tag::Summary => operation.summary = Some(rest.to_string()),
            Tag::Description => append_description(&mut operation.description, rest),
            Tag::Consumes => operation.consumes = split_words(rest).iter().map(|m| mime_type(m)).collect(),
            Tag::Produces => operation.produces = split_words(rest).iter().map(|m| mime_type(m)).collect(),
            Tag::Schemes => operation.schemes = split_words(rest),
            Tag::OperationId => operation.operationId = Some(rest.to_string()),
            Tag::Deprecated => operation.deprecated = Some(true),
            _ => {}
        }
        Ok(())
    }

    /// Reads one `@Definition` block. A second `@Definition` header ends the
    /// block, so `read_zone` dispatches it on its own.
    pub fn parse_definition(&mut self, doc: &mut Document, lines: &[CommentLine]) -> Result<usize> {
        let Some(header) = lines.first() else {
            return Ok(0);
        };
        let block = block_len(lines);
        let end = lines[1..block]
            .iter()
            .position(|line| matches!(self.directive(&line.text), Some((Tag::Definition, ..))))
            .map_or(block, |offset| offset + 1);
        let Some((_, keyword, rest)) = self.directive(&header.text) else {
            return Ok(end);
        };
        let name = definition_key(rest);
        if name.is_empty() {
            return Err(ParserError::annotation(keyword, &header.text));
        }
        if doc.has_definition(&name) {
            debug!("Definition {} already declared, skipping {} lines", name, end);
            return Ok(end);
        }

        let mut schema = Schema::default();
        for line in &lines[1..end] {
            let Some((tag, keyword, rest)) = self.directive(&line.text) else {
                continue;
            };
            match tag {
                Tag::Description => append_description(&mut schema.description, rest),
                Tag::Property => {
                    let (property, remainder) = split_tag_and_rest(rest);
                    if property.is_empty() || remainder.is_empty() {
                        return Err(ParserError::annotation(keyword, &line.text));
                    }
                    self.parse_property(
                        keyword,
                        &mut schema,
                        property,
                        &parse_key_value_run(remainder, '='),
                    )?;
                }
                Tag::Type => (schema.type_, schema.format) = apply_type(rest),
                Tag::Required => {
                    for required in split_words(rest) {
                        push_required(&mut schema.required, &required);
                    }
                }
                Tag::Enum if schema.enum_values.is_empty() => schema.enum_values = split_words(rest),
                Tag::Items => {
                    let items = schema.items.get_or_insert_with(Default::default);
                    for (key, value) in parse_key_value_run(rest, '=').iter() {
                        self.parse_schema_key(keyword, items, key, value)?;
                    }
                }
                _ => debug!("Ignoring {} in @Definition {}", keyword, name),
            }
        }

        doc.definitions.insert(name, schema);
        Ok(end)
    }

    fn parse_property(
        &mut self,
        directive: &str,
        definition: &mut Schema,
        name: &str,
        values: &KeyValues,
    ) -> Result<()> {
        let mut property = Schema::default();
        for (key, value) in values.iter() {
            if key == "required" {
                if is_required(value) {
                    push_required(&mut definition.required, name);
                }
                continue;
            }
            self.parse_schema_key(directive, &mut property, key, value)?;
        }
        definition.properties.insert(name.to_string(), property);
        Ok(())
    }

    /// Builds a parameter from its key/value run.
    pub fn parse_param(&mut self, directive: &str, values: &KeyValues) -> Result<Parameter> {
        let mut parameter = Parameter::default();
        for (key, value) in values.iter() {
            match key {
                "name" => parameter.name = Some(value.to_string()),
                "$ref" => {
                    parameter.ref_ = Some(format!("{}{}", PARAMETERS_PREFIX, value));
                    self.references.use_parameter(value);
                }
                "in" => parameter.in_type = Some(value.to_string()),
                "description" | "desc" => parameter.description = Some(value.to_string()),
                "required" => parameter.required = Some(is_required(value)),
                "type" => (parameter.type_, parameter.format) = apply_type(value),
                "format" => parameter.format = Some(value.to_string()),
                "allowEmptyValue" => parameter.allowEmptyValue = Some(is_required(value)),
                "default" => parameter.default = Some(value.to_string()),
                "enum" => parameter.enum_values = split_words(value),
                _ => {
                    if let Some(sub_key) = key.strip_prefix("schema.") {
                        let schema = parameter.schema.get_or_insert_with(Default::default);
                        self.parse_schema_key(directive, schema, sub_key, value)?;
                    } else if let Some(sub_key) = key.strip_prefix("items.") {
                        let items = parameter.items.get_or_insert_with(Default::default);
                        self.parse_items_key(directive, items, sub_key, value)?;
                    } else if let Some(slot) = parameter.constraints.slot_mut(key) {
                        *slot = Some(parse_number(directive, key, value)?);
                    } else {
                        debug!("Ignoring unknown {} key {}", directive, key);
                    }
                }
            }
        }
        Ok(parameter)
    }

    /// Applies one (possibly dotted) key to a schema.
    pub fn parse_schema_key(
        &mut self,
        directive: &str,
        schema: &mut Schema,
        key: &str,
        value: &str,
    ) -> Result<()> {
        match key {
            "type" | "format" if schema.ref_.is_some() => {
                debug!("Ignoring {} schema key {} next to $ref", directive, key)
            }
            "type" => (schema.type_, schema.format) = apply_type(value),
            "format" => schema.format = Some(value.to_string()),
            "$ref" => {
                let name = definition_key(value);
                schema.ref_ = Some(definition_ref(&name));
                (schema.type_, schema.format, schema.items) = (None, None, None);
                self.references.use_definition(&name);
            }
            "description" | "desc" => schema.description = Some(value.to_string()),
            "enum" => schema.enum_values = split_words(value),
            _ => match key.strip_prefix("items.") {
                Some(_) if schema.ref_.is_some() => {
                    debug!("Ignoring {} schema key {} next to $ref", directive, key)
                }
                Some(sub_key) => {
                    let items = schema.items.get_or_insert_with(Default::default);
                    self.parse_schema_key(directive, items, sub_key, value)?;
                }
                None => debug!("Ignoring unknown {} schema key {}", directive, key),
            },
        }
        Ok(())
    }

    fn parse_items_key(
        &mut self,
        directive: &str,
        items: &mut Items,
        key: &str,
        value: &str,
    ) -> Result<()> {
        match key {
            "$ref" => {
                let name = definition_key(value);
                items.ref_ = Some(definition_ref(&name));
                (items.type_, items.format) = (None, None);
                self.references.use_definition(&name);
            }
            "type" | "format" if items.ref_.is_some() => {
                debug!("Ignoring {} items key {} next to $ref", directive, key)
            }
            "type" => (items.type_, items.format) = apply_type(value),
            "format" => items.format = Some(value.to_string()),
            "default" => items.default = Some(value.to_string()),
            "enum" => items.enum_values = split_words(value),
            _ => match items.constraints.slot_mut(key) {
                Some(slot) => *slot = Some(parse_number(directive, key, value)?),
                None => debug!("Ignoring unknown {} items key {}", directive, key),
            },
        }
        Ok(())
    }

    /// Builds a response from its key/value run.
    pub fn parse_response(&mut self, directive: &str, values: &KeyValues) -> Result<Response> {
        let mut response = Response::default();
        for (key, value) in values.iter() {
            match key {
                "$ref" => {
                    response.ref_ = Some(format!("{}{}", RESPONSES_PREFIX, value));
                    self.references.use_response(value);
                }
                "description" | "desc" => response.description = Some(value.to_string()),
                _ => {
                    if let Some(sub_key) = key.strip_prefix("schema.") {
                        let schema = response.schema.get_or_insert_with(Default::default);
                        self.parse_schema_key(directive, schema, sub_key, value)?;
                    } else if let Some((header, field)) = key
                        .strip_prefix("headers.")
                        .and_then(|rest| rest.rsplit_once('.'))
                    {
                        let header = response.headers.entry(header.to_string()).or_default();
                        match field {
                            "type" => (header.type_, header.format) = apply_type(value),
                            "format" => header.format = Some(value.to_string()),
                            "description" | "desc" => header.description = Some(value.to_string()),
                            "default" => header.default = Some(value.to_string()),
                            _ => debug!("Ignoring unknown header key {}", key),
                        }
                    } else {
                        debug!("Ignoring unknown {} key {}", directive, key);
                    }
                }
            }
        }
        if response.ref_.is_none() && response.description.is_none() {
            response.description = Some(String::new());
        }
        Ok(response)
    }
}
