//! Reads Go source text into a [`SourceFile`]: package clause, every `//`
//! comment group, and top-level `type` declarations with their struct
//! fields. Function bodies and expressions are skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_until, take_while},
    character::complete::{alpha1, alphanumeric1, char, space0, space1},
    combinator::{map, opt, recognize, value},
    multi::{many0_count, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::declarations::{
    CommentGroup, CommentLine, FieldDecl, SourceFile, StructTag, StructType, TypeDecl, TypeExpr,
    TypeName,
};
use crate::error::{ParserError, Result};

static PACKAGE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^package\s+(\w+)").unwrap());

static TYPE_LINE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^type\s+(.+)$").unwrap());

static TYPE_GROUP_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^type\s*\(\s*$").unwrap());

static TYPE_SPEC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<name>\w+)(?P<generic>\s*\[\w+(?:\s*,\s*\w+)*\s+[^\]]+\])?\s*(?P<alias>=)?\s*(?P<rest>.*)$",
    )
    .unwrap()
});

/// Reads a Go file from disk.
pub fn read_source(path: &Path) -> Result<SourceFile> {
    let content = std::fs::read_to_string(path).map_err(|source| ParserError::IOError {
        path: path.to_path_buf(),
        source,
    })?;
    parse_source(path, &content)
}

/// Parses Go source text.
pub fn parse_source(path: impl Into<PathBuf>, content: &str) -> Result<SourceFile> {
    let path = path.into();
    let lines: Vec<&str> = content.lines().collect();
    let comments = collect_comment_groups(&lines);
    let reader = Reader::new(&path, &lines, &comments);

    let (package, types) = reader.read_declarations()?;
    debug!(
        "Read {:?}: package {}, {} comment groups, {} types",
        path,
        package,
        comments.len(),
        types.len()
    );

    Ok(SourceFile {
        path,
        package,
        comments,
        types,
    })
}

/// Groups adjacent full-line `//` comments.
fn collect_comment_groups(lines: &[&str]) -> Vec<CommentGroup> {
    let mut groups = Vec::new();
    let mut current = CommentGroup::default();

    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("//") {
            current.lines.push(CommentLine::new(index + 1, trimmed));
        } else if !current.lines.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
    }
    if !current.lines.is_empty() {
        groups.push(current);
    }
    groups
}

/// Tracks literal and block-comment state across lines while counting braces.
#[derive(Default)]
struct BraceCounter {
    in_raw_string: bool,
    in_block_comment: bool,
}

impl BraceCounter {
    fn count(&mut self, line: &str) -> i32 {
        let mut depth = 0;
        let mut chars = line.chars().peekable();
        let mut in_string: Option<char> = None;

        while let Some(c) = chars.next() {
            if self.in_block_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.in_block_comment = false;
                }
                continue;
            }
            if self.in_raw_string {
                if c == '`' {
                    self.in_raw_string = false;
                }
                continue;
            }
            if let Some(quote) = in_string {
                if c == '\\' {
                    chars.next();
                } else if c == quote {
                    in_string = None;
                }
                continue;
            }
            match c {
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.in_block_comment = true;
                }
                '`' => self.in_raw_string = true,
                '"' | '\'' => in_string = Some(c),
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
        depth
    }
}

/// Code part of a line, without a trailing `//` comment.
fn strip_line_comment(line: &str) -> &str {
    let mut in_string: Option<char> = None;
    let mut escaped = false;
    let bytes = line.as_bytes();

    for (index, c) in line.char_indices() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' && quote != '`' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '`' | '\'' => in_string = Some(c),
            '/' if bytes.get(index + 1) == Some(&b'/') => return &line[..index],
            _ => {}
        }
    }
    line
}

struct Reader<'a> {
    path: &'a Path,
    lines: &'a [&'a str],
    comments: &'a [CommentGroup],
    // last line of a comment group -> group index
    group_ends: HashMap<usize, usize>,
}

impl<'a> Reader<'a> {
    fn new(path: &'a Path, lines: &'a [&'a str], comments: &'a [CommentGroup]) -> Self {
        let group_ends = comments
            .iter()
            .enumerate()
            .map(|(index, group)| (group.last_line(), index))
            .collect();
        Self {
            path,
            lines,
            comments,
            group_ends,
        }
    }

    fn error(&self, index: usize, message: impl Into<String>) -> ParserError {
        ParserError::SourceParseError {
            path: self.path.to_path_buf(),
            line: index + 1,
            message: message.into(),
        }
    }

    /// Doc comment directly above the 0-based line `index`.
    fn doc_before(&self, index: usize) -> Vec<CommentLine> {
        self.group_ends
            .get(&index)
            .map(|group| self.comments[*group].lines.clone())
            .unwrap_or_default()
    }

    fn read_declarations(&self) -> Result<(String, Vec<TypeDecl>)> {
        let mut package = String::new();
        let mut types = Vec::new();
        let mut braces = BraceCounter::default();
        let mut depth = 0;
        let mut i = 0;

        while i < self.lines.len() {
            let code = strip_line_comment(self.lines[i]).trim();
            let top_level = depth == 0 && !braces.in_raw_string && !braces.in_block_comment;

            if top_level {
                if package.is_empty() {
                    if let Some(captures) = PACKAGE_REGEX.captures(code) {
                        package = captures[1].to_string();
                        i += 1;
                        continue;
                    }
                }
                if TYPE_GROUP_REGEX.is_match(code) {
                    self.read_type_group(&mut i, &mut types)?;
                    i += 1;
                    continue;
                }
                if let Some(captures) = TYPE_LINE_REGEX.captures(code) {
                    let spec = captures[1].to_string();
                    let doc = self.doc_before(i);
                    types.push(self.read_type_spec(&mut i, &spec, doc)?);
                    i += 1;
                    continue;
                }
            }

            depth += braces.count(self.lines[i]);
            i += 1;
        }

        if package.is_empty() {
            return Err(self.error(0, "missing package clause"));
        }
        Ok((package, types))
    }

    fn read_type_group(&self, i: &mut usize, types: &mut Vec<TypeDecl>) -> Result<()> {
        let group_doc = self.doc_before(*i);
        let start = *i;
        *i += 1;

        while *i < self.lines.len() {
            let code = strip_line_comment(self.lines[*i]).trim();
            if code == ")" {
                return Ok(());
            }
            if !code.is_empty() {
                let mut doc = self.doc_before(*i);
                if doc.is_empty() {
                    doc = group_doc.clone();
                }
                let spec = code.to_string();
                types.push(self.read_type_spec(i, &spec, doc)?);
            }
            *i += 1;
        }
        Err(self.error(start, "unterminated type group"))
    }

    /// One `Name [=] <type>` spec starting on line `i`. Multi-line bodies
    /// advance `i` to their closing line.
    fn read_type_spec(
        &self,
        i: &mut usize,
        spec: &str,
        doc: Vec<CommentLine>,
    ) -> Result<TypeDecl> {
        let line = *i;
        let Some(captures) = TYPE_SPEC_REGEX.captures(spec) else {
            return Err(self.error(line, format!("cannot parse type declaration: {}", spec)));
        };
        let name = captures["name"].to_string();
        let body = captures["rest"].trim();

        let ty = if captures.name("generic").is_some() {
            if body.ends_with('{') {
                self.skip_block(i)?;
            }
            debug!("Skipping body of generic type {}", name);
            TypeExpr::Unsupported(format!("generic type {}", name))
        } else {
            self.read_type_body(i, body)?
        };

        Ok(TypeDecl {
            name,
            ty,
            doc,
            line: line + 1,
        })
    }

    /// Type expression text on line `i`, reading following lines when it
    /// opens a struct or interface body.
    fn read_type_body(&self, i: &mut usize, text: &str) -> Result<TypeExpr> {
        if !text.ends_with('{') {
            return Ok(parse_type_text(text).unwrap_or_else(|| TypeExpr::Unsupported(text.into())));
        }

        let (head, keyword) = split_body_head(text);
        match keyword {
            Some("struct") => {
                let (body, _) = self.read_struct_body(i)?;
                let mut expr = parse_type_text(&format!("{}struct{{}}", head))
                    .ok_or_else(|| self.error(*i, format!("cannot parse type: {}", text)))?;
                fill_anonymous_struct(&mut expr, body);
                Ok(expr)
            }
            Some(_) => {
                self.skip_block(i)?;
                Ok(parse_type_text(&format!("{}interface{{}}", head))
                    .unwrap_or_else(|| TypeExpr::Unsupported(text.into())))
            }
            None => {
                self.skip_block(i)?;
                Ok(TypeExpr::Unsupported(text.into()))
            }
        }
    }

    /// Fields of a struct whose `{` ends line `i`. Leaves `i` on the closing
    /// line and returns whatever follows the closing brace.
    fn read_struct_body(&self, i: &mut usize) -> Result<(StructType, String)> {
        let start = *i;
        let mut fields = Vec::new();
        *i += 1;

        while *i < self.lines.len() {
            let line = *i;
            let code = strip_line_comment(self.lines[line]).trim();

            if code.is_empty() {
                *i += 1;
                continue;
            }
            if let Some(trailing) = code.strip_prefix('}') {
                return Ok((StructType { fields }, trailing.trim().to_string()));
            }

            let mut field = if code.ends_with('{') {
                self.read_nested_field(i, code)?
            } else if paren_depth(code) > 0 {
                self.read_unparsed_field(i, code)
            } else {
                match parse_field_line(code) {
                    Some(field) => field,
                    None => self.read_unparsed_field(i, code),
                }
            };
            field.doc = self.doc_before(line);
            fields.push(field);
            *i += 1;
        }
        Err(self.error(start, "unterminated struct"))
    }

    /// A field the grammar cannot read on one line, such as a func type whose
    /// parameters span several lines. Continuation lines are joined while
    /// parentheses stay open; anything still unreadable is kept as an
    /// unsupported type so it only fails if a schema needs it.
    fn read_unparsed_field(&self, i: &mut usize, code: &str) -> FieldDecl {
        let line = *i;
        let mut text = code.to_string();
        let mut depth = paren_depth(code);
        while depth > 0 && *i + 1 < self.lines.len() {
            let next = strip_line_comment(self.lines[*i + 1]).trim();
            if next.starts_with('}') {
                break;
            }
            *i += 1;
            depth += paren_depth(next);
            text.push(' ');
            text.push_str(next);
        }

        if let Some(field) = parse_field_line(&text) {
            return field;
        }
        warn!(
            "{:?} line {}: cannot read field `{}`, keeping it as unsupported",
            self.path,
            line + 1,
            text
        );
        let (names, ty) = match text.split_once(char::is_whitespace) {
            Some((name, ty)) if identifier(name).map_or(false, |(rest, _)| rest.is_empty()) => {
                (vec![name.to_string()], ty.trim().to_string())
            }
            _ => (Vec::new(), text.clone()),
        };
        FieldDecl {
            names,
            ty: TypeExpr::Unsupported(ty),
            tag: None,
            doc: Vec::new(),
        }
    }

    /// A field whose type opens a multi-line body, e.g. `Meta struct {`.
    fn read_nested_field(&self, i: &mut usize, code: &str) -> Result<FieldDecl> {
        let line = *i;
        let (head, keyword) = split_body_head(code);
        let (body, trailing) = match keyword {
            Some("struct") => {
                let (body, trailing) = self.read_struct_body(i)?;
                (Some(body), trailing)
            }
            _ => (None, self.skip_block(i)?),
        };
        let placeholder = if body.is_some() { "struct{}" } else { "interface{}" };
        let synthetic = format!("{}{} {}", head, placeholder, trailing);

        let mut field = parse_field_line(synthetic.trim())
            .ok_or_else(|| self.error(line, format!("cannot parse field: {}", code)))?;
        if let Some(body) = body {
            fill_anonymous_struct(&mut field.ty, body);
        }
        Ok(field)
    }

    /// Skips a `{ ... }` block opened on line `i`; returns the text after the
    /// closing brace.
    fn skip_block(&self, i: &mut usize) -> Result<String> {
        let start = *i;
        let mut braces = BraceCounter::default();
        let mut depth = 0;

        while *i < self.lines.len() {
            depth += braces.count(self.lines[*i]);
            if depth <= 0 {
                let code = strip_line_comment(self.lines[*i]).trim();
                let trailing = code.rsplit_once('}').map(|(_, t)| t).unwrap_or_default();
                return Ok(trailing.trim().to_string());
            }
            *i += 1;
        }
        Err(self.error(start, "unterminated block"))
    }
}

fn paren_depth(text: &str) -> i32 {
    text.chars().fold(0, |depth, c| match c {
        '(' => depth + 1,
        ')' => depth - 1,
        _ => depth,
    })
}

/// Splits `Items []struct {` into (`Items []`, `struct`).
fn split_body_head(text: &str) -> (&str, Option<&str>) {
    let without_brace = text.trim_end_matches('{').trim_end();
    for keyword in ["struct", "interface"] {
        if let Some(head) = without_brace.strip_suffix(keyword) {
            return (head, Some(keyword));
        }
    }
    (without_brace, None)
}

/// Replaces the first empty anonymous struct in `expr` with `body`.
fn fill_anonymous_struct(expr: &mut TypeExpr, body: StructType) -> bool {
    match expr {
        TypeExpr::Struct(existing) if existing.fields.is_empty() => {
            *existing = body;
            true
        }
        TypeExpr::Pointer(inner) | TypeExpr::Slice(inner) => fill_anonymous_struct(inner, body),
        TypeExpr::Map { value, .. } => fill_anonymous_struct(value, body),
        _ => false,
    }
}

/// Parses a complete type expression; `None` if anything is left over.
pub fn parse_type_text(text: &str) -> Option<TypeExpr> {
    match terminated(type_expr, space0)(text.trim()) {
        Ok(("", expr)) => Some(expr),
        _ => None,
    }
}

/// Parses one struct field line: `Name, Other Type `tag``.
pub fn parse_field_line(text: &str) -> Option<FieldDecl> {
    match terminated(field_decl, pair(space0, opt(char(';'))))(text.trim()) {
        Ok((remaining, field)) if remaining.trim().is_empty() => Some(field),
        _ => None,
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn type_name(input: &str) -> IResult<&str, TypeName> {
    map(
        pair(identifier, opt(preceded(char('.'), identifier))),
        |(first, second)| match second {
            Some(name) => TypeName::qualified(first, name),
            None => TypeName::local(first),
        },
    )(input)
}

fn named_type(input: &str) -> IResult<&str, TypeExpr> {
    map(
        pair(type_name, opt(delimited(char('['), is_not("]"), char(']')))),
        |(name, arguments)| match arguments {
            Some(arguments) => TypeExpr::Unsupported(format!("{}[{}]", name, arguments)),
            None => TypeExpr::Named(name),
        },
    )(input)
}

fn pointer_type(input: &str) -> IResult<&str, TypeExpr> {
    map(preceded(char('*'), type_expr), |inner| {
        TypeExpr::Pointer(Box::new(inner))
    })(input)
}

fn slice_type(input: &str) -> IResult<&str, TypeExpr> {
    map(
        preceded(
            tuple((char('['), take_while(|c| c != ']'), char(']'))),
            type_expr,
        ),
        |inner| TypeExpr::Slice(Box::new(inner)),
    )(input)
}

fn map_type(input: &str) -> IResult<&str, TypeExpr> {
    map(
        tuple((
            tag("map"),
            space0,
            char('['),
            type_expr,
            space0,
            char(']'),
            type_expr,
        )),
        |(_, _, _, key, _, _, value)| TypeExpr::Map {
            key: Box::new(key),
            value: Box::new(value),
        },
    )(input)
}

fn struct_type(input: &str) -> IResult<&str, TypeExpr> {
    map(
        tuple((
            tag("struct"),
            space0,
            char('{'),
            space0,
            separated_list0(tuple((space0, char(';'), space0)), field_decl),
            space0,
            opt(char(';')),
            space0,
            char('}'),
        )),
        |(_, _, _, _, fields, _, _, _, _)| TypeExpr::Struct(StructType { fields }),
    )(input)
}

fn interface_type(input: &str) -> IResult<&str, TypeExpr> {
    value(
        TypeExpr::Interface,
        tuple((tag("interface"), space0, char('{'), take_until("}"), char('}'))),
    )(input)
}

/// Everything up to a struct tag.
fn not_tag(input: &str) -> IResult<&str, &str> {
    take_while(|c| c != '`')(input)
}

fn func_type(input: &str) -> IResult<&str, TypeExpr> {
    map(recognize(tuple((tag("func"), space0, char('('), not_tag))), |text: &str| {
        TypeExpr::Unsupported(text.trim().to_string())
    })(input)
}

fn chan_type(input: &str) -> IResult<&str, TypeExpr> {
    map(
        recognize(tuple((
            alt((tag("<-chan"), tag("chan"))),
            alt((space1, tag("<-"))),
            not_tag,
        ))),
        |text: &str| TypeExpr::Unsupported(text.trim().to_string()),
    )(input)
}

fn type_expr(input: &str) -> IResult<&str, TypeExpr> {
    preceded(
        space0,
        alt((
            pointer_type,
            slice_type,
            map_type,
            struct_type,
            interface_type,
            func_type,
            chan_type,
            named_type,
        )),
    )(input)
}

fn struct_tag(input: &str) -> IResult<&str, StructTag> {
    map(
        alt((
            delimited(char('`'), take_until("`"), char('`')),
            delimited(char('"'), take_until("\""), char('"')),
        )),
        |text: &str| StructTag(text.replace("\\\"", "\"")),
    )(input)
}

fn named_field(input: &str) -> IResult<&str, (Vec<String>, TypeExpr)> {
    pair(
        separated_list1(
            tuple((space0, char(','), space0)),
            map(identifier, str::to_string),
        ),
        preceded(space1, type_expr),
    )(input)
}

fn embedded_field(input: &str) -> IResult<&str, (Vec<String>, TypeExpr)> {
    map(type_expr, |ty| (Vec::new(), ty))(input)
}

fn field_decl(input: &str) -> IResult<&str, FieldDecl> {
    map(
        pair(
            alt((named_field, embedded_field)),
            opt(preceded(space0, struct_tag)),
        ),
        |((names, ty), tag)| FieldDecl {
            names,
            ty,
            tag,
            doc: Vec::new(),
        },
    )(input)
}
