//! Lowers the tree-sitter TypeScript syntax tree of a declaration file into [`Item`]s.
//!
//! Covers what a published `.d.ts` bundle uses: functions, variables, interfaces, type
//! aliases, enums, namespaces and export lists. Classes, imports and re-exports are
//! skipped. Mapped, conditional, indexed-access and template-literal types are kept as
//! [`TypeExpr::Opaque`] text.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::{Node, Parser};

use super::ast::{
    Decl, EnumInit, EnumMember, ExportSpecifier, FunctionSig, Item, Member, MemberKind, Param,
    TypeExpr, TypeParam,
};

const TYPE_KEYWORDS: &[&str] = &[
    "string",
    "number",
    "boolean",
    "void",
    "any",
    "unknown",
    "never",
    "object",
    "null",
    "undefined",
    "bigint",
    "symbol",
    "this",
];

/// `import("./path").` qualifiers in type position.
static IMPORT_QUALIFIER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"import\(\s*["'][^"']*["']\s*\)\."#).ok());

/// Parse failure with a 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Line number.
    pub line: usize,
    /// Column number.
    pub column: usize,
    /// What went wrong.
    pub message: String,
}

impl ParseError {
    fn at(node: Node<'_>, message: impl Into<String>) -> Self {
        let point = node.start_position();
        Self {
            line: point.row + 1,
            column: point.column + 1,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parses one declaration file into items.
///
/// Any syntax error in the file fails the parse.
pub fn parse_source(src: &str) -> Result<Vec<Item>, ParseError> {
    let src = blank_import_qualifiers(src);
    let src = src.as_ref();
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
        .map_err(|e| ParseError {
            line: 1,
            column: 1,
            message: format!("TypeScript grammar unavailable: {e}"),
        })?;
    let tree = parser.parse(src, None).ok_or_else(|| ParseError {
        line: 1,
        column: 1,
        message: "parser returned no tree".to_string(),
    })?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(syntax_error(root, src));
    }
    Ok(Lowering { src }.statements(root))
}

/// Blanks `import("x").` so `import("x").A.B` reads as the qualified name `A.B`.
///
/// The replacement keeps every line and column in place.
fn blank_import_qualifiers(src: &str) -> Cow<'_, str> {
    match IMPORT_QUALIFIER.as_ref() {
        Some(re) => re.replace_all(src, |caps: &regex::Captures<'_>| {
            caps[0]
                .chars()
                .map(|c| if c == '\n' { '\n' } else { ' ' })
                .collect::<String>()
        }),
        None => Cow::Borrowed(src),
    }
}

fn syntax_error(root: Node<'_>, src: &str) -> ParseError {
    let Some(bad) = find_error(root) else {
        return ParseError::at(root, "syntax error");
    };
    if bad.is_missing() {
        return ParseError::at(bad, format!("expected `{}`", bad.kind()));
    }
    let text = src.get(bad.byte_range()).unwrap_or_default();
    let snippet: String = text.chars().take(40).collect();
    ParseError::at(bad, format!("unexpected `{}`", snippet.trim()))
}

fn find_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    node.children(&mut cursor).find_map(find_error)
}

/// First named child that is not a comment.
fn first_named(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).find(|c| c.kind() != "comment")
}

fn named_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).find(|c| c.kind() == kind)
}

/// Whether `node` has a direct anonymous child spelled `token`.
fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == token)
}

/// `{ [K in keyof T]: … }`
fn is_mapped(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .any(|c| c.kind() == "index_signature" && named_of_kind(c, "mapped_type_clause").is_some())
}

/// Strips the leading `*` column of a JSDoc block.
fn clean_doc(body: &str) -> String {
    body.lines()
        .map(|line| {
            let trimmed = line.trim();
            trimmed
                .strip_prefix('*')
                .map_or(trimmed, |rest| rest.strip_prefix(' ').unwrap_or(rest))
                .trim_end()
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Value of a quoted string literal with simple escapes resolved.
fn unquote(raw: &str) -> String {
    let inner = raw.get(1..raw.len().saturating_sub(1)).unwrap_or_default();
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some('r') => value.push('\r'),
            Some(other) => value.push(other),
            None => {}
        }
    }
    value
}

fn compact(text: &str) -> String {
    text.split_whitespace().collect()
}

struct Lowering<'s> {
    src: &'s str,
}

impl<'s> Lowering<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        self.src.get(node.byte_range()).unwrap_or_default()
    }

    fn doc_comment(&self, node: Node<'_>) -> Option<String> {
        let body = self.text(node).strip_prefix("/**")?.strip_suffix("*/")?;
        Some(clean_doc(body))
    }

    /// Identifier, string or number used as a member, enum or export name.
    fn property_name(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "string" => Some(unquote(self.text(node))),
            "computed_property_name" => None,
            _ => Some(self.text(node).to_string()),
        }
    }

    // ── Statements ─────────────────────────────────────────────────

    fn statements(&self, container: Node<'_>) -> Vec<Item> {
        let mut items = Vec::new();
        let mut doc = None;
        let mut cursor = container.walk();
        for child in container.named_children(&mut cursor) {
            if child.kind() == "comment" {
                if let Some(body) = self.doc_comment(child) {
                    doc = Some(body);
                }
                continue;
            }
            self.statement(child, doc.take(), false, &mut items);
        }
        items
    }

    fn statement(&self, node: Node<'_>, doc: Option<String>, exported: bool, out: &mut Vec<Item>) {
        match node.kind() {
            "export_statement" => return self.export_statement(node, doc, out),
            "ambient_declaration" => return self.ambient(node, doc, exported, out),
            "expression_statement" => {
                if let Some(inner) = first_named(node).filter(|n| n.kind() == "internal_module") {
                    self.statement(inner, doc, exported, out);
                }
                return;
            }
            _ => {}
        }
        let item = |decl: Decl| Item {
            doc: doc.clone(),
            exported,
            decl,
        };
        match node.kind() {
            "function_signature" | "function_declaration" => {
                if let Some(sig) = self.function_sig(node) {
                    out.push(item(Decl::Function(sig)));
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = node.walk();
                for declarator in node.named_children(&mut cursor) {
                    if let Some((name, ty)) = self.declarator(declarator) {
                        out.push(item(Decl::Variable { name, ty }));
                    }
                }
            }
            "interface_declaration" => {
                if let Some(decl) = self.interface(node) {
                    out.push(item(decl));
                }
            }
            "type_alias_declaration" => {
                if let Some(decl) = self.type_alias(node) {
                    out.push(item(decl));
                }
            }
            "enum_declaration" => {
                if let Some(decl) = self.enumeration(node) {
                    out.push(item(decl));
                }
            }
            "module" | "internal_module" => {
                let name = node.child_by_field_name("name").map(|n| match n.kind() {
                    "string" => unquote(self.text(n)),
                    _ => compact(self.text(n)),
                });
                if let (Some(name), Some(body)) = (name, node.child_by_field_name("body")) {
                    out.push(item(Decl::Module {
                        name,
                        items: self.statements(body),
                    }));
                }
            }
            _ => {}
        }
    }

    fn export_statement(&self, node: Node<'_>, doc: Option<String>, out: &mut Vec<Item>) {
        let reexport = node.child_by_field_name("source").is_some()
            || ["default", "=", "*", "as"]
                .iter()
                .any(|token| has_token(node, token));
        if reexport {
            return;
        }
        if let Some(declaration) = node.child_by_field_name("declaration") {
            self.statement(declaration, doc, true, out);
            return;
        }
        let Some(clause) = named_of_kind(node, "export_clause") else {
            return;
        };
        let mut specifiers = Vec::new();
        let mut cursor = clause.walk();
        for spec in clause.named_children(&mut cursor) {
            if spec.kind() != "export_specifier" {
                continue;
            }
            let Some(local) = spec
                .child_by_field_name("name")
                .and_then(|n| self.property_name(n))
            else {
                continue;
            };
            let exported = spec
                .child_by_field_name("alias")
                .and_then(|n| self.property_name(n))
                .unwrap_or_else(|| local.clone());
            specifiers.push(ExportSpecifier { local, exported });
        }
        out.push(Item {
            doc,
            exported: true,
            decl: Decl::ExportList(specifiers),
        });
    }

    /// `declare …`, including `declare global { … }`.
    fn ambient(&self, node: Node<'_>, doc: Option<String>, exported: bool, out: &mut Vec<Item>) {
        if has_token(node, "global") {
            if let Some(block) = named_of_kind(node, "statement_block") {
                out.push(Item {
                    doc,
                    exported,
                    decl: Decl::Module {
                        name: "global".to_string(),
                        items: self.statements(block),
                    },
                });
            }
            return;
        }
        if let Some(declaration) = first_named(node) {
            self.statement(declaration, doc, exported, out);
        }
    }

    fn function_sig(&self, node: Node<'_>) -> Option<FunctionSig> {
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let (type_params, params, ret) = self.signature(node, "void");
        Some(FunctionSig {
            name,
            type_params,
            params,
            ret,
        })
    }

    /// Destructuring declarators are skipped.
    fn declarator(&self, node: Node<'_>) -> Option<(String, TypeExpr)> {
        if node.kind() != "variable_declarator" {
            return None;
        }
        let name = node
            .child_by_field_name("name")
            .filter(|n| n.kind() == "identifier")?;
        let ty = node
            .child_by_field_name("type")
            .map_or_else(|| TypeExpr::keyword("any"), |t| self.annotation(t));
        Some((self.text(name).to_string(), ty))
    }

    fn interface(&self, node: Node<'_>) -> Option<Decl> {
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let extends = named_of_kind(node, "extends_type_clause")
            .map(|clause| {
                let mut cursor = clause.walk();
                clause
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() != "comment")
                    .map(|c| self.ty(c))
                    .collect()
            })
            .unwrap_or_default();
        let members = node
            .child_by_field_name("body")
            .map(|body| self.members(body))
            .unwrap_or_default();
        Some(Decl::Interface {
            name,
            type_params: self.type_params_of(node),
            extends,
            members,
        })
    }

    fn type_alias(&self, node: Node<'_>) -> Option<Decl> {
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let ty = self.ty(node.child_by_field_name("value")?);
        Some(Decl::TypeAlias {
            name,
            type_params: self.type_params_of(node),
            ty,
        })
    }

    fn enumeration(&self, node: Node<'_>) -> Option<Decl> {
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let body = node.child_by_field_name("body")?;
        let mut members = Vec::new();
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            let (name_node, value) = match child.kind() {
                "comment" => continue,
                "enum_assignment" => (
                    child.child_by_field_name("name"),
                    child
                        .child_by_field_name("value")
                        .and_then(|v| self.enum_init(v)),
                ),
                _ => (Some(child), None),
            };
            if let Some(member_name) = name_node.and_then(|n| self.property_name(n)) {
                members.push(EnumMember {
                    name: member_name,
                    value,
                });
            }
        }
        Some(Decl::Enum { name, members })
    }

    fn enum_init(&self, value: Node<'_>) -> Option<EnumInit> {
        match value.kind() {
            "string" => Some(EnumInit::Str(unquote(self.text(value)))),
            "number" => Some(EnumInit::Num(self.text(value).to_string())),
            "unary_expression" => {
                let text = compact(self.text(value));
                let digits = text.strip_prefix('-')?;
                digits
                    .starts_with(|c: char| c.is_ascii_digit())
                    .then_some(EnumInit::Num(text))
            }
            _ => None,
        }
    }

    // ── Signatures ─────────────────────────────────────────────────

    /// Type parameters, parameters and return type of a function-like node.
    fn signature(&self, node: Node<'_>, default_ret: &str) -> (Vec<TypeParam>, Vec<Param>, TypeExpr) {
        let params = node
            .child_by_field_name("parameters")
            .map(|n| self.params(n))
            .unwrap_or_default();
        let ret = node
            .child_by_field_name("return_type")
            .map_or_else(|| TypeExpr::keyword(default_ret), |n| self.annotation(n));
        (self.type_params_of(node), params, ret)
    }

    fn type_params_of(&self, node: Node<'_>) -> Vec<TypeParam> {
        let Some(list) = node.child_by_field_name("type_parameters") else {
            return Vec::new();
        };
        let mut params = Vec::new();
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            if param.kind() != "type_parameter" {
                continue;
            }
            let Some(name) = param.child_by_field_name("name") else {
                continue;
            };
            let clause = |field: &str| {
                param
                    .child_by_field_name(field)
                    .and_then(first_named)
                    .map(|t| self.ty(t))
            };
            params.push(TypeParam {
                name: self.text(name).to_string(),
                constraint: clause("constraint"),
                default: clause("value"),
            });
        }
        params
    }

    fn params(&self, list: Node<'_>) -> Vec<Param> {
        let mut params = Vec::new();
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
                continue;
            }
            let pattern = param.child_by_field_name("pattern");
            let (name, rest) = match pattern.map(|p| (p, p.kind())) {
                Some((_, "this")) => continue,
                Some((p, "identifier")) => (Some(self.text(p).to_string()), false),
                Some((p, "rest_pattern")) => (
                    first_named(p)
                        .filter(|n| n.kind() == "identifier")
                        .map(|n| self.text(n).to_string()),
                    true,
                ),
                _ => (None, false),
            };
            let ty = param
                .child_by_field_name("type")
                .map_or_else(|| TypeExpr::keyword("any"), |t| self.annotation(t));
            let optional =
                param.kind() == "optional_parameter" || param.child_by_field_name("value").is_some();
            params.push(Param {
                name,
                optional,
                rest,
                ty,
            });
        }
        params
    }

    /// `: T`, `?: T`, `: x is T` or `: asserts x`.
    fn annotation(&self, node: Node<'_>) -> TypeExpr {
        match node.kind() {
            "type_predicate_annotation" => TypeExpr::keyword("boolean"),
            "asserts_annotation" => TypeExpr::keyword("void"),
            "type_annotation" | "opting_type_annotation" | "omitting_type_annotation"
            | "adding_type_annotation" => {
                first_named(node).map_or_else(|| TypeExpr::keyword("any"), |t| self.ty(t))
            }
            _ => self.ty(node),
        }
    }

    // ── Types ──────────────────────────────────────────────────────

    fn ty(&self, node: Node<'_>) -> TypeExpr {
        let text = self.text(node);
        match node.kind() {
            "predefined_type" if text.starts_with("unique") => TypeExpr::keyword("symbol"),
            "predefined_type" => TypeExpr::keyword(text),
            "this_type" | "this" => TypeExpr::keyword("this"),
            "type_identifier" | "identifier" if TYPE_KEYWORDS.contains(&text) => {
                TypeExpr::keyword(text)
            }
            "type_identifier" | "identifier" | "nested_type_identifier" | "nested_identifier" => {
                TypeExpr::Ref {
                    name: compact(text),
                    args: Vec::new(),
                }
            }
            "generic_type" => {
                let name = node
                    .child_by_field_name("name")
                    .map_or_else(|| compact(text), |n| compact(self.text(n)));
                TypeExpr::Ref {
                    name,
                    args: self.type_args(node),
                }
            }
            "array_type" => TypeExpr::Array(Box::new(self.first_type(node))),
            "readonly_type" | "parenthesized_type" | "optional_type" | "rest_type" => {
                self.first_type(node)
            }
            "tuple_type" => {
                let mut cursor = node.walk();
                TypeExpr::Tuple(
                    node.named_children(&mut cursor)
                        .filter(|c| c.kind() != "comment")
                        .map(|c| self.tuple_member(c))
                        .collect(),
                )
            }
            "union_type" => self.flattened(node, TypeExpr::Union),
            "intersection_type" => self.flattened(node, TypeExpr::Intersection),
            "object_type" if is_mapped(node) => TypeExpr::Opaque(text.to_string()),
            "object_type" => TypeExpr::Object(self.members(node)),
            "function_type" => {
                let (type_params, params, ret) = self.signature(node, "void");
                TypeExpr::Function {
                    type_params,
                    params,
                    ret: Box::new(ret),
                }
            }
            "literal_type" => self.literal(node),
            "type_query" => {
                let target = first_named(node).map_or("", |n| self.text(n));
                // `typeof import("x")` names no declaration.
                if target.starts_with("import") {
                    return TypeExpr::TypeQuery("any".to_string());
                }
                TypeExpr::TypeQuery(compact(target.split('<').next().unwrap_or_default()))
            }
            "index_type_query" => TypeExpr::Keyof(Box::new(self.first_type(node))),
            "type_predicate" => TypeExpr::keyword("boolean"),
            "asserts" => TypeExpr::keyword("void"),
            _ => TypeExpr::Opaque(text.to_string()),
        }
    }

    fn first_type(&self, node: Node<'_>) -> TypeExpr {
        first_named(node).map_or_else(|| TypeExpr::keyword("any"), |t| self.ty(t))
    }

    fn type_args(&self, node: Node<'_>) -> Vec<TypeExpr> {
        let Some(list) = node
            .child_by_field_name("type_arguments")
            .or_else(|| named_of_kind(node, "type_arguments"))
        else {
            return Vec::new();
        };
        let mut cursor = list.walk();
        list.named_children(&mut cursor)
            .filter(|c| c.kind() != "comment")
            .map(|c| self.ty(c))
            .collect()
    }

    /// `a | b | c` nests to the left; flattens it back into one list.
    fn flattened(&self, node: Node<'_>, wrap: fn(Vec<TypeExpr>) -> TypeExpr) -> TypeExpr {
        let mut members = Vec::new();
        self.collect_operands(node, node.kind(), &mut members);
        if members.len() == 1 {
            members.remove(0)
        } else {
            wrap(members)
        }
    }

    fn collect_operands(&self, node: Node<'_>, kind: &str, out: &mut Vec<TypeExpr>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == kind {
                self.collect_operands(child, kind, out);
            } else if child.kind() != "comment" {
                out.push(self.ty(child));
            }
        }
    }

    fn tuple_member(&self, node: Node<'_>) -> TypeExpr {
        match node.kind() {
            "tuple_parameter" | "optional_tuple_parameter" => node
                .child_by_field_name("type")
                .map_or_else(|| TypeExpr::keyword("any"), |t| self.annotation(t)),
            _ => self.ty(node),
        }
    }

    fn literal(&self, node: Node<'_>) -> TypeExpr {
        let Some(value) = first_named(node) else {
            return TypeExpr::Opaque(self.text(node).to_string());
        };
        let text = self.text(value);
        match value.kind() {
            "string" => TypeExpr::StringLit(unquote(text)),
            "number" | "unary_expression" => TypeExpr::NumberLit(compact(text)),
            "true" => TypeExpr::BoolLit(true),
            "false" => TypeExpr::BoolLit(false),
            _ => TypeExpr::keyword(text),
        }
    }

    /// Members of an object type or interface body.
    fn members(&self, body: Node<'_>) -> Vec<Member> {
        let mut members = Vec::new();
        let mut doc = None;
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            if child.kind() == "comment" {
                if let Some(text) = self.doc_comment(child) {
                    doc = Some(text);
                }
                continue;
            }
            if let Some(member) = self.member(child, doc.take()) {
                members.push(member);
            }
        }
        members
    }

    /// Construct signatures, setters and computed keys yield `None`.
    fn member(&self, node: Node<'_>, doc: Option<String>) -> Option<Member> {
        match node.kind() {
            "property_signature" => {
                let name = self.property_name(node.child_by_field_name("name")?)?;
                let ty = node
                    .child_by_field_name("type")
                    .map_or_else(|| TypeExpr::keyword("any"), |t| self.annotation(t));
                Some(Member {
                    name,
                    optional: has_token(node, "?"),
                    ty,
                    doc,
                    kind: MemberKind::Property,
                })
            }
            "method_signature" => {
                if has_token(node, "set") {
                    return None;
                }
                let name = self.property_name(node.child_by_field_name("name")?)?;
                let optional = has_token(node, "?");
                let (type_params, params, ret) = self.signature(node, "any");
                if has_token(node, "get") {
                    return Some(Member {
                        name,
                        optional,
                        ty: ret,
                        doc,
                        kind: MemberKind::Property,
                    });
                }
                Some(Member {
                    name,
                    optional,
                    ty: TypeExpr::Function {
                        type_params,
                        params,
                        ret: Box::new(ret),
                    },
                    doc,
                    kind: MemberKind::Method,
                })
            }
            "call_signature" => {
                let (type_params, params, ret) = self.signature(node, "any");
                Some(Member {
                    name: String::new(),
                    optional: false,
                    ty: TypeExpr::Function {
                        type_params,
                        params,
                        ret: Box::new(ret),
                    },
                    doc,
                    kind: MemberKind::Call,
                })
            }
            "index_signature" => {
                let name = self.text(node.child_by_field_name("name")?).to_string();
                let key = self.ty(node.child_by_field_name("index_type")?);
                let ty = node
                    .child_by_field_name("type")
                    .map_or_else(|| TypeExpr::keyword("any"), |t| self.annotation(t));
                Some(Member {
                    name,
                    optional: false,
                    ty,
                    doc,
                    kind: MemberKind::Index(key),
                })
            }
            _ => None,
        }
    }
}
