//! Syntax tree for the declaration subset.

use std::fmt;

/// A top-level or module-level statement with its leading JSDoc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// JSDoc body directly preceding the statement.
    pub doc: Option<String>,
    /// Has the `export` modifier.
    pub exported: bool,
    /// The declaration.
    pub decl: Decl,
}

/// Declaration kinds the scanner cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    /// `function f<T>(…): R`
    Function(FunctionSig),
    /// `const x: T`
    Variable {
        /// Binding name.
        name: String,
        /// Annotated type.
        ty: TypeExpr,
    },
    /// `interface X<T> extends A { … }`
    Interface {
        /// Interface name.
        name: String,
        /// Generic parameters.
        type_params: Vec<TypeParam>,
        /// `extends` clause.
        extends: Vec<TypeExpr>,
        /// Body members.
        members: Vec<Member>,
    },
    /// `type X<T> = …`
    TypeAlias {
        /// Alias name.
        name: String,
        /// Generic parameters.
        type_params: Vec<TypeParam>,
        /// Aliased type.
        ty: TypeExpr,
    },
    /// `enum X { … }`
    Enum {
        /// Enum name.
        name: String,
        /// Members in order.
        members: Vec<EnumMember>,
    },
    /// `declare module "x" { … }` / `namespace X { … }`
    Module {
        /// Module or namespace name.
        name: String,
        /// Nested statements.
        items: Vec<Item>,
    },
    /// `export { a, b as c };` without a `from` clause.
    ExportList(Vec<ExportSpecifier>),
}

/// One entry of an `export { … }` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpecifier {
    /// Local binding.
    pub local: String,
    /// Exported name.
    pub exported: String,
}

/// A function or method signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSig {
    /// Declared name.
    pub name: String,
    /// Generic parameters.
    pub type_params: Vec<TypeParam>,
    /// Parameters.
    pub params: Vec<Param>,
    /// Return type (`void` when omitted).
    pub ret: TypeExpr,
}

/// Generic parameter `T extends C = D`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    /// Parameter name.
    pub name: String,
    /// `extends` constraint.
    pub constraint: Option<TypeExpr>,
    /// Default type.
    pub default: Option<TypeExpr>,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Name; `None` for destructuring patterns.
    pub name: Option<String>,
    /// Marked `?`.
    pub optional: bool,
    /// Rest parameter `...x`.
    pub rest: bool,
    /// Annotated type (`any` when omitted).
    pub ty: TypeExpr,
}

/// A member of an interface or object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Property or method name.
    pub name: String,
    /// Marked `?`.
    pub optional: bool,
    /// Property type, or the function type of a method.
    pub ty: TypeExpr,
    /// Leading JSDoc.
    pub doc: Option<String>,
    /// Member form.
    pub kind: MemberKind,
}

/// Syntactic form of a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    /// `name: T`
    Property,
    /// `name(…): R`
    Method,
    /// Call signature `(…): R`; the name is empty and `ty` is the function type.
    Call,
    /// `[key: K]: V`; `ty` holds `V`.
    Index(TypeExpr),
}

/// One enum member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    /// Member name.
    pub name: String,
    /// Initializer.
    pub value: Option<EnumInit>,
}

/// Enum initializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumInit {
    /// `= "text"`
    Str(String),
    /// `= 3` / `= -1`
    Num(String),
}

/// Type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// `string`, `number`, `void`, ...
    Keyword(String),
    /// `"text"`
    StringLit(String),
    /// `42`
    NumberLit(String),
    /// `true` / `false`
    BoolLit(bool),
    /// `Name<Args>`; qualified names keep their dots.
    Ref {
        /// Referenced name.
        name: String,
        /// Type arguments.
        args: Vec<TypeExpr>,
    },
    /// `T[]`
    Array(Box<TypeExpr>),
    /// `[A, B]`
    Tuple(Vec<TypeExpr>),
    /// `A | B`
    Union(Vec<TypeExpr>),
    /// `A & B`
    Intersection(Vec<TypeExpr>),
    /// `{ … }`
    Object(Vec<Member>),
    /// `<T>(a: A) => R`
    Function {
        /// Generic parameters.
        type_params: Vec<TypeParam>,
        /// Parameters.
        params: Vec<Param>,
        /// Return type.
        ret: Box<TypeExpr>,
    },
    /// `typeof x`
    TypeQuery(String),
    /// `keyof T`
    Keyof(Box<TypeExpr>),
    /// Mapped, conditional, indexed-access or template types, kept as text.
    Opaque(String),
}

impl TypeExpr {
    /// Shorthand for a keyword type.
    pub fn keyword(name: &str) -> Self {
        Self::Keyword(name.to_string())
    }
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeQuery(name) => write!(f, "typeof {name}"),
            Self::Keyword(name) | Self::NumberLit(name) | Self::Opaque(name) => write!(f, "{name}"),
            Self::StringLit(value) => write!(f, "\"{value}\""),
            Self::BoolLit(value) => write!(f, "{value}"),
            Self::Ref { name, args } if args.is_empty() => write!(f, "{name}"),
            Self::Ref { name, args } => write!(f, "{name}<{}>", join(args, ", ")),
            Self::Array(element) => match **element {
                Self::Union(_) | Self::Intersection(_) | Self::Function { .. } => {
                    write!(f, "({element})[]")
                }
                _ => write!(f, "{element}[]"),
            },
            Self::Tuple(items) => write!(f, "[{}]", join(items, ", ")),
            Self::Union(items) => write!(f, "{}", join(items, " | ")),
            Self::Intersection(items) => write!(f, "{}", join(items, " & ")),
            Self::Object(members) if members.is_empty() => write!(f, "{{}}"),
            Self::Object(members) => write!(f, "{{ {} }}", join(members, "; ")),
            Self::Function { params, ret, .. } => write!(f, "({}) => {ret}", join(params, ", ")),
            Self::Keyof(inner) => write!(f, "keyof {inner}"),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rest = if self.rest { "..." } else { "" };
        let name = self.name.as_deref().unwrap_or("options");
        let optional = if self.optional { "?" } else { "" };
        write!(f, "{rest}{name}{optional}: {}", self.ty)
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let optional = if self.optional { "?" } else { "" };
        match &self.kind {
            MemberKind::Index(key) => write!(f, "[{}: {key}]: {}", self.name, self.ty),
            MemberKind::Call => write!(f, "{}", self.ty),
            MemberKind::Property | MemberKind::Method => {
                write!(f, "{}{optional}: {}", self.name, self.ty)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trips_common_shapes() {
        let ty = TypeExpr::Union(vec![
            TypeExpr::Array(Box::new(TypeExpr::keyword("string"))),
            TypeExpr::Ref {
                name: "Promise".into(),
                args: vec![TypeExpr::keyword("void")],
            },
            TypeExpr::StringLit("ok".into()),
        ]);
        assert_eq!(ty.to_string(), "string[] | Promise<void> | \"ok\"");
    }

    #[test]
    fn test_display_function_and_object() {
        let ty = TypeExpr::Function {
            type_params: vec![],
            params: vec![Param {
                name: Some("e".into()),
                optional: false,
                rest: false,
                ty: TypeExpr::Object(vec![Member {
                    name: "x".into(),
                    optional: true,
                    ty: TypeExpr::keyword("number"),
                    doc: None,
                    kind: MemberKind::Property,
                }]),
            }],
            ret: Box::new(TypeExpr::keyword("void")),
        };
        assert_eq!(ty.to_string(), "(e: { x?: number }) => void");
    }
}
