//! Minimal C# syntax tree for the generated type-definition files.
//!
//! Only the constructs the generator emits are modelled: serializable classes with
//! fields, expression-bodied properties and block methods, and enums.

/// A whole `.cs` file inside the `AppsInToss` namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsFile {
    /// Pre-rendered header comment.
    pub header: String,
    /// `using` directives without the keyword.
    pub usings: Vec<String>,
    /// Namespace wrapping every item.
    pub namespace: String,
    /// Top-level items in output order.
    pub items: Vec<CsItem>,
}

/// A namespace-level item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsItem {
    /// `// ===` banner comment.
    Section(String),
    /// Class declaration.
    Class(CsClass),
    /// Enum declaration.
    Enum(CsEnum),
}

/// `public class Name { … }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsClass {
    /// Class name.
    pub name: String,
    /// XML summary text.
    pub doc: Option<String>,
    /// Attributes without brackets, e.g. `Serializable`.
    pub attributes: Vec<String>,
    /// Members in output order.
    pub members: Vec<CsMember>,
}

/// A class member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsMember {
    /// Public field.
    Field(CsField),
    /// Expression-bodied read-only property.
    Property(CsProperty),
    /// Method with a block body.
    Method(CsMethod),
    /// Nested static class of string constants.
    Constants(CsConstants),
}

/// `public Type Name;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsField {
    /// Field name.
    pub name: String,
    /// C# type.
    pub ty: String,
    /// XML summary text.
    pub doc: Option<String>,
    /// Attributes without brackets.
    pub attributes: Vec<String>,
}

/// `public Type Name => expr;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsProperty {
    /// Property name.
    pub name: String,
    /// C# type.
    pub ty: String,
    /// Getter expression.
    pub expr: String,
    /// Attributes without brackets.
    pub attributes: Vec<String>,
}

/// A method: full signature plus body statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsMethod {
    /// Everything before the body, e.g. `public bool IsOk()`.
    pub signature: String,
    /// Body statements, one per line, without outer braces.
    pub body: Vec<String>,
}

/// `public static class Name { public const string A = "a"; }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsConstants {
    /// Nested class name.
    pub name: String,
    /// `(identifier, value)` pairs.
    pub values: Vec<(String, String)>,
}

/// `public enum Name { … }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsEnum {
    /// Enum name.
    pub name: String,
    /// XML summary text.
    pub doc: Option<String>,
    /// Members in declaration order.
    pub members: Vec<CsEnumMember>,
}

/// One enum member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsEnumMember {
    /// Member identifier.
    pub name: String,
    /// Explicit numeric value.
    pub value: Option<String>,
    /// Wire value for `[EnumMember(Value = …)]`.
    pub wire: Option<String>,
}

impl CsClass {
    /// `[Serializable] [Preserve]` class without members.
    pub fn serializable(name: impl Into<String>, doc: Option<String>) -> Self {
        Self {
            name: name.into(),
            doc,
            attributes: vec!["Serializable".to_string(), "Preserve".to_string()],
            members: Vec::new(),
        }
    }
}
