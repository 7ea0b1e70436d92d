//! Type IR: the closed set of shapes every declared type is reduced to.

/// A literal value carried by a primitive literal type or an enum member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// `"text"`
    String(String),
    /// Numeric literal kept as written.
    Number(String),
    /// `true` / `false`
    Bool(bool),
}

/// A parsed type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedType {
    /// Shape of the type.
    pub kind: TypeKind,
    /// Declaration text, used for naming heuristics and diagnostics.
    pub raw: String,
    /// Declared with `?` or defaulted.
    pub optional: bool,
    /// Union with `null`/`undefined` collapsed into this type.
    pub is_nullable: bool,
}

/// Closed set of IR variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// `string`, `number`, `boolean`, `void`, `any`, ... and their literals.
    Primitive {
        /// Keyword name (`string` for a string literal).
        name: String,
        /// Present for literal types.
        literal: Option<Literal>,
    },
    /// `T[]`, `Array<T>`, `ReadonlyArray<T>` and tuples.
    Array {
        /// Element type.
        element: Box<ParsedType>,
    },
    /// Interface, object literal or opaque named object.
    Object {
        /// Declared name; `None` for anonymous object literals.
        name: Option<String>,
        /// Members; empty for opaque external types.
        properties: Vec<Property>,
    },
    /// `A | B | ...` after nullish members were collapsed.
    Union {
        /// Alias name when the union was declared as a named type.
        name: Option<String>,
        /// Remaining members.
        members: Vec<ParsedType>,
        /// Structural classification.
        shape: UnionShape,
    },
    /// `(a: A) => R`
    Function {
        /// Parameters.
        params: Vec<ParsedParameter>,
        /// Return type.
        return_type: Box<ParsedType>,
    },
    /// `Record<K, V>` or an index-signature-only object.
    Record {
        /// Key type.
        key: Box<ParsedType>,
        /// Value type.
        value: Box<ParsedType>,
    },
    /// `Promise<T>`
    Promise {
        /// Resolved type.
        inner: Box<ParsedType>,
    },
    /// Anything the builder could not reduce.
    Unknown {
        /// Best-effort name.
        name: String,
    },
}

/// Classification of a union's members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnionShape {
    /// No structural pattern.
    Plain,
    /// One object member plus string-literal error codes.
    Result {
        /// The success payload type.
        success: Box<ParsedType>,
        /// Error code literals in declaration order.
        error_codes: Vec<String>,
    },
    /// Object members sharing a string-literal discriminator.
    Tagged(TaggedUnion),
}

/// A discriminated union merged into one property set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedUnion {
    /// Discriminator property name.
    pub discriminator: String,
    /// Tag value of each member, in member order.
    pub tags: Vec<String>,
    /// Union of all member properties; optional unless present in every member.
    pub merged: Vec<Property>,
}

/// A property of an object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Declared name.
    pub name: String,
    /// Property type.
    pub ty: ParsedType,
    /// Declared with `?` or nullable.
    pub optional: bool,
    /// JSDoc text.
    pub description: Option<String>,
}

/// A function or API parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedParameter {
    /// Parameter name (destructured parameters are renamed `options`).
    pub name: String,
    /// Parameter type.
    pub ty: ParsedType,
    /// Declared with `?`, a default, or nullable.
    pub optional: bool,
    /// `@param` text.
    pub description: Option<String>,
}

/// How an API is invoked across the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKind {
    /// Plain call returning a value or promise.
    Function,
    /// Takes `{ onEvent, onError }` and returns a disposer.
    CallbackBased,
    /// One event of an `addEventListener` namespace.
    EventSubscription {
        /// Event key in the event map.
        event_name: String,
        /// Payload type of `onEvent`; `None` for payload-less events.
        event_data: Option<Box<ParsedType>>,
    },
}

/// A callback below the top level of an options object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedCallback {
    /// Property name of the callback.
    pub name: String,
    /// Property path from the options object.
    pub path: Vec<String>,
    /// Type of the first callback parameter.
    pub parameter_type: Option<ParsedType>,
    /// Declared return type.
    pub return_type: Option<ParsedType>,
}

/// One scanned API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedApi {
    /// Lookup name (`fn`, `nsMethod` or `NsSubscribeEvent`).
    pub name: String,
    /// Host-side method name.
    pub pascal_name: String,
    /// Name to call in the browser.
    pub original_name: String,
    /// Resolved category.
    pub category: String,
    /// Owning namespace object, if any.
    pub namespace: Option<String>,
    /// Parameters in declaration order.
    pub parameters: Vec<ParsedParameter>,
    /// Declared return type.
    pub return_type: ParsedType,
    /// Returns a promise.
    pub is_async: bool,
    /// Invocation style.
    pub kind: ApiKind,
    /// Callbacks nested inside the options object.
    pub nested_callbacks: Vec<NestedCallback>,
    /// `@deprecated` message.
    pub deprecated: Option<String>,
    /// JSDoc description.
    pub description: Option<String>,
}

/// A named enum or interface declared on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTypeDefinition {
    /// Declared name.
    pub name: String,
    /// Definition body.
    pub kind: TypeDefinitionKind,
    /// JSDoc text.
    pub description: Option<String>,
}

/// Body of a standalone type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDefinitionKind {
    /// TS enum or string-literal union alias.
    Enum {
        /// Members in declaration order.
        values: Vec<EnumValue>,
    },
    /// Interface or object-literal alias.
    Interface {
        /// Members.
        properties: Vec<Property>,
    },
}

/// One enum member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    /// Declared member name; `None` for string-literal unions.
    pub name: Option<String>,
    /// Member value.
    pub value: Literal,
}

/// Generated text for one API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    /// API pascal name.
    pub api: String,
    /// Category file the method lives in.
    pub category: String,
    /// Host method plus extern declaration.
    pub host_code: String,
    /// Glue function(s).
    pub glue_code: String,
}

impl ParsedType {
    /// Creates a type with default flags.
    pub fn new(kind: TypeKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
            optional: false,
            is_nullable: false,
        }
    }

    /// Keyword primitive such as `string` or `void`.
    pub fn primitive(name: &str) -> Self {
        Self::new(
            TypeKind::Primitive {
                name: name.to_string(),
                literal: None,
            },
            name,
        )
    }

    /// Unresolved type.
    pub fn unknown(name: &str) -> Self {
        Self::new(
            TypeKind::Unknown {
                name: name.to_string(),
            },
            name,
        )
    }

    /// Returns the primitive keyword, if this is a primitive.
    pub fn primitive_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Primitive { name, .. } => Some(name),
            _ => None,
        }
    }

    /// `void` or `undefined`.
    pub fn is_void(&self) -> bool {
        matches!(self.primitive_name(), Some("void" | "undefined"))
    }

    /// `null`, `undefined` or `void`.
    pub fn is_nullish(&self) -> bool {
        matches!(self.primitive_name(), Some("void" | "undefined" | "null"))
    }

    /// String literal value, if this is one.
    pub fn string_literal(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Primitive {
                literal: Some(Literal::String(value)),
                ..
            } => Some(value),
            _ => None,
        }
    }

    /// Literal values when this is a union of string literals only.
    pub fn string_literal_members(&self) -> Option<Vec<&str>> {
        let TypeKind::Union { members, .. } = &self.kind else {
            return None;
        };
        let values: Option<Vec<&str>> = members.iter().map(ParsedType::string_literal).collect();
        values.filter(|v| !v.is_empty())
    }

    /// Properties of an object, or the merged properties of a tagged union.
    pub fn properties(&self) -> Option<&[Property]> {
        match &self.kind {
            TypeKind::Object { properties, .. } => Some(properties),
            TypeKind::Union {
                shape: UnionShape::Tagged(tagged),
                ..
            } => Some(&tagged.merged),
            _ => None,
        }
    }

    /// Declared name of an object or union.
    pub fn declared_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Object { name, .. } | TypeKind::Union { name, .. } => name.as_deref(),
            TypeKind::Unknown { name } => Some(name),
            _ => None,
        }
    }

    /// An object literal with members and no declared name.
    pub fn is_anonymous_object(&self) -> bool {
        matches!(&self.kind, TypeKind::Object { name: None, properties } if !properties.is_empty())
    }

    /// Object with a property of the given name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties()?.iter().find(|p| p.name == name)
    }

    /// Short IR kind label for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            TypeKind::Primitive { .. } => "primitive",
            TypeKind::Array { .. } => "array",
            TypeKind::Object { .. } => "object",
            TypeKind::Union { .. } => "union",
            TypeKind::Function { .. } => "function",
            TypeKind::Record { .. } => "record",
            TypeKind::Promise { .. } => "promise",
            TypeKind::Unknown { .. } => "unknown",
        }
    }

    /// Unwraps `Promise<T>` to `T`.
    pub fn awaited(&self) -> &ParsedType {
        match &self.kind {
            TypeKind::Promise { inner } => inner,
            _ => self,
        }
    }

    /// Success type and error codes when this is (a promise of) a result-style union.
    pub fn result_shape(&self) -> Option<(&ParsedType, &[String])> {
        match &self.awaited().kind {
            TypeKind::Union {
                shape:
                    UnionShape::Result {
                        success,
                        error_codes,
                    },
                ..
            } => Some((success, error_codes)),
            _ => None,
        }
    }
}

impl ParsedApi {
    /// Callback-based API (sync host signature).
    pub fn is_callback_based(&self) -> bool {
        matches!(self.kind, ApiKind::CallbackBased)
    }

    /// Event-subscription API.
    pub fn is_event_subscription(&self) -> bool {
        matches!(self.kind, ApiKind::EventSubscription { .. })
    }

    /// Event key for subscriptions.
    pub fn event_name(&self) -> Option<&str> {
        match &self.kind {
            ApiKind::EventSubscription { event_name, .. } => Some(event_name),
            _ => None,
        }
    }

    /// Event payload type for subscriptions.
    pub fn event_data(&self) -> Option<&ParsedType> {
        match &self.kind {
            ApiKind::EventSubscription { event_data, .. } => event_data.as_deref(),
            _ => None,
        }
    }

    /// Marked `@deprecated`.
    pub fn is_deprecated(&self) -> bool {
        self.deprecated.is_some()
    }
}
