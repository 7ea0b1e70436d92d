//! Type IR and the passes over it.
//!
//! - [`builder`] lowers declaration syntax into [`model::ParsedType`] trees.
//! - [`detect`] holds the structural detectors (callback-based APIs, nested callbacks,
//!   result and tagged unions).
//! - [`mapper`] names every IR shape in C#.
//! - [`names`] holds the identifier heuristics shared by all of them.

pub mod builder;
pub mod detect;
pub mod mapper;
pub mod model;
pub mod names;

pub use model::{
    ApiKind, EnumValue, GeneratedCode, Literal, NestedCallback, ParsedApi, ParsedParameter,
    ParsedType, ParsedTypeDefinition, Property, TaggedUnion, TypeDefinitionKind, TypeKind,
    UnionShape,
};
