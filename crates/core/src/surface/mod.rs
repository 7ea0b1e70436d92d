//! Declaration-file front end.
//!
//! The parser lowers the tree-sitter syntax tree of `.d.ts` text into [`Item`]s, the
//! [`SymbolTable`] merges them across files, and the scanner classifies the exported values
//! into APIs.

mod ast;
mod jsdoc;
mod parser;
mod scanner;
mod symbols;

pub use ast::{
    Decl, EnumInit, EnumMember, ExportSpecifier, FunctionSig, Item, Member, MemberKind, Param,
    TypeExpr, TypeParam,
};
pub use jsdoc::JsDoc;
pub use parser::{ParseError, parse_source};
pub use scanner::{
    SurfaceScan, assign_categories, discover_files, load_symbols, scan_dir, scan_symbols,
};
pub use symbols::{SymbolTable, TypeSymbol, ValueSymbol};
