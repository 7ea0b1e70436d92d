//! Cross-file symbol table for declared types and values.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use super::ast::{Decl, EnumMember, FunctionSig, Item, Member, TypeExpr, TypeParam};

/// A named type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSymbol {
    /// Interface, with declaration-merged members.
    Interface {
        /// Generic parameters of the first declaration.
        type_params: Vec<TypeParam>,
        /// Base types from every `extends` clause.
        extends: Vec<TypeExpr>,
        /// Members of all merged declarations.
        members: Vec<Member>,
        /// JSDoc of the first declaration.
        doc: Option<String>,
    },
    /// `type X = …`
    Alias {
        /// Generic parameters.
        type_params: Vec<TypeParam>,
        /// Aliased type.
        ty: TypeExpr,
        /// JSDoc.
        doc: Option<String>,
    },
    /// `enum X { … }`
    Enum {
        /// Members in declaration order.
        members: Vec<EnumMember>,
        /// JSDoc.
        doc: Option<String>,
    },
}

/// A named value declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSymbol {
    /// `function f(…)`, all overloads in order.
    Function {
        /// Overload signatures; the first is used.
        overloads: Vec<FunctionSig>,
        /// JSDoc of the first overload.
        doc: Option<String>,
    },
    /// `const x: T`
    Variable {
        /// Annotated type.
        ty: TypeExpr,
        /// JSDoc.
        doc: Option<String>,
    },
}

impl ValueSymbol {
    /// Leading JSDoc body.
    pub fn doc(&self) -> Option<&str> {
        match self {
            Self::Function { doc, .. } | Self::Variable { doc, .. } => doc.as_deref(),
        }
    }
}

impl TypeSymbol {
    /// Leading JSDoc body.
    pub fn doc(&self) -> Option<&str> {
        match self {
            Self::Interface { doc, .. } | Self::Alias { doc, .. } | Self::Enum { doc, .. } => {
                doc.as_deref()
            }
        }
    }
}

/// Declarations gathered from every input file.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    types: IndexMap<String, TypeSymbol>,
    values: IndexMap<String, ValueSymbol>,
    exported: HashSet<String>,
    export_names: HashMap<String, String>,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the items of one parsed file. Earlier files win on conflicts.
    pub fn add_items(&mut self, items: &[Item]) {
        for item in items {
            self.add_item(item);
        }
    }

    fn add_item(&mut self, item: &Item) {
        let doc = item.doc.clone();
        let name = match &item.decl {
            Decl::Function(sig) => {
                match self.values.get_mut(&sig.name) {
                    Some(ValueSymbol::Function { overloads, .. }) => overloads.push(sig.clone()),
                    Some(ValueSymbol::Variable { .. }) => {}
                    None => {
                        self.values.insert(
                            sig.name.clone(),
                            ValueSymbol::Function {
                                overloads: vec![sig.clone()],
                                doc,
                            },
                        );
                    }
                }
                &sig.name
            }
            Decl::Variable { name, ty } => {
                self.values
                    .entry(name.clone())
                    .or_insert_with(|| ValueSymbol::Variable { ty: ty.clone(), doc });
                name
            }
            Decl::Interface {
                name,
                type_params,
                extends,
                members,
            } => {
                match self.types.get_mut(name) {
                    Some(TypeSymbol::Interface {
                        extends: merged_extends,
                        members: merged,
                        ..
                    }) => {
                        merged_extends.extend(extends.iter().cloned());
                        merged.extend(members.iter().cloned());
                    }
                    Some(_) => {}
                    None => {
                        self.types.insert(
                            name.clone(),
                            TypeSymbol::Interface {
                                type_params: type_params.clone(),
                                extends: extends.clone(),
                                members: members.clone(),
                                doc,
                            },
                        );
                    }
                }
                name
            }
            Decl::TypeAlias {
                name,
                type_params,
                ty,
            } => {
                self.types
                    .entry(name.clone())
                    .or_insert_with(|| TypeSymbol::Alias {
                        type_params: type_params.clone(),
                        ty: ty.clone(),
                        doc,
                    });
                name
            }
            Decl::Enum { name, members } => {
                self.types
                    .entry(name.clone())
                    .or_insert_with(|| TypeSymbol::Enum {
                        members: members.clone(),
                        doc,
                    });
                name
            }
            Decl::Module { items, .. } => {
                self.add_items(items);
                return;
            }
            Decl::ExportList(specifiers) => {
                for spec in specifiers {
                    self.exported.insert(spec.local.clone());
                    if spec.exported != spec.local {
                        self.export_names
                            .insert(spec.local.clone(), spec.exported.clone());
                    }
                }
                return;
            }
        };
        if item.exported {
            self.exported.insert(name.clone());
        }
    }

    /// Looks up a type by name; qualified names fall back to their last segment.
    pub fn lookup_type(&self, name: &str) -> Option<&TypeSymbol> {
        self.types.get(name).or_else(|| {
            let (_, last) = name.rsplit_once('.')?;
            self.types.get(last)
        })
    }

    /// Enum owning a qualified member reference such as `Accuracy.High`.
    pub fn enum_of_member(&self, name: &str) -> Option<&str> {
        let (owner, _) = name.rsplit_once('.')?;
        let owner = owner.rsplit('.').next().unwrap_or(owner);
        match self.types.get_key_value(owner) {
            Some((key, TypeSymbol::Enum { .. })) => Some(key),
            _ => None,
        }
    }

    /// Looks up a value by name.
    pub fn lookup_value(&self, name: &str) -> Option<&ValueSymbol> {
        self.values.get(name)
    }

    /// Public name of an exported declaration, `None` when not exported.
    pub fn export_name<'s>(&'s self, local: &'s str) -> Option<&'s str> {
        if !self.exported.contains(local) {
            return None;
        }
        Some(self.export_names.get(local).map_or(local, String::as_str))
    }

    /// Exported values in declaration order, with their public names.
    pub fn exported_values(&self) -> Vec<(&str, &ValueSymbol)> {
        self.values
            .iter()
            .filter_map(|(name, value)| Some((self.export_name(name)?, value)))
            .collect()
    }

    /// Exported types in declaration order as `(public name, local name, symbol)`.
    pub fn exported_types(&self) -> Vec<(&str, &str, &TypeSymbol)> {
        self.types
            .iter()
            .filter_map(|(name, ty)| Some((self.export_name(name)?, name.as_str(), ty)))
            .collect()
    }
}
