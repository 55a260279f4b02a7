//! Modules: the top-level container produced by deserialization.

use alloc::{string::String, vec::Vec};

use crate::{
    attribute::{AttrDict, Attribute},
    enums::{AddressingModel, Capability, ExecutionMode, ExecutionModel, MemoryModel},
    function::Function,
    sourceloc::Location,
    types::{Type, TypeStore},
};

/// Binary format version, `major.minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

/// Version, capabilities and extensions required by a module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VceTriple {
    pub version: Version,
    pub capabilities: Vec<Capability>,
    pub extensions: Vec<String>,
}

/// `spirv.GlobalVariable`
#[derive(Debug, Clone)]
pub struct GlobalVariable {
    pub name: String,
    /// Pointer type of the variable
    pub ty: Type,
    /// Symbol of the initializer
    pub initializer: Option<String>,
    pub attrs: AttrDict,
    pub loc: Location,
}

/// `spirv.SpecConstant`
#[derive(Debug, Clone)]
pub struct SpecConstant {
    pub name: String,
    pub default_value: Attribute,
    pub ty: Type,
    pub attrs: AttrDict,
}

/// `spirv.SpecConstantComposite`
#[derive(Debug, Clone)]
pub struct SpecConstantComposite {
    pub name: String,
    pub ty: Type,
    pub constituents: Vec<String>,
}

/// `spirv.EXT.SpecConstantCompositeReplicate`
#[derive(Debug, Clone)]
pub struct SpecConstantCompositeReplicate {
    pub name: String,
    pub ty: Type,
    pub constituent: String,
}

/// `spirv.EntryPoint`
#[derive(Debug, Clone)]
pub struct EntryPoint {
    pub execution_model: ExecutionModel,
    pub function: String,
    pub interface: Vec<String>,
}

/// `spirv.ExecutionMode`
#[derive(Debug, Clone)]
pub struct ExecutionModeDecl {
    pub function: String,
    pub mode: ExecutionMode,
    pub values: Vec<u32>,
}

#[derive(Debug, Clone)]
pub enum ModuleItem {
    GlobalVariable(GlobalVariable),
    SpecConstant(SpecConstant),
    SpecConstantComposite(SpecConstantComposite),
    SpecConstantCompositeReplicate(SpecConstantCompositeReplicate),
    Function(Function),
    EntryPoint(EntryPoint),
    ExecutionMode(ExecutionModeDecl),
}

/// A module: type store, header data and items in definition order
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub types: TypeStore,
    pub addressing_model: Option<AddressingModel>,
    pub memory_model: Option<MemoryModel>,
    pub vce: Option<VceTriple>,
    pub items: Vec<ModuleItem>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item and return its index
    pub fn push(&mut self, item: ModuleItem) -> usize {
        self.items.push(item);
        self.items.len() - 1
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.items.iter().filter_map(|item| match item {
            ModuleItem::Function(func) => Some(func),
            _ => None,
        })
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions().find(|f| f.name == name)
    }

    /// Get the function stored at item `index`
    pub fn function_at_mut(&mut self, index: usize) -> Option<&mut Function> {
        match self.items.get_mut(index) {
            Some(ModuleItem::Function(func)) => Some(func),
            _ => None,
        }
    }

    pub fn global_variables(&self) -> impl Iterator<Item = &GlobalVariable> {
        self.items.iter().filter_map(|item| match item {
            ModuleItem::GlobalVariable(var) => Some(var),
            _ => None,
        })
    }

    pub fn global_variable(&self, name: &str) -> Option<&GlobalVariable> {
        self.global_variables().find(|v| v.name == name)
    }

    pub fn spec_constants(&self) -> impl Iterator<Item = &SpecConstant> {
        self.items.iter().filter_map(|item| match item {
            ModuleItem::SpecConstant(c) => Some(c),
            _ => None,
        })
    }

    pub fn entry_points(&self) -> impl Iterator<Item = &EntryPoint> {
        self.items.iter().filter_map(|item| match item {
            ModuleItem::EntryPoint(ep) => Some(ep),
            _ => None,
        })
    }

    pub fn execution_modes(&self) -> impl Iterator<Item = &ExecutionModeDecl> {
        self.items.iter().filter_map(|item| match item {
            ModuleItem::ExecutionMode(mode) => Some(mode),
            _ => None,
        })
    }
}
