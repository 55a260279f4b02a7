//! Structured SSA intermediate representation for SPIR-V modules.
//!
//! This crate defines the IR a SPIR-V binary is deserialized into:
//! - Types (interned structural types, nominal structs)
//! - Values (SSA values: operation results and block parameters)
//! - Operations (opcode, operands, successors, nested regions, attributes)
//! - Blocks and regions (structured selection/loop constructs nest regions)
//! - Functions and modules (global variables, spec constants, entry points)
//!
//! Editing primitives (builders, insertion guards, block splitting, deep
//! cloning with value/block mapping, use replacement) live here so that
//! control-flow structurization can be expressed on top of them.

#![no_std]

extern crate alloc;

mod attribute;
mod block;
mod builder;
mod dfg;
mod entity;
mod entity_map;
mod enums;
mod function;
mod layout;
mod mapping;
mod module;
mod printer;
mod sourceloc;
mod types;
mod value;
mod verifier;

pub use attribute::{AttrDict, Attribute, CacheControlKind, EnumAttr};
pub use block::BlockData;
pub use builder::{
    CursorInserter, HasInsertPoint, InsertBuilder, InsertPoint, InsertionGuard, InstBuilder,
    InstBuilderBase, InstInserterBase, ReplaceBuilder,
};
pub use dfg::{BlockCall, DataFlowGraph, InstData, Opcode};
pub use entity::{Block, EntityRef, Inst, Region};
pub use entity_map::{PrimaryMap, SecondaryMap};
pub use enums::*;
pub use function::Function;
pub use layout::Layout;
pub use mapping::IrMapping;
pub use module::{
    EntryPoint, ExecutionModeDecl, GlobalVariable, Module, ModuleItem, SpecConstant,
    SpecConstantComposite, SpecConstantCompositeReplicate, VceTriple, Version,
};
pub use printer::FunctionDisplay;
pub use sourceloc::{Location, UNKNOWN_FILE};
pub use types::{
    FloatKind, ImageData, MemberDecoration, Signedness, StructBody, StructData, Type, TypeData,
    TypeError, TypeStore, DYNAMIC_DIM,
};
pub use value::{Value, ValueData, ValueDef};
pub use verifier::{verify, verify_module, VerifierError};
