//! Trait-based operation builders.
//!
//! Anything implementing `InstBuilderBase` gets the helpers of `InstBuilder`
//! through the blanket implementation at the end of this file.

use alloc::{string::String, vec::Vec};

use crate::{
    attribute::{Attribute, AttrDict},
    dfg::{BlockCall, DataFlowGraph, InstData, Opcode},
    entity::{Block, Inst},
    types::Type,
    value::Value,
};

/// Base trait for operation builders.
///
/// The methods here are the primitive used by `InstBuilder`; use the
/// `InstBuilder` helpers instead of calling `build` directly where one fits.
pub trait InstBuilderBase<'f>: Sized {
    /// Get an immutable reference to the data flow graph that will hold the
    /// constructed operations.
    fn data_flow_graph(&self) -> &DataFlowGraph;

    /// Get a mutable reference to the data flow graph.
    fn data_flow_graph_mut(&mut self) -> &mut DataFlowGraph;

    /// Build an operation with results of `result_types`, consuming the
    /// builder.
    fn build(self, data: InstData, result_types: &[Type]) -> (Inst, &'f mut DataFlowGraph);
}

/// Places a freshly built operation into the layout.
pub trait InstInserterBase<'f>: Sized {
    fn data_flow_graph(&self) -> &DataFlowGraph;

    fn data_flow_graph_mut(&mut self) -> &mut DataFlowGraph;

    /// Create the operation, insert it and hand back the DFG.
    fn insert_built_inst(self, data: InstData, result_types: &[Type]) -> (Inst, &'f mut DataFlowGraph);
}

/// Operation builder helpers.
pub trait InstBuilder<'f>: InstBuilderBase<'f> {
    /// Build any operation and return it
    fn op(self, data: InstData, result_types: &[Type]) -> Inst {
        self.build(data, result_types).0
    }

    /// Build an operation with a single result and return that result
    fn op1(self, data: InstData, result_type: Type) -> Value {
        let (inst, dfg) = self.build(data, &[result_type]);
        dfg.inst_results(inst)[0]
    }

    /// `spirv.Constant`
    fn constant(self, value: Attribute, ty: Type) -> Value {
        self.op1(InstData::new(Opcode::Constant).with_attr("value", value), ty)
    }

    /// `spirv.EXT.ConstantCompositeReplicate`
    fn constant_composite_replicate(self, value: Attribute, ty: Type) -> Value {
        self.op1(
            InstData::new(Opcode::ConstantCompositeReplicate).with_attr("value", value),
            ty,
        )
    }

    fn undef(self, ty: Type) -> Value {
        self.op1(InstData::new(Opcode::Undef), ty)
    }

    /// Address of the global variable named `symbol`
    fn address_of(self, symbol: String, ty: Type) -> Value {
        self.op1(
            InstData::new(Opcode::AddressOf).with_attr("variable", Attribute::SymbolRef(symbol)),
            ty,
        )
    }

    /// Value of the specialization constant named `symbol`
    fn reference_of(self, symbol: String, ty: Type) -> Value {
        self.op1(
            InstData::new(Opcode::ReferenceOf).with_attr("spec_const", Attribute::SymbolRef(symbol)),
            ty,
        )
    }

    fn branch(self, target: Block, args: Vec<Value>) -> Inst {
        self.op(InstData::branch(target, args), &[])
    }

    /// Two-way branch; `weights` are the optional true/false weights
    fn branch_conditional(
        self,
        cond: Value,
        true_target: BlockCall,
        false_target: BlockCall,
        weights: Option<(u32, u32)>,
    ) -> Inst {
        let mut data = InstData::branch_conditional(cond, true_target, false_target);
        if let Some((t, f)) = weights {
            data.attrs.set(
                "branch_weights",
                Attribute::Array(Vec::from([Attribute::Literal(t), Attribute::Literal(f)])),
            );
        }
        self.op(data, &[])
    }

    /// `spirv.mlir.merge`, leaving a structured region
    fn merge(self, values: Vec<Value>) -> Inst {
        self.op(InstData::new(Opcode::Merge).with_args(values), &[])
    }

    /// `spirv.mlir.yield`, ending a spec-constant operation body
    fn yield_value(self, value: Value) -> Inst {
        self.op(InstData::new(Opcode::Yield).with_args(Vec::from([value])), &[])
    }

    fn return_(self) -> Inst {
        self.op(InstData::new(Opcode::Return), &[])
    }

    fn return_value(self, value: Value) -> Inst {
        self.op(InstData::new(Opcode::ReturnValue).with_args(Vec::from([value])), &[])
    }

    /// Operation with operands, attributes and an optional result
    fn generic(
        self,
        opcode: Opcode,
        args: Vec<Value>,
        attrs: AttrDict,
        result_type: Option<Type>,
    ) -> Inst {
        let mut data = InstData::new(opcode).with_args(args);
        data.attrs = attrs;
        match result_type {
            Some(ty) => self.op(data, &[ty]),
            None => self.op(data, &[]),
        }
    }
}

impl<'f, T: InstBuilderBase<'f>> InstBuilder<'f> for T {}
