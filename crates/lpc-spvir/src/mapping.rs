//! Value and block mappings used when cloning IR.

use alloc::{collections::BTreeMap, vec::Vec};

use crate::{
    dfg::InstData,
    entity::{Block, Inst, Region},
    function::Function,
    value::Value,
};

/// Old-to-new correspondence for values and blocks.
#[derive(Debug, Clone, Default)]
pub struct IrMapping {
    values: BTreeMap<Value, Value>,
    blocks: BTreeMap<Block, Block>,
}

impl IrMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_value(&mut self, from: Value, to: Value) {
        self.values.insert(from, to);
    }

    pub fn map_block(&mut self, from: Block, to: Block) {
        self.blocks.insert(from, to);
    }

    pub fn lookup_value(&self, value: Value) -> Option<Value> {
        self.values.get(&value).copied()
    }

    pub fn lookup_block(&self, block: Block) -> Option<Block> {
        self.blocks.get(&block).copied()
    }

    /// Mapped value, or `value` itself when unmapped
    pub fn lookup_value_or_self(&self, value: Value) -> Value {
        self.lookup_value(value).unwrap_or(value)
    }

    /// Mapped block, or `block` itself when unmapped
    pub fn lookup_block_or_self(&self, block: Block) -> Block {
        self.lookup_block(block).unwrap_or(block)
    }

    pub fn contains_block(&self, block: Block) -> bool {
        self.blocks.contains_key(&block)
    }
}

impl Function {
    /// Deep-clone an operation, including its nested regions
    ///
    /// Operands and successors are rewritten through `mapping`, which is
    /// extended with the clone's results and with every cloned nested block
    /// and block parameter. The clone is not inserted anywhere.
    pub fn clone_inst(&mut self, inst: Inst, mapping: &mut IrMapping) -> Inst {
        let old = self.dfg.inst_data(inst).clone();
        let result_types = self.dfg.value_types(&old.results);

        let mut data = InstData::new(old.opcode)
            .with_args(old.args.iter().map(|v| mapping.lookup_value_or_self(*v)).collect())
            .with_loc(old.loc.clone());
        data.attrs = old.attrs.clone();
        data.successors = old.successors.clone();
        for succ in &mut data.successors {
            succ.block = mapping.lookup_block_or_self(succ.block);
            for arg in &mut succ.args {
                *arg = mapping.lookup_value_or_self(*arg);
            }
        }

        let new_inst = self.make_inst(data, &result_types);
        for (old_result, new_result) in old
            .results
            .iter()
            .zip(self.dfg.inst_results(new_inst).to_vec())
        {
            mapping.map_value(*old_result, new_result);
        }

        for region in old.regions {
            let new_region = self.make_region(Some(new_inst));
            self.clone_region_into(region, new_region, mapping);
            self.dfg.inst_data_mut(new_inst).regions.push(new_region);
        }
        new_inst
    }

    /// Clone the blocks of `from` to the end of `to`
    ///
    /// Blocks and their parameters are all mapped before any operation is
    /// cloned, so branches to later blocks resolve.
    pub fn clone_region_into(&mut self, from: Region, to: Region, mapping: &mut IrMapping) {
        let blocks: Vec<Block> = self.layout.region_blocks(from).collect();
        for block in &blocks {
            let new_block = self.create_block();
            self.append_block_to(to, new_block);
            mapping.map_block(*block, new_block);
            for param in self.block_params(*block).to_vec() {
                let ty = self.dfg.value_type(param);
                let new_param = self.append_block_param(new_block, ty);
                mapping.map_value(param, new_param);
            }
        }
        for block in blocks {
            let new_block = mapping.lookup_block_or_self(block);
            let insts: Vec<Inst> = self.layout.block_insts(block).collect();
            for inst in insts {
                let cloned = self.clone_inst(inst, mapping);
                self.append_inst(cloned, new_block);
            }
        }
    }

    /// Rewrite operands and successors of every operation in the given
    /// blocks (and their nested regions) through `mapping`
    pub fn remap_blocks(&mut self, blocks: &[Block], mapping: &IrMapping) {
        for block in blocks {
            for inst in self.walk_block(*block) {
                let data = self.dfg.inst_data_mut(inst);
                for operand in data.operands_mut() {
                    *operand = mapping.lookup_value_or_self(*operand);
                }
                for succ in &mut data.successors {
                    succ.block = mapping.lookup_block_or_self(succ.block);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec};

    use super::*;
    use crate::{
        builder::{InsertPoint, InstBuilder},
        dfg::Opcode,
        enums::FunctionControl,
        types::{Signedness, TypeStore},
    };

    #[test]
    fn test_mapping_lookup() {
        let mut mapping = IrMapping::new();
        mapping.map_value(Value::new(1), Value::new(5));
        mapping.map_block(Block::new(0), Block::new(3));

        assert_eq!(mapping.lookup_value(Value::new(1)), Some(Value::new(5)));
        assert_eq!(mapping.lookup_value_or_self(Value::new(2)), Value::new(2));
        assert_eq!(mapping.lookup_block_or_self(Block::new(0)), Block::new(3));
        assert!(!mapping.contains_block(Block::new(3)));
    }

    #[test]
    fn test_clone_inst_maps_operands_and_successors() {
        let mut types = TypeStore::new();
        let i32_ty = types.int(32, Signedness::Signless);
        let fn_ty = types.function(Vec::new(), Vec::new());
        let mut func = Function::new("f".to_string(), fn_ty, FunctionControl::NONE);
        let entry = func.create_block();
        let target = func.create_block();
        let other = func.create_block();
        func.append_block(entry);
        func.append_block(target);
        func.append_block(other);
        let a = func.append_block_param(entry, i32_ty);
        let b = func.append_block_param(entry, i32_ty);
        let br = func.ins(InsertPoint::End(entry)).branch(target, vec![a]);

        let mut mapping = IrMapping::new();
        mapping.map_value(a, b);
        mapping.map_block(target, other);
        let clone = func.clone_inst(br, &mut mapping);

        let data = func.dfg.inst_data(clone);
        assert_eq!(data.opcode, Opcode::Branch);
        assert_eq!(data.successors[0].block, other);
        assert_eq!(data.successors[0].args, vec![b]);
        assert!(!func.layout.is_inst_inserted(clone));
    }

    #[test]
    fn test_clone_inst_deep_copies_regions() {
        let mut types = TypeStore::new();
        let i32_ty = types.int(32, Signedness::Signless);
        let fn_ty = types.function(Vec::new(), Vec::new());
        let mut func = Function::new("f".to_string(), fn_ty, FunctionControl::NONE);
        let entry = func.create_block();
        func.append_block(entry);

        let op = func.make_inst(InstData::new(Opcode::SpecConstantOperation), &[i32_ty]);
        func.append_inst(op, entry);
        let region = func.make_region(Some(op));
        func.dfg.inst_data_mut(op).regions.push(region);
        let body = func.create_block();
        func.append_block_to(region, body);
        let inner = func.ins(InsertPoint::End(body)).undef(i32_ty);
        func.ins(InsertPoint::End(body)).yield_value(inner);

        let mut mapping = IrMapping::new();
        let clone = func.clone_inst(op, &mut mapping);
        let new_region = func.dfg.inst_data(clone).regions[0];
        assert_ne!(new_region, region);
        assert_eq!(func.layout.region_parent(new_region), Some(clone));

        let new_body = func.layout.first_block(new_region).unwrap();
        let insts: Vec<_> = func.block_insts(new_body).collect();
        assert_eq!(insts.len(), 2);
        let new_inner = mapping.lookup_value(inner).unwrap();
        assert_eq!(func.dfg.inst_args(insts[1]), &[new_inner]);
    }
}
