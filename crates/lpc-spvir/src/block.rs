//! Per-block data owned by the function.

use alloc::vec::Vec;

use crate::value::Value;

/// The block's parameters, which stand in for SPIR-V phis
///
/// Where the block sits lives in the layout; parameter types live in the
/// DFG's value table.
#[derive(Debug, Clone, Default)]
pub struct BlockData {
    pub params: Vec<Value>,
}

impl BlockData {
    pub fn new() -> Self {
        Self::default()
    }
}
