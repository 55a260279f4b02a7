//! Textual rendering of modules and functions.
//!
//! Values are renamed in print order: function arguments become `%argN`,
//! every other value `%N`. Blocks are numbered `^bbN` per region. The entry
//! block of a region is only labeled when it has parameters.

use alloc::{collections::BTreeMap, format, string::String};
use core::fmt::{self, Write};

use crate::{
    entity::{Block, Inst, Region},
    function::Function,
    module::{Module, ModuleItem},
    types::TypeStore,
    value::Value,
};

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("spirv.module")?;
        match (self.addressing_model, self.memory_model) {
            (Some(addressing), Some(memory)) => write!(f, " {} {}", addressing, memory)?,
            (Some(addressing), None) => write!(f, " {}", addressing)?,
            _ => {}
        }
        if let Some(vce) = &self.vce {
            write!(
                f,
                " requires #spirv.vce<v{}.{}, [",
                vce.version.major, vce.version.minor
            )?;
            for (i, cap) in vce.capabilities.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", cap)?;
            }
            f.write_str("], [")?;
            for (i, ext) in vce.extensions.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(ext)?;
            }
            f.write_str("]>")?;
        }
        f.write_str(" {\n")?;
        for item in &self.items {
            write_item(f, item, &self.types)?;
        }
        f.write_str("}\n")
    }
}

fn write_item(f: &mut fmt::Formatter<'_>, item: &ModuleItem, types: &TypeStore) -> fmt::Result {
    match item {
        ModuleItem::GlobalVariable(var) => {
            write!(f, "  spirv.GlobalVariable @{}", var.name)?;
            if let Some(init) = &var.initializer {
                write!(f, " initializer(@{})", init)?;
            }
            if !var.attrs.is_empty() {
                write!(f, " {}", var.attrs.display(types))?;
            }
            writeln!(f, " : {}", types.display(var.ty))
        }
        ModuleItem::SpecConstant(c) => {
            write!(
                f,
                "  spirv.SpecConstant @{} = {}",
                c.name,
                c.default_value.display(types)
            )?;
            if !c.attrs.is_empty() {
                write!(f, " {}", c.attrs.display(types))?;
            }
            writeln!(f)
        }
        ModuleItem::SpecConstantComposite(c) => {
            write!(f, "  spirv.SpecConstantComposite @{} (", c.name)?;
            for (i, constituent) in c.constituents.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "@{}", constituent)?;
            }
            writeln!(f, ") : {}", types.display(c.ty))
        }
        ModuleItem::SpecConstantCompositeReplicate(c) => writeln!(
            f,
            "  spirv.EXT.SpecConstantCompositeReplicate @{} (@{}) : {}",
            c.name,
            c.constituent,
            types.display(c.ty)
        ),
        ModuleItem::Function(func) => {
            let mut text = String::new();
            FunctionPrinter::new(func, types).print(&mut text, "  ")?;
            f.write_str(&text)
        }
        ModuleItem::EntryPoint(ep) => {
            write!(f, "  spirv.EntryPoint \"{}\" @{}", ep.execution_model, ep.function)?;
            for var in &ep.interface {
                write!(f, ", @{}", var)?;
            }
            writeln!(f)
        }
        ModuleItem::ExecutionMode(mode) => {
            write!(f, "  spirv.ExecutionMode @{} \"{}\"", mode.function, mode.mode)?;
            for value in &mode.values {
                write!(f, ", {}", value)?;
            }
            writeln!(f)
        }
    }
}

/// Renders one function given the module's type store
pub struct FunctionDisplay<'a> {
    func: &'a Function,
    types: &'a TypeStore,
}

impl Function {
    pub fn display<'a>(&'a self, types: &'a TypeStore) -> FunctionDisplay<'a> {
        FunctionDisplay { func: self, types }
    }
}

impl fmt::Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = String::new();
        FunctionPrinter::new(self.func, self.types).print(&mut text, "")?;
        f.write_str(&text)
    }
}

struct FunctionPrinter<'a> {
    func: &'a Function,
    types: &'a TypeStore,
    values: BTreeMap<Value, String>,
    blocks: BTreeMap<Block, String>,
    next_value: usize,
}

impl<'a> FunctionPrinter<'a> {
    fn new(func: &'a Function, types: &'a TypeStore) -> Self {
        let mut printer = Self {
            func,
            types,
            values: BTreeMap::new(),
            blocks: BTreeMap::new(),
            next_value: 0,
        };
        for (i, arg) in func.args().iter().enumerate() {
            printer.values.insert(*arg, format!("%arg{}", i));
        }
        printer.name_region(func.body);
        printer
    }

    fn name_region(&mut self, region: Region) {
        let blocks: alloc::vec::Vec<Block> = self.func.layout.region_blocks(region).collect();
        for (i, block) in blocks.iter().enumerate() {
            self.blocks.insert(*block, format!("^bb{}", i));
            if !self.func.is_entry_block(*block) {
                for param in self.func.block_params(*block) {
                    self.name_value(*param);
                }
            }
            for inst in self.func.block_insts(*block) {
                for result in self.func.dfg.inst_results(inst) {
                    self.name_value(*result);
                }
                for nested in &self.func.dfg.inst_data(inst).regions {
                    self.name_region(*nested);
                }
            }
        }
    }

    fn name_value(&mut self, value: Value) {
        self.values.insert(value, format!("%{}", self.next_value));
        self.next_value += 1;
    }

    fn value(&self, value: Value) -> String {
        self.values
            .get(&value)
            .cloned()
            .unwrap_or_else(|| format!("%<{}>", value))
    }

    fn block(&self, block: Block) -> String {
        self.blocks
            .get(&block)
            .cloned()
            .unwrap_or_else(|| format!("^<{}>", block))
    }

    fn print(&self, out: &mut String, indent: &str) -> fmt::Result {
        let func = self.func;
        write!(out, "{}spirv.func @{}(", indent, func.name)?;
        let (params, results) = self.types.function_signature(func.ty).unwrap_or((&[], &[]));
        for (i, ty) in params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match func.args().get(i) {
                Some(arg) => write!(out, "{}: {}", self.value(*arg), self.types.display(*ty))?,
                None => write!(out, "{}", self.types.display(*ty))?,
            }
            if let Some(attrs) = func.arg_attrs.get(i).filter(|a| !a.is_empty()) {
                write!(out, " {}", attrs.display(self.types))?;
            }
        }
        out.push(')');
        if !results.is_empty() {
            out.push_str(" -> ");
            for (i, ty) in results.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write!(out, "{}", self.types.display(*ty))?;
            }
        }
        write!(out, " \"{}\"", func.control)?;
        if !func.attrs.is_empty() {
            write!(out, " attributes {}", func.attrs.display(self.types))?;
        }
        if func.is_declaration() {
            out.push('\n');
            return Ok(());
        }
        out.push_str(" {\n");
        self.print_region(out, func.body, indent)?;
        writeln!(out, "{}}}", indent)
    }

    fn print_region(&self, out: &mut String, region: Region, indent: &str) -> fmt::Result {
        let inner = format!("{}  ", indent);
        for (i, block) in self.func.layout.region_blocks(region).enumerate() {
            let params = self.func.block_params(block);
            let is_fn_entry = self.func.is_entry_block(block);
            if i > 0 || (!params.is_empty() && !is_fn_entry) {
                write!(out, "{}{}", indent, self.block(block))?;
                if !params.is_empty() {
                    out.push('(');
                    for (j, param) in params.iter().enumerate() {
                        if j > 0 {
                            out.push_str(", ");
                        }
                        write!(
                            out,
                            "{}: {}",
                            self.value(*param),
                            self.types.display(self.func.dfg.value_type(*param))
                        )?;
                    }
                    out.push(')');
                }
                out.push_str(":\n");
            }
            for inst in self.func.block_insts(block) {
                self.print_inst(out, inst, &inner)?;
            }
        }
        Ok(())
    }

    fn print_inst(&self, out: &mut String, inst: Inst, indent: &str) -> fmt::Result {
        let data = self.func.dfg.inst_data(inst);
        out.push_str(indent);
        if !data.results.is_empty() {
            for (i, result) in data.results.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&self.value(*result));
            }
            out.push_str(" = ");
        }
        out.push_str(data.opcode.name());
        for (i, arg) in data.args.iter().enumerate() {
            out.push_str(if i == 0 { " " } else { ", " });
            out.push_str(&self.value(*arg));
        }
        for (i, succ) in data.successors.iter().enumerate() {
            out.push_str(if i == 0 && data.args.is_empty() { " " } else { ", " });
            out.push_str(&self.block(succ.block));
            if !succ.args.is_empty() {
                out.push('(');
                for (j, arg) in succ.args.iter().enumerate() {
                    if j > 0 {
                        out.push_str(", ");
                    }
                    write!(
                        out,
                        "{} : {}",
                        self.value(*arg),
                        self.types.display(self.func.dfg.value_type(*arg))
                    )?;
                }
                out.push(')');
            }
        }
        if !data.attrs.is_empty() {
            write!(out, " {}", data.attrs.display(self.types))?;
        }
        let typed: &[Value] = if data.results.is_empty() {
            &data.args
        } else {
            &data.results
        };
        if !typed.is_empty() {
            out.push_str(" : ");
            for (i, value) in typed.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write!(out, "{}", self.types.display(self.func.dfg.value_type(*value)))?;
            }
        }
        for region in &data.regions {
            out.push_str(" {\n");
            self.print_region(out, *region, indent)?;
            write!(out, "{}}}", indent)?;
        }
        if !data.loc.is_unknown() {
            write!(out, " {}", data.loc)?;
        }
        out.push('\n');
        Ok(())
    }
}
