//! Attributes: compile-time constant data attached to operations.

use alloc::{string::String, vec::Vec};
use core::fmt;

use crate::{
    enums::{
        BuiltIn, Decoration, ExecutionModel, FPFastMathMode, FPRoundingMode, FunctionControl,
        LinkageType, LoopControl, MemoryAccess, SelectionControl, StorageClass,
    },
    types::{Type, TypeData, TypeStore},
};

/// Typed enumerant stored as an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumAttr {
    BuiltIn(BuiltIn),
    Decoration(Decoration),
    StorageClass(StorageClass),
    FPRoundingMode(FPRoundingMode),
    FPFastMathMode(FPFastMathMode),
    FunctionControl(FunctionControl),
    SelectionControl(SelectionControl),
    LoopControl(LoopControl),
    MemoryAccess(MemoryAccess),
    ExecutionModel(ExecutionModel),
}

impl fmt::Display for EnumAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumAttr::BuiltIn(v) => write!(f, "#spirv.built_in<{}>", v),
            EnumAttr::Decoration(v) => write!(f, "#spirv.decoration<{}>", v),
            EnumAttr::StorageClass(v) => write!(f, "#spirv.storage_class<{}>", v),
            EnumAttr::FPRoundingMode(v) => write!(f, "#spirv.fp_rounding_mode<{}>", v),
            EnumAttr::FPFastMathMode(v) => write!(f, "#spirv.fastmath_mode<{}>", v),
            EnumAttr::FunctionControl(v) => write!(f, "#spirv.function_control<{}>", v),
            EnumAttr::SelectionControl(v) => write!(f, "#spirv.selection_control<{}>", v),
            EnumAttr::LoopControl(v) => write!(f, "#spirv.loop_control<{}>", v),
            EnumAttr::MemoryAccess(v) => write!(f, "#spirv.memory_access<{}>", v),
            EnumAttr::ExecutionModel(v) => write!(f, "#spirv.execution_model<{}>", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheControlKind {
    Load,
    Store,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Unit,
    Bool(bool),
    /// Untyped literal word, such as an index, a weight or a binding number
    Literal(u32),
    /// Integer constant, sign-extended from the type's width
    Int {
        value: i64,
        ty: Type,
    },
    /// Float constant as raw bits of the type's width
    Float {
        bits: u64,
        ty: Type,
    },
    String(String),
    Type(Type),
    SymbolRef(String),
    Array(Vec<Attribute>),
    /// Element-wise constant of a vector or tensor type
    Dense {
        elements: Vec<Attribute>,
        ty: Type,
    },
    Dict(AttrDict),
    Enum(EnumAttr),
    Linkage {
        name: String,
        linkage: LinkageType,
    },
    CacheControl {
        kind: CacheControlKind,
        level: u32,
        control: u32,
    },
}

impl Attribute {
    pub fn int(value: i64, ty: Type) -> Self {
        Attribute::Int { value, ty }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Attribute::Int { value, .. } => Some(*value),
            Attribute::Literal(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::String(s) | Attribute::SymbolRef(s) => Some(s),
            _ => None,
        }
    }

    /// Type of a typed constant attribute
    pub fn ty(&self) -> Option<Type> {
        match self {
            Attribute::Int { ty, .. } | Attribute::Float { ty, .. } | Attribute::Dense { ty, .. } => {
                Some(*ty)
            }
            _ => None,
        }
    }

    /// Render an attribute in the textual IR syntax
    pub fn display<'a>(&'a self, types: &'a TypeStore) -> AttrDisplay<'a> {
        AttrDisplay { attr: self, types }
    }
}

/// Display adapter returned by `Attribute::display`
pub struct AttrDisplay<'a> {
    attr: &'a Attribute,
    types: &'a TypeStore,
}

impl AttrDisplay<'_> {
    fn write_bare(&self, f: &mut fmt::Formatter<'_>, attr: &Attribute) -> fmt::Result {
        match attr {
            Attribute::Int { value, ty } => {
                if matches!(self.types.get(*ty), TypeData::Bool) {
                    f.write_str(if *value != 0 { "true" } else { "false" })
                } else {
                    write!(f, "{}", value)
                }
            }
            Attribute::Float { bits, ty } => write_float(f, *bits, self.types.bit_width(*ty)),
            Attribute::Bool(b) => write!(f, "{}", b),
            other => write!(f, "{}", other.display(self.types)),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, bits: u64, width: Option<u32>) -> fmt::Result {
    match width {
        Some(32) => write!(f, "{:?}", f32::from_bits(bits as u32)),
        Some(64) => write!(f, "{:?}", f64::from_bits(bits)),
        _ => write!(f, "0x{:04X}", bits),
    }
}

impl fmt::Display for AttrDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.attr {
            Attribute::Unit => f.write_str("unit"),
            Attribute::Bool(b) => write!(f, "{}", b),
            Attribute::Literal(v) => write!(f, "{}", v),
            Attribute::Int { ty, .. } | Attribute::Float { ty, .. } => {
                self.write_bare(f, self.attr)?;
                write!(f, " : {}", self.types.display(*ty))
            }
            Attribute::String(s) => write!(f, "\"{}\"", s.escape_default()),
            Attribute::Type(ty) => write!(f, "{}", self.types.display(*ty)),
            Attribute::SymbolRef(s) => write!(f, "@{}", s),
            Attribute::Array(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element.display(self.types))?;
                }
                f.write_str("]")
            }
            Attribute::Dense { elements, ty } => {
                f.write_str("dense<")?;
                let splat = elements.windows(2).all(|w| w[0] == w[1]) && !elements.is_empty();
                if splat {
                    self.write_bare(f, &elements[0])?;
                } else {
                    f.write_str("[")?;
                    for (i, element) in elements.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        self.write_bare(f, element)?;
                    }
                    f.write_str("]")?;
                }
                write!(f, "> : {}", self.types.display(*ty))
            }
            Attribute::Dict(dict) => write!(f, "{}", dict.display(self.types)),
            Attribute::Enum(e) => write!(f, "{}", e),
            Attribute::Linkage { name, linkage } => write!(
                f,
                "#spirv.linkage_attributes<linkage_name = \"{}\", linkage_type = <{}>>",
                name, linkage
            ),
            Attribute::CacheControl {
                kind,
                level,
                control,
            } => {
                let kind = match kind {
                    CacheControlKind::Load => "load",
                    CacheControlKind::Store => "store",
                };
                write!(f, "#spirv.cache_control_{}_intel<cache_level = {}, cache_control = {}>", kind, level, control)
            }
        }
    }
}

/// Ordered name-to-attribute dictionary.
///
/// Insertion order is kept so printed output is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrDict {
    entries: Vec<(String, Attribute)>,
}

impl AttrDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing any existing value with the same name
    pub fn set(&mut self, name: impl Into<String>, attr: Attribute) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = attr,
            None => self.entries.push((name, attr)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.entries.iter_mut().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.entries.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn display<'a>(&'a self, types: &'a TypeStore) -> DictDisplay<'a> {
        DictDisplay { dict: self, types }
    }
}

/// Display adapter returned by `AttrDict::display`
pub struct DictDisplay<'a> {
    dict: &'a AttrDict,
    types: &'a TypeStore,
}

impl fmt::Display for DictDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, attr)) in self.dict.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match attr {
                Attribute::Unit => f.write_str(name)?,
                _ => write!(f, "{} = {}", name, attr.display(self.types))?,
            }
        }
        f.write_str("}")
    }
}
