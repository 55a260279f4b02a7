//! Types and the per-module type store.
//!
//! Non-struct types are structurally interned, so two handles compare equal
//! exactly when the types are equal. Struct types are nominal: each
//! declaration gets its own handle and its body may be filled in later,
//! which is how self-referencing structs are built.

use alloc::{
    collections::BTreeMap,
    string::String,
    vec::Vec,
};
use core::fmt;

use crate::{
    entity::entity_impl,
    entity_map::PrimaryMap,
    enums::{
        CooperativeMatrixUse, Decoration, Dim, ImageArrayedInfo, ImageDepthInfo, ImageFormat,
        ImageSamplerUseInfo, ImageSamplingInfo, Scope, StorageClass,
    },
};

entity_impl!(
    /// Handle into a `TypeStore`.
    Type,
    "type"
);

/// Integer signedness as recorded by `OpTypeInt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signedness {
    Signless,
    Signed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FloatKind {
    F16,
    BF16,
    F32,
    F64,
}

impl FloatKind {
    pub fn width(self) -> u32 {
        match self {
            FloatKind::F16 | FloatKind::BF16 => 16,
            FloatKind::F32 => 32,
            FloatKind::F64 => 64,
        }
    }
}

/// A decoration attached to one struct member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberDecoration {
    pub member: u32,
    pub decoration: Decoration,
    pub value: Option<u32>,
}

/// Members of a struct type.
///
/// `offsets` and `member_names` are either empty or have one entry per
/// member. Names are debug info and do not take part in type identity.
#[derive(Debug, Clone, Default)]
pub struct StructBody {
    pub members: Vec<Type>,
    pub offsets: Vec<u32>,
    pub member_decorations: Vec<MemberDecoration>,
    pub member_names: Vec<String>,
}

impl StructBody {
    fn layout_key(&self) -> (&[Type], &[u32], &[MemberDecoration]) {
        (&self.members, &self.offsets, &self.member_decorations)
    }
}

impl PartialEq for StructBody {
    fn eq(&self, other: &Self) -> bool {
        self.layout_key() == other.layout_key()
    }
}

impl Eq for StructBody {}

impl PartialOrd for StructBody {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StructBody {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.layout_key().cmp(&other.layout_key())
    }
}

impl core::hash::Hash for StructBody {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.layout_key().hash(state);
    }
}

/// A nominal struct. `body` is none until the struct is completed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructData {
    pub name: Option<String>,
    pub body: Option<StructBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageData {
    pub sampled: Type,
    pub dim: Dim,
    pub depth: ImageDepthInfo,
    pub arrayed: ImageArrayedInfo,
    pub sampling: ImageSamplingInfo,
    pub sampler_use: ImageSamplerUseInfo,
    pub format: ImageFormat,
}

/// Dynamic tensor dimension marker.
pub const DYNAMIC_DIM: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeData {
    Void,
    Bool,
    Int {
        width: u32,
        signedness: Signedness,
    },
    Float(FloatKind),
    Vector {
        element: Type,
        count: u32,
    },
    Matrix {
        column: Type,
        count: u32,
    },
    Array {
        element: Type,
        count: u32,
        stride: u32,
    },
    RuntimeArray {
        element: Type,
        stride: u32,
    },
    Pointer {
        pointee: Type,
        storage: StorageClass,
    },
    Function {
        params: Vec<Type>,
        results: Vec<Type>,
    },
    Struct(StructData),
    Image(ImageData),
    SampledImage {
        image: Type,
    },
    CooperativeMatrix {
        element: Type,
        rows: u32,
        columns: u32,
        scope: Scope,
        usage: CooperativeMatrixUse,
    },
    /// `shape` is none for an unranked tensor
    Tensor {
        element: Type,
        shape: Option<Vec<i64>>,
    },
}

/// Why a struct body could not be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeError {
    NotAStruct,
    BodyMismatch,
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::NotAStruct => f.write_str("type is not a struct"),
            TypeError::BodyMismatch => f.write_str("struct body already set to a different body"),
        }
    }
}

/// Owner of every type used by a module.
#[derive(Debug, Clone, Default)]
pub struct TypeStore {
    types: PrimaryMap<Type, TypeData>,
    interned: BTreeMap<TypeData, Type>,
}

impl TypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a structural type
    ///
    /// Struct data is never interned; use `declare_struct` for those.
    pub fn intern(&mut self, data: TypeData) -> Type {
        if let TypeData::Struct(data) = data {
            return self.types.push(TypeData::Struct(data));
        }
        if let Some(ty) = self.interned.get(&data) {
            return *ty;
        }
        let ty = self.types.push(data.clone());
        self.interned.insert(data, ty);
        ty
    }

    pub fn void(&mut self) -> Type {
        self.intern(TypeData::Void)
    }

    pub fn bool(&mut self) -> Type {
        self.intern(TypeData::Bool)
    }

    pub fn int(&mut self, width: u32, signedness: Signedness) -> Type {
        self.intern(TypeData::Int { width, signedness })
    }

    pub fn float(&mut self, kind: FloatKind) -> Type {
        self.intern(TypeData::Float(kind))
    }

    pub fn vector(&mut self, element: Type, count: u32) -> Type {
        self.intern(TypeData::Vector { element, count })
    }

    pub fn pointer(&mut self, pointee: Type, storage: StorageClass) -> Type {
        self.intern(TypeData::Pointer { pointee, storage })
    }

    pub fn function(&mut self, params: Vec<Type>, results: Vec<Type>) -> Type {
        self.intern(TypeData::Function { params, results })
    }

    /// Declare a new nominal struct without a body
    pub fn declare_struct(&mut self, name: Option<String>) -> Type {
        self.types
            .push(TypeData::Struct(StructData { name, body: None }))
    }

    /// Set the body of a struct
    ///
    /// Setting the same body twice is accepted; a different body is not.
    pub fn try_set_body(&mut self, ty: Type, body: StructBody) -> Result<(), TypeError> {
        match self.types.get_mut(ty) {
            Some(TypeData::Struct(data)) => match &data.body {
                Some(existing) if *existing != body => Err(TypeError::BodyMismatch),
                _ => {
                    data.body = Some(body);
                    Ok(())
                }
            },
            _ => Err(TypeError::NotAStruct),
        }
    }

    pub fn get(&self, ty: Type) -> &TypeData {
        &self.types[ty]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn is_void(&self, ty: Type) -> bool {
        matches!(self.get(ty), TypeData::Void)
    }

    pub fn is_struct(&self, ty: Type) -> bool {
        matches!(self.get(ty), TypeData::Struct(_))
    }

    /// Parameter and result types of a function type
    pub fn function_signature(&self, ty: Type) -> Option<(&[Type], &[Type])> {
        match self.get(ty) {
            TypeData::Function { params, results } => Some((params, results)),
            _ => None,
        }
    }

    pub fn pointee(&self, ty: Type) -> Option<(Type, StorageClass)> {
        match self.get(ty) {
            TypeData::Pointer { pointee, storage } => Some((*pointee, *storage)),
            _ => None,
        }
    }

    /// Width of an integer or float type
    pub fn bit_width(&self, ty: Type) -> Option<u32> {
        match self.get(ty) {
            TypeData::Int { width, .. } => Some(*width),
            TypeData::Float(kind) => Some(kind.width()),
            TypeData::Bool => Some(1),
            _ => None,
        }
    }

    pub fn struct_data(&self, ty: Type) -> Option<&StructData> {
        match self.get(ty) {
            TypeData::Struct(data) => Some(data),
            _ => None,
        }
    }

    /// Render a type in the textual IR syntax
    pub fn display(&self, ty: Type) -> TypeDisplay<'_> {
        TypeDisplay { store: self, ty }
    }

    fn write_type(&self, f: &mut fmt::Formatter<'_>, ty: Type, open: &mut Vec<Type>) -> fmt::Result {
        match self.get(ty) {
            TypeData::Void => f.write_str("none"),
            TypeData::Bool => f.write_str("i1"),
            TypeData::Int { width, signedness } => match signedness {
                Signedness::Signless => write!(f, "i{}", width),
                Signedness::Signed => write!(f, "si{}", width),
            },
            TypeData::Float(kind) => f.write_str(match kind {
                FloatKind::F16 => "f16",
                FloatKind::BF16 => "bf16",
                FloatKind::F32 => "f32",
                FloatKind::F64 => "f64",
            }),
            TypeData::Vector { element, count } => {
                write!(f, "vector<{}x", count)?;
                self.write_type(f, *element, open)?;
                f.write_str(">")
            }
            TypeData::Matrix { column, count } => {
                write!(f, "!spirv.matrix<{} x ", count)?;
                self.write_type(f, *column, open)?;
                f.write_str(">")
            }
            TypeData::Array {
                element,
                count,
                stride,
            } => {
                write!(f, "!spirv.array<{} x ", count)?;
                self.write_type(f, *element, open)?;
                if *stride != 0 {
                    write!(f, ", stride={}", stride)?;
                }
                f.write_str(">")
            }
            TypeData::RuntimeArray { element, stride } => {
                f.write_str("!spirv.rtarray<")?;
                self.write_type(f, *element, open)?;
                if *stride != 0 {
                    write!(f, ", stride={}", stride)?;
                }
                f.write_str(">")
            }
            TypeData::Pointer { pointee, storage } => {
                f.write_str("!spirv.ptr<")?;
                self.write_type(f, *pointee, open)?;
                write!(f, ", {}>", storage)
            }
            TypeData::Function { params, results } => {
                f.write_str("(")?;
                self.write_list(f, params, open)?;
                f.write_str(") -> ")?;
                if results.len() == 1 {
                    self.write_type(f, results[0], open)
                } else {
                    f.write_str("(")?;
                    self.write_list(f, results, open)?;
                    f.write_str(")")
                }
            }
            TypeData::Struct(data) => self.write_struct(f, ty, data, open),
            TypeData::Image(image) => {
                f.write_str("!spirv.image<")?;
                self.write_type(f, image.sampled, open)?;
                write!(
                    f,
                    ", {}, {}, {}, {}, {}, {}>",
                    image.dim,
                    image.depth,
                    image.arrayed,
                    image.sampling,
                    image.sampler_use,
                    image.format
                )
            }
            TypeData::SampledImage { image } => {
                f.write_str("!spirv.sampled_image<")?;
                self.write_type(f, *image, open)?;
                f.write_str(">")
            }
            TypeData::CooperativeMatrix {
                element,
                rows,
                columns,
                scope,
                usage,
            } => {
                write!(f, "!spirv.coopmatrix<{}x{}x", rows, columns)?;
                self.write_type(f, *element, open)?;
                write!(f, ", {}, {}>", scope, usage)
            }
            TypeData::Tensor { element, shape } => {
                f.write_str("!spirv.arm.tensor<")?;
                match shape {
                    Some(dims) => {
                        for dim in dims {
                            if *dim == DYNAMIC_DIM {
                                f.write_str("?x")?;
                            } else {
                                write!(f, "{}x", dim)?;
                            }
                        }
                    }
                    None => f.write_str("*x")?,
                }
                self.write_type(f, *element, open)?;
                f.write_str(">")
            }
        }
    }

    fn write_list(&self, f: &mut fmt::Formatter<'_>, types: &[Type], open: &mut Vec<Type>) -> fmt::Result {
        for (i, ty) in types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            self.write_type(f, *ty, open)?;
        }
        Ok(())
    }

    fn write_struct(
        &self,
        f: &mut fmt::Formatter<'_>,
        ty: Type,
        data: &StructData,
        open: &mut Vec<Type>,
    ) -> fmt::Result {
        f.write_str("!spirv.struct<")?;
        if let Some(name) = &data.name {
            f.write_str(name)?;
            // Recursive reference or forward declaration: name only.
            if open.contains(&ty) || data.body.is_none() {
                return f.write_str(">");
            }
            f.write_str(", ")?;
        }
        let Some(body) = &data.body else {
            return f.write_str("()>");
        };
        if open.contains(&ty) {
            return f.write_str("...>");
        }
        open.push(ty);
        f.write_str("(")?;
        for (i, member) in body.members.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            self.write_type(f, *member, open)?;
            let offset = body.offsets.get(i);
            let decorations: Vec<&MemberDecoration> = body
                .member_decorations
                .iter()
                .filter(|d| d.member as usize == i)
                .collect();
            if offset.is_some() || !decorations.is_empty() {
                f.write_str(" [")?;
                let mut first = true;
                if let Some(offset) = offset {
                    write!(f, "{}", offset)?;
                    first = false;
                }
                for decoration in decorations {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    match decoration.value {
                        Some(value) => write!(f, "{}={}", decoration.decoration, value)?,
                        None => write!(f, "{}", decoration.decoration)?,
                    }
                }
                f.write_str("]")?;
            }
        }
        open.pop();
        f.write_str(")>")
    }
}

/// Display adapter returned by `TypeStore::display`
pub struct TypeDisplay<'a> {
    store: &'a TypeStore,
    ty: Type,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.store.write_type(f, self.ty, &mut Vec::new())
    }
}
