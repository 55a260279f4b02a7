//! `OpDecorate` and `OpMemberDecorate`.
//!
//! Decorations are collected per target `<id>` and attached when the target
//! is defined: to global variables, spec constants, functions and ops as
//! attributes named after the decoration (`descriptor_set`, `binding`, ...),
//! to array types as their stride, and to struct types as member offsets
//! and member decorations.

use alloc::{format, string::String, vec::Vec};

use lpc_spvir::{
    Attribute, BuiltIn, CacheControlKind, Decoration, EnumAttr, FPFastMathMode, FPRoundingMode,
    LinkageType, Signedness,
};
use tracing::trace;

use super::{decode_enum, Deserializer};
use crate::{
    error::{Arity, ErrorKind},
    literal::decode_string,
};

/// How the literal operands of a decoration are read.
enum DecorationShape {
    /// No literal
    Unit,
    /// One integer literal
    Literal,
    BuiltIn,
    FPRoundingMode,
    FPFastMathMode,
    Linkage,
    /// Cache level and control, accumulated per target
    CacheControl(CacheControlKind),
    /// `ArrayStride` is a property of the array type, not an attribute
    ArrayStride,
}

fn decoration_shape(decoration: Decoration) -> Option<DecorationShape> {
    use Decoration as D;
    Some(match decoration {
        D::RelaxedPrecision
        | D::Block
        | D::BufferBlock
        | D::RowMajor
        | D::ColMajor
        | D::NoPerspective
        | D::Flat
        | D::Patch
        | D::Centroid
        | D::Sample
        | D::Invariant
        | D::Restrict
        | D::Aliased
        | D::Volatile
        | D::Constant
        | D::Coherent
        | D::NonWritable
        | D::NonReadable
        | D::Uniform
        | D::SaturatedConversion
        | D::NoContraction
        | D::NoSignedWrap
        | D::NoUnsignedWrap
        | D::RestrictPointer
        | D::AliasedPointer => DecorationShape::Unit,
        D::SpecId
        | D::MatrixStride
        | D::Stream
        | D::Location
        | D::Component
        | D::Index
        | D::Binding
        | D::DescriptorSet
        | D::Offset
        | D::XfbBuffer
        | D::XfbStride
        | D::InputAttachmentIndex
        | D::Alignment
        | D::MaxByteOffset => DecorationShape::Literal,
        D::ArrayStride => DecorationShape::ArrayStride,
        D::BuiltIn => DecorationShape::BuiltIn,
        D::FPRoundingMode => DecorationShape::FPRoundingMode,
        D::FPFastMathMode => DecorationShape::FPFastMathMode,
        D::LinkageAttributes => DecorationShape::Linkage,
        D::CacheControlLoadINTEL => DecorationShape::CacheControl(CacheControlKind::Load),
        D::CacheControlStoreINTEL => DecorationShape::CacheControl(CacheControlKind::Store),
        _ => return None,
    })
}

impl Deserializer<'_> {
    /// `OpDecorate`: target `<id>`, decoration, literals
    pub(super) fn process_decoration(&mut self, words: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpDecorate", Arity::AtLeast(2), words.len())?;
        let target = words[0];
        let decoration = decode_enum("decoration", words[1], Decoration::from_u32)?;
        let Some(shape) = decoration_shape(decoration) else {
            return Err(ErrorKind::Unsupported(format!(
                "unhandled decoration {}",
                decoration
            )));
        };
        let name = decoration.attr_name();
        trace!("decorate <id> {} with {}", target, decoration);

        let attr = match shape {
            DecorationShape::Unit => {
                expect_words(decoration, words, 2, "needs a single target <id>")?;
                Attribute::Unit
            }
            DecorationShape::Literal => {
                expect_words(decoration, words, 3, "needs a single integer literal")?;
                let i32_ty = self.module.types.int(32, Signedness::Signless);
                Attribute::int(i64::from(words[2] as i32), i32_ty)
            }
            DecorationShape::ArrayStride => {
                expect_words(decoration, words, 3, "needs a single integer literal")?;
                if let Some(existing) = self.type_decorations.insert(target, words[2]) {
                    if existing != words[2] {
                        return Err(conflict(target, decoration));
                    }
                }
                return Ok(());
            }
            DecorationShape::BuiltIn => {
                expect_words(decoration, words, 3, "needs a single integer literal")?;
                let builtin = decode_enum("built-in", words[2], BuiltIn::from_u32)?;
                Attribute::String(String::from(builtin.name()))
            }
            DecorationShape::FPRoundingMode => {
                expect_words(decoration, words, 3, "needs a single integer literal")?;
                let mode = decode_enum("FP rounding mode", words[2], FPRoundingMode::from_u32)?;
                Attribute::Enum(EnumAttr::FPRoundingMode(mode))
            }
            DecorationShape::FPFastMathMode => {
                expect_words(decoration, words, 3, "needs a single integer literal")?;
                let mode = decode_enum("FP fast math mode", words[2], FPFastMathMode::from_bits)?;
                Attribute::Enum(EnumAttr::FPFastMathMode(mode))
            }
            DecorationShape::Linkage => {
                if words.len() < 4 {
                    return Err(ErrorKind::MalformedInstruction(String::from(
                        "OpDecorate with LinkageAttributes needs at least 1 string and 1 integer literal",
                    )));
                }
                let mut index = 2;
                let linkage_name = decode_string(words, &mut index)?;
                if index + 1 != words.len() {
                    return Err(ErrorKind::MalformedInstruction(String::from(
                        "OpDecorate with LinkageAttributes must end with the linkage type",
                    )));
                }
                let linkage = decode_enum("linkage type", words[index], LinkageType::from_u32)?;
                Attribute::Linkage {
                    name: linkage_name,
                    linkage,
                }
            }
            DecorationShape::CacheControl(kind) => {
                expect_words(decoration, words, 4, "needs a cache level and a cache control")?;
                let control = Attribute::CacheControl {
                    kind,
                    level: words[2],
                    control: words[3],
                };
                let attrs = self.decorations.entry(target).or_default();
                match attrs.get_mut(&name) {
                    Some(Attribute::Array(controls)) => controls.push(control),
                    _ => attrs.set(name, Attribute::Array(Vec::from([control]))),
                }
                return Ok(());
            }
        };

        let attrs = self.decorations.entry(target).or_default();
        match attrs.get(&name) {
            Some(existing) if *existing != attr => Err(conflict(target, decoration)),
            _ => {
                attrs.set(name, attr);
                Ok(())
            }
        }
    }

    /// `OpMemberDecorate`: struct `<id>`, member, decoration, literals
    pub(super) fn process_member_decoration(&mut self, words: &[u32]) -> Result<(), ErrorKind> {
        ErrorKind::check_arity("OpMemberDecorate", Arity::AtLeast(3), words.len())?;
        let decoration = decode_enum("decoration", words[2], Decoration::from_u32)?;
        if decoration == Decoration::Offset && words.len() != 4 {
            return Err(ErrorKind::OperandArityMismatch {
                op: "OpMemberDecorate",
                expected: Arity::Exactly(4),
                found: words.len(),
            });
        }
        trace!(
            "decorate member {} of <id> {} with {}",
            words[1],
            words[0],
            decoration
        );
        self.member_decorations
            .entry(words[0])
            .or_default()
            .entry(words[1])
            .or_default()
            .insert(decoration, words[3..].to_vec());
        Ok(())
    }
}

fn expect_words(
    decoration: Decoration,
    words: &[u32],
    count: usize,
    what: &str,
) -> Result<(), ErrorKind> {
    if words.len() == count {
        Ok(())
    } else {
        Err(ErrorKind::MalformedInstruction(format!(
            "OpDecorate with {} {}",
            decoration, what
        )))
    }
}

fn conflict(target: u32, decoration: Decoration) -> ErrorKind {
    ErrorKind::ConflictingDecoration(format!(
        "<id> {} is decorated with {} twice with different values",
        target, decoration
    ))
}
