//! Assembler for the `.spvasm` text used by the file tests.
//!
//! One instruction per line, in the usual SPIR-V assembly shape:
//!
//! ```text
//! %int = OpTypeInt 32 0
//!  %one = OpConstant %int 1
//!        OpSelectionMerge %merge None
//! ```
//!
//! Operands are `%name` ids, integer or float literals, quoted strings and
//! bare enumerant names. Named ids are numbered in order of first
//! appearance, after the largest numeric id (`%12`) used anywhere in the
//! text. A `;` starts a comment.

use std::collections::BTreeMap;

use lpc_spirv::{Op, MAGIC_NUMBER};
use lpc_spvir::{
    AddressingModel, BuiltIn, Capability, Decoration, Dim, ExecutionMode, ExecutionModel,
    FPFastMathMode, FPRoundingMode, FunctionControl, ImageFormat, LinkageType, LoopControl,
    MemoryAccess, MemoryModel, SelectionControl, StorageClass,
};
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while1},
    character::complete::{char, digit1, hex_digit1, satisfy, space0, space1},
    combinator::{map, map_res, not, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

/// One operand as written
#[derive(Debug, Clone, PartialEq)]
enum Operand<'a> {
    Id(&'a str),
    Int(i64),
    Float(f32),
    Str(String),
    Word(&'a str),
}

/// One parsed line
#[derive(Debug, Clone, PartialEq)]
struct AsmInst<'a> {
    line: usize,
    result: Option<&'a str>,
    op: Op,
    operands: Vec<Operand<'a>>,
}

fn id_name(input: &str) -> IResult<&str, &str> {
    preceded(
        char('%'),
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
    )(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("\"", tag("\"")),
                    value("\n", tag("n")),
                )),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn float_literal(input: &str) -> IResult<&str, f32> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, char('.'), digit1))),
        str::parse,
    )(input)
}

fn int_literal(input: &str) -> IResult<&str, i64> {
    alt((
        map_res(preceded(tag("0x"), hex_digit1), |digits| {
            i64::from_str_radix(digits, 16)
        }),
        map_res(recognize(pair(opt(char('-')), digit1)), str::parse),
    ))(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '|')(input)
}

/// Numbers must not run into a word, so `2D` stays an enumerant
fn word_boundary(input: &str) -> IResult<&str, ()> {
    not(satisfy(|c: char| c.is_ascii_alphanumeric() || c == '_'))(input)
}

fn operand(input: &str) -> IResult<&str, Operand<'_>> {
    alt((
        map(id_name, Operand::Id),
        map(string_literal, Operand::Str),
        map(terminated(float_literal, word_boundary), Operand::Float),
        map(terminated(int_literal, word_boundary), Operand::Int),
        map(word, Operand::Word),
    ))(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    preceded(char(';'), nom::combinator::rest)(input)
}

/// `[%result =] OpName operand*`
fn instruction(input: &str) -> IResult<&str, (Option<&str>, &str, Vec<Operand<'_>>)> {
    let (input, _) = space0(input)?;
    let (input, result) = opt(terminated(id_name, tuple((space0, char('='), space0))))(input)?;
    let (input, name) = word(input)?;
    let (input, operands) = many0(preceded(space1, operand))(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = opt(comment)(input)?;
    Ok((input, (result, name, operands)))
}

fn parse_lines(source: &str) -> Result<Vec<AsmInst<'_>>, String> {
    let mut insts = Vec::new();
    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }
        let (rest, (result, name, operands)) = instruction(text)
            .map_err(|e| format!("line {}: cannot parse instruction: {:?}", line, e))?;
        if !rest.is_empty() {
            return Err(format!("line {}: unexpected input '{}'", line, rest));
        }
        let op = Op::from_name(name)
            .ok_or_else(|| format!("line {}: unknown instruction {}", line, name))?;
        insts.push(AsmInst {
            line,
            result,
            op,
            operands,
        });
    }
    Ok(insts)
}

/// Instructions that define a result without a result type operand
fn has_result_type(op: Op) -> bool {
    let name = op.name();
    !(name.starts_with("OpType")
        || matches!(op, Op::Label | Op::String | Op::ExtInstImport))
}

/// Numbers for every id in the text
struct IdMap<'a> {
    ids: BTreeMap<&'a str, u32>,
    next: u32,
}

impl<'a> IdMap<'a> {
    fn new(insts: &[AsmInst<'a>]) -> Self {
        let names = insts.iter().flat_map(|inst| {
            inst.result.into_iter().chain(inst.operands.iter().filter_map(|op| match op {
                Operand::Id(name) => Some(*name),
                _ => None,
            }))
        });
        let numeric_max = names
            .clone()
            .filter_map(|name| name.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        let mut map = Self {
            ids: BTreeMap::new(),
            next: numeric_max + 1,
        };
        for name in names {
            map.assign(name);
        }
        map
    }

    fn assign(&mut self, name: &'a str) {
        if self.ids.contains_key(name) {
            return;
        }
        let id = match name.parse::<u32>() {
            Ok(id) => id,
            Err(_) => {
                let id = self.next;
                self.next += 1;
                id
            }
        };
        self.ids.insert(name, id);
    }

    fn get(&self, name: &str) -> u32 {
        self.ids.get(name).copied().unwrap_or(0)
    }

    fn bound(&self) -> u32 {
        self.ids.values().max().map_or(1, |max| max + 1)
    }
}

/// Value of a bare enumerant at `index` among the source operands of `op`;
/// `previous` holds the first word of each earlier operand
fn enumerant(op: Op, index: usize, previous: &[u32], name: &str) -> Option<u32> {
    let decoration = |at: usize| previous.get(at).copied().and_then(Decoration::from_u32);
    match (op, index) {
        (Op::Capability, 0) => Capability::from_name(name).map(Capability::as_u32),
        (Op::MemoryModel, 0) => AddressingModel::from_name(name).map(AddressingModel::as_u32),
        (Op::MemoryModel, 1) => MemoryModel::from_name(name).map(MemoryModel::as_u32),
        (Op::EntryPoint, 0) => ExecutionModel::from_name(name).map(ExecutionModel::as_u32),
        (Op::ExecutionMode, 1) => ExecutionMode::from_name(name).map(ExecutionMode::as_u32),
        (Op::Decorate, 1) | (Op::MemberDecorate, 2) => {
            Decoration::from_name(name).map(Decoration::as_u32)
        }
        (Op::Decorate, 2) | (Op::MemberDecorate, 3) => match decoration(index - 1)? {
            Decoration::BuiltIn => BuiltIn::from_name(name).map(BuiltIn::as_u32),
            Decoration::FPRoundingMode => FPRoundingMode::from_name(name).map(FPRoundingMode::as_u32),
            Decoration::FPFastMathMode => FPFastMathMode::from_names(name).map(FPFastMathMode::bits),
            _ => None,
        },
        (Op::Decorate, 3) if decoration(1) == Some(Decoration::LinkageAttributes) => {
            LinkageType::from_name(name).map(LinkageType::as_u32)
        }
        (Op::TypePointer, 0) | (Op::TypeForwardPointer, 1) | (Op::Variable, 1) => {
            StorageClass::from_name(name).map(StorageClass::as_u32)
        }
        (Op::TypeImage, 1) => Dim::from_name(&format!("Dim{}", name))
            .or_else(|| Dim::from_name(name))
            .map(Dim::as_u32),
        (Op::TypeImage, 6) => ImageFormat::from_name(name).map(ImageFormat::as_u32),
        (Op::Function, 1) => FunctionControl::from_names(name).map(FunctionControl::bits),
        (Op::SelectionMerge, 1) => SelectionControl::from_names(name).map(SelectionControl::bits),
        (Op::LoopMerge, 2) => LoopControl::from_names(name).map(LoopControl::bits),
        (Op::Load, 2) | (Op::Store, 2) | (Op::CopyMemory, 2) | (Op::CopyMemory, 3) => {
            MemoryAccess::from_names(name).map(MemoryAccess::bits)
        }
        _ => None,
    }
}

fn string_words(text: &str) -> Vec<u32> {
    let mut bytes = Vec::from(text.as_bytes());
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn encode(inst: &AsmInst<'_>, ids: &IdMap<'_>) -> Result<Vec<u32>, String> {
    let mut sources: Vec<Vec<u32>> = Vec::with_capacity(inst.operands.len());
    let mut firsts = Vec::with_capacity(inst.operands.len());
    for (index, operand) in inst.operands.iter().enumerate() {
        let words = match operand {
            Operand::Id(name) => vec![ids.get(name)],
            Operand::Int(value) => {
                if *value >= i64::from(i32::MIN) && *value <= i64::from(u32::MAX) {
                    vec![*value as u32]
                } else {
                    vec![*value as u32, (*value >> 32) as u32]
                }
            }
            Operand::Float(value) => vec![value.to_bits()],
            Operand::Str(text) => string_words(text),
            Operand::Word(name) => {
                let value = enumerant(inst.op, index, &firsts, name).ok_or_else(|| {
                    format!(
                        "line {}: unknown enumerant {} for operand {} of {}",
                        inst.line,
                        name,
                        index,
                        inst.op.name()
                    )
                })?;
                vec![value]
            }
        };
        firsts.push(words.first().copied().unwrap_or(0));
        sources.push(words);
    }

    let mut operands: Vec<u32> = Vec::new();
    match inst.result {
        Some(result) if has_result_type(inst.op) => {
            let mut sources = sources.into_iter();
            let result_type = sources.next().ok_or_else(|| {
                format!("line {}: {} needs a result type", inst.line, inst.op.name())
            })?;
            operands.extend(result_type);
            operands.push(ids.get(result));
            operands.extend(sources.flatten());
        }
        Some(result) => {
            operands.push(ids.get(result));
            operands.extend(sources.into_iter().flatten());
        }
        None => operands.extend(sources.into_iter().flatten()),
    }

    let word_count = operands.len() as u32 + 1;
    if word_count > 0xffff {
        return Err(format!("line {}: instruction too long", inst.line));
    }
    let mut words = Vec::with_capacity(operands.len() + 1);
    words.push((word_count << 16) | inst.op.as_u32());
    words.extend(operands);
    Ok(words)
}

/// Assemble `source` into a complete module with header
///
/// `minor_version` selects SPIR-V 1.`minor_version` in the header.
pub fn assemble(source: &str, minor_version: u32) -> Result<Vec<u32>, String> {
    let insts = parse_lines(source)?;
    let ids = IdMap::new(&insts);
    let mut words = vec![MAGIC_NUMBER, (1 << 16) | (minor_version << 8), 0, ids.bound(), 0];
    for inst in &insts {
        words.extend(encode(inst, &ids)?);
    }
    Ok(words)
}
