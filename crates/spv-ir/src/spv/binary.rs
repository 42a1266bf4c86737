//! SPIR-V binary word-stream decoding.
//!
//! Decodes the 5-word header and the flat instruction stream into tagged
//! instruction records. The loader consumes these records; it never touches
//! raw words itself.

use crate::ir::{Operand, OperandKind};
use crate::{Error, Result};

use super::Op;

/// SPIR-V magic number (little-endian host order).
pub const MAGIC: u32 = 0x0723_0203;

/// Default version word written by the encoder (SPIR-V 1.3).
pub const VERSION: u32 = 0x0001_0300;

/// Generator id written by the encoder.
pub const GENERATOR: u32 = 0;

/// The 5-word module header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub generator: u32,
    pub bound: u32,
    pub schema: u32,
}

impl Header {
    #[must_use]
    pub fn to_words(self) -> [u32; 5] {
        [MAGIC, self.version, self.generator, self.bound, self.schema]
    }
}

/// One decoded instruction: opcode, optional type/result ids (0 = absent)
/// and the remaining operands, each tagged with its semantic kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInstruction {
    pub opcode: Op,
    pub type_id: u32,
    pub result_id: u32,
    pub operands: Vec<Operand>,
}

/// Reassemble little-endian bytes into a word stream.
pub fn bytes_to_words(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::bad_binary(
            bytes.len() / 4,
            "byte length is not a multiple of 4",
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Serialize a word stream to little-endian bytes.
#[must_use]
pub fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for word in words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes
}

/// Decode the header and every instruction of a binary module.
///
/// Structural errors (bad magic, truncated instruction, unknown opcode,
/// malformed operands) abort immediately with the offending word offset;
/// no partial result is returned.
pub fn decode_module(words: &[u32]) -> Result<(Header, Vec<RawInstruction>)> {
    if words.len() < 5 {
        return Err(Error::bad_binary(0, "module shorter than the 5-word header"));
    }
    if words[0] != MAGIC {
        let reason = if words[0] == MAGIC.swap_bytes() {
            "byte-swapped (big-endian) modules are not supported"
        } else {
            "bad magic number"
        };
        return Err(Error::bad_binary(0, reason));
    }

    let header = Header {
        version: words[1],
        generator: words[2],
        bound: words[3],
        schema: words[4],
    };

    let mut instructions = Vec::new();
    let mut pos = 5;
    while pos < words.len() {
        let first = words[pos];
        let word_count = (first >> 16) as usize;
        let opcode_raw = (first & 0xFFFF) as u16;

        if word_count == 0 {
            return Err(Error::bad_binary(pos, "instruction word count is zero"));
        }
        if pos + word_count > words.len() {
            return Err(Error::bad_binary(
                pos,
                format!("instruction of {word_count} words overruns the stream"),
            ));
        }
        let Some(opcode) = Op::from_u16(opcode_raw) else {
            return Err(Error::bad_binary(pos, format!("unknown opcode {opcode_raw}")));
        };

        instructions.push(decode_instruction(opcode, &words[pos..pos + word_count], pos)?);
        pos += word_count;
    }

    Ok((header, instructions))
}

// Fixed leading operands, after any type/result ids.
#[derive(Clone, Copy)]
enum Arg {
    Id,
    Lit,
}

// What the trailing (variable-length) operands are.
#[derive(Clone, Copy)]
enum Rest {
    None,
    Ids,
    Lits,
    Str,
    // OpEntryPoint: name string, then interface ids.
    StrThenIds,
    // OpSource: optional file id, then optional source string.
    OptIdThenStr,
    // OpSwitch: (case literal, target id) pairs.
    LitIdPairs,
    // OpGroupMemberDecorate: (target id, member literal) pairs.
    IdLitPairs,
}

struct Layout {
    has_type: bool,
    has_result: bool,
    args: &'static [Arg],
    rest: Rest,
}

const fn layout(has_type: bool, has_result: bool, args: &'static [Arg], rest: Rest) -> Layout {
    Layout {
        has_type,
        has_result,
        args,
        rest,
    }
}

#[allow(clippy::too_many_lines)]
fn op_layout(op: Op) -> Layout {
    use Arg::{Id, Lit};
    match op {
        Op::Nop | Op::NoLine | Op::FunctionEnd | Op::Kill | Op::Return | Op::Unreachable => {
            layout(false, false, &[], Rest::None)
        }
        Op::Undef | Op::FunctionParameter => layout(true, true, &[], Rest::None),
        Op::SourceContinued | Op::SourceExtension | Op::Extension => {
            layout(false, false, &[], Rest::Str)
        }
        Op::Source => layout(false, false, &[Lit, Lit], Rest::OptIdThenStr),
        Op::Name => layout(false, false, &[Id], Rest::Str),
        Op::MemberName => layout(false, false, &[Id, Lit], Rest::Str),
        Op::String | Op::ExtInstImport => layout(false, true, &[], Rest::Str),
        Op::Line => layout(false, false, &[Id, Lit, Lit], Rest::None),
        Op::ExtInst => layout(true, true, &[Id, Lit], Rest::Ids),
        Op::MemoryModel => layout(false, false, &[Lit, Lit], Rest::None),
        Op::EntryPoint => layout(false, false, &[Lit, Id], Rest::StrThenIds),
        Op::ExecutionMode => layout(false, false, &[Id, Lit], Rest::Lits),
        Op::Capability => layout(false, false, &[Lit], Rest::None),
        // Types
        Op::TypeVoid | Op::TypeBool | Op::TypeSampler | Op::DecorationGroup => {
            layout(false, true, &[], Rest::None)
        }
        Op::TypeInt => layout(false, true, &[Lit, Lit], Rest::None),
        Op::TypeFloat => layout(false, true, &[Lit], Rest::Lits),
        Op::TypeVector | Op::TypeMatrix => layout(false, true, &[Id, Lit], Rest::None),
        Op::TypeImage => {
            layout(false, true, &[Id, Lit, Lit, Lit, Lit, Lit, Lit], Rest::Lits)
        }
        Op::TypeSampledImage | Op::TypeRuntimeArray => layout(false, true, &[Id], Rest::None),
        Op::TypeArray => layout(false, true, &[Id, Id], Rest::None),
        Op::TypeStruct => layout(false, true, &[], Rest::Ids),
        Op::TypeOpaque => layout(false, true, &[], Rest::Str),
        Op::TypePointer => layout(false, true, &[Lit, Id], Rest::None),
        Op::TypeFunction => layout(false, true, &[Id], Rest::Ids),
        Op::TypeForwardPointer => layout(false, false, &[Id, Lit], Rest::None),
        // Constants
        Op::ConstantTrue
        | Op::ConstantFalse
        | Op::ConstantNull
        | Op::SpecConstantTrue
        | Op::SpecConstantFalse => layout(true, true, &[], Rest::None),
        Op::Constant | Op::SpecConstant => layout(true, true, &[], Rest::Lits),
        Op::ConstantComposite | Op::SpecConstantComposite => layout(true, true, &[], Rest::Ids),
        Op::SpecConstantOp => layout(true, true, &[Lit], Rest::Ids),
        // Functions and memory
        Op::Function => layout(true, true, &[Lit, Id], Rest::None),
        Op::FunctionCall | Op::AccessChain => layout(true, true, &[Id], Rest::Ids),
        Op::Variable => layout(true, true, &[Lit], Rest::Ids),
        Op::Load => layout(true, true, &[Id], Rest::Lits),
        Op::Store | Op::CopyMemory => layout(false, false, &[Id, Id], Rest::Lits),
        // Annotations
        Op::Decorate => layout(false, false, &[Id, Lit], Rest::Lits),
        Op::MemberDecorate => layout(false, false, &[Id, Lit, Lit], Rest::Lits),
        Op::GroupDecorate => layout(false, false, &[Id], Rest::Ids),
        Op::GroupMemberDecorate => layout(false, false, &[Id], Rest::IdLitPairs),
        // Composites
        Op::VectorShuffle => layout(true, true, &[Id, Id], Rest::Lits),
        Op::CompositeConstruct => layout(true, true, &[], Rest::Ids),
        Op::CompositeExtract => layout(true, true, &[Id], Rest::Lits),
        Op::CompositeInsert => layout(true, true, &[Id, Id], Rest::Lits),
        // Unary operations
        Op::ConvertFToU
        | Op::ConvertFToS
        | Op::ConvertSToF
        | Op::ConvertUToF
        | Op::UConvert
        | Op::SConvert
        | Op::FConvert
        | Op::Bitcast
        | Op::SNegate
        | Op::FNegate
        | Op::Any
        | Op::All
        | Op::IsNan
        | Op::IsInf
        | Op::LogicalNot
        | Op::Not => layout(true, true, &[Id], Rest::None),
        // Binary operations
        Op::IAdd
        | Op::FAdd
        | Op::ISub
        | Op::FSub
        | Op::IMul
        | Op::FMul
        | Op::UDiv
        | Op::SDiv
        | Op::FDiv
        | Op::UMod
        | Op::SRem
        | Op::SMod
        | Op::FRem
        | Op::FMod
        | Op::VectorTimesScalar
        | Op::MatrixTimesScalar
        | Op::VectorTimesMatrix
        | Op::MatrixTimesVector
        | Op::MatrixTimesMatrix
        | Op::OuterProduct
        | Op::Dot
        | Op::LogicalEqual
        | Op::LogicalNotEqual
        | Op::LogicalOr
        | Op::LogicalAnd
        | Op::IEqual
        | Op::INotEqual
        | Op::UGreaterThan
        | Op::SGreaterThan
        | Op::UGreaterThanEqual
        | Op::SGreaterThanEqual
        | Op::ULessThan
        | Op::SLessThan
        | Op::ULessThanEqual
        | Op::SLessThanEqual
        | Op::FOrdEqual
        | Op::FUnordEqual
        | Op::FOrdNotEqual
        | Op::FUnordNotEqual
        | Op::FOrdLessThan
        | Op::FUnordLessThan
        | Op::FOrdGreaterThan
        | Op::FUnordGreaterThan
        | Op::FOrdLessThanEqual
        | Op::FUnordLessThanEqual
        | Op::FOrdGreaterThanEqual
        | Op::FUnordGreaterThanEqual
        | Op::ShiftRightLogical
        | Op::ShiftRightArithmetic
        | Op::ShiftLeftLogical
        | Op::BitwiseOr
        | Op::BitwiseXor
        | Op::BitwiseAnd => layout(true, true, &[Id, Id], Rest::None),
        Op::Select => layout(true, true, &[Id, Id, Id], Rest::None),
        // Control flow
        Op::Phi => layout(true, true, &[], Rest::Ids),
        Op::LoopMerge => layout(false, false, &[Id, Id, Lit], Rest::Lits),
        Op::SelectionMerge => layout(false, false, &[Id, Lit], Rest::None),
        Op::Label => layout(false, true, &[], Rest::None),
        Op::Branch => layout(false, false, &[Id], Rest::None),
        Op::BranchConditional => layout(false, false, &[Id, Id, Id], Rest::Lits),
        Op::Switch => layout(false, false, &[Id, Id], Rest::LitIdPairs),
        Op::ReturnValue => layout(false, false, &[Id], Rest::None),
    }
}

fn decode_instruction(opcode: Op, words: &[u32], offset: usize) -> Result<RawInstruction> {
    let shape = op_layout(opcode);
    let mut pos = 1;
    let mut next = |what: &str| -> Result<u32> {
        if pos >= words.len() {
            return Err(Error::bad_binary(
                offset,
                format!("{opcode:?} is missing its {what}"),
            ));
        }
        let word = words[pos];
        pos += 1;
        Ok(word)
    };

    let type_id = if shape.has_type { next("type id")? } else { 0 };
    let result_id = if shape.has_result { next("result id")? } else { 0 };

    let mut operands = Vec::new();
    for arg in shape.args {
        let word = next("operand")?;
        operands.push(match arg {
            Arg::Id => Operand::id(word),
            Arg::Lit => Operand::literal(word),
        });
    }

    let rest = &words[pos..];
    match shape.rest {
        Rest::None => {
            if !rest.is_empty() {
                return Err(Error::bad_binary(
                    offset,
                    format!("{opcode:?} has {} unexpected trailing words", rest.len()),
                ));
            }
        }
        Rest::Ids => operands.extend(rest.iter().map(|&w| Operand::id(w))),
        Rest::Lits => operands.extend(rest.iter().map(|&w| Operand::literal(w))),
        Rest::Str => operands.push(decode_string(rest, offset)?),
        Rest::StrThenIds => {
            let string = decode_string_prefix(rest, offset)?;
            let consumed = string.words().len();
            operands.push(string);
            operands.extend(rest[consumed..].iter().map(|&w| Operand::id(w)));
        }
        Rest::OptIdThenStr => {
            if let Some((&file, source)) = rest.split_first() {
                operands.push(Operand::id(file));
                if !source.is_empty() {
                    operands.push(decode_string(source, offset)?);
                }
            }
        }
        Rest::LitIdPairs => {
            if rest.len() % 2 != 0 {
                return Err(Error::bad_binary(
                    offset,
                    format!("{opcode:?} has a dangling half pair"),
                ));
            }
            for pair in rest.chunks_exact(2) {
                operands.push(Operand::literal(pair[0]));
                operands.push(Operand::id(pair[1]));
            }
        }
        Rest::IdLitPairs => {
            if rest.len() % 2 != 0 {
                return Err(Error::bad_binary(
                    offset,
                    format!("{opcode:?} has a dangling half pair"),
                ));
            }
            for pair in rest.chunks_exact(2) {
                operands.push(Operand::id(pair[0]));
                operands.push(Operand::literal(pair[1]));
            }
        }
    }

    Ok(RawInstruction {
        opcode,
        type_id,
        result_id,
        operands,
    })
}

// A literal string consuming the whole remainder of the instruction.
fn decode_string(words: &[u32], offset: usize) -> Result<Operand> {
    let operand = decode_string_prefix(words, offset)?;
    if operand.words().len() != words.len() {
        return Err(Error::bad_binary(offset, "trailing words after string"));
    }
    Ok(operand)
}

// A literal string at the start of `words`: null-padded UTF-8 packed
// little-endian, terminated within the word that contains the NUL.
fn decode_string_prefix(words: &[u32], offset: usize) -> Result<Operand> {
    let mut end = None;
    'scan: for (i, word) in words.iter().enumerate() {
        for byte in word.to_le_bytes() {
            if byte == 0 {
                end = Some(i + 1);
                break 'scan;
            }
        }
    }
    let Some(end) = end else {
        return Err(Error::bad_binary(offset, "unterminated string literal"));
    };
    let operand = Operand::new(OperandKind::LiteralString, words[..end].to_vec());
    if operand.as_string().is_none() {
        return Err(Error::bad_binary(offset, "string literal is not UTF-8"));
    }
    Ok(operand)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(words: &[u32]) -> Vec<u32> {
        let mut module = vec![MAGIC, VERSION, GENERATOR, 100, 0];
        module.extend_from_slice(words);
        module
    }

    #[test]
    fn test_header_decode() {
        let words = inst(&[]);
        let (header, insts) = decode_module(&words).expect("decode");
        assert_eq!(header.version, VERSION);
        assert_eq!(header.bound, 100);
        assert!(insts.is_empty());
    }

    #[test]
    fn test_bad_magic() {
        let mut words = inst(&[]);
        words[0] = 0xDEAD_BEEF;
        assert!(matches!(
            decode_module(&words),
            Err(Error::InvalidBinary { offset: 0, .. })
        ));
    }

    #[test]
    fn test_byte_swapped_magic_is_reported() {
        let mut words = inst(&[]);
        words[0] = MAGIC.swap_bytes();
        let err = decode_module(&words).unwrap_err();
        assert!(err.to_string().contains("byte-swapped"));
    }

    #[test]
    fn test_truncated_instruction() {
        // Claims 4 words but only 2 are present.
        let words = inst(&[(4 << 16) | u32::from(Op::TypeVector.as_u16()), 1]);
        assert!(matches!(
            decode_module(&words),
            Err(Error::InvalidBinary { offset: 5, .. })
        ));
    }

    #[test]
    fn test_zero_word_count() {
        let words = inst(&[u32::from(Op::Nop.as_u16())]);
        let err = decode_module(&words).unwrap_err();
        assert!(err.to_string().contains("word count is zero"));
    }

    #[test]
    fn test_unknown_opcode() {
        let words = inst(&[(1 << 16) | 9999]);
        let err = decode_module(&words).unwrap_err();
        assert!(err.to_string().contains("unknown opcode"));
    }

    #[test]
    fn test_decode_type_vector() {
        // %2 = OpTypeVector %1 3
        let words = inst(&[(4 << 16) | u32::from(Op::TypeVector.as_u16()), 2, 1, 3]);
        let (_, insts) = decode_module(&words).expect("decode");
        assert_eq!(insts.len(), 1);
        let i = &insts[0];
        assert_eq!(i.opcode, Op::TypeVector);
        assert_eq!(i.result_id, 2);
        assert_eq!(i.type_id, 0);
        assert_eq!(i.operands.len(), 2);
        assert_eq!(i.operands[0].kind(), OperandKind::IdRef);
        assert_eq!(i.operands[0].single_word(), 1);
        assert_eq!(i.operands[1].kind(), OperandKind::LiteralWord);
        assert_eq!(i.operands[1].single_word(), 3);
    }

    #[test]
    fn test_decode_name_string() {
        // OpName %3 "abc"
        let name = u32::from_le_bytes([b'a', b'b', b'c', 0]);
        let words = inst(&[(3 << 16) | u32::from(Op::Name.as_u16()), 3, name]);
        let (_, insts) = decode_module(&words).expect("decode");
        let i = &insts[0];
        assert_eq!(i.operands[1].kind(), OperandKind::LiteralString);
        assert_eq!(i.operands[1].as_string().as_deref(), Some("abc"));
    }

    #[test]
    fn test_decode_entry_point_interface() {
        // OpEntryPoint GLCompute %4 "main" %7 %8
        let name = u32::from_le_bytes([b'm', b'a', b'i', b'n']);
        let words = inst(&[
            (7 << 16) | u32::from(Op::EntryPoint.as_u16()),
            5,
            4,
            name,
            0,
            7,
            8,
        ]);
        let (_, insts) = decode_module(&words).expect("decode");
        let i = &insts[0];
        assert_eq!(i.operands.len(), 5);
        assert_eq!(i.operands[2].as_string().as_deref(), Some("main"));
        assert_eq!(i.operands[3].kind(), OperandKind::IdRef);
        assert_eq!(i.operands[4].single_word(), 8);
    }

    #[test]
    fn test_decode_switch_pairs() {
        // OpSwitch %1 %2 10 %3 20 %4
        let words = inst(&[
            (7 << 16) | u32::from(Op::Switch.as_u16()),
            1,
            2,
            10,
            3,
            20,
            4,
        ]);
        let (_, insts) = decode_module(&words).expect("decode");
        let kinds: Vec<_> = insts[0].operands.iter().map(Operand::kind).collect();
        assert_eq!(
            kinds,
            vec![
                OperandKind::IdRef,
                OperandKind::IdRef,
                OperandKind::LiteralWord,
                OperandKind::IdRef,
                OperandKind::LiteralWord,
                OperandKind::IdRef,
            ]
        );
    }

    #[test]
    fn test_switch_dangling_pair() {
        let words = inst(&[(4 << 16) | u32::from(Op::Switch.as_u16()), 1, 2, 10]);
        assert!(decode_module(&words).is_err());
    }

    #[test]
    fn test_unterminated_string() {
        let name = u32::from_le_bytes([b'a', b'b', b'c', b'd']);
        let words = inst(&[(3 << 16) | u32::from(Op::Name.as_u16()), 3, name]);
        let err = decode_module(&words).unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_bytes_round_trip() {
        let words = inst(&[(2 << 16) | u32::from(Op::Capability.as_u16()), 1]);
        let bytes = words_to_bytes(&words);
        assert_eq!(bytes_to_words(&bytes).expect("round trip"), words);
    }

    #[test]
    fn test_bytes_bad_length() {
        assert!(bytes_to_words(&[1, 2, 3]).is_err());
    }
}
