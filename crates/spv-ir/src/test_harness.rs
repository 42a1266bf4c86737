//! Test harness for spv-ir unit and integration tests.
//!
//! Provides shorthand constructors for decoded-instruction records and
//! helpers to assemble them into modules or raw word streams, so tests
//! don't need a textual assembler.
//!
//! Only available when running tests or with the `test-harness` feature.

#![allow(clippy::missing_panics_doc, clippy::must_use_candidate)]

use crate::ir::{InstId, Instruction, Module, Operand};
use crate::loader::IrLoader;
use crate::spv::{self, Op, RawInstruction};

/// Shorthand for a decoded-instruction record.
pub fn inst(opcode: Op, type_id: u32, result_id: u32, operands: Vec<Operand>) -> RawInstruction {
    RawInstruction {
        opcode,
        type_id,
        result_id,
        operands,
    }
}

/// An id-reference operand.
pub fn id(value: u32) -> Operand {
    Operand::id(value)
}

/// A literal-word operand.
pub fn lit(value: u32) -> Operand {
    Operand::literal(value)
}

/// A literal-string operand.
pub fn string(value: &str) -> Operand {
    Operand::string(value)
}

/// Feed the records through the loader and finalize the module, with the
/// id bound computed from the contents. Panics on loader errors.
pub fn assemble(records: Vec<RawInstruction>) -> Module {
    let mut loader = IrLoader::new();
    for record in records {
        loader.add_instruction(record).expect("loader rejected record");
    }
    let mut module = loader.end_module();
    let bound = module.compute_bound();
    module.set_bound(bound);
    module
}

/// Encode records straight to a binary word stream (header included),
/// without going through a `Module`.
pub fn assemble_words(records: &[RawInstruction]) -> Vec<u32> {
    let mut bound = 0;
    let mut body = Vec::new();
    for record in records {
        let instruction = Instruction::from_raw(record.clone());
        bound = bound.max(instruction.result_id());
        for referenced in instruction.referenced_ids() {
            bound = bound.max(referenced);
        }
        instruction.encode_into(&mut body, false);
    }
    let header = spv::Header {
        version: spv::VERSION,
        generator: spv::GENERATOR,
        bound: bound + 1,
        schema: 0,
    };
    let mut words = header.to_words().to_vec();
    words.extend(body);
    words
}

/// Count live instructions with the given opcode anywhere in the module.
pub fn count_opcode(module: &Module, opcode: Op) -> usize {
    module
        .all_insts()
        .map(|i| module.inst(i))
        .filter(|inst| inst.is_live() && inst.opcode() == opcode)
        .count()
}

/// Does the module contain a live instruction with this opcode?
pub fn has_opcode(module: &Module, opcode: Op) -> bool {
    count_opcode(module, opcode) > 0
}

/// The first live module-scope instruction with this opcode.
pub fn find_global(module: &Module, opcode: Op) -> Option<InstId> {
    module.global_insts().find(|&i| {
        let inst = module.inst(i);
        inst.is_live() && inst.opcode() == opcode
    })
}
