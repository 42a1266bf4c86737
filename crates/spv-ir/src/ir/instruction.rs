use crate::spv::{Op, RawInstruction};

use super::{Operand, OperandKind};

/// Whether an instruction slot still carries a live instruction.
///
/// Passes never physically erase instructions; they tombstone them so that
/// every recorded (instruction, operand) position stays valid until the
/// module is serialized. Tombstoned slots encode as `OpNop` unless the
/// serializer is asked to skip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Liveness {
    #[default]
    Live,
    Tombstoned,
}

/// A single SPIR-V instruction.
///
/// `type_id` and `result_id` are 0 when absent. `operands` holds the
/// in-operands only; on the wire the type id (when present) is always the
/// first word after the opcode word, the result id the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    opcode: Op,
    type_id: u32,
    result_id: u32,
    operands: Vec<Operand>,
    /// Line-debug instructions (`OpLine`/`OpNoLine`) textually preceding
    /// this one. They travel with the instruction across moves and copies.
    lines: Vec<Instruction>,
    liveness: Liveness,
}

impl Instruction {
    #[must_use]
    pub fn new(opcode: Op, type_id: u32, result_id: u32, operands: Vec<Operand>) -> Self {
        Self {
            opcode,
            type_id,
            result_id,
            operands,
            lines: Vec::new(),
            liveness: Liveness::Live,
        }
    }

    /// Build from a decoded record, taking ownership of its operands.
    #[must_use]
    pub fn from_raw(raw: RawInstruction) -> Self {
        Self::new(raw.opcode, raw.type_id, raw.result_id, raw.operands)
    }

    #[must_use]
    pub fn opcode(&self) -> Op {
        self.opcode
    }

    #[must_use]
    pub fn type_id(&self) -> u32 {
        self.type_id
    }

    #[must_use]
    pub fn result_id(&self) -> u32 {
        self.result_id
    }

    #[must_use]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    #[must_use]
    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    #[must_use]
    pub fn operand(&self, index: usize) -> &Operand {
        &self.operands[index]
    }

    /// The single word of operand `index`. Panics if that operand is wider
    /// than one word.
    #[must_use]
    pub fn single_word_operand(&self, index: usize) -> u32 {
        self.operands[index].single_word()
    }

    pub fn set_type_id(&mut self, id: u32) {
        self.type_id = id;
    }

    pub(crate) fn set_operand_word(&mut self, index: usize, word: u32) {
        self.operands[index].set_single_word(word);
    }

    /// Attached line-debug instructions.
    #[must_use]
    pub fn lines(&self) -> &[Instruction] {
        &self.lines
    }

    pub fn attach_lines(&mut self, lines: Vec<Instruction>) {
        self.lines = lines;
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.liveness == Liveness::Live
    }

    #[must_use]
    pub fn is_tombstoned(&self) -> bool {
        self.liveness == Liveness::Tombstoned
    }

    /// Logically delete this instruction. The slot stays put; operands and
    /// ids are dropped so nothing keeps referencing other ids through it.
    pub fn tombstone(&mut self) {
        self.liveness = Liveness::Tombstoned;
        self.type_id = 0;
        self.result_id = 0;
        self.operands.clear();
        self.lines.clear();
    }

    /// Total encoded size in words, including attached line instructions.
    #[must_use]
    pub fn word_count(&self) -> usize {
        if self.is_tombstoned() {
            return 1;
        }
        self.own_word_count() + self.lines.iter().map(Instruction::word_count).sum::<usize>()
    }

    fn own_word_count(&self) -> usize {
        1 + usize::from(self.type_id != 0)
            + usize::from(self.result_id != 0)
            + self
                .operands
                .iter()
                .map(|op| op.words().len())
                .sum::<usize>()
    }

    /// Append the binary encoding: `(word_count << 16) | opcode`, then the
    /// type id if nonzero, the result id if nonzero, then operand words.
    /// Attached line instructions are emitted first. Tombstoned slots emit
    /// a 1-word `OpNop` unless `skip_tombstones` is set.
    pub fn encode_into(&self, words: &mut Vec<u32>, skip_tombstones: bool) {
        if self.is_tombstoned() {
            if !skip_tombstones {
                words.push((1 << 16) | u32::from(Op::Nop.as_u16()));
            }
            return;
        }
        for line in &self.lines {
            line.encode_into(words, skip_tombstones);
        }
        #[allow(clippy::cast_possible_truncation)]
        words.push(((self.own_word_count() as u32) << 16) | u32::from(self.opcode.as_u16()));
        if self.type_id != 0 {
            words.push(self.type_id);
        }
        if self.result_id != 0 {
            words.push(self.result_id);
        }
        for operand in &self.operands {
            words.extend_from_slice(operand.words());
        }
    }

    /// Ids this instruction references: the type id plus every id operand.
    /// The instruction's own result id is not a reference.
    pub fn referenced_ids(&self) -> impl Iterator<Item = u32> + '_ {
        let type_ref = (self.type_id != 0).then_some(self.type_id);
        type_ref.into_iter().chain(
            self.operands
                .iter()
                .filter(|op| op.kind() == OperandKind::IdRef)
                .map(Operand::single_word),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_with_type_and_result() {
        // %3 = OpIAdd %1 %2 %2
        let inst = Instruction::new(Op::IAdd, 1, 3, vec![Operand::id(2), Operand::id(2)]);
        let mut words = Vec::new();
        inst.encode_into(&mut words, false);
        assert_eq!(
            words,
            vec![(5 << 16) | u32::from(Op::IAdd.as_u16()), 1, 3, 2, 2]
        );
    }

    #[test]
    fn test_encode_no_ids() {
        let inst = Instruction::new(Op::Return, 0, 0, vec![]);
        let mut words = Vec::new();
        inst.encode_into(&mut words, false);
        assert_eq!(words, vec![(1 << 16) | u32::from(Op::Return.as_u16())]);
    }

    #[test]
    fn test_tombstone_encodes_as_nop() {
        let mut inst = Instruction::new(Op::IAdd, 1, 3, vec![Operand::id(2), Operand::id(2)]);
        inst.tombstone();
        assert_eq!(inst.word_count(), 1);

        let mut words = Vec::new();
        inst.encode_into(&mut words, false);
        assert_eq!(words, vec![(1 << 16) | u32::from(Op::Nop.as_u16())]);

        words.clear();
        inst.encode_into(&mut words, true);
        assert!(words.is_empty());
    }

    #[test]
    fn test_lines_emitted_before_instruction() {
        let mut inst = Instruction::new(Op::Return, 0, 0, vec![]);
        inst.attach_lines(vec![Instruction::new(
            Op::Line,
            0,
            0,
            vec![Operand::id(7), Operand::literal(12), Operand::literal(4)],
        )]);
        let mut words = Vec::new();
        inst.encode_into(&mut words, false);
        assert_eq!(words[0] & 0xFFFF, u32::from(Op::Line.as_u16()));
        assert_eq!(words[4] & 0xFFFF, u32::from(Op::Return.as_u16()));
        assert_eq!(inst.word_count(), 5);
    }

    #[test]
    fn test_referenced_ids_exclude_result() {
        let inst = Instruction::new(
            Op::Phi,
            4,
            9,
            vec![
                Operand::id(9),
                Operand::id(5),
                Operand::id(10),
                Operand::id(6),
            ],
        );
        let refs: Vec<u32> = inst.referenced_ids().collect();
        assert_eq!(refs, vec![4, 9, 5, 10, 6]);
    }
}
