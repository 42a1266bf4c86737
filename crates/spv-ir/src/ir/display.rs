use std::fmt;

use crate::spv::Op;

use super::{Instruction, Module, OperandKind};

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_tombstoned() {
            return write!(f, "OpNop");
        }
        if self.result_id() != 0 {
            write!(f, "%{} = ", self.result_id())?;
        }
        write!(f, "Op{:?}", self.opcode())?;
        if self.type_id() != 0 {
            write!(f, " %{}", self.type_id())?;
        }
        for operand in self.operands() {
            match operand.kind() {
                OperandKind::IdRef => write!(f, " %{}", operand.single_word())?,
                OperandKind::LiteralWord => write!(f, " {}", operand.single_word())?,
                OperandKind::LiteralString => match operand.as_string() {
                    Some(s) => write!(f, " \"{s}\"")?,
                    None => write!(f, " \"<bad string>\"")?,
                },
            }
        }
        Ok(())
    }
}

impl fmt::Display for Module {
    /// Readable listing of the whole module, one instruction per line,
    /// function bodies indented. A debugging aid, not the assembler grammar.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in self.global_insts() {
            writeln!(f, "{}", self.inst(id))?;
        }
        for func in self.func_ids() {
            let func = self.function(func);
            writeln!(f, "{}", self.inst(func.def()))?;
            for &param in func.params() {
                writeln!(f, "{}", self.inst(param))?;
            }
            for &block in func.blocks() {
                let block = self.block(block);
                writeln!(f, "{}", self.inst(block.label()))?;
                for inst in block.live_body(self) {
                    writeln!(f, "  {}", self.inst(inst))?;
                }
            }
            if func.end().is_some() {
                writeln!(f, "Op{:?}", Op::FunctionEnd)?;
            }
        }
        Ok(())
    }
}
