//! Incremental IR construction from a decoded-instruction stream.
//!
//! The loader is the sole consumer of the binary decoder's records. It
//! infers function and block boundaries purely from opcodes and routes
//! module-scope instructions into their sections via the opcode's fixed
//! section mapping.

use crate::ir::{BasicBlock, BlockId, FuncId, Function, Instruction, Module};
use crate::spv::{self, Op, RawInstruction};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    OutsideFunction,
    InsideFunctionOutsideBlock,
    InsideBlock,
}

/// Builds a [`Module`] one decoded instruction at a time.
///
/// Unterminated blocks and functions are still registered at
/// [`IrLoader::end_module`] so unit tests can build partial IR; production
/// binaries are expected to go through the CFG validator afterwards.
#[derive(Debug)]
pub struct IrLoader {
    module: Module,
    state: State,
    current_function: Option<FuncId>,
    current_block: Option<BlockId>,
    pending_lines: Vec<Instruction>,
}

impl Default for IrLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl IrLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            module: Module::new(),
            state: State::OutsideFunction,
            current_function: None,
            current_block: None,
            pending_lines: Vec::new(),
        }
    }

    /// Feed the next decoded instruction.
    pub fn add_instruction(&mut self, raw: RawInstruction) -> Result<()> {
        // OpNop carries no meaning; a serialized tombstone reloads as
        // nothing at all.
        if raw.opcode == Op::Nop {
            return Ok(());
        }
        // Line-debug instructions attach to the next real instruction.
        if raw.opcode.is_debug_line() {
            self.pending_lines.push(Instruction::from_raw(raw));
            return Ok(());
        }

        let opcode = raw.opcode;
        let mut inst = Instruction::from_raw(raw);
        inst.attach_lines(std::mem::take(&mut self.pending_lines));

        match self.state {
            State::OutsideFunction => self.add_outside_function(opcode, inst),
            State::InsideFunctionOutsideBlock => self.add_between_blocks(opcode, inst),
            State::InsideBlock => {
                self.add_in_block(opcode, inst);
                Ok(())
            }
        }
    }

    fn add_outside_function(&mut self, opcode: Op, inst: Instruction) -> Result<()> {
        if opcode == Op::Function {
            let def = self.module.alloc_inst(inst);
            self.current_function = Some(self.module.alloc_function(Function::new(def)));
            self.state = State::InsideFunctionOutsideBlock;
            return Ok(());
        }
        let Some(section) = opcode.section() else {
            return Err(Error::InvalidLayout(format!(
                "Op{opcode:?} is not valid at module scope"
            )));
        };
        if section == spv::Section::MemoryModel
            && self
                .module
                .global_insts()
                .any(|i| self.module.inst(i).opcode() == Op::MemoryModel)
        {
            tracing::warn!("duplicate OpMemoryModel, keeping the last one");
        }
        let id = self.module.alloc_inst(inst);
        self.module.add_to_section(section, id);
        Ok(())
    }

    fn add_between_blocks(&mut self, opcode: Op, inst: Instruction) -> Result<()> {
        let function = self.current_function.expect("in function");
        match opcode {
            Op::FunctionParameter => {
                let id = self.module.alloc_inst(inst);
                self.module.function_mut(function).push_param(id);
            }
            Op::Label => {
                let label = self.module.alloc_inst(inst);
                self.current_block = Some(self.module.alloc_block(BasicBlock::new(label)));
                self.state = State::InsideBlock;
            }
            Op::FunctionEnd => {
                let id = self.module.alloc_inst(inst);
                self.module.function_mut(function).set_end(id);
                self.current_function = None;
                self.state = State::OutsideFunction;
            }
            _ => {
                return Err(Error::InvalidLayout(format!(
                    "Op{opcode:?} in a function body but outside any block"
                )));
            }
        }
        Ok(())
    }

    fn add_in_block(&mut self, opcode: Op, inst: Instruction) {
        if opcode == Op::Label {
            // The previous block never saw its terminator. Tolerated; the
            // validator will reject it if this module is meant to be real.
            tracing::warn!("block without terminator, sealing it anyway");
            self.seal_block();
            let label = self.module.alloc_inst(inst);
            self.current_block = Some(self.module.alloc_block(BasicBlock::new(label)));
            self.state = State::InsideBlock;
            return;
        }
        let block = self.current_block.expect("in block");
        let id = self.module.alloc_inst(inst);
        self.module.block_mut(block).push(id);
        if opcode.is_terminator() {
            self.seal_block();
        }
    }

    fn seal_block(&mut self) {
        let block = self.current_block.take().expect("in block");
        let function = self.current_function.expect("in function");
        self.module.function_mut(function).push_block(block);
        self.state = State::InsideFunctionOutsideBlock;
    }

    /// Finish loading. Open blocks/functions are registered as-is, and every
    /// block's parent-function back-reference is fixed up in one pass.
    #[must_use]
    pub fn end_module(mut self) -> Module {
        if self.current_block.is_some() {
            tracing::warn!("module ended inside a block, sealing it");
            self.seal_block();
        }
        if self.current_function.take().is_some() {
            tracing::warn!("module ended inside a function, registering it without OpFunctionEnd");
        }
        if !self.pending_lines.is_empty() {
            tracing::warn!("dropping trailing line-debug instructions with nothing to attach to");
        }

        let mut module = self.module;
        for func in module.func_ids().collect::<Vec<_>>() {
            for block in module.function(func).blocks().to_vec() {
                module.block_mut(block).set_function(func);
            }
        }
        module
    }
}

/// Decode a binary word stream and build the module tree from it.
///
/// Structural decode errors abort the load; no partial module is returned.
pub fn build_module(words: &[u32]) -> Result<Module> {
    let (header, instructions) = spv::decode_module(words)?;
    let mut loader = IrLoader::new();
    for raw in instructions {
        loader.add_instruction(raw)?;
    }
    let mut module = loader.end_module();
    module.set_header(header);
    Ok(module)
}

/// [`build_module`] over little-endian bytes.
pub fn build_module_from_bytes(bytes: &[u8]) -> Result<Module> {
    build_module(&spv::bytes_to_words(bytes)?)
}
