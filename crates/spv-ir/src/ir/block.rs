use crate::spv::Op;

use super::{FuncId, InstId, Module};

/// A basic block: an `OpLabel` plus the ordered body instructions.
///
/// When the block is well-formed the final body instruction is a
/// terminator; the loader also accepts unterminated blocks so unit tests
/// can build partial IR.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    label: InstId,
    body: Vec<InstId>,
    /// Owning function, fixed up when the module is finalized.
    function: Option<FuncId>,
}

impl BasicBlock {
    #[must_use]
    pub fn new(label: InstId) -> Self {
        Self {
            label,
            body: Vec::new(),
            function: None,
        }
    }

    #[must_use]
    pub fn label(&self) -> InstId {
        self.label
    }

    #[must_use]
    pub fn body(&self) -> &[InstId] {
        &self.body
    }

    pub fn push(&mut self, inst: InstId) {
        self.body.push(inst);
    }

    #[must_use]
    pub fn function(&self) -> Option<FuncId> {
        self.function
    }

    pub(crate) fn set_function(&mut self, function: FuncId) {
        self.function = Some(function);
    }

    /// The block's id, i.e. the result id of its label instruction.
    #[must_use]
    pub fn id(&self, module: &Module) -> u32 {
        module.inst(self.label).result_id()
    }

    /// The live terminator, if the block ends in one.
    #[must_use]
    pub fn terminator(&self, module: &Module) -> Option<InstId> {
        let last = self
            .body
            .iter()
            .rev()
            .copied()
            .find(|&id| module.inst(id).is_live())?;
        module.inst(last).opcode().is_terminator().then_some(last)
    }

    /// Live body instructions in order.
    pub fn live_body<'a>(&'a self, module: &'a Module) -> impl Iterator<Item = InstId> + 'a {
        self.body
            .iter()
            .copied()
            .filter(move |&id| module.inst(id).is_live())
    }

    /// Merge declaration (`OpLoopMerge`/`OpSelectionMerge`) of this block,
    /// if it has one. It sits right before the terminator.
    #[must_use]
    pub fn merge_inst(&self, module: &Module) -> Option<InstId> {
        self.live_body(module).find(|&id| {
            matches!(
                module.inst(id).opcode(),
                Op::LoopMerge | Op::SelectionMerge
            )
        })
    }
}
