use super::{BlockId, InstId, Module};

/// A function: its `OpFunction`, parameters, blocks and `OpFunctionEnd`.
#[derive(Debug, Clone)]
pub struct Function {
    def: InstId,
    params: Vec<InstId>,
    blocks: Vec<BlockId>,
    /// `None` when the loader had to auto-close the function.
    end: Option<InstId>,
}

impl Function {
    #[must_use]
    pub fn new(def: InstId) -> Self {
        Self {
            def,
            params: Vec::new(),
            blocks: Vec::new(),
            end: None,
        }
    }

    #[must_use]
    pub fn def(&self) -> InstId {
        self.def
    }

    #[must_use]
    pub fn params(&self) -> &[InstId] {
        &self.params
    }

    #[must_use]
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    #[must_use]
    pub fn end(&self) -> Option<InstId> {
        self.end
    }

    pub fn push_param(&mut self, param: InstId) {
        self.params.push(param);
    }

    pub fn push_block(&mut self, block: BlockId) {
        self.blocks.push(block);
    }

    pub fn set_end(&mut self, end: InstId) {
        self.end = Some(end);
    }

    /// Result id of the `OpFunction` instruction.
    #[must_use]
    pub fn id(&self, module: &Module) -> u32 {
        module.inst(self.def).result_id()
    }

    /// The entry block is the first one.
    #[must_use]
    pub fn entry_block(&self) -> Option<BlockId> {
        self.blocks.first().copied()
    }
}
