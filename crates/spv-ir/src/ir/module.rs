use crate::spv::{self, Header, Op, Section};

use super::{BasicBlock, BlockId, FuncId, Function, InstId, Instruction};

/// A SPIR-V module.
///
/// Owns dense arenas of instructions, blocks and functions; everything else
/// refers to them through `InstId`/`BlockId`/`FuncId` handles, so parent
/// links are plain indices instead of pointers. Section lists hold the
/// module-scope instructions in the mandated logical order.
#[derive(Debug, Clone)]
pub struct Module {
    version: u32,
    generator: u32,
    schema: u32,
    bound: u32,

    insts: Vec<Instruction>,
    blocks: Vec<BasicBlock>,
    functions: Vec<Function>,

    capabilities: Vec<InstId>,
    extensions: Vec<InstId>,
    ext_inst_imports: Vec<InstId>,
    memory_model: Option<InstId>,
    entry_points: Vec<InstId>,
    execution_modes: Vec<InstId>,
    debug_sources: Vec<InstId>,
    debug_names: Vec<InstId>,
    annotations: Vec<InstId>,
    types_values: Vec<InstId>,
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl Module {
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: spv::VERSION,
            generator: spv::GENERATOR,
            schema: 0,
            bound: 0,
            insts: Vec::new(),
            blocks: Vec::new(),
            functions: Vec::new(),
            capabilities: Vec::new(),
            extensions: Vec::new(),
            ext_inst_imports: Vec::new(),
            memory_model: None,
            entry_points: Vec::new(),
            execution_modes: Vec::new(),
            debug_sources: Vec::new(),
            debug_names: Vec::new(),
            annotations: Vec::new(),
            types_values: Vec::new(),
        }
    }

    pub fn set_header(&mut self, header: Header) {
        self.version = header.version;
        self.generator = header.generator;
        self.bound = header.bound;
        self.schema = header.schema;
    }

    #[must_use]
    pub fn bound(&self) -> u32 {
        self.bound
    }

    pub fn set_bound(&mut self, bound: u32) {
        self.bound = bound;
    }

    // --- Arenas ---

    pub fn alloc_inst(&mut self, inst: Instruction) -> InstId {
        let id = InstId(u32::try_from(self.insts.len()).expect("instruction arena overflow"));
        self.insts.push(inst);
        id
    }

    pub fn alloc_block(&mut self, block: BasicBlock) -> BlockId {
        let id = BlockId(u32::try_from(self.blocks.len()).expect("block arena overflow"));
        self.blocks.push(block);
        id
    }

    pub fn alloc_function(&mut self, function: Function) -> FuncId {
        let id = FuncId(u32::try_from(self.functions.len()).expect("function arena overflow"));
        self.functions.push(function);
        id
    }

    #[must_use]
    pub fn inst(&self, id: InstId) -> &Instruction {
        &self.insts[id.0 as usize]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut Instruction {
        &mut self.insts[id.0 as usize]
    }

    #[must_use]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.0 as usize]
    }

    #[must_use]
    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.0 as usize]
    }

    /// Handles of all functions, in module order.
    pub fn func_ids(&self) -> impl Iterator<Item = FuncId> {
        let len = u32::try_from(self.functions.len()).expect("function arena overflow");
        (0..len).map(FuncId)
    }

    #[must_use]
    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }

    // --- Sections ---

    /// Route a module-scope instruction into its section.
    pub fn add_to_section(&mut self, section: Section, inst: InstId) {
        match section {
            Section::Capabilities => self.capabilities.push(inst),
            Section::Extensions => self.extensions.push(inst),
            Section::ExtInstImports => self.ext_inst_imports.push(inst),
            Section::MemoryModel => self.memory_model = Some(inst),
            Section::EntryPoints => self.entry_points.push(inst),
            Section::ExecutionModes => self.execution_modes.push(inst),
            Section::DebugSources => self.debug_sources.push(inst),
            Section::DebugNames => self.debug_names.push(inst),
            Section::Annotations => self.annotations.push(inst),
            Section::TypesAndValues => self.types_values.push(inst),
        }
    }

    #[must_use]
    pub fn annotations(&self) -> &[InstId] {
        &self.annotations
    }

    #[must_use]
    pub fn types_values(&self) -> &[InstId] {
        &self.types_values
    }

    #[must_use]
    pub fn entry_points(&self) -> &[InstId] {
        &self.entry_points
    }

    #[must_use]
    pub fn debug_names(&self) -> &[InstId] {
        &self.debug_names
    }

    /// Module-scope instructions in the mandated section order.
    pub fn global_insts(&self) -> impl Iterator<Item = InstId> + '_ {
        self.capabilities
            .iter()
            .chain(&self.extensions)
            .chain(&self.ext_inst_imports)
            .chain(self.memory_model.as_ref())
            .chain(&self.entry_points)
            .chain(&self.execution_modes)
            .chain(&self.debug_sources)
            .chain(&self.debug_names)
            .chain(&self.annotations)
            .chain(&self.types_values)
            .copied()
    }

    /// Every instruction in serialization order: the global sections, then
    /// each function's definition, parameters, blocks and end.
    pub fn all_insts(&self) -> impl Iterator<Item = InstId> + '_ {
        self.global_insts().chain(
            self.functions
                .iter()
                .flat_map(move |f| self.function_insts(f)),
        )
    }

    fn function_insts<'a>(&'a self, f: &'a Function) -> impl Iterator<Item = InstId> + 'a {
        std::iter::once(f.def())
            .chain(f.params().iter().copied())
            .chain(f.blocks().iter().flat_map(move |&b| {
                let block = self.block(b);
                std::iter::once(block.label()).chain(block.body().iter().copied())
            }))
            .chain(f.end())
    }

    /// The debug name attached to `id` via `OpName`, if any.
    #[must_use]
    pub fn name_of(&self, id: u32) -> Option<String> {
        self.debug_names.iter().find_map(|&n| {
            let inst = self.inst(n);
            (inst.opcode() == Op::Name
                && inst.num_operands() == 2
                && inst.single_word_operand(0) == id)
                .then(|| inst.operand(1).as_string())?
        })
    }

    // --- Serialization ---

    /// Serialize to the binary word stream: 5-word header, then every
    /// instruction in section order. Tombstoned slots are emitted as
    /// `OpNop` unless `skip_tombstones` is set.
    #[must_use]
    pub fn to_words(&self, skip_tombstones: bool) -> Vec<u32> {
        let header = Header {
            version: self.version,
            generator: self.generator,
            bound: self.bound,
            schema: self.schema,
        };
        let mut words = header.to_words().to_vec();
        for id in self.all_insts() {
            self.inst(id).encode_into(&mut words, skip_tombstones);
        }
        words
    }

    /// One more than the largest id mentioned anywhere in the module.
    #[must_use]
    pub fn compute_bound(&self) -> u32 {
        let mut max = 0;
        for id in self.all_insts() {
            let inst = self.inst(id);
            max = max.max(inst.result_id());
            for r in inst.referenced_ids() {
                max = max.max(r);
            }
            for line in inst.lines() {
                for r in line.referenced_ids() {
                    max = max.max(r);
                }
            }
        }
        max + 1
    }
}
