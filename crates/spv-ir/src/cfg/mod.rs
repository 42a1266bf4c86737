//! Per-function control-flow graph, dominance and structured-control-flow
//! validation.

mod construct;
mod dominators;
mod validate;

pub use construct::{Construct, ConstructKind};
pub use dominators::{DominatorTree, Graph, PSEUDO};
pub use validate::{validate_function, validate_module};

use std::collections::{HashMap, HashSet};

use crate::ir::{FuncId, Instruction, Module};
use crate::spv::Op;

/// The control-flow graph of one function.
///
/// Tracks defined blocks by id, successor/predecessor lists, block ids that
/// are referenced but never given a body, and the structured constructs
/// declared by merge instructions.
#[derive(Debug)]
pub struct Cfg {
    entry: Option<u32>,
    /// Block ids in textual (binary) order.
    order: Vec<u32>,
    blocks: HashMap<u32, crate::ir::BlockId>,
    succs: HashMap<u32, Vec<u32>>,
    preds: HashMap<u32, Vec<u32>>,
    undefined: Vec<u32>,
    constructs: Vec<Construct>,
    /// Construct indices keyed by their entry block.
    constructs_by_entry: HashMap<u32, Vec<usize>>,
    /// Blocks carrying an `OpLoopMerge`.
    loop_headers: HashSet<u32>,
}

impl Cfg {
    /// Build the CFG of `func` by registering its blocks in order.
    #[must_use]
    pub fn new(module: &Module, func: FuncId) -> Self {
        let mut cfg = Self {
            entry: None,
            order: Vec::new(),
            blocks: HashMap::new(),
            succs: HashMap::new(),
            preds: HashMap::new(),
            undefined: Vec::new(),
            constructs: Vec::new(),
            constructs_by_entry: HashMap::new(),
            loop_headers: HashSet::new(),
        };
        let mut referenced: Vec<u32> = Vec::new();

        for &block_id in module.function(func).blocks() {
            let block = module.block(block_id);
            let id = block.id(module);
            cfg.blocks.insert(id, block_id);
            cfg.order.push(id);
            if cfg.entry.is_none() {
                cfg.entry = Some(id);
            }

            let targets = block
                .terminator(module)
                .map(|t| branch_targets(module.inst(t)))
                .unwrap_or_default();
            for &target in &targets {
                cfg.preds.entry(target).or_default().push(id);
                referenced.push(target);
            }
            cfg.succs.insert(id, targets);

            cfg.register_constructs(module, block_id, id, &mut referenced);
        }

        let mut undefined: Vec<u32> = referenced
            .into_iter()
            .filter(|id| !cfg.blocks.contains_key(id))
            .collect();
        undefined.sort_unstable();
        undefined.dedup();
        cfg.undefined = undefined;
        cfg
    }

    fn register_constructs(
        &mut self,
        module: &Module,
        block: crate::ir::BlockId,
        id: u32,
        referenced: &mut Vec<u32>,
    ) {
        let block = module.block(block);
        let merge = block.merge_inst(module).map(|m| module.inst(m));
        match merge.map(Instruction::opcode) {
            Some(Op::LoopMerge) => {
                let merge = merge.expect("loop merge");
                let merge_block = merge.single_word_operand(0);
                let continue_target = merge.single_word_operand(1);
                referenced.push(merge_block);
                referenced.push(continue_target);
                self.loop_headers.insert(id);

                let loop_index = self.constructs.len();
                let continue_index = loop_index + 1;
                let mut lp = Construct::new(ConstructKind::Loop, id, Some(merge_block));
                lp.corresponding.push(continue_index);
                // The continue construct's exit is the back-edge block,
                // resolved during validation.
                let mut cont = Construct::new(ConstructKind::Continue, continue_target, None);
                cont.corresponding.push(loop_index);
                self.push_construct(lp);
                self.push_construct(cont);
            }
            Some(Op::SelectionMerge) => {
                let merge = merge.expect("selection merge");
                let merge_block = merge.single_word_operand(0);
                referenced.push(merge_block);
                self.push_construct(Construct::new(
                    ConstructKind::Selection,
                    id,
                    Some(merge_block),
                ));

                // A structured switch opens one Case construct per distinct
                // target; the sibling links tie them together.
                if let Some(term) = block.terminator(module)
                    && module.inst(term).opcode() == Op::Switch
                {
                    let first_case = self.constructs.len();
                    let mut seen = HashSet::new();
                    for target in branch_targets(module.inst(term)) {
                        if target == merge_block || !seen.insert(target) {
                            continue;
                        }
                        self.push_construct(Construct::new(
                            ConstructKind::Case,
                            target,
                            Some(merge_block),
                        ));
                    }
                    let last_case = self.constructs.len();
                    for index in first_case..last_case {
                        self.constructs[index].corresponding = (first_case..last_case)
                            .filter(|&sibling| sibling != index)
                            .collect();
                    }
                }
            }
            _ => {}
        }
    }

    fn push_construct(&mut self, construct: Construct) {
        self.constructs_by_entry
            .entry(construct.entry)
            .or_default()
            .push(self.constructs.len());
        self.constructs.push(construct);
    }

    #[must_use]
    pub fn entry(&self) -> Option<u32> {
        self.entry
    }

    #[must_use]
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    #[must_use]
    pub fn is_defined(&self, id: u32) -> bool {
        self.blocks.contains_key(&id)
    }

    /// Handle of the block with this id, if one was registered.
    #[must_use]
    pub fn block(&self, id: u32) -> Option<crate::ir::BlockId> {
        self.blocks.get(&id).copied()
    }

    #[must_use]
    pub fn successors(&self, id: u32) -> &[u32] {
        self.succs.get(&id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn predecessors(&self, id: u32) -> &[u32] {
        self.preds.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Block ids referenced by branches or merge declarations but never
    /// given a body. Illegal at function end.
    #[must_use]
    pub fn undefined(&self) -> &[u32] {
        &self.undefined
    }

    #[must_use]
    pub fn constructs(&self) -> &[Construct] {
        &self.constructs
    }

    /// Indices into [`Self::constructs`] of the constructs entered at
    /// block `id`.
    #[must_use]
    pub fn constructs_at(&self, id: u32) -> &[usize] {
        self.constructs_by_entry
            .get(&id)
            .map_or(&[], Vec::as_slice)
    }

    pub(crate) fn constructs_mut(&mut self) -> &mut [Construct] {
        &mut self.constructs
    }

    #[must_use]
    pub fn is_loop_header(&self, id: u32) -> bool {
        self.loop_headers.contains(&id)
    }

    /// The forward graph augmented with a pseudo-entry whose successors are
    /// the blocks with no real predecessor, plus one representative of each
    /// otherwise-unreachable cycle. Every block, dead code included, is
    /// reachable from [`PSEUDO`] in the result.
    #[must_use]
    pub fn forward_graph(&self) -> Graph {
        self.augmented(false)
    }

    /// The reversed graph augmented with a pseudo-exit. Traversal roots are
    /// the blocks with no successor; representatives of exit-free cycles
    /// are picked scanning blocks in reverse textual order.
    #[must_use]
    pub fn backward_graph(&self) -> Graph {
        self.augmented(true)
    }

    fn augmented(&self, reverse: bool) -> Graph {
        let mut graph = Graph {
            root: PSEUDO,
            ..Graph::default()
        };
        for &id in &self.order {
            let succs = if reverse {
                self.predecessors(id)
            } else {
                self.successors(id)
            };
            let succs: Vec<u32> = succs
                .iter()
                .copied()
                .filter(|t| self.blocks.contains_key(t))
                .collect();
            for &t in &succs {
                graph.preds.entry(t).or_default().push(id);
            }
            graph.succs.entry(id).or_default().extend(succs);
        }

        let scan: Vec<u32> = if reverse {
            self.order.iter().rev().copied().collect()
        } else {
            self.order.clone()
        };

        let mut roots: Vec<u32> = scan
            .iter()
            .copied()
            .filter(|&id| graph.preds.get(&id).is_none_or(Vec::is_empty))
            .collect();

        // Cycles with no way in are invisible to the natural roots; give
        // each one a representative so every block gets a dominator.
        let mut reached = reach(&graph, &roots);
        for &id in &scan {
            if !reached.contains(&id) {
                roots.push(id);
                reached = reach(&graph, &roots);
            }
        }

        for &root in &roots {
            graph.preds.entry(root).or_default().push(PSEUDO);
        }
        graph.succs.insert(PSEUDO, roots);
        graph
    }

    /// Back-edges found by a depth-first walk from the real entry block: an
    /// edge to a node still on the DFS stack, recorded as (source, target).
    #[must_use]
    pub fn back_edges(&self) -> Vec<(u32, u32)> {
        let Some(entry) = self.entry else {
            return Vec::new();
        };
        let mut edges = Vec::new();
        let mut on_stack = HashSet::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(entry, 0usize)];
        visited.insert(entry);
        on_stack.insert(entry);

        while let Some(&(node, child)) = stack.last() {
            let succs = self.successors(node);
            if child < succs.len() {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                let next = succs[child];
                if !self.blocks.contains_key(&next) {
                    continue;
                }
                if on_stack.contains(&next) {
                    edges.push((node, next));
                } else if visited.insert(next) {
                    on_stack.insert(next);
                    stack.push((next, 0));
                }
            } else {
                on_stack.remove(&node);
                stack.pop();
            }
        }
        edges
    }

    /// Blocks reachable from the real entry.
    #[must_use]
    pub fn reachable(&self) -> HashSet<u32> {
        let mut reached = HashSet::new();
        let Some(entry) = self.entry else {
            return reached;
        };
        let mut stack = vec![entry];
        reached.insert(entry);
        while let Some(node) = stack.pop() {
            for &next in self.successors(node) {
                if self.blocks.contains_key(&next) && reached.insert(next) {
                    stack.push(next);
                }
            }
        }
        reached
    }
}

fn reach(graph: &Graph, roots: &[u32]) -> HashSet<u32> {
    let mut reached: HashSet<u32> = roots.iter().copied().collect();
    let mut stack: Vec<u32> = roots.to_vec();
    while let Some(node) = stack.pop() {
        for &next in graph.succs.get(&node).map_or(&[][..], Vec::as_slice) {
            if reached.insert(next) {
                stack.push(next);
            }
        }
    }
    reached
}

/// Successor block ids named by a terminator.
fn branch_targets(inst: &Instruction) -> Vec<u32> {
    match inst.opcode() {
        Op::Branch => vec![inst.single_word_operand(0)],
        Op::BranchConditional => vec![
            inst.single_word_operand(1),
            inst.single_word_operand(2),
        ],
        Op::Switch => {
            // Selector, default target, then (literal, target) pairs.
            let mut targets = vec![inst.single_word_operand(1)];
            let mut index = 3;
            while index < inst.num_operands() {
                targets.push(inst.single_word_operand(index));
                index += 2;
            }
            targets
        }
        _ => Vec::new(),
    }
}
