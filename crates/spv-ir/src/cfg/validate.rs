//! Structured-control-flow validation.
//!
//! Each check returns on the first violation with enough context (block
//! ids, attached debug names) to localize the fault. Structured checks
//! (back-edge and construct rules) only apply to modules declaring the
//! Shader capability; ordinary irreducible cycles are legal without it.

use std::collections::HashMap;

use crate::ir::{FuncId, Module};
use crate::spv::Op;
use crate::{Error, Result};

use super::{Cfg, ConstructKind, DominatorTree};

// SPIR-V capability value for Shader.
const CAPABILITY_SHADER: u32 = 1;

/// Validate the control flow of every function in the module.
pub fn validate_module(module: &Module) -> Result<()> {
    for func in module.func_ids() {
        validate_function(module, func)?;
    }
    Ok(())
}

/// Validate one function: undefined blocks, back-edge rules, construct
/// nesting and textual order vs. dominance.
pub fn validate_function(module: &Module, func: FuncId) -> Result<()> {
    let mut cfg = Cfg::new(module, func);
    if cfg.order().is_empty() {
        // Function declaration without a body.
        return Ok(());
    }
    let fail = |reason: String| -> Error {
        Error::InvalidCfg {
            context: describe(module, module.function(func).id(module)),
            reason,
        }
    };

    if let Some(&id) = cfg.undefined().first() {
        return Err(fail(format!(
            "block {} is referenced but never defined",
            describe(module, id)
        )));
    }

    let dom = DominatorTree::compute(&cfg.forward_graph());
    let postdom = DominatorTree::compute(&cfg.backward_graph());
    let back_edges = cfg.back_edges();
    let reachable = cfg.reachable();

    if is_structured(module) {
        check_back_edges(module, &cfg, &back_edges, &fail)?;
        resolve_continue_exits(&mut cfg, &back_edges);
        check_constructs(module, &cfg, &dom, &postdom, &reachable, &fail)?;
    }

    check_block_order(module, &cfg, &dom, &reachable, &fail)
}

fn is_structured(module: &Module) -> bool {
    module.global_insts().any(|i| {
        let inst = module.inst(i);
        inst.opcode() == Op::Capability && inst.single_word_operand(0) == CAPABILITY_SHADER
    })
}

fn check_back_edges(
    module: &Module,
    cfg: &Cfg,
    back_edges: &[(u32, u32)],
    fail: &impl Fn(String) -> Error,
) -> Result<()> {
    let mut per_target: HashMap<u32, usize> = HashMap::new();
    for &(source, target) in back_edges {
        if !cfg.is_loop_header(target) {
            return Err(fail(format!(
                "back-edge from {} targets {}, which is not a loop header",
                describe(module, source),
                describe(module, target)
            )));
        }
        *per_target.entry(target).or_default() += 1;
    }
    for &header in cfg.order() {
        if !cfg.is_loop_header(header) {
            continue;
        }
        let count = per_target.get(&header).copied().unwrap_or(0);
        if count != 1 {
            return Err(fail(format!(
                "loop header {} has {count} back-edges, expected exactly 1",
                describe(module, header)
            )));
        }
    }
    Ok(())
}

// The exit of a Continue construct is the loop's back-edge block, known
// only now.
fn resolve_continue_exits(cfg: &mut Cfg, back_edges: &[(u32, u32)]) {
    let loops: Vec<(usize, u32)> = cfg
        .constructs()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind == ConstructKind::Loop)
        .map(|(index, c)| (index, c.entry))
        .collect();
    for (loop_index, header) in loops {
        let Some(&(source, _)) = back_edges.iter().find(|&&(_, t)| t == header) else {
            continue;
        };
        let corresponding = cfg.constructs()[loop_index].corresponding.clone();
        for index in corresponding {
            let construct = &mut cfg.constructs_mut()[index];
            if construct.kind == ConstructKind::Continue {
                construct.exit = Some(source);
            }
        }
    }
}

fn check_constructs(
    module: &Module,
    cfg: &Cfg,
    dom: &DominatorTree,
    postdom: &DominatorTree,
    reachable: &std::collections::HashSet<u32>,
    fail: &impl Fn(String) -> Error,
) -> Result<()> {
    for construct in cfg.constructs() {
        if !reachable.contains(&construct.entry) {
            continue;
        }
        let Some(exit) = construct.exit else {
            // Back-edge checks passed, so every continue construct should
            // have been resolved. Reaching this is a validator bug, not an
            // input error.
            return Err(Error::Internal(format!(
                "{:?} construct with reachable header {} has no exit block",
                construct.kind,
                describe(module, construct.entry)
            )));
        };
        if !reachable.contains(&exit) {
            continue;
        }
        match construct.kind {
            ConstructKind::Continue => {
                // The continue target must funnel every path back to the
                // loop through the back-edge block, hence post-dominance.
                if !postdom.dominates(exit, construct.entry) {
                    return Err(fail(format!(
                        "continue target {} is not post-dominated by back-edge block {}",
                        describe(module, construct.entry),
                        describe(module, exit)
                    )));
                }
            }
            // A case target shares the switch's merge with its siblings and
            // does not dominate it; only exit resolution applies.
            ConstructKind::Case => {}
            ConstructKind::Selection | ConstructKind::Loop => {
                if !dom.dominates(construct.entry, exit) {
                    return Err(fail(format!(
                        "{:?} header {} does not dominate its merge block {}",
                        construct.kind,
                        describe(module, construct.entry),
                        describe(module, exit)
                    )));
                }
            }
        }
    }
    Ok(())
}

// Textual order must respect dominance: a linear scan over immediate
// dominators, not a second dominance computation.
fn check_block_order(
    module: &Module,
    cfg: &Cfg,
    dom: &DominatorTree,
    reachable: &std::collections::HashSet<u32>,
    fail: &impl Fn(String) -> Error,
) -> Result<()> {
    let position: HashMap<u32, usize> = cfg
        .order()
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();
    for &id in cfg.order() {
        if !reachable.contains(&id) {
            continue;
        }
        let Some(idom) = dom.idom(id) else {
            continue;
        };
        if idom == id || idom == super::PSEUDO {
            continue;
        }
        if position.get(&idom) > position.get(&id) {
            return Err(fail(format!(
                "block {} appears before its dominator {}",
                describe(module, id),
                describe(module, idom)
            )));
        }
    }
    Ok(())
}

fn describe(module: &Module, id: u32) -> String {
    match module.name_of(id) {
        Some(name) => format!("%{id} (\"{name}\")"),
        None => format!("%{id}"),
    }
}
