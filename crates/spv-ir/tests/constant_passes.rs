//! The constant passes through the public API, including the
//! decorated-constant exemption.

use spv_ir::opt::{eliminate_dead_constants, unify_constants};
use spv_ir::spv::{Op, RawInstruction};
use spv_ir::test_harness::*;
use spv_ir::{Module, ModuleBuilder, build_module};

fn prelude() -> Vec<RawInstruction> {
    vec![
        inst(Op::Capability, 0, 0, vec![lit(1)]),
        inst(Op::TypeInt, 0, 1, vec![lit(32), lit(1)]),
    ]
}

fn load(records: Vec<RawInstruction>) -> Module {
    build_module(&assemble_words(&records)).expect("load")
}

#[test]
fn test_decorated_dead_constant_survives() {
    let mut records = prelude();
    records.insert(
        1,
        inst(Op::Decorate, 0, 0, vec![id(2), lit(1)]),
    );
    records.push(inst(Op::Constant, 1, 2, vec![lit(5)]));
    records.push(inst(Op::Constant, 1, 3, vec![lit(5)]));
    let mut module = load(records);

    assert_eq!(eliminate_dead_constants(&mut module), 1);
    assert_eq!(count_opcode(&module, Op::Constant), 1);

    // The survivor is the decorated one.
    let reloaded = load_back(&module);
    assert_eq!(count_opcode(&reloaded, Op::Constant), 1);
    assert_eq!(count_opcode(&reloaded, Op::Decorate), 1);
}

#[test]
fn test_unify_then_eliminate_pipeline() {
    let mut records = prelude();
    records.push(inst(Op::Constant, 1, 2, vec![lit(7)]));
    records.push(inst(Op::Constant, 1, 3, vec![lit(7)]));
    records.push(inst(Op::TypeVector, 0, 4, vec![id(1), lit(2)]));
    records.push(inst(
        Op::ConstantComposite,
        4,
        5,
        vec![id(2), id(3)],
    ));
    let mut module = load(records);

    // Unify folds %3 into %2; the composite now reads %2 twice.
    assert_eq!(unify_constants(&mut module).expect("unify"), 1);
    // Nothing uses the composite, so elimination takes it and then frees
    // %2 as well.
    assert_eq!(eliminate_dead_constants(&mut module), 2);

    let builder = ModuleBuilder::new(&module);
    builder.finalize(&mut module);

    let reloaded = load_back(&module);
    assert_eq!(count_opcode(&reloaded, Op::Constant), 0);
    assert_eq!(count_opcode(&reloaded, Op::ConstantComposite), 0);
    assert!(has_opcode(&reloaded, Op::TypeInt));
}

#[test]
fn test_passes_are_idempotent() {
    let mut records = prelude();
    records.push(inst(Op::Constant, 1, 2, vec![lit(7)]));
    records.push(inst(Op::Constant, 1, 3, vec![lit(7)]));
    let mut module = load(records);

    assert_eq!(unify_constants(&mut module).expect("unify"), 1);
    assert_eq!(unify_constants(&mut module).expect("unify again"), 0);
    assert!(eliminate_dead_constants(&mut module) > 0);
    assert_eq!(eliminate_dead_constants(&mut module), 0);
}

fn load_back(module: &Module) -> Module {
    build_module(&module.to_words(true)).expect("reload")
}
