use std::collections::HashSet;

use crate::analysis::DefUseManager;
use crate::ir::{Module, OperandKind};
use crate::spv::Op;

/// Remove constants that nothing real uses.
///
/// A use is "real" unless it comes from an annotation or a debug name;
/// however a *decorated* constant is exempt from elimination entirely —
/// the decoration gives the id meaning on its own. Killing a composite
/// constant releases its components, so the worklist drains transitively.
///
/// Returns the number of constants eliminated.
pub fn eliminate_dead_constants(module: &mut Module) -> usize {
    let mut def_use = DefUseManager::new(module);

    let mut worklist: Vec<u32> = module
        .types_values()
        .iter()
        .map(|&i| module.inst(i))
        .filter(|inst| inst.is_live() && inst.opcode().is_constant())
        .map(|inst| inst.result_id())
        .filter(|&id| is_dead(module, &def_use, id))
        .collect();
    let mut queued: HashSet<u32> = worklist.iter().copied().collect();

    let mut eliminated = 0;
    while let Some(id) = worklist.pop() {
        let Some(inst_id) = def_use.def(id) else {
            continue;
        };
        let components: Vec<u32> = module
            .inst(inst_id)
            .operands()
            .iter()
            .filter(|op| op.kind() == OperandKind::IdRef)
            .map(|op| op.single_word())
            .collect();

        def_use.kill_inst(module, inst_id);
        eliminated += 1;

        for component in components {
            let defines_constant = def_use
                .def(component)
                .is_some_and(|d| module.inst(d).opcode().is_constant());
            if defines_constant
                && is_dead(module, &def_use, component)
                && queued.insert(component)
            {
                worklist.push(component);
            }
        }
    }

    if eliminated > 0 {
        tracing::debug!("eliminated {eliminated} dead constants");
    }
    eliminated
}

fn is_dead(module: &Module, def_use: &DefUseManager, id: u32) -> bool {
    if !def_use.annotations(module, id).is_empty() {
        return false;
    }
    !def_use.uses(id).iter().any(|record| {
        let opcode = module.inst(record.inst).opcode();
        !opcode.is_annotation() && !matches!(opcode, Op::Name | Op::MemberName)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Instruction, Operand};
    use crate::spv::Section;

    fn add(module: &mut Module, section: Section, inst: Instruction) -> crate::ir::InstId {
        let id = module.alloc_inst(inst);
        module.add_to_section(section, id);
        id
    }

    fn int_module() -> Module {
        let mut module = Module::new();
        add(
            &mut module,
            Section::TypesAndValues,
            Instruction::new(Op::TypeInt, 0, 1, vec![
                Operand::literal(32),
                Operand::literal(1),
            ]),
        );
        module
    }

    #[test]
    fn test_unused_constant_is_eliminated() {
        let mut module = int_module();
        let dead = add(
            &mut module,
            Section::TypesAndValues,
            Instruction::new(Op::Constant, 1, 2, vec![Operand::literal(5)]),
        );

        assert_eq!(eliminate_dead_constants(&mut module), 1);
        assert!(module.inst(dead).is_tombstoned());
    }

    #[test]
    fn test_decorated_constant_survives_undecorated_twin_dies() {
        let mut module = int_module();
        add(
            &mut module,
            Section::Annotations,
            Instruction::new(Op::Decorate, 0, 0, vec![
                Operand::id(2),
                Operand::literal(1),
            ]),
        );
        let decorated = add(
            &mut module,
            Section::TypesAndValues,
            Instruction::new(Op::Constant, 1, 2, vec![Operand::literal(5)]),
        );
        let undecorated = add(
            &mut module,
            Section::TypesAndValues,
            Instruction::new(Op::Constant, 1, 3, vec![Operand::literal(5)]),
        );

        assert_eq!(eliminate_dead_constants(&mut module), 1);
        assert!(module.inst(decorated).is_live());
        assert!(module.inst(undecorated).is_tombstoned());
    }

    #[test]
    fn test_composite_releases_components() {
        let mut module = int_module();
        add(
            &mut module,
            Section::TypesAndValues,
            Instruction::new(Op::TypeVector, 0, 2, vec![
                Operand::id(1),
                Operand::literal(2),
            ]),
        );
        let scalar = add(
            &mut module,
            Section::TypesAndValues,
            Instruction::new(Op::Constant, 1, 3, vec![Operand::literal(1)]),
        );
        let composite = add(
            &mut module,
            Section::TypesAndValues,
            Instruction::new(Op::ConstantComposite, 2, 4, vec![
                Operand::id(3),
                Operand::id(3),
            ]),
        );

        // %3 is only alive through %4; killing %4 frees %3 too.
        assert_eq!(eliminate_dead_constants(&mut module), 2);
        assert!(module.inst(composite).is_tombstoned());
        assert!(module.inst(scalar).is_tombstoned());
    }

    #[test]
    fn test_used_constant_survives() {
        let mut module = int_module();
        let used = add(
            &mut module,
            Section::TypesAndValues,
            Instruction::new(Op::Constant, 1, 2, vec![Operand::literal(5)]),
        );
        // A global variable initialized with %2 is a real use.
        add(
            &mut module,
            Section::TypesAndValues,
            Instruction::new(Op::Variable, 1, 3, vec![
                Operand::literal(5),
                Operand::id(2),
            ]),
        );

        assert_eq!(eliminate_dead_constants(&mut module), 0);
        assert!(module.inst(used).is_live());
    }

    #[test]
    fn test_dead_spec_op_releases_its_operand() {
        let mut module = int_module();
        let operand = add(
            &mut module,
            Section::TypesAndValues,
            Instruction::new(Op::Constant, 1, 2, vec![Operand::literal(5)]),
        );
        let spec_op = add(
            &mut module,
            Section::TypesAndValues,
            Instruction::new(Op::SpecConstantOp, 1, 3, vec![
                Operand::literal(126),
                Operand::id(2),
            ]),
        );

        assert_eq!(eliminate_dead_constants(&mut module), 2);
        assert!(module.inst(spec_op).is_tombstoned());
        assert!(module.inst(operand).is_tombstoned());
    }

    #[test]
    fn test_name_only_use_does_not_keep_alive() {
        let mut module = int_module();
        add(
            &mut module,
            Section::DebugNames,
            Instruction::new(Op::Name, 0, 0, vec![
                Operand::id(2),
                Operand::string("answer"),
            ]),
        );
        let named = add(
            &mut module,
            Section::TypesAndValues,
            Instruction::new(Op::Constant, 1, 2, vec![Operand::literal(42)]),
        );

        assert_eq!(eliminate_dead_constants(&mut module), 1);
        assert!(module.inst(named).is_tombstoned());
    }
}
