use std::collections::HashMap;

use crate::analysis::{DefUseManager, TypeManager};
use crate::ir::Module;
use crate::{Error, Result};

/// Collapse structurally identical constants onto their first declaration.
///
/// Two constants unify when they have the same opcode, semantically equal
/// result types (per the type manager's canonical ids) and identical
/// operand words. Walking the types section in order and rewriting uses as
/// duplicates are found makes the comparison transitive: a composite whose
/// components were already unified sees the canonical component ids.
///
/// Decorated ids are exempt — a decoration makes an id semantically
/// distinct from an otherwise identical one.
///
/// Returns the number of constants eliminated.
pub fn unify_constants(module: &mut Module) -> Result<usize> {
    let types = TypeManager::new(module)?;
    let mut def_use = DefUseManager::new(module);

    let mut canonical: HashMap<Vec<u32>, u32> = HashMap::new();
    let mut unified = 0;

    for inst_id in module.types_values().to_vec() {
        let inst = module.inst(inst_id);
        if !inst.is_live() || !inst.opcode().is_constant() {
            continue;
        }
        let result_id = inst.result_id();
        if !def_use.annotations(module, result_id).is_empty() {
            continue;
        }
        let Some(type_key) = types.canonical_id(inst.type_id()) else {
            return Err(Error::InvalidId {
                id: inst.type_id(),
                reason: "constant has an undeclared result type".into(),
            });
        };

        let mut key = vec![type_key, u32::from(inst.opcode().as_u16())];
        for operand in inst.operands() {
            key.extend_from_slice(operand.words());
        }

        match canonical.get(&key) {
            None => {
                canonical.insert(key, result_id);
            }
            Some(&keep) => {
                def_use.replace_all_uses(module, result_id, keep);
                def_use.kill_def(module, result_id);
                unified += 1;
            }
        }
    }

    if unified > 0 {
        tracing::debug!("unified {unified} duplicate constants");
    }
    Ok(unified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Instruction, Operand};
    use crate::spv::{Op, Section};

    fn add(module: &mut Module, inst: Instruction) -> crate::ir::InstId {
        let id = module.alloc_inst(inst);
        module.add_to_section(Section::TypesAndValues, id);
        id
    }

    fn int_type(module: &mut Module, id: u32) {
        add(
            module,
            Instruction::new(Op::TypeInt, 0, id, vec![
                Operand::literal(32),
                Operand::literal(1),
            ]),
        );
    }

    #[test]
    fn test_duplicate_constants_unify() {
        let mut module = Module::new();
        int_type(&mut module, 1);
        add(
            &mut module,
            Instruction::new(Op::Constant, 1, 2, vec![Operand::literal(42)]),
        );
        let dup = add(
            &mut module,
            Instruction::new(Op::Constant, 1, 3, vec![Operand::literal(42)]),
        );
        let user = add(&mut module, Instruction::new(Op::SpecConstantOp, 1, 4, vec![
            Operand::literal(126),
            Operand::id(3),
        ]));

        assert_eq!(unify_constants(&mut module).expect("pass"), 1);
        assert!(module.inst(dup).is_tombstoned());
        assert_eq!(module.inst(user).single_word_operand(1), 2);
    }

    #[test]
    fn test_constants_with_equal_types_unify_across_type_ids() {
        // %1 and %2 declare the same int type; constants typed by either
        // still unify.
        let mut module = Module::new();
        int_type(&mut module, 1);
        int_type(&mut module, 2);
        add(
            &mut module,
            Instruction::new(Op::Constant, 1, 3, vec![Operand::literal(7)]),
        );
        let dup = add(
            &mut module,
            Instruction::new(Op::Constant, 2, 4, vec![Operand::literal(7)]),
        );

        assert_eq!(unify_constants(&mut module).expect("pass"), 1);
        assert!(module.inst(dup).is_tombstoned());
    }

    #[test]
    fn test_composites_unify_transitively() {
        let mut module = Module::new();
        int_type(&mut module, 1);
        add(
            &mut module,
            Instruction::new(Op::TypeVector, 0, 2, vec![
                Operand::id(1),
                Operand::literal(2),
            ]),
        );
        add(
            &mut module,
            Instruction::new(Op::Constant, 1, 3, vec![Operand::literal(1)]),
        );
        add(
            &mut module,
            Instruction::new(Op::Constant, 1, 4, vec![Operand::literal(1)]),
        );
        add(
            &mut module,
            Instruction::new(Op::ConstantComposite, 2, 5, vec![
                Operand::id(3),
                Operand::id(3),
            ]),
        );
        let dup = add(
            &mut module,
            Instruction::new(Op::ConstantComposite, 2, 6, vec![
                Operand::id(4),
                Operand::id(4),
            ]),
        );

        // %4 unifies into %3 first, which rewrites %6's operands, so %6
        // then unifies into %5.
        assert_eq!(unify_constants(&mut module).expect("pass"), 2);
        assert!(module.inst(dup).is_tombstoned());
    }

    #[test]
    fn test_decorated_constant_is_exempt() {
        let mut module = Module::new();
        let decorate = module.alloc_inst(Instruction::new(
            Op::Decorate,
            0,
            0,
            vec![Operand::id(3), Operand::literal(1)],
        ));
        module.add_to_section(Section::Annotations, decorate);
        int_type(&mut module, 1);
        add(
            &mut module,
            Instruction::new(Op::Constant, 1, 2, vec![Operand::literal(42)]),
        );
        let decorated = add(
            &mut module,
            Instruction::new(Op::Constant, 1, 3, vec![Operand::literal(42)]),
        );

        assert_eq!(unify_constants(&mut module).expect("pass"), 0);
        assert!(module.inst(decorated).is_live());
    }
}
