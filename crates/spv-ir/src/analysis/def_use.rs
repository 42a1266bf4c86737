//! Bidirectional def-use index over a module.
//!
//! Maps every id to its defining instruction and to every place that
//! references it. The index is built against one module snapshot; callers
//! must route id-affecting mutation through [`DefUseManager::replace_all_uses`]
//! and [`DefUseManager::kill_inst`]/[`DefUseManager::kill_def`], or rebuild
//! the manager after mutating the module directly.

use std::collections::HashMap;

use crate::ir::{InstId, Module, OperandKind};

/// Where inside an instruction an id is referenced.
///
/// The result id is never a use site; type references are distinguished
/// from in-operands so replacement rewrites the right slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseSite {
    Type,
    Operand(usize),
}

/// One recorded use: which instruction, and where in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Use {
    pub inst: InstId,
    pub site: UseSite,
}

#[derive(Debug, Default)]
pub struct DefUseManager {
    defs: HashMap<u32, InstId>,
    uses: HashMap<u32, Vec<Use>>,
    /// Ids referenced by each analyzed instruction. Present (possibly
    /// empty) for every instruction the manager has seen.
    used_ids: HashMap<InstId, Vec<u32>>,
}

impl DefUseManager {
    /// Build the index for every live instruction, in module order.
    #[must_use]
    pub fn new(module: &Module) -> Self {
        let mut manager = Self::default();
        for inst in module.all_insts() {
            manager.analyze_inst(module, inst);
        }
        manager
    }

    /// (Re-)analyze one instruction.
    ///
    /// If another instruction previously claimed this instruction's result
    /// id, the old definition's use records are cleared first — last writer
    /// wins, which tolerates the illegal-but-observed duplicate-result-id
    /// case.
    pub fn analyze_inst(&mut self, module: &Module, inst_id: InstId) {
        self.clear_inst(inst_id);

        let inst = module.inst(inst_id);
        if !inst.is_live() {
            return;
        }

        let result_id = inst.result_id();
        if result_id != 0 {
            if let Some(&old) = self.defs.get(&result_id)
                && old != inst_id
            {
                self.clear_inst(old);
            }
            self.defs.insert(result_id, inst_id);
        }

        let mut used = Vec::new();
        if inst.type_id() != 0 {
            self.record_use(inst.type_id(), Use {
                inst: inst_id,
                site: UseSite::Type,
            });
            used.push(inst.type_id());
        }
        for (index, operand) in inst.operands().iter().enumerate() {
            if operand.kind() == OperandKind::IdRef {
                let id = operand.single_word();
                self.record_use(id, Use {
                    inst: inst_id,
                    site: UseSite::Operand(index),
                });
                used.push(id);
            }
        }
        self.used_ids.insert(inst_id, used);
    }

    fn record_use(&mut self, id: u32, record: Use) {
        self.uses.entry(id).or_default().push(record);
    }

    // Remove every use record this instruction contributed.
    fn clear_inst(&mut self, inst_id: InstId) {
        let Some(used) = self.used_ids.remove(&inst_id) else {
            return;
        };
        for id in used {
            if let Some(records) = self.uses.get_mut(&id) {
                records.retain(|r| r.inst != inst_id);
            }
        }
    }

    /// Has this instruction been analyzed?
    #[must_use]
    pub fn is_analyzed(&self, inst: InstId) -> bool {
        self.used_ids.contains_key(&inst)
    }

    /// The current defining instruction of `id`, if any.
    #[must_use]
    pub fn def(&self, id: u32) -> Option<InstId> {
        self.defs.get(&id).copied()
    }

    /// All recorded uses of `id`, in insertion order.
    #[must_use]
    pub fn uses(&self, id: u32) -> &[Use] {
        self.uses.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Rewrite every recorded use of `before` to reference `after` and
    /// migrate the use records. Result ids are never rewritten.
    ///
    /// Returns `false` without touching anything when `before` has no
    /// recorded uses. `before == after` is a no-op.
    pub fn replace_all_uses(&mut self, module: &mut Module, before: u32, after: u32) -> bool {
        if before == after {
            return true;
        }
        let Some(records) = self.uses.remove(&before) else {
            return false;
        };
        if records.is_empty() {
            return false;
        }

        for record in &records {
            let inst = module.inst_mut(record.inst);
            match record.site {
                UseSite::Type => inst.set_type_id(after),
                UseSite::Operand(index) => inst.set_operand_word(index, after),
            }
            if let Some(used) = self.used_ids.get_mut(&record.inst) {
                for id in used.iter_mut().filter(|id| **id == before) {
                    *id = after;
                }
            }
        }
        self.uses.entry(after).or_default().extend(records);
        true
    }

    /// Tombstone an instruction and drop it from the index: its use records
    /// disappear and it stops defining its result id. Killing an already
    /// tombstoned instruction is a no-op.
    pub fn kill_inst(&mut self, module: &mut Module, inst_id: InstId) {
        if module.inst(inst_id).is_tombstoned() {
            return;
        }
        self.clear_inst(inst_id);
        let result_id = module.inst(inst_id).result_id();
        if result_id != 0 && self.defs.get(&result_id) == Some(&inst_id) {
            self.defs.remove(&result_id);
        }
        module.inst_mut(inst_id).tombstone();
    }

    /// [`Self::kill_inst`] by id. No-op when the id has no definition.
    pub fn kill_def(&mut self, module: &mut Module, id: u32) {
        if let Some(inst) = self.def(id) {
            self.kill_inst(module, inst);
        }
    }

    /// Uses of `id` coming from annotation instructions (the `OpDecorate`
    /// family). A decorated id is not safe to unify or eliminate.
    #[must_use]
    pub fn annotations(&self, module: &Module, id: u32) -> Vec<InstId> {
        self.uses(id)
            .iter()
            .filter(|r| module.inst(r.inst).opcode().is_annotation())
            .map(|r| r.inst)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Instruction, Operand};
    use crate::spv::{Op, Section};

    fn type_module() -> (Module, InstId, InstId) {
        // %1 = OpTypeBool
        // %2 = OpTypeVector %1 3
        let mut module = Module::new();
        let bool_ty = module.alloc_inst(Instruction::new(Op::TypeBool, 0, 1, vec![]));
        let vec_ty = module.alloc_inst(Instruction::new(
            Op::TypeVector,
            0,
            2,
            vec![Operand::id(1), Operand::literal(3)],
        ));
        module.add_to_section(Section::TypesAndValues, bool_ty);
        module.add_to_section(Section::TypesAndValues, vec_ty);
        (module, bool_ty, vec_ty)
    }

    #[test]
    fn test_defs_and_uses() {
        let (module, bool_ty, vec_ty) = type_module();
        let manager = DefUseManager::new(&module);

        assert_eq!(manager.def(1), Some(bool_ty));
        assert_eq!(manager.def(2), Some(vec_ty));
        assert_eq!(
            manager.uses(1),
            &[Use {
                inst: vec_ty,
                site: UseSite::Operand(0),
            }]
        );
        assert!(manager.uses(2).is_empty());
    }

    #[test]
    fn test_zero_operand_instruction_is_recorded() {
        let (module, bool_ty, _) = type_module();
        let manager = DefUseManager::new(&module);
        assert!(manager.is_analyzed(bool_ty));
    }

    #[test]
    fn test_completeness() {
        let (module, _, _) = type_module();
        let manager = DefUseManager::new(&module);

        for inst_id in module.all_insts() {
            let inst = module.inst(inst_id);
            for (index, operand) in inst.operands().iter().enumerate() {
                if operand.is_id() {
                    let expected = Use {
                        inst: inst_id,
                        site: UseSite::Operand(index),
                    };
                    assert!(manager.uses(operand.single_word()).contains(&expected));
                }
            }
        }
    }

    #[test]
    fn test_redefinition_last_writer_wins() {
        let mut module = Module::new();
        let first = module.alloc_inst(Instruction::new(Op::TypeBool, 0, 7, vec![]));
        let second = module.alloc_inst(Instruction::new(
            Op::TypeVector,
            0,
            7,
            vec![Operand::id(1), Operand::literal(2)],
        ));
        module.add_to_section(Section::TypesAndValues, first);
        module.add_to_section(Section::TypesAndValues, second);

        let manager = DefUseManager::new(&module);
        assert_eq!(manager.def(7), Some(second));
    }

    #[test]
    fn test_replace_moves_every_use() {
        let (mut module, _, vec_ty) = type_module();
        // Another consumer of %1 so there are two uses to migrate.
        let undef = module.alloc_inst(Instruction::new(Op::Undef, 1, 3, vec![]));
        module.add_to_section(Section::TypesAndValues, undef);

        let mut manager = DefUseManager::new(&module);
        assert!(manager.replace_all_uses(&mut module, 1, 9));

        assert!(manager.uses(1).is_empty());
        let migrated = manager.uses(9);
        assert_eq!(migrated.len(), 2);
        assert_eq!(migrated[0].inst, vec_ty);
        assert_eq!(migrated[1].inst, undef);

        assert_eq!(module.inst(vec_ty).single_word_operand(0), 9);
        assert_eq!(module.inst(undef).type_id(), 9);
    }

    #[test]
    fn test_replace_without_uses_fails() {
        let (mut module, _, _) = type_module();
        let mut manager = DefUseManager::new(&module);
        assert!(!manager.replace_all_uses(&mut module, 2, 9));
        assert!(!manager.replace_all_uses(&mut module, 42, 9));
    }

    #[test]
    fn test_replace_same_id_is_noop() {
        let (mut module, _, vec_ty) = type_module();
        let mut manager = DefUseManager::new(&module);
        assert!(manager.replace_all_uses(&mut module, 1, 1));
        assert_eq!(module.inst(vec_ty).single_word_operand(0), 1);
    }

    #[test]
    fn test_kill_is_idempotent() {
        let (mut module, _, vec_ty) = type_module();
        let mut manager = DefUseManager::new(&module);

        manager.kill_def(&mut module, 2);
        assert!(module.inst(vec_ty).is_tombstoned());
        assert_eq!(manager.def(2), None);
        assert!(manager.uses(1).is_empty());

        let snapshot = module.to_words(false);
        manager.kill_def(&mut module, 2);
        manager.kill_inst(&mut module, vec_ty);
        assert_eq!(module.to_words(false), snapshot);
    }

    #[test]
    fn test_self_referential_phi_records_one_use() {
        // %7 = OpPhi %4 %7 %5 %6 %8 — the Phi references its own result.
        let mut module = Module::new();
        let phi = module.alloc_inst(Instruction::new(
            Op::Phi,
            4,
            7,
            vec![
                Operand::id(7),
                Operand::id(5),
                Operand::id(6),
                Operand::id(8),
            ],
        ));
        module.add_to_section(Section::TypesAndValues, phi);

        let mut manager = DefUseManager::new(&module);
        assert_eq!(manager.def(7), Some(phi));
        assert_eq!(
            manager.uses(7),
            &[Use {
                inst: phi,
                site: UseSite::Operand(0),
            }]
        );

        // Killing the self-referential definition must not recurse or leave
        // stale records behind.
        manager.kill_inst(&mut module, phi);
        assert_eq!(manager.def(7), None);
        assert!(manager.uses(7).is_empty());
        assert!(manager.uses(5).is_empty());
    }

    #[test]
    fn test_annotations_filter() {
        let (mut module, _, _) = type_module();
        let decorate = module.alloc_inst(Instruction::new(
            Op::Decorate,
            0,
            0,
            vec![Operand::id(1), Operand::literal(11)],
        ));
        module.add_to_section(Section::Annotations, decorate);

        let manager = DefUseManager::new(&module);
        assert_eq!(manager.annotations(&module, 1), vec![decorate]);
        assert!(manager.annotations(&module, 2).is_empty());
    }
}
