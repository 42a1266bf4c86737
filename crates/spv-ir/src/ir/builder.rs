use super::Module;

/// Context for passes that mint ids.
///
/// Owns the "next fresh id" counter so id allocation is explicit rather
/// than scattered module state. `finalize` recomputes the id bound from
/// what the module actually contains and commits it; passes that maintain
/// the bound themselves can skip it.
#[derive(Debug)]
pub struct ModuleBuilder {
    next_id: u32,
}

impl ModuleBuilder {
    #[must_use]
    pub fn new(module: &Module) -> Self {
        Self {
            next_id: module.bound().max(1),
        }
    }

    /// A fresh, unused id.
    pub fn fresh_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Recompute the id bound from the module contents and commit it.
    pub fn finalize(self, module: &mut Module) {
        let bound = module.compute_bound().max(self.next_id);
        module.set_bound(bound);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Instruction, Operand};
    use crate::spv::{Op, Section};

    #[test]
    fn test_fresh_ids_are_distinct() {
        let mut module = Module::new();
        module.set_bound(10);
        let mut builder = ModuleBuilder::new(&module);
        assert_eq!(builder.fresh_id(), 10);
        assert_eq!(builder.fresh_id(), 11);
    }

    #[test]
    fn test_finalize_commits_bound() {
        let mut module = Module::new();
        let ty = module.alloc_inst(Instruction::new(Op::TypeInt, 0, 5, vec![
            Operand::literal(32),
            Operand::literal(1),
        ]));
        module.add_to_section(Section::TypesAndValues, ty);

        let builder = ModuleBuilder::new(&module);
        builder.finalize(&mut module);
        assert_eq!(module.bound(), 6);
    }
}
