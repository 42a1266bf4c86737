//! Deduplicated semantic type hierarchy.
//!
//! Rebuilt from scratch by scanning the module's type-declaring
//! instructions in order. Two independently declared, structurally
//! identical and identically decorated types resolve to the same canonical
//! node (while keeping their distinct ids), which is what lets passes
//! compare types without chasing ids.
//!
//! The manager is a snapshot: adding a type instruction to the module
//! behind its back desynchronizes it, and the holder must drop and rebuild
//! it before the next query.

use std::collections::{BTreeSet, HashMap};

use crate::ir::{Instruction, Module};
use crate::spv::Op;
use crate::{Error, Result};

/// A semantic type. Nested references are structural, not id-based, so
/// equality is independent of id identity. The sole exception is
/// [`Type::ForwardPointer`], which keeps its target id — the only finite
/// representation of a self-referential pointer type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Void,
    Bool,
    Integer {
        width: u32,
        signed: bool,
    },
    Float {
        width: u32,
    },
    Vector {
        elem: Box<TypeNode>,
        count: u32,
    },
    Matrix {
        column: Box<TypeNode>,
        count: u32,
    },
    Image {
        sampled_type: Box<TypeNode>,
        dim: u32,
        depth: u32,
        arrayed: u32,
        multisampled: u32,
        sampled: u32,
        format: u32,
        access: Option<u32>,
    },
    Sampler,
    SampledImage {
        image: Box<TypeNode>,
    },
    Array {
        elem: Box<TypeNode>,
        /// Id of the length constant. Kept as an id: the length is a value,
        /// not a type, so it has no structural form here.
        length_id: u32,
    },
    RuntimeArray {
        elem: Box<TypeNode>,
    },
    Struct {
        members: Vec<TypeNode>,
        member_decorations: BTreeSet<(u32, Vec<u32>)>,
    },
    Opaque {
        name: String,
    },
    Pointer {
        storage_class: u32,
        pointee: Box<TypeNode>,
    },
    Function {
        return_type: Box<TypeNode>,
        params: Vec<TypeNode>,
    },
    ForwardPointer {
        storage_class: u32,
        target_id: u32,
    },
}

/// A type together with the decorations attached to its declaring id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeNode {
    pub ty: Type,
    pub decorations: BTreeSet<Vec<u32>>,
}

impl TypeNode {
    #[must_use]
    pub fn plain(ty: Type) -> Self {
        Self {
            ty,
            decorations: BTreeSet::new(),
        }
    }
}

#[derive(Debug)]
pub struct TypeManager {
    types: HashMap<u32, TypeNode>,
    /// Reverse map for deduplication; the first declared id wins.
    ids: HashMap<TypeNode, u32>,
}

impl TypeManager {
    /// Build from the module's types section, two-phase: decorations are
    /// collected first (annotations precede types in the section order),
    /// then type instructions are streamed in declaration order. Only
    /// `OpTypeForwardPointer` may reference a not-yet-declared id.
    pub fn new(module: &Module) -> Result<Self> {
        let mut decorations: HashMap<u32, BTreeSet<Vec<u32>>> = HashMap::new();
        let mut member_decorations: HashMap<u32, BTreeSet<(u32, Vec<u32>)>> = HashMap::new();
        for &ann in module.annotations() {
            let inst = module.inst(ann);
            match inst.opcode() {
                Op::Decorate => {
                    let target = inst.single_word_operand(0);
                    let words = operand_words(inst, 1);
                    decorations.entry(target).or_default().insert(words);
                }
                Op::MemberDecorate => {
                    let target = inst.single_word_operand(0);
                    let member = inst.single_word_operand(1);
                    let words = operand_words(inst, 2);
                    member_decorations
                        .entry(target)
                        .or_default()
                        .insert((member, words));
                }
                _ => {}
            }
        }

        let mut manager = Self {
            types: HashMap::new(),
            ids: HashMap::new(),
        };
        // Storage class of ids forward-declared via OpTypeForwardPointer.
        let mut forward: HashMap<u32, u32> = HashMap::new();

        for &id in module.types_values() {
            let inst = module.inst(id);
            if !inst.is_live() || !inst.opcode().is_type_decl() {
                continue;
            }
            if inst.opcode() == Op::TypeForwardPointer {
                forward.insert(inst.single_word_operand(0), inst.single_word_operand(1));
                continue;
            }

            let result_id = inst.result_id();
            let ty = manager.build_type(inst, &forward, &member_decorations)?;
            let node = TypeNode {
                ty,
                decorations: decorations.get(&result_id).cloned().unwrap_or_default(),
            };
            manager.types.insert(result_id, node.clone());
            manager.ids.entry(node).or_insert(result_id);
        }

        Ok(manager)
    }

    fn build_type(
        &self,
        inst: &Instruction,
        forward: &HashMap<u32, u32>,
        member_decorations: &HashMap<u32, BTreeSet<(u32, Vec<u32>)>>,
    ) -> Result<Type> {
        let resolve = |id: u32| -> Result<Box<TypeNode>> {
            if let Some(node) = self.types.get(&id) {
                return Ok(Box::new(node.clone()));
            }
            // The only legal forward reference: a pointer declared ahead of
            // time keeps its id-based identity.
            if let Some(&storage_class) = forward.get(&id) {
                return Ok(Box::new(TypeNode::plain(Type::ForwardPointer {
                    storage_class,
                    target_id: id,
                })));
            }
            Err(Error::InvalidId {
                id,
                reason: format!("Op{:?} references an undeclared type", inst.opcode()),
            })
        };

        let ty = match inst.opcode() {
            Op::TypeVoid => Type::Void,
            Op::TypeBool => Type::Bool,
            Op::TypeInt => Type::Integer {
                width: inst.single_word_operand(0),
                signed: inst.single_word_operand(1) != 0,
            },
            Op::TypeFloat => Type::Float {
                width: inst.single_word_operand(0),
            },
            Op::TypeVector => Type::Vector {
                elem: resolve(inst.single_word_operand(0))?,
                count: inst.single_word_operand(1),
            },
            Op::TypeMatrix => Type::Matrix {
                column: resolve(inst.single_word_operand(0))?,
                count: inst.single_word_operand(1),
            },
            Op::TypeImage => Type::Image {
                sampled_type: resolve(inst.single_word_operand(0))?,
                dim: inst.single_word_operand(1),
                depth: inst.single_word_operand(2),
                arrayed: inst.single_word_operand(3),
                multisampled: inst.single_word_operand(4),
                sampled: inst.single_word_operand(5),
                format: inst.single_word_operand(6),
                access: (inst.num_operands() > 7).then(|| inst.single_word_operand(7)),
            },
            Op::TypeSampler => Type::Sampler,
            Op::TypeSampledImage => Type::SampledImage {
                image: resolve(inst.single_word_operand(0))?,
            },
            Op::TypeArray => Type::Array {
                elem: resolve(inst.single_word_operand(0))?,
                length_id: inst.single_word_operand(1),
            },
            Op::TypeRuntimeArray => Type::RuntimeArray {
                elem: resolve(inst.single_word_operand(0))?,
            },
            Op::TypeStruct => {
                let mut members = Vec::with_capacity(inst.num_operands());
                for operand in inst.operands() {
                    members.push(*resolve(operand.single_word())?);
                }
                Type::Struct {
                    members,
                    member_decorations: member_decorations
                        .get(&inst.result_id())
                        .cloned()
                        .unwrap_or_default(),
                }
            }
            Op::TypeOpaque => Type::Opaque {
                name: inst.operand(0).as_string().unwrap_or_default(),
            },
            Op::TypePointer => Type::Pointer {
                storage_class: inst.single_word_operand(0),
                pointee: resolve(inst.single_word_operand(1))?,
            },
            Op::TypeFunction => {
                let return_type = resolve(inst.single_word_operand(0))?;
                let mut params = Vec::new();
                for operand in &inst.operands()[1..] {
                    params.push(*resolve(operand.single_word())?);
                }
                Type::Function {
                    return_type,
                    params,
                }
            }
            op => {
                return Err(Error::Internal(format!(
                    "Op{op:?} is not a type declaration"
                )));
            }
        };
        Ok(ty)
    }

    /// The type declared by `id`, if `id` declares one.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&TypeNode> {
        self.types.get(&id)
    }

    /// Canonical (first declared) id of a structurally equal, identically
    /// decorated type.
    #[must_use]
    pub fn id_of(&self, node: &TypeNode) -> Option<u32> {
        self.ids.get(node).copied()
    }

    /// Canonical id for whatever type `id` declares. Useful to test two
    /// type ids for semantic equality.
    #[must_use]
    pub fn canonical_id(&self, id: u32) -> Option<u32> {
        self.id_of(self.get(id)?)
    }
}

fn operand_words(inst: &Instruction, from: usize) -> Vec<u32> {
    inst.operands()[from..]
        .iter()
        .flat_map(|op| op.words().iter().copied())
        .collect()
}
