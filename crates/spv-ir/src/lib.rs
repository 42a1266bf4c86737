#![allow(
    clippy::missing_errors_doc, // error conditions are described in prose where they matter
    clippy::missing_panics_doc  // asserts guard internal invariants, not caller input
)]

pub mod analysis;
pub mod cfg;
pub mod error;
pub mod ir;
pub mod loader;
pub mod opt;
pub mod spv;

/// Test harness module for writing unit and integration tests.
///
/// This module is only available when running tests or when the
/// `test-harness` feature is enabled.
#[cfg(any(test, feature = "test-harness"))]
pub mod test_harness;

pub use error::{Error, Result};
pub use ir::{Instruction, Module, ModuleBuilder, Operand};
pub use loader::{build_module, build_module_from_bytes};
pub use spv::Op;
