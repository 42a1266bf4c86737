mod def_use;
mod types;

pub use def_use::{DefUseManager, Use, UseSite};
pub use types::{Type, TypeManager, TypeNode};
