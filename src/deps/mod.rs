//! Register dependencies: where virtual registers must be before and after
//! an instruction.

mod dependency;
pub use dependency::{DepFlags, RegisterDependency};

mod group;
pub use group::{DependencyGroup};

mod conditions;
pub use conditions::{DependencyConditions};

mod map;
pub use map::{RegisterDependencyMap};

mod scratch;
pub use scratch::{ScratchRegisterDependencies, ScratchRegisterManager};
