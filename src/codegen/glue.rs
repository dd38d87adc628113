use super::{VirtualRegister};
use crate::target::{RealRegister};

/**
 * One child of a [`GlueNode`]: a value that must be in a global register
 * where control flow joins.
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GlueDependency {
    /** The value. A register pair if `high_global` is set. */
    pub register: VirtualRegister,
    pub global: RealRegister,
    /** The global register of the high half of a register pair. */
    pub high_global: Option<RealRegister>,
}

/** The register glue of an IR node, e.g. at a block boundary. */
#[derive(Debug, Default, Clone)]
pub struct GlueNode {
    pub children: Vec<GlueDependency>,
}

impl GlueNode {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, register: VirtualRegister, global: RealRegister) {
        self.children.push(GlueDependency {register, global, high_global: None});
    }

    pub fn push_pair(&mut self, register: VirtualRegister, global: RealRegister, high_global: RealRegister) {
        self.children.push(GlueDependency {register, global, high_global: Some(high_global)});
    }
}
