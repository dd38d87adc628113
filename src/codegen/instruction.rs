use super::{VirtualRegister};
use crate::deps::{DependencyConditions};

/** The position of an [`Instruction`] in its list. */
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructionId(pub usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Opcode {
    /** Copies the source into the target. */
    Copy,
    /** A branch target. A `cold` label starts out-of-line code. */
    Label {cold: bool},
    /**
     * Records the previous virtual register associated with each real
     * register in its post-conditions. Generates no code.
     */
    AssocRegs,
    /** Any other instruction, named by its mnemonic. */
    Op(&'static str),
}

/**
 * A machine instruction, reduced to what register assignment needs: its
 * register operands and its dependencies.
 */
#[derive(Debug)]
pub struct Instruction {
    pub opcode: Opcode,
    pub targets: Vec<VirtualRegister>,
    pub sources: Vec<VirtualRegister>,
    pub conditions: Option<DependencyConditions>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Instruction {opcode, targets: Vec::new(), sources: Vec::new(), conditions: None}
    }

    pub fn copy(dest: VirtualRegister, src: VirtualRegister) -> Self {
        Instruction {opcode: Opcode::Copy, targets: vec![dest], sources: vec![src], conditions: None}
    }

    pub fn with_targets(mut self, targets: &[VirtualRegister]) -> Self {
        self.targets.extend_from_slice(targets);
        self
    }

    pub fn with_sources(mut self, sources: &[VirtualRegister]) -> Self {
        self.sources.extend_from_slice(sources);
        self
    }

    pub fn with_conditions(mut self, conditions: DependencyConditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /** The sources, then the targets. */
    pub fn operands(&self) -> impl Iterator<Item=VirtualRegister> + '_ {
        self.sources.iter().chain(self.targets.iter()).copied()
    }
}
