//! Real registers, and the register files of the supported architectures.

use std::fmt::{self, Debug};

use super::util::{AsUsize};
use super::codegen::{CodeGenerator, InstructionId};
use super::deps::{DependencyGroup};
use super::assign;

pub mod arm;
pub use arm::{Arm};

pub mod aarch64;
pub use aarch64::{Aarch64};

pub mod power;
pub use power::{Power};

pub mod riscv;
pub use riscv::{RiscV};

pub mod x86_64;
pub use x86_64::{X86_64};

pub mod z;
pub use z::{Z};

/**
 * An upper bound on [`Target::NUM_REGISTERS`] for every target.
 * Lookup tables indexed by [`RealRegister`] can use this as their length.
 */
pub const MAX_REAL_REGISTERS: usize = 256;

/**
 * A physical register, numbered densely from zero within a [`Target`].
 * Registers of all [`RegisterKind`]s share one numbering.
 */
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RealRegister(u8);

impl RealRegister {
    pub const fn new(number: u8) -> Self { RealRegister(number) }

    pub const fn number(self) -> u8 { self.0 }
}

impl Debug for RealRegister {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

impl AsUsize for RealRegister {
    fn as_usize(self) -> usize { self.0 as usize }
}

/**
 * Returns `N` consecutive [`RealRegister`]s starting at `first`.
 * Used to build the per-target register tables.
 */
pub const fn register_range<const N: usize>(first: u8) -> [RealRegister; N] {
    let mut ret = [RealRegister(0); N];
    let mut i = 0;
    while i < N {
        ret[i] = RealRegister(first + i as u8);
        i += 1;
    }
    ret
}

//-----------------------------------------------------------------------------

/** The partition of the register file by functional class. */
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(clippy::upper_case_acronyms)]
pub enum RegisterKind {
    /** General purpose. */
    GPR,
    /** Floating point. */
    FPR,
    /** Vector. */
    VRF,
    /** Condition. */
    CCR,
}

//-----------------------------------------------------------------------------

/** Where a dependency requires its virtual register to be. */
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Binding {
    /** Any register of the right kind, chosen during assignment. */
    #[default]
    Any,
    /** In the virtual register's spill slot, not in a register. */
    Spilled,
    /** In exactly this register. */
    Real(RealRegister),
    /** In the first register of some [`Target::REGISTER_PAIRS`] entry. */
    EvenOfPair,
    /** In the second register of some [`Target::REGISTER_PAIRS`] entry. */
    OddOfPair,
}

impl Binding {
    pub fn real(self) -> Option<RealRegister> {
        if let Binding::Real(r) = self { Some(r) } else { None }
    }

    pub fn is_any(self) -> bool { self == Binding::Any }

    pub fn is_spilled(self) -> bool { self == Binding::Spilled }

    pub fn is_pair_half(self) -> bool { matches!(self, Binding::EvenOfPair | Binding::OddOfPair) }
}

impl From<RealRegister> for Binding {
    fn from(r: RealRegister) -> Self { Binding::Real(r) }
}

//-----------------------------------------------------------------------------

/**
 * The register file of a machine architecture, and the algorithm used to
 * satisfy a [`DependencyGroup`] on it.
 *
 * A compilation uses exactly one `Target`, fixed at compile time by the type
 * parameter of [`CodeGenerator`].
 */
pub trait Target: Debug + Default + Copy + 'static {
    /** A human-readable name, e.g. "x86_64". */
    const NAME: &'static str;

    /** The number of [`RealRegister`]s. All are below this. */
    const NUM_REGISTERS: usize;

    /**
     * The [`RegisterKind`]s this target has, in the order the assignment
     * driver visits them.
     */
    const KINDS: &'static [RegisterKind];

    /** Registers never handed out, e.g. the stack pointer. */
    const LOCKED: &'static [RealRegister] = &[];

    /**
     * The register whose encoding as a base means "zero" rather than its
     * contents. Dependencies flagged `EXCLUDE_GPR0` avoid it.
     */
    const ZERO_REGISTER: Option<RealRegister> = None;

    /**
     * The register conventionally holding the code generator's environment
     * register, see [`CodeGenerator::environment_register()`].
     */
    const ENVIRONMENT_REGISTER: Option<RealRegister> = None;

    /**
     * The register pairs that can hold a double-width value, as (even, odd),
     * most preferred first. Dependencies bound to [`Binding::EvenOfPair`]
     * and [`Binding::OddOfPair`] are put in these.
     */
    const REGISTER_PAIRS: &'static [(RealRegister, RealRegister)] = &[];

    /** The kind of `reg`. */
    fn kind_of(reg: RealRegister) -> RegisterKind;

    /** The registers of `kind` that may be assigned, most preferred first. */
    fn assignable(kind: RegisterKind) -> &'static [RealRegister];

    /** The assembler name of `reg`. */
    fn register_name(reg: RealRegister) -> &'static str;

    /**
     * Satisfy the first `n` dependencies of `group` whose virtual registers
     * are of `kind`, at instruction `at`.
     */
    fn assign_registers(
        group: &mut DependencyGroup,
        n: usize,
        at: InstructionId,
        kind: RegisterKind,
        cg: &mut CodeGenerator<Self>,
    ) {
        assign::coercing(group, n, at, kind, cg)
    }
}

//-----------------------------------------------------------------------------
