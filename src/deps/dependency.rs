use std::fmt::{self, Debug};
use std::ops::{BitOr, BitOrAssign, BitAnd};

use crate::codegen::{VirtualRegister};
use crate::target::{Binding};

/** How an instruction uses the register of a [`RegisterDependency`]. */
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct DepFlags(u8);

impl DepFlags {
    pub const NONE: Self = DepFlags(0);
    /** The instruction reads the register. */
    pub const REFERENCES: Self = DepFlags(1);
    /** The instruction writes the register. */
    pub const DEFINES: Self = DepFlags(2);
    /** The instruction reads and writes the register. */
    pub const USES: Self = DepFlags(3);
    /** The register must not be [`crate::target::Target::ZERO_REGISTER`]. */
    pub const EXCLUDE_GPR0: Self = DepFlags(4);

    pub fn bits(self) -> u8 { self.0 }

    /** `true` if every flag in `other` is in `self`. */
    pub fn contains(self, other: Self) -> bool { self.0 & other.0 == other.0 }

    /** `true` if any flag in `other` is in `self`. */
    pub fn intersects(self, other: Self) -> bool { self.0 & other.0 != 0 }
}

impl BitOr for DepFlags {
    type Output = Self;
    fn bitor(self, other: Self) -> Self { DepFlags(self.0 | other.0) }
}

impl BitOrAssign for DepFlags {
    fn bitor_assign(&mut self, other: Self) { self.0 |= other.0; }
}

impl BitAnd for DepFlags {
    type Output = Self;
    fn bitand(self, other: Self) -> Self { DepFlags(self.0 & other.0) }
}

impl Debug for DepFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut names = Vec::new();
        if self.intersects(Self::REFERENCES) { names.push("REFERENCES"); }
        if self.intersects(Self::DEFINES) { names.push("DEFINES"); }
        if self.intersects(Self::EXCLUDE_GPR0) { names.push("EXCLUDE_GPR0"); }
        if names.is_empty() { names.push("NONE"); }
        write!(f, "{}", names.join(" | "))
    }
}

//-----------------------------------------------------------------------------

/**
 * A requirement that a virtual register be in a particular place at an
 * instruction.
 *
 * The register is `None` while the slot has not been filled.
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct RegisterDependency {
    register: Option<VirtualRegister>,
    binding: Binding,
    flags: DepFlags,
}

impl RegisterDependency {
    pub fn new(register: VirtualRegister, binding: Binding, flags: DepFlags) -> Self {
        RegisterDependency {register: Some(register), binding, flags}
    }

    pub fn register(&self) -> Option<VirtualRegister> { self.register }

    pub fn set_register(&mut self, register: Option<VirtualRegister>) { self.register = register; }

    pub fn binding(&self) -> Binding { self.binding }

    pub fn set_binding(&mut self, binding: Binding) { self.binding = binding; }

    pub fn flags(&self) -> DepFlags { self.flags }

    pub fn assign_flags(&mut self, flags: DepFlags) { self.flags = flags; }

    pub fn refs_register(&self) -> bool { self.flags.intersects(DepFlags::REFERENCES) }

    pub fn defs_register(&self) -> bool { self.flags.intersects(DepFlags::DEFINES) }

    pub fn uses_register(&self) -> bool { self.flags.intersects(DepFlags::USES) }

    pub fn exclude_gpr0(&self) -> bool { self.flags.intersects(DepFlags::EXCLUDE_GPR0) }

    pub fn set_exclude_gpr0(&mut self) { self.flags |= DepFlags::EXCLUDE_GPR0; }

    /** Unbinds the slot: no register, [`Binding::Any`], no flags. */
    pub fn clear(&mut self) { *self = Self::default(); }
}

//-----------------------------------------------------------------------------
