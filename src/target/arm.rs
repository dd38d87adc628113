//! The 32-bit ARM register file.

use super::{RealRegister, RegisterKind, Target, register_range};
use RegisterKind::*;

/** `r0` to `r15`. */
pub const R: [RealRegister; 16] = register_range(0);
pub const SP: RealRegister = R[13];
pub const LR: RealRegister = R[14];
pub const PC: RealRegister = R[15];

/** `d0` to `d15`. */
pub const D: [RealRegister; 16] = register_range(16);

const NAMES: [&str; 32] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp", "lr", "pc",
    "d0", "d1", "d2", "d3", "d4", "d5", "d6", "d7", "d8", "d9", "d10", "d11", "d12", "d13", "d14", "d15",
];

const GPRS: [RealRegister; 13] = register_range(0);

#[derive(Debug, Default, Copy, Clone)]
pub struct Arm;

impl Target for Arm {
    const NAME: &'static str = "arm";
    const NUM_REGISTERS: usize = 32;
    const KINDS: &'static [RegisterKind] = &[GPR, FPR];
    const LOCKED: &'static [RealRegister] = &[SP, LR, PC];

    fn kind_of(reg: RealRegister) -> RegisterKind {
        if reg.number() < 16 { GPR } else { FPR }
    }

    fn assignable(kind: RegisterKind) -> &'static [RealRegister] {
        match kind {
            GPR => &GPRS,
            FPR => &D,
            _ => &[],
        }
    }

    fn register_name(reg: RealRegister) -> &'static str { NAMES[reg.number() as usize] }
}
