//! The RISC-V (RV64GC) register file.

use super::{RealRegister, RegisterKind, Target, register_range};
use RegisterKind::*;

/** `x0` to `x31`. `x0` always reads as zero. */
pub const X: [RealRegister; 32] = register_range(0);
pub const ZERO: RealRegister = X[0];
pub const RA: RealRegister = X[1];
pub const SP: RealRegister = X[2];
pub const GP: RealRegister = X[3];
pub const TP: RealRegister = X[4];

/** `f0` to `f31`. */
pub const F: [RealRegister; 32] = register_range(32);

const NAMES: [&str; 64] = [
    "x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8", "x9", "x10", "x11", "x12", "x13", "x14", "x15", "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23", "x24", "x25", "x26", "x27", "x28", "x29", "x30", "x31",
    "f0", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12", "f13", "f14", "f15", "f16", "f17", "f18", "f19", "f20", "f21", "f22", "f23", "f24", "f25", "f26", "f27", "f28", "f29", "f30", "f31",
];

const GPRS: [RealRegister; 27] = register_range(5);

#[derive(Debug, Default, Copy, Clone)]
pub struct RiscV;

impl Target for RiscV {
    const NAME: &'static str = "riscv";
    const NUM_REGISTERS: usize = 64;
    const KINDS: &'static [RegisterKind] = &[GPR, FPR];
    const LOCKED: &'static [RealRegister] = &[ZERO, RA, SP, GP, TP];

    fn kind_of(reg: RealRegister) -> RegisterKind {
        if reg.number() < 32 { GPR } else { FPR }
    }

    fn assignable(kind: RegisterKind) -> &'static [RealRegister] {
        match kind {
            GPR => &GPRS,
            FPR => &F,
            _ => &[],
        }
    }

    fn register_name(reg: RealRegister) -> &'static str { NAMES[reg.number() as usize] }
}
