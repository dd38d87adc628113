//! The AArch64 register file.

use super::{RealRegister, RegisterKind, Target, register_range};
use RegisterKind::*;

/** `x0` to `x30`, followed by `sp`. */
pub const X: [RealRegister; 32] = register_range(0);
pub const FP: RealRegister = X[29];
pub const LR: RealRegister = X[30];
pub const SP: RealRegister = X[31];

/** `v0` to `v31`. */
pub const V: [RealRegister; 32] = register_range(32);

const NAMES: [&str; 64] = [
    "x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8", "x9", "x10", "x11", "x12", "x13", "x14", "x15", "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23", "x24", "x25", "x26", "x27", "x28", "x29", "x30", "sp",
    "v0", "v1", "v2", "v3", "v4", "v5", "v6", "v7", "v8", "v9", "v10", "v11", "v12", "v13", "v14", "v15", "v16", "v17", "v18", "v19", "v20", "v21", "v22", "v23", "v24", "v25", "v26", "v27", "v28", "v29", "v30", "v31",
];

/**
 * `x16` and `x17` are reserved for veneers, and `x18` for the platform.
 */
const GPRS: [RealRegister; 26] = [
    X[0], X[1], X[2], X[3], X[4], X[5], X[6], X[7],
    X[8], X[9], X[10], X[11], X[12], X[13], X[14], X[15],
    X[19], X[20], X[21], X[22], X[23], X[24], X[25], X[26], X[27], X[28],
];

#[derive(Debug, Default, Copy, Clone)]
pub struct Aarch64;

impl Target for Aarch64 {
    const NAME: &'static str = "aarch64";
    const NUM_REGISTERS: usize = 64;
    const KINDS: &'static [RegisterKind] = &[GPR, FPR];
    const LOCKED: &'static [RealRegister] = &[X[16], X[17], X[18], FP, LR, SP];

    fn kind_of(reg: RealRegister) -> RegisterKind {
        if reg.number() < 32 { GPR } else { FPR }
    }

    fn assignable(kind: RegisterKind) -> &'static [RealRegister] {
        match kind {
            GPR => &GPRS,
            FPR => &V,
            _ => &[],
        }
    }

    fn register_name(reg: RealRegister) -> &'static str { NAMES[reg.number() as usize] }
}
