//! The z/Architecture register file.

use super::{RealRegister, RegisterKind, Target, register_range};
use super::super::codegen::{CodeGenerator, InstructionId};
use super::super::deps::{DependencyGroup};
use super::super::assign;
use RegisterKind::*;

/** `gpr0` to `gpr15`. `gpr0` reads as zero when used as a base. */
pub const R: [RealRegister; 16] = register_range(0);
pub const SP: RealRegister = R[15];

/** `fpr0` to `fpr15`. These overlap `vrf0` to `vrf15`. */
pub const F: [RealRegister; 16] = register_range(16);

/** `vrf16` to `vrf31`. */
pub const V: [RealRegister; 16] = register_range(32);

const NAMES: [&str; 48] = [
    "gpr0", "gpr1", "gpr2", "gpr3", "gpr4", "gpr5", "gpr6", "gpr7", "gpr8", "gpr9", "gpr10", "gpr11", "gpr12", "gpr13", "gpr14", "gpr15",
    "fpr0", "fpr1", "fpr2", "fpr3", "fpr4", "fpr5", "fpr6", "fpr7", "fpr8", "fpr9", "fpr10", "fpr11", "fpr12", "fpr13", "fpr14", "fpr15",
    "vrf16", "vrf17", "vrf18", "vrf19", "vrf20", "vrf21", "vrf22", "vrf23", "vrf24", "vrf25", "vrf26", "vrf27", "vrf28", "vrf29", "vrf30", "vrf31",
];

/** `gpr0` is last because it cannot be a base. */
const GPRS: [RealRegister; 15] = [
    R[1], R[2], R[3], R[4], R[5], R[6], R[7],
    R[8], R[9], R[10], R[11], R[12], R[13], R[14],
    R[0],
];

/** Even/odd pairs, e.g. for the 128-bit dividend of `dlgr`. `gpr0` is last. */
const PAIRS: [(RealRegister, RealRegister); 7] = [
    (R[2], R[3]), (R[4], R[5]), (R[6], R[7]), (R[8], R[9]), (R[10], R[11]), (R[12], R[13]),
    (R[0], R[1]),
];

#[derive(Debug, Default, Copy, Clone)]
pub struct Z;

impl Target for Z {
    const NAME: &'static str = "z";
    const NUM_REGISTERS: usize = 48;
    const KINDS: &'static [RegisterKind] = &[GPR, FPR, VRF];
    const LOCKED: &'static [RealRegister] = &[SP];
    const ZERO_REGISTER: Option<RealRegister> = Some(R[0]);
    const REGISTER_PAIRS: &'static [(RealRegister, RealRegister)] = &PAIRS;

    fn kind_of(reg: RealRegister) -> RegisterKind {
        match reg.number() {
            0..=15 => GPR,
            16..=31 => FPR,
            _ => VRF,
        }
    }

    fn assignable(kind: RegisterKind) -> &'static [RealRegister] {
        match kind {
            GPR => &GPRS,
            FPR => &F,
            VRF => &V,
            CCR => &[],
        }
    }

    fn register_name(reg: RealRegister) -> &'static str { NAMES[reg.number() as usize] }

    fn assign_registers(
        group: &mut DependencyGroup,
        n: usize,
        at: InstructionId,
        kind: RegisterKind,
        cg: &mut CodeGenerator<Self>,
    ) {
        assign::chained(group, n, at, kind, cg)
    }
}
