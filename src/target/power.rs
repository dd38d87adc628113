//! The Power register file.

use super::{RealRegister, RegisterKind, Target, register_range};
use super::super::codegen::{CodeGenerator, InstructionId};
use super::super::deps::{DependencyGroup};
use super::super::assign;
use RegisterKind::*;

/** `gr0` to `gr31`. `gr0` reads as zero when used as a base. */
pub const GR: [RealRegister; 32] = register_range(0);
pub const SP: RealRegister = GR[1];
pub const TOC: RealRegister = GR[2];
pub const SYSTEM: RealRegister = GR[13];

/** `fp0` to `fp31`. */
pub const FP: [RealRegister; 32] = register_range(32);

/** `vr0` to `vr31`. */
pub const VR: [RealRegister; 32] = register_range(64);

/** `cr0` to `cr7`. */
pub const CR: [RealRegister; 8] = register_range(96);

const NAMES: [&str; 104] = [
    "gr0", "gr1", "gr2", "gr3", "gr4", "gr5", "gr6", "gr7", "gr8", "gr9", "gr10", "gr11", "gr12", "gr13", "gr14", "gr15", "gr16", "gr17", "gr18", "gr19", "gr20", "gr21", "gr22", "gr23", "gr24", "gr25", "gr26", "gr27", "gr28", "gr29", "gr30", "gr31",
    "fp0", "fp1", "fp2", "fp3", "fp4", "fp5", "fp6", "fp7", "fp8", "fp9", "fp10", "fp11", "fp12", "fp13", "fp14", "fp15", "fp16", "fp17", "fp18", "fp19", "fp20", "fp21", "fp22", "fp23", "fp24", "fp25", "fp26", "fp27", "fp28", "fp29", "fp30", "fp31",
    "vr0", "vr1", "vr2", "vr3", "vr4", "vr5", "vr6", "vr7", "vr8", "vr9", "vr10", "vr11", "vr12", "vr13", "vr14", "vr15", "vr16", "vr17", "vr18", "vr19", "vr20", "vr21", "vr22", "vr23", "vr24", "vr25", "vr26", "vr27", "vr28", "vr29", "vr30", "vr31",
    "cr0", "cr1", "cr2", "cr3", "cr4", "cr5", "cr6", "cr7",
];

/** Volatile registers first, and `gr0` last because it cannot be a base. */
const GPRS: [RealRegister; 29] = [
    GR[3], GR[4], GR[5], GR[6], GR[7], GR[8], GR[9], GR[10], GR[11], GR[12],
    GR[14], GR[15], GR[16], GR[17], GR[18], GR[19], GR[20], GR[21], GR[22],
    GR[23], GR[24], GR[25], GR[26], GR[27], GR[28], GR[29], GR[30], GR[31],
    GR[0],
];

#[derive(Debug, Default, Copy, Clone)]
pub struct Power;

impl Target for Power {
    const NAME: &'static str = "power";
    const NUM_REGISTERS: usize = 104;
    const KINDS: &'static [RegisterKind] = &[GPR, FPR, VRF, CCR];
    const LOCKED: &'static [RealRegister] = &[SP, TOC, SYSTEM];
    const ZERO_REGISTER: Option<RealRegister> = Some(GR[0]);

    fn kind_of(reg: RealRegister) -> RegisterKind {
        match reg.number() {
            0..=31 => GPR,
            32..=63 => FPR,
            64..=95 => VRF,
            _ => CCR,
        }
    }

    fn assignable(kind: RegisterKind) -> &'static [RealRegister] {
        match kind {
            GPR => &GPRS,
            FPR => &FP,
            VRF => &VR,
            CCR => &CR,
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
