//! The x86_64 register file.

use super::{RealRegister, RegisterKind, Target, register_range};
use RegisterKind::*;

pub const RAX: RealRegister = RealRegister::new(0);
pub const RCX: RealRegister = RealRegister::new(1);
pub const RDX: RealRegister = RealRegister::new(2);
pub const RBX: RealRegister = RealRegister::new(3);
pub const RSP: RealRegister = RealRegister::new(4);
pub const RBP: RealRegister = RealRegister::new(5);
pub const RSI: RealRegister = RealRegister::new(6);
pub const RDI: RealRegister = RealRegister::new(7);
pub const R8: RealRegister = RealRegister::new(8);
pub const R9: RealRegister = RealRegister::new(9);
pub const R10: RealRegister = RealRegister::new(10);
pub const R11: RealRegister = RealRegister::new(11);
pub const R12: RealRegister = RealRegister::new(12);
pub const R13: RealRegister = RealRegister::new(13);
pub const R14: RealRegister = RealRegister::new(14);
pub const R15: RealRegister = RealRegister::new(15);

/** `xmm0` to `xmm15`. */
pub const XMM: [RealRegister; 16] = register_range(16);

const NAMES: [&str; 32] = [
    "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi",
    "r8", "r9", "r10", "r11", "r12", "r13", "r14", "r15",
    "xmm0", "xmm1", "xmm2", "xmm3", "xmm4", "xmm5", "xmm6", "xmm7", "xmm8", "xmm9", "xmm10", "xmm11", "xmm12", "xmm13", "xmm14", "xmm15",
];

/** Caller-saved registers first. `rbp` is last, because it usually holds the environment. */
const GPRS: [RealRegister; 15] = [
    RAX, RCX, RDX, RSI, RDI, R8, R9, R10, R11,
    RBX, R12, R13, R14, R15, RBP,
];

#[derive(Debug, Default, Copy, Clone)]
pub struct X86_64;

impl Target for X86_64 {
    const NAME: &'static str = "x86_64";
    const NUM_REGISTERS: usize = 32;
    const KINDS: &'static [RegisterKind] = &[GPR, FPR];
    const LOCKED: &'static [RealRegister] = &[RSP];
    const ENVIRONMENT_REGISTER: Option<RealRegister> = Some(RBP);

    fn kind_of(reg: RealRegister) -> RegisterKind {
        if reg.number() < 16 { GPR } else { FPR }
    }

    fn assignable(kind: RegisterKind) -> &'static [RealRegister] {
        match kind {
            GPR => &GPRS,
            FPR => &XMM,
            _ => &[],
        }
    }

    fn register_name(reg: RealRegister) -> &'static str { NAMES[reg.number() as usize] }
}
