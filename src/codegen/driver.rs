use super::{CodeGenerator, Instruction, InstructionId, Opcode};
use crate::target::{Target};

/**
 * Assigns real registers to `instructions`, first to last.
 *
 * For each instruction, the pre-conditions are satisfied one
 * [`RegisterKind`] at a time in [`Target::KINDS`] order, then the operands
 * are given registers, then the post-conditions are satisfied in the same
 * kind order. The pre-condition registers stay blocked while the operands
 * are assigned, so that they are not spilled to make room. The moves this
 * requires are recorded in `cg`.
 *
 * [`RegisterKind`]: crate::target::RegisterKind
 */
pub fn assign_registers<T: Target>(instructions: &mut [Instruction], cg: &mut CodeGenerator<T>) {
    log::debug!("{}: assigning registers to {} instructions", T::NAME, instructions.len());
    for (i, instruction) in instructions.iter_mut().enumerate() {
        let at = InstructionId(i);
        match instruction.opcode {
            // The associations were tracked when the instruction was appended.
            Opcode::AssocRegs => continue,
            Opcode::Label {cold} => cg.set_out_of_line(cold),
            Opcode::Copy | Opcode::Op(_) => {},
        }
        if let Some(conditions) = instruction.conditions.as_mut() {
            for &kind in T::KINDS {
                conditions.assign_pre_condition_registers(at, kind, cg);
            }
        }
        if let Some(conditions) = instruction.conditions.as_ref() {
            conditions.block_pre_condition_registers(cg);
        }
        for vr in instruction.operands() {
            cg.assign_one_register(at, vr, false);
            cg.block(vr);
        }
        for vr in instruction.operands() {
            cg.unblock(vr);
            cg.dec_future_use_count_and_unlatch(at, vr);
        }
        if let Some(conditions) = instruction.conditions.as_ref() {
            conditions.unblock_pre_condition_registers(cg);
        }
        if let Some(conditions) = instruction.conditions.as_mut() {
            for &kind in T::KINDS {
                conditions.assign_post_condition_registers(at, kind, cg);
            }
        }
    }
    log::debug!("{}: {} fixups, {} registers spilled", T::NAME, cg.fixups().len(), cg.spilled_registers().count());
}

//-----------------------------------------------------------------------------
