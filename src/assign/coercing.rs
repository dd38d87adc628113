use super::{Slot, slots, check_targets, spill_bound, place_pairs, place_wildcards, finish};
use crate::codegen::{CodeGenerator, InstructionId};
use crate::deps::{DependencyGroup};
use crate::target::{Target, RegisterKind, RealRegister};

/**
 * Satisfies the first `n` dependencies of `group` on registers of `kind`
 * by coercing each register into place in turn.
 *
 * A register already in its target stays there. The occupant of a target is
 * exchanged with the incoming register if possible, otherwise moved to a
 * free register, otherwise spilled. Dependencies whose target is free are
 * done first, since they cost at most one move.
 */
pub fn coercing<T: Target>(
    group: &mut DependencyGroup,
    n: usize,
    at: InstructionId,
    kind: RegisterKind,
    cg: &mut CodeGenerator<T>,
) {
    let slots = slots(group, n, kind, cg);
    if slots.is_empty() { return; }
    check_targets::<T>(group, n, &slots);
    let before = cg.fixups().len();
    spill_bound(&slots, at, cg);
    let targeted: Vec<(Slot, RealRegister)> = slots.iter()
        .filter_map(|s| Some((*s, s.dep.binding().real()?)))
        .collect();
    for slot in &slots {
        cg.block(slot.register);
    }
    group.block_real_dependency_registers(n, cg);
    let (free, contended): (Vec<(Slot, RealRegister)>, Vec<(Slot, RealRegister)>) = targeted.into_iter()
        .filter(|&(slot, r)| cg.assigned_register(slot.register) != Some(r))
        .partition(|&(_, r)| cg.machine().is_free(r));
    for (slot, r) in free.into_iter().chain(contended) {
        cg.coerce_register_assignment(at, slot.register, r);
    }
    let mut rebound = place_pairs(&slots, at, kind, cg);
    rebound.extend(place_wildcards(&slots, at, cg));
    finish(group, n, &slots, true, rebound, at, cg);
    log::debug!(
        "{:?}: {} {:?} dependencies satisfied with {} fixups",
        at, slots.len(), kind, cg.fixups().len() - before,
    );
}

//-----------------------------------------------------------------------------
