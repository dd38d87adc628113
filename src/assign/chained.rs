use super::{Slot, slots, check_targets, spill_bound, place_pairs, place_wildcards, finish};
use crate::codegen::{CodeGenerator, InstructionId, VirtualRegister};
use crate::deps::{DependencyGroup, RegisterDependencyMap};
use crate::target::{Target, RegisterKind, RealRegister};

/** The register of `slot`'s dependency, and the register it must be in. */
fn target_of(slot: &Slot) -> RealRegister {
    match slot.dep.binding().real() {
        Some(r) => r,
        None => panic!("{:?} has no target", slot.register),
    }
}

/**
 * Moves `vr` out of the way, into a spare register if one can be found,
 * otherwise into its spill slot.
 *
 * If `block` is `true` the dependencies' registers are blocked, so a spare
 * can be made by spilling some other register. Otherwise `vr` itself is
 * spilled.
 */
fn evict<T: Target>(at: InstructionId, vr: VirtualRegister, block: bool, cg: &mut CodeGenerator<T>) {
    let kind = cg.kind(vr);
    let exclude_zero = cg.interferes_with_zero(vr);
    let spare = match cg.find_best_free_register(kind, exclude_zero) {
        Some(spare) => spare,
        None if block => cg.free_best_register(at, kind, exclude_zero),
        None => {
            cg.spill_register(at, vr);
            return;
        },
    };
    // `free_best_register()` might have chosen `vr` itself.
    if cg.assigned_register(vr).is_some() {
        cg.coerce_register_assignment(at, vr, spare);
    }
}

/**
 * Satisfies the first `n` dependencies of `group` on registers of `kind`
 * by following chains of moves.
 *
 * A dependency whose target is free starts a chain: its register moves in,
 * which frees the register it was in, which may be the target of another
 * dependency, and so on. When every remaining target is occupied, the
 * occupants are followed from target to target. That ends either back at
 * the start, in which case the cycle is resolved by exchanges, or at a
 * register that no dependency wants, which is evicted to start a chain.
 */
pub fn chained<T: Target>(
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
    let targeted: Vec<Slot> = slots.iter().filter(|s| s.dep.binding().real().is_some()).copied().collect();
    let num_assignable = T::assignable(kind).len();
    assert!(
        targeted.len() <= num_assignable,
        "{} {:?} dependencies on {} registers", targeted.len(), kind, num_assignable,
    );
    // With a register to spare, the dependencies' registers can be kept out
    // of the way of spilling.
    let block = slots.len() < num_assignable;
    spill_bound(&slots, at, cg);
    if block {
        for slot in &slots {
            cg.block(slot.register);
        }
    }
    group.block_real_dependency_registers(n, cg);
    let is_done = |slot: &Slot, cg: &CodeGenerator<T>| cg.assigned_register(slot.register) == Some(target_of(slot));
    let mut rounds = 0;
    loop {
        let pending: Vec<Slot> = targeted.iter().filter(|&s| !is_done(s, cg)).copied().collect();
        let Some(&first) = pending.first() else { break };
        rounds += 1;
        assert!(rounds <= targeted.len() + 1, "{:?}: {} {:?} dependencies are stuck", at, pending.len(), kind);
        let mut map = RegisterDependencyMap::<T>::new(group.dependencies(), n);
        for slot in &targeted {
            map.add_dependency_of(slot.index, cg);
        }
        if let Some(&head) = pending.iter().find(|s| cg.machine().is_free(target_of(s))) {
            // Follow the chain of freed registers.
            let mut next = Some(head);
            while let Some(slot) = next {
                let old = cg.assigned_register(slot.register);
                cg.coerce_register_assignment(at, slot.register, target_of(&slot));
                next = old
                    .and_then(|r| map.find_target_index(r))
                    .and_then(|i| pending.iter().find(|s| s.index == i).copied())
                    .filter(|s| !is_done(s, cg));
            }
            continue;
        }
        // Follow the occupants.
        let mut chain = vec![first];
        let head = loop {
            let reg = target_of(&chain[chain.len() - 1]);
            match map.find_source_assigned_index(reg) {
                Some(i) if chain.iter().any(|s| s.index == i) => break None,
                Some(i) => match targeted.iter().find(|s| s.index == i) {
                    Some(&s) => chain.push(s),
                    None => break Some(reg),
                },
                None => break Some(reg),
            }
        };
        if let Some(reg) = head {
            if let Some(occupant) = cg.machine().occupant(reg) {
                evict(at, occupant, block, cg);
            }
            for slot in chain.iter().rev() {
                cg.coerce_register_assignment(at, slot.register, target_of(slot));
            }
        } else {
            // A cycle. Each exchange puts one register in place.
            for slot in &chain {
                if !is_done(slot, cg) {
                    cg.coerce_register_assignment(at, slot.register, target_of(slot));
                }
            }
        }
    }
    for slot in &targeted {
        cg.coerce_register_assignment(at, slot.register, target_of(slot));
    }
    let mut rebound = place_pairs(&slots, at, kind, cg);
    rebound.extend(place_wildcards(&slots, at, cg));
    finish(group, n, &slots, block, rebound, at, cg);
    log::debug!(
        "{:?}: {} {:?} dependencies satisfied with {} fixups in {} rounds",
        at, slots.len(), kind, cg.fixups().len() - before, rounds,
    );
}

//-----------------------------------------------------------------------------
