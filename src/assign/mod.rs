//! The algorithms that satisfy a [`DependencyGroup`] by moving values
//! between real registers. Each [`Target`] picks one.
//!
//! Both algorithms share the same outline. Dependencies bound to
//! [`Binding::Spilled`] are sent to their spill slots. Those bound to a
//! specific register are coerced into it. Halves of register pairs are put
//! in a pair, then wildcards are given the best free register. Both are
//! rebound to the register they got. Finally one use of each register is
//! counted off.

use crate::codegen::{CodeGenerator, InstructionId, VirtualRegister};
use crate::deps::{DependencyGroup, RegisterDependency, RegisterDependencyMap};
use crate::target::{Target, RegisterKind, RealRegister, Binding};

mod coercing;
pub use coercing::{coercing};

mod chained;
pub use chained::{chained};

/** A filled dependency on a register of the kind being assigned. */
#[derive(Debug, Copy, Clone)]
struct Slot {
    index: usize,
    register: VirtualRegister,
    dep: RegisterDependency,
}

/** The first `n` dependencies of `group` on registers of `kind`. */
fn slots<T: Target>(group: &DependencyGroup, n: usize, kind: RegisterKind, cg: &CodeGenerator<T>) -> Vec<Slot> {
    group.dependencies()[..n].iter().enumerate().filter_map(|(index, &dep)| {
        let register = dep.register()?;
        if cg.kind(register) != kind { return None; }
        Some(Slot {index, register, dep})
    }).collect()
}

/**
 * Checks that the dependencies in `slots` agree about where things go: no
 * real register is the target of two different virtual registers, and no
 * virtual register is bound to two different real registers.
 *
 * The [`RegisterDependencyMap`] is built only for this check.
 */
fn check_targets<T: Target>(group: &DependencyGroup, n: usize, slots: &[Slot]) {
    let mut map = RegisterDependencyMap::<T>::new(group.dependencies(), n);
    for (i, slot) in slots.iter().enumerate() {
        let Some(reg) = slot.dep.binding().real() else { continue };
        map.add_dependency(slot.index, None);
        for other in &slots[..i] {
            if other.register != slot.register { continue; }
            if let Some(other_reg) = other.dep.binding().real() {
                assert_eq!(
                    other_reg, reg,
                    "{:?} must be in both {} and {}",
                    slot.register, T::register_name(other_reg), T::register_name(reg),
                );
            }
        }
    }
}

/**
 * Sends the registers of dependencies bound to [`Binding::Spilled`] to their
 * spill slots. Such a register must have been spilled before.
 * Does nothing if out-of-line code is disabled.
 */
fn spill_bound<T: Target>(slots: &[Slot], at: InstructionId, cg: &mut CodeGenerator<T>) {
    if cg.options().disable_ool { return; }
    for slot in slots.iter().filter(|s| s.dep.binding().is_spilled()) {
        let vr = slot.register;
        assert!(cg.backing_store(vr).is_some(), "{:?} is bound to its spill slot but has none", vr);
        if cg.assigned_register(vr).is_some() {
            cg.spill_register(at, vr);
        }
        cg.add_spilled_register(vr);
    }
}

/**
 * Gives each wildcard dependency in `slots` a register, and returns them.
 * Those excluding the zero register go first, so that they are not left
 * with only the zero register.
 */
fn place_wildcards<T: Target>(slots: &[Slot], at: InstructionId, cg: &mut CodeGenerator<T>) -> Vec<(usize, Binding)> {
    let wildcards = slots.iter().filter(|s| s.dep.binding().is_any());
    let (excluding, others): (Vec<&Slot>, Vec<&Slot>) = wildcards.partition(|s| s.dep.exclude_gpr0());
    excluding.into_iter().chain(others).map(|slot| {
        let reg = cg.assign_one_register(at, slot.register, slot.dep.exclude_gpr0());
        (slot.index, reg.into())
    }).collect()
}

/**
 * The entry of [`Target::REGISTER_PAIRS`] of `kind` that is cheapest for
 * `halves`, the even and the odd half. A register already holding its half
 * costs nothing, a free one costs a move, and an occupied one costs an
 * eviction as well. Blocked registers are never chosen.
 */
fn best_pair<T: Target>(halves: [Option<Slot>; 2], kind: RegisterKind, cg: &CodeGenerator<T>) -> (RealRegister, RealRegister) {
    let cost = |half: Option<Slot>, reg: RealRegister| -> Option<u32> {
        let Some(slot) = half else { return Some(0) };
        if cg.machine().is_blocked(reg) { return None; }
        let exclude_zero = slot.dep.exclude_gpr0() || cg.interferes_with_zero(slot.register);
        if exclude_zero && Some(reg) == T::ZERO_REGISTER { return None; }
        if cg.assigned_register(slot.register) == Some(reg) { return Some(0); }
        Some(if cg.machine().is_free(reg) { 1 } else { 2 })
    };
    let best = T::REGISTER_PAIRS.iter().copied()
        .filter(|&(even, _)| T::kind_of(even) == kind)
        .filter_map(|(even, odd)| Some(((even, odd), cost(halves[0], even)? + cost(halves[1], odd)?)))
        .min_by_key(|&(_, c)| c);
    match best {
        Some((pair, _)) => pair,
        None => panic!("{}: no {:?} register pair is available", T::NAME, kind),
    }
}

/**
 * Puts each dependency bound to [`Binding::EvenOfPair`] or
 * [`Binding::OddOfPair`] in a register of a [`Target::REGISTER_PAIRS`]
 * entry, and returns them. The `k`th even half and the `k`th odd half share
 * a pair. A half with no partner still gets a register that could start or
 * end a pair.
 *
 * The chosen registers stay blocked until [`finish()`].
 */
fn place_pairs<T: Target>(slots: &[Slot], at: InstructionId, kind: RegisterKind, cg: &mut CodeGenerator<T>) -> Vec<(usize, Binding)> {
    let evens: Vec<Slot> = slots.iter().filter(|s| s.dep.binding() == Binding::EvenOfPair).copied().collect();
    let odds: Vec<Slot> = slots.iter().filter(|s| s.dep.binding() == Binding::OddOfPair).copied().collect();
    let mut placed = Vec::new();
    for k in 0..evens.len().max(odds.len()) {
        let halves = [evens.get(k).copied(), odds.get(k).copied()];
        let (even, odd) = best_pair(halves, kind, cg);
        let wanted: Vec<(Slot, RealRegister)> = halves.iter().zip([even, odd])
            .filter_map(|(&half, reg)| Some((half?, reg)))
            .collect();
        for &(_, reg) in &wanted {
            cg.machine_mut().block(reg);
        }
        for (slot, reg) in wanted {
            cg.coerce_register_assignment(at, slot.register, reg);
            placed.push((slot.index, reg.into()));
        }
    }
    if !placed.is_empty() {
        log::debug!("{:?}: {} register pair halves placed", at, placed.len());
    }
    placed
}

/**
 * Undoes the blocking, records the register pair and wildcard choices, and
 * counts off one use of each register. `blocked` says whether the
 * registers of `slots` were blocked.
 */
fn finish<T: Target>(
    group: &mut DependencyGroup,
    n: usize,
    slots: &[Slot],
    blocked: bool,
    rebound: Vec<(usize, Binding)>,
    at: InstructionId,
    cg: &mut CodeGenerator<T>,
) {
    if blocked {
        for slot in slots {
            cg.unblock(slot.register);
        }
    }
    group.unblock_real_dependency_registers(n, cg);
    for &(index, binding) in &rebound {
        if group.dependency(index).binding().is_pair_half() {
            if let Some(reg) = binding.real() { cg.machine_mut().unblock(reg); }
        }
    }
    for (index, binding) in rebound {
        group.set_real_register_for_dependency(index, binding);
    }
    for slot in slots {
        cg.dec_future_use_count_and_unlatch(at, slot.register);
    }
}

//-----------------------------------------------------------------------------
