use super::{CodeGenerator, VirtualRegister, InstructionId, Transfer, Fixup};
use crate::util::{ArrayMap};
use crate::target::{Target, RealRegister, RegisterKind};

/** What a real register currently holds. */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegisterState {
    Free,
    Assigned(VirtualRegister),
    /** Never assigned, e.g. the stack pointer. */
    Locked,
}

/** The state of the real register file. */
#[derive(Debug, Clone)]
pub struct Machine {
    states: ArrayMap<RealRegister, RegisterState>,
    /** For each real register, the number of outstanding blocks. */
    blocked: ArrayMap<RealRegister, u32>,
    /** The virtual register most recently bound to each real register. */
    associations: ArrayMap<RealRegister, Option<VirtualRegister>>,
}

impl Machine {
    pub fn new<T: Target>() -> Self {
        let mut states = ArrayMap::new_with(T::NUM_REGISTERS, |_| RegisterState::Free);
        for &r in T::LOCKED {
            states[r] = RegisterState::Locked;
        }
        Machine {
            states,
            blocked: ArrayMap::new(T::NUM_REGISTERS),
            associations: ArrayMap::new(T::NUM_REGISTERS),
        }
    }

    pub fn state(&self, reg: RealRegister) -> RegisterState { self.states[reg] }

    pub fn is_free(&self, reg: RealRegister) -> bool { self.states[reg] == RegisterState::Free }

    /** The virtual register held in `reg`, if any. */
    pub fn occupant(&self, reg: RealRegister) -> Option<VirtualRegister> {
        if let RegisterState::Assigned(vr) = self.states[reg] { Some(vr) } else { None }
    }

    /** All real registers with their states. */
    pub fn registers(&self) -> impl Iterator<Item=(RealRegister, RegisterState)> + '_ {
        self.states.iter().map(|(i, &state)| (RealRegister::new(i as u8), state))
    }

    pub fn is_blocked(&self, reg: RealRegister) -> bool { self.blocked[reg] > 0 }

    /** Excludes `reg` from free choice until matched by [`Self::unblock()`]. */
    pub fn block(&mut self, reg: RealRegister) { self.blocked[reg] += 1; }

    pub fn unblock(&mut self, reg: RealRegister) {
        assert!(self.blocked[reg] > 0, "{:?} is not blocked", reg);
        self.blocked[reg] -= 1;
    }

    pub fn virtual_associated_with_real(&self, reg: RealRegister) -> Option<VirtualRegister> {
        self.associations[reg]
    }

    pub fn set_virtual_associated_with_real(&mut self, reg: RealRegister, vr: VirtualRegister) {
        self.associations[reg] = Some(vr);
    }
}

//-----------------------------------------------------------------------------

impl<T: Target> CodeGenerator<T> {
    /** Records `vr` in `reg`, without touching wherever `vr` was before. */
    pub(super) fn set_assignment(&mut self, vr: VirtualRegister, reg: RealRegister) {
        self.machine.states[reg] = RegisterState::Assigned(vr);
        self.info_mut(vr).assigned = Some(reg);
    }

    /** Frees the real register holding `vr`, discarding its contents. */
    pub(super) fn release_register(&mut self, vr: VirtualRegister) {
        if let Some(reg) = self.info_mut(vr).assigned.take() {
            self.machine.states[reg] = RegisterState::Free;
        }
    }

    fn record(&mut self, at: InstructionId, register: VirtualRegister, transfer: Transfer) {
        if self.options.trace_register_assignment {
            let name = T::register_name;
            match transfer {
                Transfer::Move {dest, src} =>
                    log::trace!("{:?}: move {:?} from {} to {}", at, register, name(src), name(dest)),
                Transfer::Exchange(a, b) =>
                    log::trace!("{:?}: exchange {} with {} for {:?}", at, name(a), name(b), register),
                Transfer::Spill {src, slot} =>
                    log::trace!("{:?}: spill {:?} from {} to {:?}", at, register, name(src), slot),
                Transfer::Reload {dest, slot} =>
                    log::trace!("{:?}: reload {:?} from {:?} into {}", at, register, slot, name(dest)),
            }
        }
        self.fixups.push(Fixup {at, register, transfer});
    }

    fn move_register(&mut self, at: InstructionId, vr: VirtualRegister, dest: RealRegister) {
        let Some(src) = self.assigned_register(vr) else {
            panic!("{:?} is not in a register", vr)
        };
        self.record(at, vr, Transfer::Move {dest, src});
        self.machine.states[src] = RegisterState::Free;
        self.set_assignment(vr, dest);
    }

    /** Puts the unassigned `vr` in `dest`, reloading it if it was spilled. */
    fn load_register(&mut self, at: InstructionId, vr: VirtualRegister, dest: RealRegister) {
        if let Some(slot) = self.backing_store(vr) {
            self.record(at, vr, Transfer::Reload {dest, slot});
            self.spilled.shift_remove(&vr);
        }
        self.set_assignment(vr, dest);
    }

    /** Stores `vr` to its spill slot and frees its real register. */
    pub fn spill_register(&mut self, at: InstructionId, vr: VirtualRegister) {
        let Some(src) = self.assigned_register(vr) else {
            panic!("{:?} is not in a register", vr)
        };
        let slot = self.allocate_backing_store(vr);
        self.record(at, vr, Transfer::Spill {src, slot});
        self.release_register(vr);
        self.spilled.insert(vr);
    }

    /**
     * The most preferred free register of `kind` that is not blocked.
     * If `exclude_zero` is `true`, [`Target::ZERO_REGISTER`] is not chosen.
     */
    pub fn find_best_free_register(&self, kind: RegisterKind, exclude_zero: bool) -> Option<RealRegister> {
        T::assignable(kind).iter().copied().find(|&r| {
            self.machine.is_free(r) &&
            !self.machine.is_blocked(r) &&
            !(exclude_zero && Some(r) == T::ZERO_REGISTER)
        })
    }

    /**
     * Spills the unblocked virtual register of `kind` with the fewest
     * remaining uses, and returns the register it was in.
     */
    pub fn free_best_register(&mut self, at: InstructionId, kind: RegisterKind, exclude_zero: bool) -> RealRegister {
        let best = T::assignable(kind).iter().copied().filter_map(|r| {
            let vr = self.machine.occupant(r)?;
            if self.is_blocked(vr) || self.machine.is_blocked(r) { return None; }
            if exclude_zero && Some(r) == T::ZERO_REGISTER { return None; }
            Some((r, vr))
        }).min_by_key(|&(_, vr)| self.future_use_count(vr));
        let Some((reg, vr)) = best else {
            panic!("{}: every {:?} register is blocked", T::NAME, kind)
        };
        self.spill_register(at, vr);
        reg
    }

    /**
     * Makes `target` hold `vr`. Whatever `target` held is exchanged with
     * `vr`'s current register, or else moved to a free register, or else
     * spilled.
     */
    pub fn coerce_register_assignment(&mut self, at: InstructionId, vr: VirtualRegister, target: RealRegister) {
        assert_eq!(
            T::kind_of(target), self.kind(vr),
            "cannot put {:?} in {}", vr, T::register_name(target),
        );
        let current = self.assigned_register(vr);
        if current == Some(target) { return; }
        match self.machine.state(target) {
            RegisterState::Locked => panic!("{} is locked", T::register_name(target)),
            RegisterState::Free => {},
            RegisterState::Assigned(other) => {
                if let Some(src) = current {
                    self.record(at, vr, Transfer::Exchange(src, target));
                    self.set_assignment(other, src);
                    self.set_assignment(vr, target);
                    return;
                }
                let exclude_zero = self.interferes_with_zero(other);
                match self.find_best_free_register(T::kind_of(target), exclude_zero) {
                    Some(spare) => self.move_register(at, other, spare),
                    None => self.spill_register(at, other),
                }
            },
        }
        if current.is_some() {
            self.move_register(at, vr, target);
        } else {
            self.load_register(at, vr, target);
        }
    }

    /**
     * Ensures `vr` is in some register of its kind, preferring a free one,
     * and returns that register.
     */
    pub fn assign_one_register(&mut self, at: InstructionId, vr: VirtualRegister, exclude_zero: bool) -> RealRegister {
        let exclude_zero = exclude_zero || self.interferes_with_zero(vr);
        let current = self.assigned_register(vr);
        if let Some(reg) = current {
            if !(exclude_zero && Some(reg) == T::ZERO_REGISTER) { return reg; }
        }
        let kind = self.kind(vr);
        let reg = match self.find_best_free_register(kind, exclude_zero) {
            Some(reg) => reg,
            None => self.free_best_register(at, kind, exclude_zero),
        };
        if current.is_some() {
            self.move_register(at, vr, reg);
        } else {
            self.load_register(at, vr, reg);
        }
        reg
    }

    /**
     * Counts off one use of `vr`. After its last use, its real register is
     * freed.
     */
    pub fn dec_future_use_count_and_unlatch(&mut self, at: InstructionId, vr: VirtualRegister) {
        let info = self.info_mut(vr);
        if info.future_use_count == 0 { return; }
        info.future_use_count -= 1;
        if info.future_use_count == 0 {
            if self.options.trace_register_assignment {
                log::trace!("{:?}: last use of {:?}", at, vr);
            }
            self.release_register(vr);
        }
    }

    /**
     * Checks that the real register file and the virtual register table
     * agree with each other.
     */
    pub fn check_consistency(&self) {
        for (reg, state) in self.machine.registers() {
            if let RegisterState::Assigned(vr) = state {
                assert_eq!(self.assigned_register(vr), Some(reg), "{:?} is not in {}", vr, T::register_name(reg));
            }
        }
        for (i, info) in self.registers.iter().enumerate() {
            if let Some(reg) = info.assigned {
                assert_eq!(
                    self.machine.state(reg), RegisterState::Assigned(VirtualRegister(i as u32)),
                    "{} does not hold V{}", T::register_name(reg), i,
                );
            }
        }
    }
}

//-----------------------------------------------------------------------------
