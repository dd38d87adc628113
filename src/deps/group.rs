use super::{RegisterDependency, DepFlags};
use crate::codegen::{CodeGenerator, InstructionId, VirtualRegister};
use crate::target::{Target, RegisterKind, Binding};

/**
 * A fixed number of [`RegisterDependency`] slots, allocated once.
 *
 * Most methods take `n`, the number of leading slots to consider, which is
 * usually the number filled so far. Indices at or beyond the capacity panic.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGroup(Box<[RegisterDependency]>);

impl DependencyGroup {
    /** Allocates `n` empty slots. */
    pub fn new(n: usize) -> Self {
        DependencyGroup(vec![RegisterDependency::default(); n].into_boxed_slice())
    }

    /** Reallocates with `n` slots, keeping the first `keep`. */
    pub(super) fn resized(&self, n: usize, keep: usize) -> Self {
        let mut ret = Self::new(n);
        ret.0[..keep].copy_from_slice(&self.0[..keep]);
        ret
    }

    pub fn capacity(&self) -> usize { self.0.len() }

    pub fn dependencies(&self) -> &[RegisterDependency] { &self.0 }

    pub fn dependencies_mut(&mut self) -> &mut [RegisterDependency] { &mut self.0 }

    pub fn dependency(&self, index: usize) -> &RegisterDependency { &self.0[index] }

    pub fn dependency_mut(&mut self, index: usize) -> &mut RegisterDependency { &mut self.0[index] }

    pub fn set_dependency_info(&mut self, index: usize, vr: Option<VirtualRegister>, binding: Binding, flags: DepFlags) {
        let dep = &mut self.0[index];
        dep.set_register(vr);
        dep.set_binding(binding);
        dep.assign_flags(flags);
    }

    pub fn clear_dependency_info(&mut self, index: usize) {
        self.0[index].clear();
    }

    /** The first `n` slots that have a register. */
    fn filled(&self, n: usize) -> impl Iterator<Item=(usize, &RegisterDependency, VirtualRegister)> {
        self.0[..n].iter().enumerate().filter_map(|(i, dep)| Some((i, dep, dep.register()?)))
    }

    pub fn contains_virtual_register(&self, vr: VirtualRegister, n: usize) -> bool {
        self.filled(n).any(|(_, _, r)| r == vr)
    }

    /** The register of the first dependency bound to `binding`. */
    pub fn search_for_register(&self, binding: Binding, n: usize) -> Option<VirtualRegister> {
        self.filled(n).find(|(_, dep, _)| dep.binding() == binding).map(|(_, _, r)| r)
    }

    /**
     * Returns `vr` if a dependency on it has any of `flags`. For example,
     * [`DepFlags::REFERENCES`] ignores dependencies that only define `vr`.
     */
    pub fn search_for_register_with_flags(&self, vr: VirtualRegister, flags: DepFlags, n: usize) -> Option<VirtualRegister> {
        self.search_for_register_pos(vr, flags, n).map(|_| vr)
    }

    /** Like [`Self::search_for_register()`], considering only dependencies with any of `flags`. */
    pub fn search_for_binding_with_flags(&self, binding: Binding, flags: DepFlags, n: usize) -> Option<VirtualRegister> {
        self.filled(n)
            .find(|(_, dep, _)| dep.binding() == binding && dep.flags().intersects(flags))
            .map(|(_, _, r)| r)
    }

    /** The index of the first dependency on `vr` with any of `flags`. */
    pub fn search_for_register_pos(&self, vr: VirtualRegister, flags: DepFlags, n: usize) -> Option<usize> {
        self.filled(n)
            .find(|(_, dep, r)| *r == vr && dep.flags().intersects(flags))
            .map(|(i, _, _)| i)
    }

    /** The first dependency on `vr`. */
    pub fn find_dependency(&mut self, vr: VirtualRegister, n: usize) -> Option<&mut RegisterDependency> {
        self.0[..n].iter_mut().find(|dep| dep.register() == Some(vr))
    }

    /** The first filled dependency bound to `binding`. */
    pub fn find_dependency_for(&mut self, binding: Binding, n: usize) -> Option<&mut RegisterDependency> {
        self.0[..n].iter_mut().find(|dep| dep.register().is_some() && dep.binding() == binding)
    }

    /** Rebinds slot `index`, e.g. once a wildcard has been resolved. */
    pub fn set_real_register_for_dependency(&mut self, index: usize, binding: Binding) {
        self.0[index].set_binding(binding);
    }

    /** Flags the first dependency on `vr` as [`DepFlags::EXCLUDE_GPR0`]. */
    pub fn set_exclude_gpr0(&mut self, vr: VirtualRegister, n: usize) {
        if let Some(dep) = self.find_dependency(vr, n) {
            dep.set_exclude_gpr0();
        }
    }

    pub fn block_registers<T: Target>(&self, n: usize, cg: &mut CodeGenerator<T>) {
        for (_, _, vr) in self.filled(n) {
            cg.block(vr);
        }
    }

    pub fn unblock_registers<T: Target>(&self, n: usize, cg: &mut CodeGenerator<T>) {
        for (_, _, vr) in self.filled(n) {
            cg.unblock(vr);
        }
    }

    /** Blocks the real registers named by the first `n` dependencies. */
    pub fn block_real_dependency_registers<T: Target>(&self, n: usize, cg: &mut CodeGenerator<T>) {
        for (_, dep, _) in self.filled(n) {
            if let Binding::Real(r) = dep.binding() {
                cg.machine_mut().block(r);
            }
        }
    }

    pub fn unblock_real_dependency_registers<T: Target>(&self, n: usize, cg: &mut CodeGenerator<T>) {
        for (_, dep, _) in self.filled(n) {
            if let Binding::Real(r) = dep.binding() {
                cg.machine_mut().unblock(r);
            }
        }
    }

    /** Counts off one use of each register of `kind`, without assigning anything. */
    pub fn dec_future_use_counts<T: Target>(&self, n: usize, at: InstructionId, kind: RegisterKind, cg: &mut CodeGenerator<T>) {
        for (_, _, vr) in self.filled(n) {
            if cg.kind(vr) == kind {
                cg.dec_future_use_count_and_unlatch(at, vr);
            }
        }
    }

    /**
     * Stops using every register of the first `n` dependencies, except
     * those in `keep`, typically the registers holding results.
     */
    pub fn stop_using_dep_regs<T: Target>(&self, n: usize, keep: &[VirtualRegister], cg: &mut CodeGenerator<T>) {
        for (_, _, vr) in self.filled(n) {
            if !keep.contains(&vr) {
                cg.stop_using_register(vr);
            }
        }
    }
}

//-----------------------------------------------------------------------------
