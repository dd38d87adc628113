use super::{RegisterDependency, DepFlags, DependencyGroup};
use crate::codegen::{CodeGenerator, Instruction, InstructionId, VirtualRegister, GlueNode};
use crate::target::{Target, RealRegister, RegisterKind, Binding};

/**
 * One half of a [`DependencyConditions`]: a [`DependencyGroup`], the number
 * of dependencies declared for it, and the number added so far.
 */
#[derive(Debug, Clone, Default)]
struct Half {
    group: DependencyGroup,
    num: usize,
    cursor: usize,
}

impl Half {
    fn new(num: usize) -> Self {
        Half {group: DependencyGroup::new(num), num, cursor: 0}
    }

    fn filled(&self) -> &[RegisterDependency] { &self.group.dependencies()[..self.cursor] }

    fn registers(&self) -> impl Iterator<Item=VirtualRegister> + '_ {
        self.filled().iter().filter_map(|dep| dep.register())
    }

    fn add(&mut self, vr: VirtualRegister, binding: Binding, flags: DepFlags) {
        assert!(
            self.cursor < self.num && self.cursor < self.group.capacity(),
            "too many dependencies: {} declared", self.num,
        );
        self.group.set_dependency_info(self.cursor, Some(vr), binding, flags);
        self.cursor += 1;
    }

    fn set_num(&mut self, num: usize) {
        assert!(num >= self.cursor, "{} dependencies already added", self.cursor);
        if num > self.group.capacity() {
            self.group = self.group.resized(num, self.cursor);
        }
        self.num = num;
    }

    /** A dependency was combined with an existing one, so one fewer slot is needed. */
    fn merged(&mut self) {
        assert!(self.num > self.cursor, "{} dependencies declared but {} added", self.num, self.cursor);
        self.num -= 1;
    }

    /**
     * Adds a dependency, unless it is on the environment register and one
     * already exists. A dependency of the code generator's environment
     * register there gives way to any other.
     */
    fn add_or_displace<T: Target>(&mut self, vr: VirtualRegister, binding: Binding, flags: DepFlags, cg: &CodeGenerator<T>) {
        if let (Some(env), Some(env_real)) = (cg.environment_register(), T::ENVIRONMENT_REGISTER) {
            if binding == Binding::Real(env_real) {
                let cursor = self.cursor;
                if let Some(dep) = self.group.find_dependency_for(binding, cursor) {
                    if dep.register() == Some(env) {
                        *dep = RegisterDependency::new(vr, binding, flags);
                    } else {
                        assert_eq!(vr, env, "conflicting {} dependencies", T::register_name(env_real));
                    }
                    self.merged();
                    return;
                }
            }
        }
        self.add(vr, binding, flags);
    }

    /**
     * Adds a dependency, or strengthens an existing one on the same `vr`.
     * A specific register is stronger than [`Binding::Any`]. Two different
     * specific registers are both kept.
     */
    fn union<T: Target>(&mut self, vr: VirtualRegister, binding: Binding, flags: DepFlags, cg: &CodeGenerator<T>) {
        let cursor = self.cursor;
        let existing = self.group.dependencies_mut()[..cursor].iter_mut().find(|dep| {
            dep.register() == Some(vr) &&
            (binding.is_any() || dep.binding().is_any() || dep.binding() == binding)
        });
        if let Some(dep) = existing {
            if !binding.is_any() { dep.set_binding(binding); }
            dep.assign_flags(dep.flags() | flags);
            self.merged();
            return;
        }
        self.add_or_displace(vr, binding, flags, cg);
    }

    /**
     * Whether a dependency on `vr` with any of `flags` is bound to `binding`.
     * [`Binding::Any`] matches every binding. With `overwrite_any`, a
     * dependency bound to [`Binding::Any`] is rebound to `binding` and
     * counts as a match.
     */
    fn exists(&mut self, vr: VirtualRegister, binding: Binding, flags: DepFlags, overwrite_any: bool) -> bool {
        let cursor = self.cursor;
        for dep in &mut self.group.dependencies_mut()[..cursor] {
            if dep.register() != Some(vr) || !dep.flags().intersects(flags) { continue; }
            if dep.binding() == binding || binding.is_any() { return true; }
            if overwrite_any && dep.binding().is_any() {
                dep.set_binding(binding);
                return true;
            }
        }
        false
    }

    /**
     * Copies the filled dependencies of `self` then `added` into a new
     * `Half`. Wildcard dependencies of `self` on registers that `added`
     * also depends on are dropped.
     */
    fn cloned(&self, added: Option<&Half>) -> Self {
        let added_deps = added.map_or(&[][..], Half::filled);
        let mut ret = Half::new(self.cursor + added_deps.len());
        for dep in self.filled() {
            let Some(vr) = dep.register() else { continue };
            if dep.binding().is_any() && added.map_or(false, |a| a.registers().any(|r| r == vr)) { continue; }
            ret.add(vr, dep.binding(), dep.flags());
        }
        for dep in added_deps {
            if let Some(vr) = dep.register() {
                ret.add(vr, dep.binding(), dep.flags());
            }
        }
        ret
    }
}

//-----------------------------------------------------------------------------

/**
 * The register dependencies of an instruction: where virtual registers must
 * be just before it (the pre-conditions) and just after it (the
 * post-conditions).
 *
 * Each half is declared with a number of dependencies, and filled in order.
 * Adding more than were declared panics.
 */
#[derive(Debug, Clone, Default)]
pub struct DependencyConditions {
    pre: Half,
    post: Half,
    is_used: bool,
    is_hint: bool,
}

impl DependencyConditions {
    /** No dependencies. Use [`Self::set_num_pre_conditions()`] etc. to grow. */
    pub fn new() -> Self { Self::default() }

    pub fn with_capacity(num_pre: usize, num_post: usize) -> Self {
        DependencyConditions {pre: Half::new(num_pre), post: Half::new(num_post), is_used: false, is_hint: false}
    }

    /**
     * The dependencies implied by the register glue of `node`, holding each
     * child's register in its global register both before and after. Room is
     * left for `extra` more dependencies in each half.
     *
     * Children whose register is already associated with their global
     * register are added first. If a later child's register has already been
     * added, it is copied into a fresh register by an instruction appended to
     * `cursor`, and the copy is used instead.
     */
    pub fn from_glue<T: Target>(
        cg: &mut CodeGenerator<T>,
        node: &GlueNode,
        extra: usize,
        cursor: &mut Vec<Instruction>,
    ) -> Self {
        let num_pairs = node.children.iter().filter(|c| c.high_global.is_some()).count();
        let total = node.children.len() + num_pairs + extra;
        let mut ret = Self::with_capacity(total, total);
        // Split each child into (register, global register) halves.
        let halves: Vec<[Option<(VirtualRegister, RealRegister)>; 2]> = node.children.iter().map(|child| {
            match child.high_global {
                None => [Some((child.register, child.global)), None],
                Some(high_global) => {
                    let Some((low, high)) = cg.register_pair(child.register) else {
                        panic!("{:?} has a high global register but is not a pair", child.register)
                    };
                    [Some((low, child.global)), Some((high, high_global))]
                },
            }
        }).collect();
        let associated = |cg: &CodeGenerator<T>, h: &[Option<(VirtualRegister, RealRegister)>; 2]| {
            h.iter().flatten().all(|&(vr, r)| cg.association(vr) == Some(r))
        };
        let mut seen: Vec<VirtualRegister> = Vec::new();
        for h in &halves {
            if !associated(cg, h) { continue; }
            for &(vr, r) in h.iter().flatten() {
                assert!(!seen.contains(&vr), "{:?} is glued to two registers", vr);
                ret.add_pre_condition(vr, r.into(), DepFlags::USES);
                ret.add_post_condition(vr, r.into(), DepFlags::USES);
                seen.push(vr);
            }
        }
        for h in &halves {
            if associated(cg, h) { continue; }
            for &(vr, r) in h.iter().flatten() {
                if seen.contains(&vr) {
                    let copy = cg.allocate_register(cg.kind(vr));
                    cg.append(cursor, Instruction::copy(copy, vr));
                    ret.add_pre_condition(copy, r.into(), DepFlags::USES);
                    ret.add_post_condition(copy, r.into(), DepFlags::USES);
                    cg.stop_using_register(copy);
                } else {
                    ret.add_pre_condition(vr, r.into(), DepFlags::USES);
                    ret.add_post_condition(vr, r.into(), DepFlags::USES);
                    seen.push(vr);
                }
            }
        }
        ret
    }

    /**
     * Concatenates `a` and `b`, leaving out dependencies that are already
     * present. A wildcard dependency is strengthened by a later specific one.
     */
    pub fn merge(a: &Self, b: &Self) -> Self {
        let mut ret = Self::with_capacity(a.pre.cursor + b.pre.cursor, a.post.cursor + b.post.cursor);
        for (half, from) in [(&mut ret.pre, [&a.pre, &b.pre]), (&mut ret.post, [&a.post, &b.post])] {
            for dep in from.iter().flat_map(|h| h.filled()) {
                let Some(vr) = dep.register() else { continue };
                if half.exists(vr, dep.binding(), dep.flags(), true) {
                    half.merged();
                } else {
                    half.add(vr, dep.binding(), dep.flags());
                }
            }
        }
        ret
    }

    pub fn pre_conditions(&self) -> &DependencyGroup { &self.pre.group }

    pub fn post_conditions(&self) -> &DependencyGroup { &self.post.group }

    pub fn pre_conditions_mut(&mut self) -> &mut DependencyGroup { &mut self.pre.group }

    pub fn post_conditions_mut(&mut self) -> &mut DependencyGroup { &mut self.post.group }

    pub fn num_pre_conditions(&self) -> usize { self.pre.num }

    pub fn num_post_conditions(&self) -> usize { self.post.num }

    pub fn add_cursor_for_pre(&self) -> usize { self.pre.cursor }

    pub fn add_cursor_for_post(&self) -> usize { self.post.cursor }

    /** Changes the declared number of pre-conditions, reallocating if necessary. */
    pub fn set_num_pre_conditions(&mut self, n: usize) { self.pre.set_num(n); }

    /** Changes the declared number of post-conditions, reallocating if necessary. */
    pub fn set_num_post_conditions(&mut self, n: usize) { self.post.set_num(n); }

    /** Declares exactly the dependencies added so far. */
    pub fn stop_adding_conditions(&mut self) {
        self.pre.num = self.pre.cursor;
        self.post.num = self.post.cursor;
    }

    fn check_unused(&self) {
        assert!(!self.is_used, "dependencies have already been assigned; add to a clone instead");
    }

    pub fn add_pre_condition(&mut self, vr: VirtualRegister, binding: Binding, flags: DepFlags) {
        self.check_unused();
        self.pre.add(vr, binding, flags);
    }

    pub fn add_post_condition(&mut self, vr: VirtualRegister, binding: Binding, flags: DepFlags) {
        self.check_unused();
        self.post.add(vr, binding, flags);
    }

    /**
     * Like [`Self::add_pre_condition()`], except that a dependency of the
     * environment register on [`Target::ENVIRONMENT_REGISTER`] is replaced
     * rather than added to. The declared number is reduced by one if so.
     */
    pub fn add_pre_condition_or_displace<T: Target>(&mut self, vr: VirtualRegister, binding: Binding, flags: DepFlags, cg: &CodeGenerator<T>) {
        self.check_unused();
        self.pre.add_or_displace(vr, binding, flags, cg);
    }

    pub fn add_post_condition_or_displace<T: Target>(&mut self, vr: VirtualRegister, binding: Binding, flags: DepFlags, cg: &CodeGenerator<T>) {
        self.check_unused();
        self.post.add_or_displace(vr, binding, flags, cg);
    }

    /**
     * Adds a pre-condition, or combines it with an existing one on `vr`. A
     * combination uses no slot, and reduces the declared number by one.
     */
    pub fn union_pre_condition<T: Target>(&mut self, vr: VirtualRegister, binding: Binding, flags: DepFlags, cg: &CodeGenerator<T>) {
        self.check_unused();
        self.pre.union(vr, binding, flags, cg);
    }

    pub fn union_post_condition<T: Target>(&mut self, vr: VirtualRegister, binding: Binding, flags: DepFlags, cg: &CodeGenerator<T>) {
        self.check_unused();
        self.post.union(vr, binding, flags, cg);
    }

    /** Ensures `vr` has a post-condition, adding a wildcard one if needed. */
    pub fn union_no_reg_post_condition<T: Target>(&mut self, vr: VirtualRegister, cg: &CodeGenerator<T>) {
        self.union_post_condition(vr, Binding::Any, DepFlags::USES, cg);
    }

    /** Adds a pre-condition unless a matching one exists. Returns `true` if added. */
    pub fn add_pre_condition_if_not_already_inserted(&mut self, vr: VirtualRegister, binding: Binding, flags: DepFlags) -> bool {
        if self.does_pre_condition_exist(vr, binding, flags, false) { return false; }
        self.add_pre_condition(vr, binding, flags);
        true
    }

    pub fn add_post_condition_if_not_already_inserted(&mut self, vr: VirtualRegister, binding: Binding, flags: DepFlags) -> bool {
        if self.does_post_condition_exist(vr, binding, flags, false) { return false; }
        self.add_post_condition(vr, binding, flags);
        true
    }

    /**
     * Whether a pre-condition on `vr` sharing any of `flags` is bound to
     * `binding`, or `binding` is [`Binding::Any`]. With `overwrite_any`, a
     * wildcard pre-condition on `vr` is rebound to `binding` and matches.
     */
    pub fn does_pre_condition_exist(&mut self, vr: VirtualRegister, binding: Binding, flags: DepFlags, overwrite_any: bool) -> bool {
        self.pre.exists(vr, binding, flags, overwrite_any)
    }

    pub fn does_post_condition_exist(&mut self, vr: VirtualRegister, binding: Binding, flags: DepFlags, overwrite_any: bool) -> bool {
        self.post.exists(vr, binding, flags, overwrite_any)
    }

    /**
     * A deep copy of the dependencies, followed by those of `added`.
     * The virtual registers are shared, not copied. Either half can be left
     * out, which leaves it with no dependencies.
     */
    pub fn clone_with(&self, added: Option<&Self>, omit_pre: bool, omit_post: bool) -> Self {
        DependencyConditions {
            pre: if omit_pre { Half::default() } else { self.pre.cloned(added.map(|a| &a.pre)) },
            post: if omit_post { Half::default() } else { self.post.cloned(added.map(|a| &a.post)) },
            is_used: false,
            is_hint: false,
        }
    }

    /** The pre-conditions only. */
    pub fn clone_pre(&self, added: Option<&Self>) -> Self { self.clone_with(added, false, true) }

    /** The post-conditions only. */
    pub fn clone_post(&self, added: Option<&Self>) -> Self { self.clone_with(added, true, false) }

    /** The post-conditions followed by those of `added`, with no pre-conditions. */
    pub fn clone_and_fix(&self, added: Option<&Self>) -> Self {
        let added_deps = added.map_or(&[][..], |a| a.post.filled());
        let mut post = Half::new(self.post.cursor + added_deps.len());
        for dep in self.post.filled().iter().chain(added_deps) {
            if let Some(vr) = dep.register() {
                post.add(vr, dep.binding(), dep.flags());
            }
        }
        DependencyConditions {pre: Half::default(), post, is_used: false, is_hint: false}
    }

    pub fn search_pre_condition_register(&self, binding: Binding) -> Option<VirtualRegister> {
        self.pre.group.search_for_register(binding, self.pre.cursor)
    }

    pub fn search_post_condition_register(&self, binding: Binding) -> Option<VirtualRegister> {
        self.post.group.search_for_register(binding, self.post.cursor)
    }

    pub fn pre_condition_contains_virtual(&self, vr: VirtualRegister) -> bool {
        self.pre.group.contains_virtual_register(vr, self.pre.cursor)
    }

    pub fn post_condition_contains_virtual(&self, vr: VirtualRegister) -> bool {
        self.post.group.contains_virtual_register(vr, self.post.cursor)
    }

    /** The register of pre-condition `index`. */
    pub fn source_register(&self, index: usize) -> Option<VirtualRegister> {
        self.pre.group.dependency(index).register()
    }

    /** The register of post-condition `index`. */
    pub fn target_register(&self, index: usize) -> Option<VirtualRegister> {
        self.post.group.dependency(index).register()
    }

    fn all(&self) -> impl Iterator<Item=&RegisterDependency> {
        self.pre.filled().iter().chain(self.post.filled())
    }

    /** Whether any dependency on `vr` reads it. */
    pub fn refs_register(&self, vr: VirtualRegister) -> bool {
        self.all().any(|dep| dep.register() == Some(vr) && dep.refs_register())
    }

    /** Whether any dependency on `vr` writes it. */
    pub fn defs_register(&self, vr: VirtualRegister) -> bool {
        self.all().any(|dep| dep.register() == Some(vr) && dep.defs_register())
    }

    /** Whether any dependency on `vr` reads or writes it. */
    pub fn uses_register(&self, vr: VirtualRegister) -> bool {
        self.all().any(|dep| dep.register() == Some(vr) && dep.uses_register())
    }

    /** Whether a defining dependency's register is currently held in `reg`. */
    pub fn defs_real_register<T: Target>(&self, reg: RealRegister, cg: &CodeGenerator<T>) -> bool {
        self.all().any(|dep| {
            dep.defs_register() && dep.register().and_then(|vr| cg.assigned_register(vr)) == Some(reg)
        })
    }

    pub fn set_pre_dependency_exclude_gpr0(&mut self, vr: VirtualRegister) {
        self.pre.group.set_exclude_gpr0(vr, self.pre.cursor);
    }

    pub fn set_post_dependency_exclude_gpr0(&mut self, vr: VirtualRegister) {
        self.post.group.set_exclude_gpr0(vr, self.post.cursor);
    }

    pub fn block_pre_condition_registers<T: Target>(&self, cg: &mut CodeGenerator<T>) {
        self.pre.group.block_registers(self.pre.cursor, cg);
    }

    pub fn unblock_pre_condition_registers<T: Target>(&self, cg: &mut CodeGenerator<T>) {
        self.pre.group.unblock_registers(self.pre.cursor, cg);
    }

    pub fn block_post_condition_registers<T: Target>(&self, cg: &mut CodeGenerator<T>) {
        self.post.group.block_registers(self.post.cursor, cg);
    }

    pub fn unblock_post_condition_registers<T: Target>(&self, cg: &mut CodeGenerator<T>) {
        self.post.group.unblock_registers(self.post.cursor, cg);
    }

    /** `true` once either half has been assigned. */
    pub fn is_used(&self) -> bool { self.is_used }

    pub fn is_hint(&self) -> bool { self.is_hint }

    /**
     * Marks the post-conditions as a hint: assigning them only counts off
     * one use of each register.
     */
    pub fn set_is_hint(&mut self, is_hint: bool) { self.is_hint = is_hint; }

    /** Satisfies the pre-conditions on registers of `kind`, before instruction `at`. */
    pub fn assign_pre_condition_registers<T: Target>(&mut self, at: InstructionId, kind: RegisterKind, cg: &mut CodeGenerator<T>) {
        self.is_used = true;
        if self.pre.cursor > 0 {
            T::assign_registers(&mut self.pre.group, self.pre.cursor, at, kind, cg);
        }
    }

    /** Satisfies the post-conditions on registers of `kind`, after instruction `at`. */
    pub fn assign_post_condition_registers<T: Target>(&mut self, at: InstructionId, kind: RegisterKind, cg: &mut CodeGenerator<T>) {
        self.is_used = true;
        if self.post.cursor == 0 { return; }
        if self.is_hint {
            self.post.group.dec_future_use_counts(self.post.cursor, at, kind, cg);
        } else {
            T::assign_registers(&mut self.post.group, self.post.cursor, at, kind, cg);
        }
    }

    /**
     * Counts the uses of every register, and records the global register
     * each is bound to.
     *
     * Unless generating out-of-line code, or register associations are
     * disabled, the pre-conditions also update which virtual register is
     * associated with each real register. If that displaces earlier
     * associations, the displaced ones are returned as the post-conditions
     * of a new `DependencyConditions`, for an [`Opcode::AssocRegs`].
     *
     * [`Opcode::AssocRegs`]: crate::codegen::Opcode::AssocRegs
     */
    pub fn book_keeping_register_uses<T: Target>(&self, cg: &mut CodeGenerator<T>) -> Option<Self> {
        let in_line = !cg.is_out_of_line();
        let track = in_line && cg.options().enable_register_associations;
        let mut associations = Self::with_capacity(0, self.pre.cursor);
        for (is_pre, half) in [(true, &self.pre), (false, &self.post)] {
            for dep in half.filled() {
                let Some(vr) = dep.register() else { continue };
                let real = dep.binding().real();
                if let Some(r) = real.filter(|_| is_pre && track) {
                    match cg.machine().virtual_associated_with_real(r) {
                        Some(previous) if previous != vr => {
                            associations.add_post_condition(previous, r.into(), DepFlags::USES);
                        },
                        _ => {},
                    }
                    cg.machine_mut().set_virtual_associated_with_real(r, vr);
                }
                cg.use_register(vr);
                if in_line {
                    if let Some(r) = real { cg.set_association(vr, r); }
                    if dep.exclude_gpr0() { cg.add_zero_register_interference(vr); }
                }
            }
        }
        if associations.post.cursor == 0 { return None; }
        associations.stop_adding_conditions();
        Some(associations)
    }

    /**
     * Stops using every register of every dependency, except those in
     * `keep`, typically the registers holding results.
     */
    pub fn stop_using_dep_regs<T: Target>(&self, keep: &[VirtualRegister], cg: &mut CodeGenerator<T>) {
        self.pre.group.stop_using_dep_regs(self.pre.cursor, keep, cg);
        self.post.group.stop_using_dep_regs(self.post.cursor, keep, cg);
    }
}

//-----------------------------------------------------------------------------

#[cfg(test)]
pub mod tests {
    use super::*;

    use crate::codegen::{Opcode};
    use crate::options::{Options};
    use crate::target::{power, Power, x86_64, X86_64};
    use RegisterKind::*;

    fn setup<T: Target>(target: T, n: usize) -> (CodeGenerator<T>, Vec<VirtualRegister>) {
        let mut cg = CodeGenerator::new(target, Options::default());
        let vrs = (0..n).map(|_| cg.allocate_register(GPR)).collect();
        (cg, vrs)
    }

    #[test]
    fn add_and_query() {
        let (_, vrs) = setup(Power, 2);
        let (a, b) = (vrs[0], vrs[1]);
        let mut deps = DependencyConditions::with_capacity(2, 1);
        deps.add_pre_condition(a, power::GR[3].into(), DepFlags::USES);
        deps.add_pre_condition(b, power::GR[4].into(), DepFlags::REFERENCES);
        deps.add_post_condition(a, power::GR[3].into(), DepFlags::DEFINES);
        assert_eq!(deps.num_pre_conditions(), 2);
        assert_eq!(deps.search_pre_condition_register(power::GR[3].into()), Some(a));
        assert_eq!(deps.search_post_condition_register(power::GR[4].into()), None);
        assert!(deps.refs_register(b));
        assert!(!deps.defs_register(b));
        assert!(deps.defs_register(a));
        assert!(deps.uses_register(b));
        assert_eq!(deps.source_register(1), Some(b));
        assert_eq!(deps.target_register(0), Some(a));
        assert!(deps.pre_condition_contains_virtual(b));
        assert!(!deps.post_condition_contains_virtual(b));
    }

    #[test]
    fn cursor_counts_additions() {
        let (_, vrs) = setup(Power, 5);
        let flags = [DepFlags::REFERENCES, DepFlags::DEFINES, DepFlags::USES];
        let mut deps = DependencyConditions::with_capacity(5, 0);
        for (k, &vr) in vrs.iter().enumerate() {
            let binding = if k == 2 { Binding::Any } else { power::GR[k + 3].into() };
            deps.add_pre_condition(vr, binding, flags[k % 3]);
            assert_eq!(deps.add_cursor_for_pre(), k + 1);
            assert_eq!(*deps.pre_conditions().dependency(k), RegisterDependency::new(vr, binding, flags[k % 3]));
        }
    }

    #[test]
    #[should_panic(expected = "too many dependencies")]
    fn overflow() {
        let (_, vrs) = setup(Power, 2);
        let mut deps = DependencyConditions::with_capacity(0, 1);
        deps.add_post_condition(vrs[0], Binding::Any, DepFlags::USES);
        deps.add_post_condition(vrs[1], Binding::Any, DepFlags::USES);
    }

    #[test]
    fn grow() {
        let (_, vrs) = setup(Power, 3);
        let mut deps = DependencyConditions::new();
        deps.set_num_pre_conditions(2);
        deps.add_pre_condition(vrs[0], power::GR[3].into(), DepFlags::USES);
        deps.add_pre_condition(vrs[1], power::GR[4].into(), DepFlags::USES);
        deps.set_num_pre_conditions(3);
        deps.add_pre_condition(vrs[2], power::GR[5].into(), DepFlags::USES);
        assert_eq!(deps.search_pre_condition_register(power::GR[3].into()), Some(vrs[0]));
        assert_eq!(deps.search_pre_condition_register(power::GR[5].into()), Some(vrs[2]));
        assert!(deps.pre_conditions().capacity() >= 3);
    }

    #[test]
    fn stop_adding() {
        let (_, vrs) = setup(Power, 1);
        let mut deps = DependencyConditions::with_capacity(4, 4);
        deps.add_pre_condition(vrs[0], Binding::Any, DepFlags::USES);
        deps.stop_adding_conditions();
        assert_eq!(deps.num_pre_conditions(), 1);
        assert_eq!(deps.num_post_conditions(), 0);
    }

    #[test]
    fn clone_with_added() {
        let (_, vrs) = setup(Power, 3);
        let (a, b, c) = (vrs[0], vrs[1], vrs[2]);
        let mut original = DependencyConditions::with_capacity(1, 1);
        original.add_pre_condition(a, power::GR[3].into(), DepFlags::USES);
        original.add_post_condition(b, power::GR[4].into(), DepFlags::USES);
        let mut added = DependencyConditions::with_capacity(0, 1);
        added.add_post_condition(c, power::GR[6].into(), DepFlags::USES);
        let clone = original.clone_with(Some(&added), false, false);
        assert_eq!(clone.num_post_conditions(), original.num_post_conditions() + 1);
        assert_eq!(clone.num_pre_conditions(), 1);
        assert_eq!(clone.search_post_condition_register(power::GR[6].into()), Some(c));
        assert_eq!(original.search_post_condition_register(power::GR[6].into()), None);
    }

    #[test]
    fn clones_are_independent() {
        let (_, vrs) = setup(Power, 1);
        let mut original = DependencyConditions::with_capacity(0, 1);
        original.add_post_condition(vrs[0], power::GR[3].into(), DepFlags::USES);
        let mut clone = original.clone_with(None, false, false);
        clone.post_conditions_mut().set_real_register_for_dependency(0, power::GR[9].into());
        assert_eq!(original.post_conditions().dependency(0).binding(), Binding::Real(power::GR[3]));
        original.post_conditions_mut().set_real_register_for_dependency(0, power::GR[10].into());
        assert_eq!(clone.post_conditions().dependency(0).binding(), Binding::Real(power::GR[9]));
        assert_eq!(clone.target_register(0), original.target_register(0));
    }

    #[test]
    fn clone_omission() {
        let (_, vrs) = setup(Power, 2);
        let mut deps = DependencyConditions::with_capacity(1, 1);
        deps.add_pre_condition(vrs[0], power::GR[3].into(), DepFlags::USES);
        deps.add_post_condition(vrs[1], power::GR[4].into(), DepFlags::USES);
        let pre = deps.clone_pre(None);
        assert_eq!(pre.num_post_conditions(), 0);
        assert_eq!(pre.num_pre_conditions(), 1);
        let post = deps.clone_post(None);
        assert_eq!(post.num_pre_conditions(), 0);
        assert_eq!(post.num_post_conditions(), 1);
    }

    #[test]
    fn clone_drops_superseded_wildcards() {
        let (_, vrs) = setup(Power, 2);
        let (a, b) = (vrs[0], vrs[1]);
        let mut original = DependencyConditions::with_capacity(2, 0);
        original.add_pre_condition(a, Binding::Any, DepFlags::USES);
        original.add_pre_condition(b, power::GR[3].into(), DepFlags::USES);
        let mut added = DependencyConditions::with_capacity(1, 0);
        added.add_pre_condition(a, power::GR[5].into(), DepFlags::USES);
        let clone = original.clone_pre(Some(&added));
        assert_eq!(clone.add_cursor_for_pre(), 2);
        assert_eq!(clone.source_register(0), Some(b));
        assert_eq!(clone.search_pre_condition_register(power::GR[5].into()), Some(a));
    }

    #[test]
    fn clone_and_fix() {
        let (_, vrs) = setup(Power, 3);
        let mut original = DependencyConditions::with_capacity(1, 1);
        original.add_pre_condition(vrs[0], power::GR[3].into(), DepFlags::USES);
        original.add_post_condition(vrs[1], power::GR[4].into(), DepFlags::USES);
        let mut added = DependencyConditions::with_capacity(1, 1);
        added.add_pre_condition(vrs[2], power::GR[7].into(), DepFlags::USES);
        added.add_post_condition(vrs[2], power::GR[5].into(), DepFlags::USES);
        let fixed = original.clone_and_fix(Some(&added));
        assert_eq!(fixed.num_pre_conditions(), 0);
        assert_eq!(fixed.num_post_conditions(), 2);
        assert_eq!(fixed.search_post_condition_register(power::GR[5].into()), Some(vrs[2]));
    }

    #[test]
    fn merge() {
        let (_, vrs) = setup(Power, 3);
        let (x, y, w) = (vrs[0], vrs[1], vrs[2]);
        let mut a = DependencyConditions::with_capacity(2, 1);
        a.add_pre_condition(x, power::GR[3].into(), DepFlags::USES);
        a.add_pre_condition(w, Binding::Any, DepFlags::USES);
        a.add_post_condition(x, power::GR[3].into(), DepFlags::USES);
        let mut b = DependencyConditions::with_capacity(3, 1);
        b.add_pre_condition(x, power::GR[3].into(), DepFlags::USES);
        b.add_pre_condition(y, power::GR[4].into(), DepFlags::USES);
        b.add_pre_condition(w, power::GR[8].into(), DepFlags::USES);
        b.add_post_condition(y, power::GR[4].into(), DepFlags::USES);
        let merged = DependencyConditions::merge(&a, &b);
        assert_eq!(merged.num_pre_conditions(), 3);
        assert_eq!(merged.add_cursor_for_pre(), 3);
        assert_eq!(merged.num_post_conditions(), 2);
        assert_eq!(merged.search_pre_condition_register(power::GR[8].into()), Some(w));
        assert_eq!(merged.search_pre_condition_register(power::GR[4].into()), Some(y));
    }

    #[test]
    fn insert_once() {
        let (_, vrs) = setup(Power, 1);
        let a = vrs[0];
        let mut deps = DependencyConditions::with_capacity(3, 0);
        assert!(deps.add_pre_condition_if_not_already_inserted(a, power::GR[3].into(), DepFlags::USES));
        assert!(!deps.add_pre_condition_if_not_already_inserted(a, power::GR[3].into(), DepFlags::REFERENCES));
        assert!(deps.add_pre_condition_if_not_already_inserted(a, power::GR[4].into(), DepFlags::USES));
        assert_eq!(deps.add_cursor_for_pre(), 2);
        assert!(deps.does_pre_condition_exist(a, Binding::Any, DepFlags::USES, false));
        assert!(!deps.does_pre_condition_exist(a, power::GR[5].into(), DepFlags::USES, false));
    }

    #[test]
    fn exists_overwrites_wildcard() {
        let (_, vrs) = setup(Power, 1);
        let mut deps = DependencyConditions::with_capacity(0, 1);
        deps.add_post_condition(vrs[0], Binding::Any, DepFlags::DEFINES);
        assert!(!deps.does_post_condition_exist(vrs[0], power::GR[6].into(), DepFlags::DEFINES, false));
        assert!(deps.does_post_condition_exist(vrs[0], power::GR[6].into(), DepFlags::DEFINES, true));
        assert_eq!(deps.search_post_condition_register(power::GR[6].into()), Some(vrs[0]));
    }

    #[test]
    fn union() {
        let (cg, vrs) = setup(X86_64, 2);
        let (a, b) = (vrs[0], vrs[1]);
        let mut deps = DependencyConditions::with_capacity(0, 4);
        deps.union_post_condition(a, Binding::Any, DepFlags::REFERENCES, &cg);
        deps.union_post_condition(a, x86_64::RAX.into(), DepFlags::DEFINES, &cg);
        assert_eq!(deps.add_cursor_for_post(), 1);
        assert_eq!(deps.num_post_conditions(), 3);
        assert_eq!(*deps.post_conditions().dependency(0), RegisterDependency::new(a, x86_64::RAX.into(), DepFlags::USES));
        deps.union_post_condition(b, x86_64::RDX.into(), DepFlags::DEFINES, &cg);
        deps.union_no_reg_post_condition(b, &cg);
        assert_eq!(deps.add_cursor_for_post(), 2);
        assert_eq!(deps.num_post_conditions(), 2);
        assert_eq!(deps.search_post_condition_register(x86_64::RDX.into()), Some(b));
    }

    #[test]
    fn union_keeps_both_registers() {
        let (cg, vrs) = setup(X86_64, 1);
        let mut deps = DependencyConditions::with_capacity(2, 0);
        deps.union_pre_condition(vrs[0], x86_64::RSI.into(), DepFlags::REFERENCES, &cg);
        deps.union_pre_condition(vrs[0], x86_64::RDI.into(), DepFlags::REFERENCES, &cg);
        assert_eq!(deps.add_cursor_for_pre(), 2);
    }

    #[test]
    fn environment_is_displaced() {
        let (mut cg, vrs) = setup(X86_64, 2);
        let (env, a) = (vrs[0], vrs[1]);
        cg.set_environment_register(env);
        let mut deps = DependencyConditions::with_capacity(2, 3);
        deps.add_post_condition_or_displace(env, x86_64::RBP.into(), DepFlags::USES, &cg);
        deps.add_post_condition_or_displace(a, x86_64::RBP.into(), DepFlags::DEFINES, &cg);
        assert_eq!(deps.search_post_condition_register(x86_64::RBP.into()), Some(a));
        assert_eq!(deps.add_cursor_for_post(), 1);
        assert_eq!(deps.num_post_conditions(), 2);
        // The environment itself can be added again.
        deps.add_pre_condition_or_displace(a, x86_64::RBP.into(), DepFlags::REFERENCES, &cg);
        deps.add_pre_condition_or_displace(env, x86_64::RBP.into(), DepFlags::REFERENCES, &cg);
        assert_eq!(deps.add_cursor_for_pre(), 1);
        assert_eq!(deps.search_pre_condition_register(x86_64::RBP.into()), Some(a));
    }

    #[test]
    #[should_panic(expected = "conflicting rbp dependencies")]
    fn environment_conflict() {
        let (mut cg, vrs) = setup(X86_64, 3);
        cg.set_environment_register(vrs[0]);
        let mut deps = DependencyConditions::with_capacity(2, 0);
        deps.add_pre_condition_or_displace(vrs[1], x86_64::RBP.into(), DepFlags::USES, &cg);
        deps.add_pre_condition_or_displace(vrs[2], x86_64::RBP.into(), DepFlags::USES, &cg);
    }

    #[test]
    fn stop_using_keeps_results() {
        let (mut cg, vrs) = setup(Power, 3);
        let mut deps = DependencyConditions::with_capacity(2, 1);
        deps.add_pre_condition(vrs[0], power::GR[3].into(), DepFlags::USES);
        deps.add_pre_condition(vrs[1], power::GR[4].into(), DepFlags::USES);
        deps.add_post_condition(vrs[2], power::GR[5].into(), DepFlags::DEFINES);
        deps.stop_using_dep_regs(&[vrs[1]], &mut cg);
        assert!(!cg.is_live(vrs[0]));
        assert!(cg.is_live(vrs[1]));
        assert!(!cg.is_live(vrs[2]));
    }

    #[test]
    fn exclude_gpr0_and_defs_real() {
        let (mut cg, vrs) = setup(Power, 2);
        cg.place_register(vrs[0], power::GR[3]);
        let mut deps = DependencyConditions::with_capacity(1, 1);
        deps.add_pre_condition(vrs[1], Binding::Any, DepFlags::REFERENCES);
        deps.add_post_condition(vrs[0], Binding::Any, DepFlags::DEFINES);
        deps.set_pre_dependency_exclude_gpr0(vrs[1]);
        assert!(deps.pre_conditions().dependency(0).exclude_gpr0());
        assert!(!deps.post_conditions().dependency(0).exclude_gpr0());
        deps.set_post_dependency_exclude_gpr0(vrs[0]);
        assert!(deps.post_conditions().dependency(0).exclude_gpr0());
        assert!(deps.defs_real_register(power::GR[3], &cg));
        assert!(!deps.defs_real_register(power::GR[4], &cg));
    }

    #[test]
    fn block_round_trip() {
        let (mut cg, vrs) = setup(Power, 3);
        cg.block(vrs[2]);
        let mut deps = DependencyConditions::with_capacity(2, 1);
        deps.add_pre_condition(vrs[0], power::GR[3].into(), DepFlags::USES);
        deps.add_pre_condition(vrs[1], power::GR[4].into(), DepFlags::USES);
        deps.add_post_condition(vrs[2], power::GR[4].into(), DepFlags::USES);
        deps.block_pre_condition_registers(&mut cg);
        assert!(cg.is_blocked(vrs[0]) && cg.is_blocked(vrs[1]));
        deps.unblock_pre_condition_registers(&mut cg);
        assert!(!cg.is_blocked(vrs[0]) && !cg.is_blocked(vrs[1]));
        assert!(cg.is_blocked(vrs[2]));
        deps.block_post_condition_registers(&mut cg);
        deps.unblock_post_condition_registers(&mut cg);
        assert!(cg.is_blocked(vrs[2]));
    }

    #[test]
    #[should_panic(expected = "already been assigned")]
    fn assigned_conditions_are_frozen() {
        let (mut cg, vrs) = setup(Power, 2);
        let mut deps = DependencyConditions::with_capacity(2, 0);
        deps.add_pre_condition(vrs[0], power::GR[3].into(), DepFlags::USES);
        deps.assign_pre_condition_registers(InstructionId(0), GPR, &mut cg);
        assert!(deps.is_used());
        deps.add_pre_condition(vrs[1], power::GR[4].into(), DepFlags::USES);
    }

    #[test]
    fn glue() {
        let (mut cg, vrs) = setup(X86_64, 2);
        let (a, b) = (vrs[0], vrs[1]);
        cg.set_association(a, x86_64::RBX);
        let mut node = GlueNode::new();
        node.push(b, x86_64::R12);
        node.push(a, x86_64::R13);
        node.push(a, x86_64::RBX);
        let mut list = Vec::new();
        let deps = DependencyConditions::from_glue(&mut cg, &node, 1, &mut list);
        assert_eq!(deps.num_pre_conditions(), 4);
        assert_eq!(deps.add_cursor_for_pre(), 3);
        assert_eq!(deps.add_cursor_for_post(), 3);
        // The associated child comes first.
        assert_eq!(deps.source_register(0), Some(a));
        assert_eq!(deps.search_pre_condition_register(x86_64::RBX.into()), Some(a));
        assert_eq!(deps.search_pre_condition_register(x86_64::R12.into()), Some(b));
        let Some(copy) = deps.search_post_condition_register(x86_64::R13.into()) else { panic!("no copy") };
        assert_ne!(copy, a);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].opcode, Opcode::Copy);
        assert_eq!(list[0].sources, vec![a]);
        assert_eq!(list[0].targets, vec![copy]);
        assert!(!cg.is_live(copy));
        assert_eq!(cg.total_use_count(a), 1);
    }

    #[test]
    fn glue_pairs() {
        let (mut cg, vrs) = setup(Power, 2);
        let pair = cg.allocate_register_pair(vrs[0], vrs[1]);
        let mut node = GlueNode::new();
        node.push_pair(pair, power::GR[3], power::GR[4]);
        let deps = DependencyConditions::from_glue(&mut cg, &node, 0, &mut Vec::new());
        assert_eq!(deps.num_post_conditions(), 2);
        assert_eq!(deps.search_pre_condition_register(power::GR[3].into()), Some(vrs[0]));
        assert_eq!(deps.search_post_condition_register(power::GR[4].into()), Some(vrs[1]));
    }

    fn with_pre(vr: VirtualRegister, reg: RealRegister, flags: DepFlags) -> Instruction {
        let mut deps = DependencyConditions::with_capacity(1, 0);
        deps.add_pre_condition(vr, reg.into(), flags);
        Instruction::new(Opcode::Op("call")).with_conditions(deps)
    }

    #[test]
    fn associations() {
        let (mut cg, vrs) = setup(Power, 2);
        let (a, b) = (vrs[0], vrs[1]);
        let mut list = Vec::new();
        cg.append(&mut list, with_pre(a, power::GR[3], DepFlags::USES | DepFlags::EXCLUDE_GPR0));
        assert_eq!(list.len(), 1);
        assert_eq!(cg.association(a), Some(power::GR[3]));
        assert!(cg.interferes_with_zero(a));
        assert_eq!(cg.total_use_count(a), 1);
        cg.append(&mut list, with_pre(b, power::GR[3], DepFlags::USES));
        assert_eq!(list.len(), 3);
        assert_eq!(list[1].opcode, Opcode::AssocRegs);
        let Some(assoc) = &list[1].conditions else { panic!("no associations") };
        assert_eq!(assoc.search_post_condition_register(power::GR[3].into()), Some(a));
        assert_eq!(cg.machine().virtual_associated_with_real(power::GR[3]), Some(b));
        // Out-of-line code leaves the associations alone.
        cg.set_out_of_line(true);
        cg.append(&mut list, with_pre(a, power::GR[3], DepFlags::USES));
        assert_eq!(list.len(), 4);
        assert_eq!(cg.machine().virtual_associated_with_real(power::GR[3]), Some(b));
        assert_eq!(cg.association(b), Some(power::GR[3]));
        assert_eq!(cg.total_use_count(a), 2);
    }

    #[test]
    fn associations_disabled() {
        let options = Options {enable_register_associations: false, ..Options::default()};
        let mut cg = CodeGenerator::new(Power, options);
        let a = cg.allocate_register(GPR);
        let b = cg.allocate_register(GPR);
        let mut list = Vec::new();
        cg.append(&mut list, with_pre(a, power::GR[3], DepFlags::USES));
        cg.append(&mut list, with_pre(b, power::GR[3], DepFlags::USES));
        assert_eq!(list.len(), 2);
        assert_eq!(cg.association(b), Some(power::GR[3]));
    }
}
