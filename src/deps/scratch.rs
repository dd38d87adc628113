use super::{RegisterDependency, DepFlags, DependencyConditions};
use crate::codegen::{CodeGenerator, VirtualRegister};
use crate::target::{Target, RealRegister, RegisterKind};

const MAX_GPR_DEPENDENCIES: usize = 32;
const MAX_CCR_DEPENDENCIES: usize = 8;

/**
 * Collects GPR and CCR dependencies without knowing in advance how many
 * there will be, then makes a [`DependencyConditions`] of exactly the right
 * size.
 */
#[derive(Debug, Clone)]
pub struct ScratchRegisterDependencies {
    gprs: [RegisterDependency; MAX_GPR_DEPENDENCIES],
    num_gprs: usize,
    /** Bit `i` is set if `gprs[i]` excludes the zero register. */
    exclude_gpr0: u32,
    ccrs: [RegisterDependency; MAX_CCR_DEPENDENCIES],
    num_ccrs: usize,
}

impl Default for ScratchRegisterDependencies {
    fn default() -> Self {
        ScratchRegisterDependencies {
            gprs: [RegisterDependency::default(); MAX_GPR_DEPENDENCIES],
            num_gprs: 0,
            exclude_gpr0: 0,
            ccrs: [RegisterDependency::default(); MAX_CCR_DEPENDENCIES],
            num_ccrs: 0,
        }
    }
}

impl ScratchRegisterDependencies {
    pub fn new() -> Self { Self::default() }

    pub fn number_of_gpr_dependencies(&self) -> usize { self.num_gprs }

    pub fn number_of_ccr_dependencies(&self) -> usize { self.num_ccrs }

    pub fn number_of_dependencies(&self) -> usize { self.num_gprs + self.num_ccrs }

    /**
     * Adds a dependency of `vr` on `reg`, which must be a GPR or a CCR.
     * If `vr` is `None`, a register is allocated and immediately released,
     * so that `reg` is merely reserved.
     */
    pub fn add_dependency<T: Target>(
        &mut self,
        cg: &mut CodeGenerator<T>,
        vr: Option<VirtualRegister>,
        reg: RealRegister,
        exclude_gpr0: bool,
        flags: DepFlags,
    ) {
        let kind = T::kind_of(reg);
        assert!(
            kind == RegisterKind::GPR || kind == RegisterKind::CCR,
            "expected a GPR or CCR, not {}", T::register_name(reg),
        );
        assert!(!exclude_gpr0 || kind == RegisterKind::GPR, "only a GPR can exclude the zero register");
        let vr = vr.unwrap_or_else(|| {
            let vr = cg.allocate_register(kind);
            cg.stop_using_register(vr);
            vr
        });
        let dep = RegisterDependency::new(vr, reg.into(), flags);
        if kind == RegisterKind::GPR {
            assert!(
                self.num_gprs < T::assignable(kind).len() && self.num_gprs < MAX_GPR_DEPENDENCIES,
                "too many GPR dependencies",
            );
            self.gprs[self.num_gprs] = dep;
            if exclude_gpr0 {
                self.exclude_gpr0 |= 1 << self.num_gprs;
            } else {
                self.exclude_gpr0 &= !(1 << self.num_gprs);
            }
            self.num_gprs += 1;
        } else {
            assert!(
                self.num_ccrs < T::assignable(kind).len() && self.num_ccrs < MAX_CCR_DEPENDENCIES,
                "too many CCR dependencies",
            );
            self.ccrs[self.num_ccrs] = dep;
            self.num_ccrs += 1;
        }
    }

    fn dependencies(&self) -> impl Iterator<Item=(RegisterDependency, bool)> + '_ {
        let gprs = self.gprs[..self.num_gprs].iter().enumerate()
            .map(move |(i, &dep)| (dep, self.exclude_gpr0 & (1 << i) != 0));
        let ccrs = self.ccrs[..self.num_ccrs].iter().map(|&dep| (dep, false));
        gprs.chain(ccrs)
    }

    /**
     * Makes a [`DependencyConditions`] holding exactly the dependencies of
     * `pre` and `post`, GPRs first.
     */
    pub fn create_dependency_conditions(pre: Option<&Self>, post: Option<&Self>) -> DependencyConditions {
        let count = |s: Option<&Self>| s.map_or(0, Self::number_of_dependencies);
        let mut ret = DependencyConditions::with_capacity(count(pre), count(post));
        for (dep, exclude_gpr0) in pre.into_iter().flat_map(|s| s.dependencies()) {
            let flags = if exclude_gpr0 { dep.flags() | DepFlags::EXCLUDE_GPR0 } else { dep.flags() };
            if let Some(vr) = dep.register() {
                ret.add_pre_condition(vr, dep.binding(), flags);
            }
        }
        for (dep, exclude_gpr0) in post.into_iter().flat_map(|s| s.dependencies()) {
            let flags = if exclude_gpr0 { dep.flags() | DepFlags::EXCLUDE_GPR0 } else { dep.flags() };
            if let Some(vr) = dep.register() {
                ret.add_post_condition(vr, dep.binding(), flags);
            }
        }
        ret
    }
}

//-----------------------------------------------------------------------------

#[derive(Debug, Copy, Clone)]
struct ManagedRegister {
    register: VirtualRegister,
    in_use: bool,
    donated: bool,
}

/**
 * Hands out scratch registers to code that needs a few temporaries, reusing
 * those that have been given back, up to a fixed number of registers.
 */
#[derive(Debug, Clone)]
pub struct ScratchRegisterManager {
    capacity: usize,
    registers: Vec<ManagedRegister>,
}

impl ScratchRegisterManager {
    pub fn new(capacity: usize) -> Self {
        ScratchRegisterManager {capacity, registers: Vec::with_capacity(capacity)}
    }

    pub fn capacity(&self) -> usize { self.capacity }

    pub fn number_of_scratch_registers(&self) -> usize { self.registers.len() }

    /** A register of `kind` not in use, allocating one if necessary. */
    pub fn find_or_create_scratch_register<T: Target>(&mut self, kind: RegisterKind, cg: &mut CodeGenerator<T>) -> VirtualRegister {
        if let Some(m) = self.registers.iter_mut().find(|m| !m.in_use && cg.kind(m.register) == kind) {
            m.in_use = true;
            return m.register;
        }
        assert!(self.registers.len() < self.capacity, "all {} scratch registers are in use", self.capacity);
        let register = cg.allocate_register(kind);
        self.registers.push(ManagedRegister {register, in_use: true, donated: false});
        register
    }

    /**
     * Offers `vr` for use as a scratch register. Its owner remains
     * responsible for it. Returns `false` if it is already managed or the
     * manager is full.
     */
    pub fn donate_scratch_register(&mut self, vr: VirtualRegister) -> bool {
        if self.registers.len() >= self.capacity || self.registers.iter().any(|m| m.register == vr) {
            return false;
        }
        self.registers.push(ManagedRegister {register: vr, in_use: false, donated: true});
        true
    }

    /** Makes `vr` available for reuse. Returns `false` if it is not managed. */
    pub fn reclaim_scratch_register(&mut self, vr: VirtualRegister) -> bool {
        match self.registers.iter_mut().find(|m| m.register == vr) {
            Some(m) => { m.in_use = false; true },
            None => false,
        }
    }

    /** Ensures every managed register has a post-condition in `deps`. */
    pub fn add_scratch_registers_to_dependency_list<T: Target>(&self, deps: &mut DependencyConditions, cg: &CodeGenerator<T>) {
        for m in &self.registers {
            deps.union_no_reg_post_condition(m.register, cg);
        }
    }

    /** Stops using every managed register, except donated ones. */
    pub fn stop_using_registers<T: Target>(&self, cg: &mut CodeGenerator<T>) {
        for m in self.registers.iter().filter(|m| !m.donated) {
            cg.stop_using_register(m.register);
        }
    }
}

//-----------------------------------------------------------------------------

#[cfg(test)]
pub mod tests {
    use super::*;

    use crate::options::{Options};
    use crate::target::{power, Power, x86_64, X86_64, Binding};
    use RegisterKind::*;

    #[test]
    fn condense() {
        let mut cg = CodeGenerator::new(Power, Options::default());
        let a = cg.allocate_register(GPR);
        let mut pre = ScratchRegisterDependencies::new();
        let mut post = ScratchRegisterDependencies::new();
        pre.add_dependency(&mut cg, Some(a), power::GR[3], true, DepFlags::REFERENCES);
        pre.add_dependency(&mut cg, None, power::CR[0], false, DepFlags::USES);
        post.add_dependency(&mut cg, Some(a), power::GR[3], false, DepFlags::DEFINES);
        post.add_dependency(&mut cg, None, power::GR[4], false, DepFlags::USES);
        post.add_dependency(&mut cg, None, power::GR[5], true, DepFlags::USES);
        assert_eq!(pre.number_of_gpr_dependencies(), 1);
        assert_eq!(pre.number_of_ccr_dependencies(), 1);
        let deps = ScratchRegisterDependencies::create_dependency_conditions(Some(&pre), Some(&post));
        assert_eq!(deps.num_pre_conditions(), 2);
        assert_eq!(deps.num_post_conditions(), 3);
        assert_eq!(deps.add_cursor_for_post(), 3);
        assert!(deps.pre_conditions().dependency(0).exclude_gpr0());
        assert_eq!(deps.pre_conditions().dependency(1).binding(), Binding::Real(power::CR[0]));
        assert!(!deps.post_conditions().dependency(1).exclude_gpr0());
        assert!(deps.post_conditions().dependency(2).exclude_gpr0());
        // Placeholders are released at once.
        let placeholder = deps.search_post_condition_register(power::GR[4].into()).unwrap();
        assert!(!cg.is_live(placeholder));
        assert_eq!(cg.kind(deps.source_register(1).unwrap()), CCR);
        assert!(cg.is_live(a));
    }

    #[test]
    fn pre_only() {
        let mut cg = CodeGenerator::new(Power, Options::default());
        let mut pre = ScratchRegisterDependencies::new();
        pre.add_dependency(&mut cg, None, power::GR[11], false, DepFlags::USES);
        let deps = ScratchRegisterDependencies::create_dependency_conditions(Some(&pre), None);
        assert_eq!(deps.num_pre_conditions(), 1);
        assert_eq!(deps.num_post_conditions(), 0);
    }

    #[test]
    #[should_panic(expected = "too many CCR dependencies")]
    fn too_many_ccrs() {
        let mut cg = CodeGenerator::new(Power, Options::default());
        let mut deps = ScratchRegisterDependencies::new();
        for _ in 0..9 {
            deps.add_dependency(&mut cg, None, power::CR[1], false, DepFlags::USES);
        }
    }

    #[test]
    #[should_panic(expected = "expected a GPR or CCR")]
    fn not_gpr_or_ccr() {
        let mut cg = CodeGenerator::new(Power, Options::default());
        let mut deps = ScratchRegisterDependencies::new();
        deps.add_dependency(&mut cg, None, power::FP[1], false, DepFlags::USES);
    }

    #[test]
    fn manager_reuses() {
        let mut cg = CodeGenerator::new(X86_64, Options::default());
        let mut srm = ScratchRegisterManager::new(3);
        let a = srm.find_or_create_scratch_register(GPR, &mut cg);
        let b = srm.find_or_create_scratch_register(GPR, &mut cg);
        assert_ne!(a, b);
        assert!(srm.reclaim_scratch_register(a));
        assert_eq!(srm.find_or_create_scratch_register(GPR, &mut cg), a);
        let x = srm.find_or_create_scratch_register(FPR, &mut cg);
        assert_eq!(cg.kind(x), FPR);
        assert_eq!(srm.number_of_scratch_registers(), 3);
        let outsider = cg.allocate_register(GPR);
        assert!(!srm.reclaim_scratch_register(outsider));
        assert!(!srm.donate_scratch_register(outsider));
    }

    #[test]
    fn manager_donations() {
        let mut cg = CodeGenerator::new(X86_64, Options::default());
        let mut srm = ScratchRegisterManager::new(2);
        let donated = cg.allocate_register(GPR);
        assert!(srm.donate_scratch_register(donated));
        assert!(!srm.donate_scratch_register(donated));
        assert_eq!(srm.find_or_create_scratch_register(GPR, &mut cg), donated);
        let own = srm.find_or_create_scratch_register(GPR, &mut cg);
        let mut deps = DependencyConditions::with_capacity(0, 3);
        deps.add_post_condition(own, x86_64::RDX.into(), DepFlags::USES);
        srm.add_scratch_registers_to_dependency_list(&mut deps, &cg);
        assert!(deps.post_condition_contains_virtual(donated));
        assert_eq!(deps.add_cursor_for_post(), 2);
        assert_eq!(deps.search_post_condition_register(x86_64::RDX.into()), Some(own));
        srm.stop_using_registers(&mut cg);
        assert!(cg.is_live(donated));
        assert!(!cg.is_live(own));
    }

    #[test]
    #[should_panic(expected = "scratch registers are in use")]
    fn manager_full() {
        let mut cg = CodeGenerator::new(X86_64, Options::default());
        let mut srm = ScratchRegisterManager::new(1);
        srm.find_or_create_scratch_register(GPR, &mut cg);
        srm.find_or_create_scratch_register(GPR, &mut cg);
    }
}
