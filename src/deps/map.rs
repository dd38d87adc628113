use std::marker::{PhantomData};

use super::{RegisterDependency};
use crate::codegen::{CodeGenerator, VirtualRegister};
use crate::target::{Target, RealRegister, Binding, MAX_REAL_REGISTERS};
use crate::util::{AsUsize};

/**
 * Constant-time lookups into a slice of [`RegisterDependency`]s by real
 * register: which dependency targets it, and which dependency's register is
 * currently assigned to it.
 *
 * The tables start empty. The caller adds each dependency with
 * [`Self::add_dependency()`] during a scan it was making anyway. The
 * assignments must not change while the map is in use.
 */
pub struct RegisterDependencyMap<'a, T: Target> {
    deps: &'a [RegisterDependency],
    target: [Option<u8>; MAX_REAL_REGISTERS],
    source_assigned: [Option<u8>; MAX_REAL_REGISTERS],
    _target: PhantomData<T>,
}

impl<'a, T: Target> RegisterDependencyMap<'a, T> {
    /** The maximum number of dependencies in a map. */
    pub const MAX_DEPENDENCIES: usize = u8::MAX as usize;

    /** An empty map over the first `n` dependencies of `deps`. */
    pub fn new(deps: &'a [RegisterDependency], n: usize) -> Self {
        assert!(T::NUM_REGISTERS <= MAX_REAL_REGISTERS);
        assert!(n <= Self::MAX_DEPENDENCIES, "too many dependencies ({}) for a map", n);
        RegisterDependencyMap {
            deps: &deps[..n],
            target: [None; MAX_REAL_REGISTERS],
            source_assigned: [None; MAX_REAL_REGISTERS],
            _target: PhantomData,
        }
    }

    fn check(reg: RealRegister) {
        assert!(reg.as_usize() < T::NUM_REGISTERS, "{:?} is not a {} register", reg, T::NAME);
    }

    /** Records `index` in `table[reg]`, panicking if a different register is already there. */
    fn insert(deps: &[RegisterDependency], table: &mut [Option<u8>], reg: RealRegister, index: usize, what: &str) {
        Self::check(reg);
        let slot = &mut table[reg.as_usize()];
        if let Some(existing) = *slot {
            assert_eq!(
                deps[existing as usize].register(), deps[index].register(),
                "two registers {} {}", what, T::register_name(reg),
            );
        }
        *slot = Some(index as u8);
    }

    /**
     * Adds dependency `index`, whose register is currently in `assigned`.
     * Two dependencies may target, or be assigned, the same real register
     * only if they are on the same virtual register.
     */
    pub fn add_dependency(&mut self, index: usize, assigned: Option<RealRegister>) {
        if let Binding::Real(r) = self.deps[index].binding() {
            Self::insert(self.deps, &mut self.target, r, index, "target");
        }
        if let Some(r) = assigned {
            Self::insert(self.deps, &mut self.source_assigned, r, index, "are assigned to");
        }
    }

    /** Adds dependency `index`, looking up its current assignment in `cg`. */
    pub fn add_dependency_of(&mut self, index: usize, cg: &CodeGenerator<T>) {
        let assigned = self.deps[index].register().and_then(|vr| cg.assigned_register(vr));
        self.add_dependency(index, assigned);
    }

    /** The index of the dependency targeting `reg`. */
    pub fn find_target_index(&self, reg: RealRegister) -> Option<usize> {
        Self::check(reg);
        self.target[reg.as_usize()].map(usize::from)
    }

    /** The index of the dependency whose register is assigned to `reg`. */
    pub fn find_source_assigned_index(&self, reg: RealRegister) -> Option<usize> {
        Self::check(reg);
        self.source_assigned[reg.as_usize()].map(usize::from)
    }

    /** The index of the dependency targeting `reg`, which must exist. */
    pub fn target_index(&self, reg: RealRegister) -> usize {
        match self.find_target_index(reg) {
            Some(index) => index,
            None => panic!("no dependency targets {}", T::register_name(reg)),
        }
    }

    pub fn dependency_with_target(&self, reg: RealRegister) -> Option<&'a RegisterDependency> {
        self.find_target_index(reg).map(|i| &self.deps[i])
    }

    /**
     * Like [`Self::dependency_with_target()`], for a [`Binding`], which must
     * be a specific register. Many dependencies can be bound to
     * [`Binding::Any`] or [`Binding::Spilled`]: search the
     * [`DependencyGroup`] for those.
     *
     * [`DependencyGroup`]: super::DependencyGroup
     */
    pub fn dependency_for(&self, binding: Binding) -> Option<&'a RegisterDependency> {
        match binding {
            Binding::Real(r) => self.dependency_with_target(r),
            _ => panic!("{:?} does not name one register", binding),
        }
    }

    pub fn dependency_with_source_assigned(&self, reg: RealRegister) -> Option<&'a RegisterDependency> {
        self.find_source_assigned_index(reg).map(|i| &self.deps[i])
    }

    /** The register of the dependency targeting `reg`. */
    pub fn source_with_target(&self, reg: RealRegister) -> Option<VirtualRegister> {
        self.dependency_with_target(reg).and_then(RegisterDependency::register)
    }

    /** The register of the dependency whose register is assigned to `reg`. */
    pub fn source_with_assigned(&self, reg: RealRegister) -> Option<VirtualRegister> {
        self.dependency_with_source_assigned(reg).and_then(RegisterDependency::register)
    }
}

//-----------------------------------------------------------------------------

#[cfg(test)]
pub mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand::seq::{SliceRandom};
    use rand_pcg::{Pcg64};

    use crate::options::{Options};
    use crate::deps::{DependencyGroup, DepFlags};
    use crate::target::{power, Power, RegisterKind};

    fn setup(n: usize) -> (CodeGenerator<Power>, Vec<VirtualRegister>) {
        let mut cg = CodeGenerator::new(Power, Options::default());
        let vrs = (0..n).map(|_| cg.allocate_register(RegisterKind::GPR)).collect();
        (cg, vrs)
    }

    #[test]
    fn targets() {
        let (_, vrs) = setup(3);
        let mut group = DependencyGroup::new(3);
        group.set_dependency_info(0, Some(vrs[0]), power::GR[1].into(), DepFlags::USES);
        group.set_dependency_info(1, Some(vrs[1]), power::GR[2].into(), DepFlags::USES);
        group.set_dependency_info(2, Some(vrs[2]), Binding::Any, DepFlags::USES);
        let mut map = RegisterDependencyMap::<Power>::new(group.dependencies(), 3);
        for i in 0..3 { map.add_dependency(i, None); }
        assert_eq!(map.dependency_with_target(power::GR[1]), Some(group.dependency(0)));
        assert_eq!(map.dependency_with_target(power::GR[2]), Some(group.dependency(1)));
        assert_eq!(map.source_with_target(power::GR[2]), Some(vrs[1]));
        assert_eq!(map.target_index(power::GR[1]), 0);
        assert_eq!(map.dependency_with_target(power::GR[3]), None);
        assert_eq!(map.dependency_for(power::GR[2].into()), Some(group.dependency(1)));
    }

    #[test]
    #[should_panic(expected = "does not name one register")]
    fn wildcard_lookup() {
        let (_, vrs) = setup(1);
        let mut group = DependencyGroup::new(1);
        group.set_dependency_info(0, Some(vrs[0]), Binding::Any, DepFlags::USES);
        let mut map = RegisterDependencyMap::<Power>::new(group.dependencies(), 1);
        map.add_dependency(0, None);
        map.dependency_for(Binding::Any);
    }

    #[test]
    #[should_panic(expected = "no dependency targets")]
    fn missing_target_index() {
        let group = DependencyGroup::new(0);
        let map = RegisterDependencyMap::<Power>::new(group.dependencies(), 0);
        map.target_index(power::GR[5]);
    }

    #[test]
    fn same_register_twice() {
        let (_, vrs) = setup(1);
        let mut group = DependencyGroup::new(2);
        group.set_dependency_info(0, Some(vrs[0]), power::GR[5].into(), DepFlags::REFERENCES);
        group.set_dependency_info(1, Some(vrs[0]), power::GR[5].into(), DepFlags::DEFINES);
        let mut map = RegisterDependencyMap::<Power>::new(group.dependencies(), 2);
        map.add_dependency(0, Some(power::GR[7]));
        map.add_dependency(1, Some(power::GR[7]));
        assert_eq!(map.source_with_target(power::GR[5]), Some(vrs[0]));
        assert_eq!(map.source_with_assigned(power::GR[7]), Some(vrs[0]));
    }

    #[test]
    #[should_panic(expected = "two registers target")]
    fn conflicting_targets() {
        let (_, vrs) = setup(2);
        let mut group = DependencyGroup::new(3);
        group.set_dependency_info(0, Some(vrs[0]), power::GR[5].into(), DepFlags::USES);
        group.set_dependency_info(1, Some(vrs[0]), power::GR[5].into(), DepFlags::USES);
        group.set_dependency_info(2, Some(vrs[1]), power::GR[5].into(), DepFlags::USES);
        let mut map = RegisterDependencyMap::<Power>::new(group.dependencies(), 3);
        map.add_dependency(0, None);
        map.add_dependency(1, None);
        map.add_dependency(2, None);
    }

    #[test]
    #[should_panic(expected = "two registers are assigned to")]
    fn conflicting_assignments() {
        let (_, vrs) = setup(2);
        let mut group = DependencyGroup::new(2);
        group.set_dependency_info(0, Some(vrs[0]), Binding::Any, DepFlags::USES);
        group.set_dependency_info(1, Some(vrs[1]), Binding::Any, DepFlags::USES);
        let mut map = RegisterDependencyMap::<Power>::new(group.dependencies(), 2);
        map.add_dependency(0, Some(power::GR[3]));
        map.add_dependency(1, Some(power::GR[3]));
    }

    #[test]
    #[should_panic(expected = "too many dependencies")]
    fn too_many() {
        let group = DependencyGroup::new(256);
        RegisterDependencyMap::<Power>::new(group.dependencies(), 256);
    }

    #[test]
    fn agrees_with_scan() {
        let mut rng = Pcg64::seed_from_u64(0);
        let (_, vrs) = setup(20);
        for _ in 0..100 {
            // Distinct targets, some wildcards.
            let n = rng.gen_range(0..20);
            let mut targets = power::GR.to_vec();
            targets.shuffle(&mut rng);
            let mut group = DependencyGroup::new(n);
            for i in 0..n {
                let binding = if rng.gen_bool(0.2) { Binding::Any } else { targets[i].into() };
                group.set_dependency_info(i, Some(vrs[i]), binding, DepFlags::USES);
            }
            let mut map = RegisterDependencyMap::<Power>::new(group.dependencies(), n);
            for i in 0..n { map.add_dependency(i, None); }
            for &r in power::GR.iter() {
                let scanned = group.dependencies()[..n].iter().find(|dep| dep.binding() == Binding::Real(r));
                assert_eq!(map.dependency_with_target(r), scanned);
            }
        }
    }
}
