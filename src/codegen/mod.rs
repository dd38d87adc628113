//! The parts of a code generator that register dependencies consult and
//! drive: the virtual register table, the state of the real register file,
//! spill slots, and the log of moves made to satisfy dependencies.

use std::fmt::{self, Debug};

use indexmap::{IndexSet};

use super::util::{AsUsize};
use super::options::{Options};
use super::target::{Target, RealRegister, RegisterKind};

mod machine;
pub use machine::{RegisterState, Machine};

mod instruction;
pub use instruction::{InstructionId, Opcode, Instruction};

mod glue;
pub use glue::{GlueDependency, GlueNode};

mod driver;
pub use driver::{assign_registers};

//-----------------------------------------------------------------------------

/**
 * A handle to a virtual register of a [`CodeGenerator`].
 *
 * Holding a `VirtualRegister` does not keep the register alive. Its lifetime
 * is controlled by [`CodeGenerator::stop_using_register()`].
 */
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualRegister(u32);

impl Debug for VirtualRegister {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

impl AsUsize for VirtualRegister {
    fn as_usize(self) -> usize { self.0 as usize }
}

/** A stack location to which a [`VirtualRegister`] can be spilled. */
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpillSlot(pub usize);

/** The bookkeeping for one [`VirtualRegister`]. */
#[derive(Debug, Clone)]
struct Info {
    kind: RegisterKind,
    assigned: Option<RealRegister>,
    /** The number of outstanding [`CodeGenerator::block()`]s. */
    blocked: u32,
    live: bool,
    total_use_count: u32,
    future_use_count: u32,
    backing_store: Option<SpillSlot>,
    association: Option<RealRegister>,
    interferes_with_zero: bool,
    pair: Option<(VirtualRegister, VirtualRegister)>,
}

impl Info {
    fn new(kind: RegisterKind) -> Self {
        Info {
            kind,
            assigned: None,
            blocked: 0,
            live: true,
            total_use_count: 0,
            future_use_count: 0,
            backing_store: None,
            association: None,
            interferes_with_zero: false,
            pair: None,
        }
    }
}

//-----------------------------------------------------------------------------

/** A data movement inserted at an instruction to satisfy its dependencies. */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transfer {
    Move {dest: RealRegister, src: RealRegister},
    Exchange(RealRegister, RealRegister),
    Spill {src: RealRegister, slot: SpillSlot},
    Reload {dest: RealRegister, slot: SpillSlot},
}

/** A [`Transfer`] of `register`'s value, made before instruction `at`. */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Fixup {
    pub at: InstructionId,
    pub register: VirtualRegister,
    pub transfer: Transfer,
}

//-----------------------------------------------------------------------------

/**
 * The register state of one compilation for target `T`.
 *
 * The dependency assigners read and update this as they walk forward
 * through the instructions. Every value they move is recorded as a
 * [`Fixup`].
 */
pub struct CodeGenerator<T: Target> {
    target: T,
    options: Options,
    registers: Vec<Info>,
    machine: Machine,
    /** Registers that have been spilled, in the order they were spilled. */
    spilled: IndexSet<VirtualRegister>,
    num_slots: usize,
    fixups: Vec<Fixup>,
    environment: Option<VirtualRegister>,
    out_of_line: bool,
}

impl<T: Target> CodeGenerator<T> {
    pub fn new(target: T, options: Options) -> Self {
        CodeGenerator {
            target,
            options,
            registers: Vec::new(),
            machine: Machine::new::<T>(),
            spilled: IndexSet::new(),
            num_slots: 0,
            fixups: Vec::new(),
            environment: None,
            out_of_line: false,
        }
    }

    pub fn target(&self) -> T { self.target }

    pub fn options(&self) -> &Options { &self.options }

    pub fn machine(&self) -> &Machine { &self.machine }

    pub fn machine_mut(&mut self) -> &mut Machine { &mut self.machine }

    fn info(&self, vr: VirtualRegister) -> &Info { &self.registers[vr.as_usize()] }

    fn info_mut(&mut self, vr: VirtualRegister) -> &mut Info { &mut self.registers[vr.as_usize()] }

    /** Creates a live, unassigned [`VirtualRegister`] of `kind`. */
    pub fn allocate_register(&mut self, kind: RegisterKind) -> VirtualRegister {
        assert!(!T::assignable(kind).is_empty(), "{} has no {:?} registers", T::NAME, kind);
        let vr = VirtualRegister(self.registers.len() as u32);
        self.registers.push(Info::new(kind));
        vr
    }

    /**
     * Creates a [`VirtualRegister`] standing for the pair `low`, `high`, e.g.
     * a 64-bit value on a 32-bit machine. Its kind is that of its halves.
     */
    pub fn allocate_register_pair(&mut self, low: VirtualRegister, high: VirtualRegister) -> VirtualRegister {
        let kind = self.kind(low);
        assert_eq!(kind, self.kind(high), "register pair halves differ in kind");
        let vr = self.allocate_register(kind);
        self.info_mut(vr).pair = Some((low, high));
        vr
    }

    /** The halves of `vr`, if it is a pair. */
    pub fn register_pair(&self, vr: VirtualRegister) -> Option<(VirtualRegister, VirtualRegister)> {
        self.info(vr).pair
    }

    pub fn kind(&self, vr: VirtualRegister) -> RegisterKind { self.info(vr).kind }

    /** The real register currently holding `vr`, if any. */
    pub fn assigned_register(&self, vr: VirtualRegister) -> Option<RealRegister> {
        self.info(vr).assigned
    }

    /**
     * Records that `vr` is currently held in `reg`, for example because it
     * arrives there as an argument. `reg` must be free.
     */
    pub fn place_register(&mut self, vr: VirtualRegister, reg: RealRegister) {
        assert_eq!(T::kind_of(reg), self.kind(vr));
        assert_eq!(self.assigned_register(vr), None, "{:?} is already assigned", vr);
        assert!(self.machine.is_free(reg), "{} is not free", T::register_name(reg));
        self.set_assignment(vr, reg);
    }

    /** `false` once [`Self::stop_using_register()`] has been called. */
    pub fn is_live(&self, vr: VirtualRegister) -> bool { self.info(vr).live }

    /**
     * Declares that no further uses of `vr` will be generated.
     * Uses that were already counted still keep its real register.
     */
    pub fn stop_using_register(&mut self, vr: VirtualRegister) {
        let info = self.info_mut(vr);
        info.live = false;
        if info.future_use_count == 0 {
            self.release_register(vr);
        }
    }

    pub fn is_blocked(&self, vr: VirtualRegister) -> bool { self.info(vr).blocked > 0 }

    /**
     * Prevent `vr` from being chosen to be spilled. Blocks nest: `vr` stays
     * blocked until every `block()` has been matched by an `unblock()`.
     */
    pub fn block(&mut self, vr: VirtualRegister) { self.info_mut(vr).blocked += 1; }

    pub fn unblock(&mut self, vr: VirtualRegister) {
        let info = self.info_mut(vr);
        assert!(info.blocked > 0, "{:?} is not blocked", vr);
        info.blocked -= 1;
    }

    /** Counts one more use of `vr` by a generated instruction. */
    pub fn use_register(&mut self, vr: VirtualRegister) {
        let info = self.info_mut(vr);
        info.total_use_count += 1;
        info.future_use_count += 1;
    }

    pub fn total_use_count(&self, vr: VirtualRegister) -> u32 { self.info(vr).total_use_count }

    /** The number of counted uses that have not yet been assigned. */
    pub fn future_use_count(&self, vr: VirtualRegister) -> u32 { self.info(vr).future_use_count }

    /** The spill slot of `vr`, if it has ever been spilled. */
    pub fn backing_store(&self, vr: VirtualRegister) -> Option<SpillSlot> { self.info(vr).backing_store }

    /** Gives `vr` a spill slot if it has none, and returns it. */
    pub fn allocate_backing_store(&mut self, vr: VirtualRegister) -> SpillSlot {
        if let Some(slot) = self.backing_store(vr) { return slot; }
        let slot = SpillSlot(self.num_slots);
        self.num_slots += 1;
        self.info_mut(vr).backing_store = Some(slot);
        slot
    }

    /** The global register `vr` was given by the register associations. */
    pub fn association(&self, vr: VirtualRegister) -> Option<RealRegister> { self.info(vr).association }

    pub fn set_association(&mut self, vr: VirtualRegister, reg: RealRegister) {
        self.info_mut(vr).association = Some(reg);
    }

    /** `vr` must not be assigned to [`Target::ZERO_REGISTER`]. */
    pub fn interferes_with_zero(&self, vr: VirtualRegister) -> bool { self.info(vr).interferes_with_zero }

    pub fn add_zero_register_interference(&mut self, vr: VirtualRegister) {
        self.info_mut(vr).interferes_with_zero = true;
    }

    /** `true` while generating out-of-line (cold) code. */
    pub fn is_out_of_line(&self) -> bool { self.out_of_line }

    pub fn set_out_of_line(&mut self, out_of_line: bool) { self.out_of_line = out_of_line; }

    /** The virtual register that holds the environment (e.g. the VM thread). */
    pub fn environment_register(&self) -> Option<VirtualRegister> { self.environment }

    pub fn set_environment_register(&mut self, vr: VirtualRegister) {
        assert!(T::ENVIRONMENT_REGISTER.is_some(), "{} has no environment register", T::NAME);
        self.environment = Some(vr);
    }

    /** Registers that have been spilled, in the order they were spilled. */
    pub fn spilled_registers(&self) -> impl Iterator<Item=VirtualRegister> + '_ {
        self.spilled.iter().copied()
    }

    pub fn add_spilled_register(&mut self, vr: VirtualRegister) {
        self.spilled.insert(vr);
    }

    /** The data movements made so far, in order. */
    pub fn fixups(&self) -> &[Fixup] { &self.fixups }

    /**
     * Appends `instruction` to `list`, counting the uses of its operands and
     * dependencies. If its dependencies change the register associations,
     * an [`Opcode::AssocRegs`] instruction is appended first.
     */
    pub fn append(&mut self, list: &mut Vec<Instruction>, instruction: Instruction) -> InstructionId {
        for vr in instruction.operands() {
            self.use_register(vr);
        }
        if let Some(conditions) = &instruction.conditions {
            if let Some(associations) = conditions.book_keeping_register_uses(self) {
                if instruction.opcode != Opcode::AssocRegs {
                    list.push(Instruction::new(Opcode::AssocRegs).with_conditions(associations));
                }
            }
        }
        list.push(instruction);
        InstructionId(list.len() - 1)
    }
}

impl<T: Target> Debug for CodeGenerator<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CodeGenerator")
            .field("target", &T::NAME)
            .field("registers", &self.registers.len())
            .field("machine", &self.machine)
            .field("spilled", &self.spilled)
            .finish()
    }
}
