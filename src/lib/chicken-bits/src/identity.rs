//! Decoding of the executing core's identity.
//!
//! Nothing here is cached: every call reads the registers of the core it runs
//! on, so concurrent bring-up on several cores never sees another core's
//! identity.
use core::fmt;

use registers::LocalRegisterCopy;

use crate::{
    fields::{MIDR, MPIDR},
    sysreg::{SysReg, SysRegs},
};

/// The MIDR_EL1 part number, which selects the patch sequence for a core.
///
/// Always fits in 12 bits. Values that no table entry names are legal and
/// simply miss the lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariantKey(u16);

impl VariantKey {
    pub const fn new(part: u16) -> Self {
        Self(part & 0xfff)
    }

    /// Extract the key from a raw MIDR_EL1 value.
    pub fn from_midr(midr: u64) -> Self {
        let midr = LocalRegisterCopy::<u64, MIDR::Register>::new(midr);
        Self::new(midr.read(MIDR::PartNum) as u16)
    }

    pub const fn part(self) -> u16 {
        self.0
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part {:#x}", self.0)
    }
}

/// Which kind of core in a heterogeneous cluster is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreRole {
    Performance,
    Efficiency,
}

impl CoreRole {
    pub fn from_mpidr(mpidr: u64) -> Self {
        let mpidr = LocalRegisterCopy::<u64, MPIDR::Register>::new(mpidr);
        if mpidr.is_set(MPIDR::PerfCluster) {
            CoreRole::Performance
        } else {
            CoreRole::Efficiency
        }
    }
}

impl fmt::Display for CoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreRole::Performance => f.write_str("p-core"),
            CoreRole::Efficiency => f.write_str("e-core"),
        }
    }
}

pub fn variant_key<R: SysRegs + ?Sized>(regs: &mut R) -> VariantKey {
    let midr = regs.read(SysReg::MidrEl1);
    log::trace!(
        "MIDR_EL1 {:#x}: implementer {:#x}, revision {}",
        midr,
        MIDR::Implementer.read(midr),
        MIDR::Revision.read(midr)
    );
    VariantKey::from_midr(midr)
}

pub fn core_role<R: SysRegs + ?Sized>(regs: &mut R) -> CoreRole {
    CoreRole::from_mpidr(regs.read(SysReg::MpidrEl1))
}

/// Index of the core within its cluster (MPIDR_EL1 Aff0).
pub fn core_index<R: SysRegs + ?Sized>(regs: &mut R) -> u64 {
    MPIDR::Aff0.read(regs.read(SysReg::MpidrEl1))
}
