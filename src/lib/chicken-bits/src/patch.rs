//! Register patch operations and the loop that applies them.
use core::fmt;

use crate::{
    identity,
    sysreg::{SysReg, SysRegs},
};

/// One step of a workaround sequence.
///
/// Every read-modify-write is a discrete read followed by a discrete write,
/// even when neighbouring ops hit the same register: intermediate values can
/// matter to the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOp {
    /// `reg &= !mask`
    Clear { reg: SysReg, mask: u64 },
    /// `reg |= bits`
    Set { reg: SysReg, bits: u64 },
    /// `reg = (reg & !clear) | set`
    Mask { reg: SysReg, clear: u64, set: u64 },
    /// Plain write of a fixed value.
    Write { reg: SysReg, value: u64 },
    /// Write the executing core's Aff0 index.
    WriteCoreIndex { reg: SysReg },
    Isb,
}

/// An ordered list of patch operations.
pub type PatchSequence = [PatchOp];

impl PatchOp {
    pub const fn clear(reg: SysReg, mask: u64) -> Self {
        PatchOp::Clear { reg, mask }
    }

    pub const fn set(reg: SysReg, bits: u64) -> Self {
        PatchOp::Set { reg, bits }
    }

    pub const fn mask(reg: SysReg, clear: u64, set: u64) -> Self {
        PatchOp::Mask { reg, clear, set }
    }

    pub const fn write(reg: SysReg, value: u64) -> Self {
        PatchOp::Write { reg, value }
    }

    /// The register this op writes, if any.
    pub const fn target(&self) -> Option<SysReg> {
        match *self {
            PatchOp::Clear { reg, .. }
            | PatchOp::Set { reg, .. }
            | PatchOp::Mask { reg, .. }
            | PatchOp::Write { reg, .. }
            | PatchOp::WriteCoreIndex { reg } => Some(reg),
            PatchOp::Isb => None,
        }
    }

    /// Whether applying this op reads its target first.
    pub const fn is_read_modify_write(&self) -> bool {
        matches!(
            self,
            PatchOp::Clear { .. } | PatchOp::Set { .. } | PatchOp::Mask { .. }
        )
    }

    /// The value a read-modify-write op stores given the current contents.
    pub const fn modify(&self, current: u64) -> Option<u64> {
        match *self {
            PatchOp::Clear { mask, .. } => Some(current & !mask),
            PatchOp::Set { bits, .. } => Some(current | bits),
            PatchOp::Mask { clear, set, .. } => Some((current & !clear) | set),
            _ => None,
        }
    }

    pub fn apply<R: SysRegs + ?Sized>(&self, regs: &mut R) {
        match *self {
            PatchOp::Clear { reg, .. } | PatchOp::Set { reg, .. } | PatchOp::Mask { reg, .. } => {
                let old = regs.read(reg);
                // only the three RMW kinds reach this arm
                let new = self.modify(old).unwrap_or(old);
                log::trace!("{}: {:#018x} -> {:#018x}", reg, old, new);
                regs.write(reg, new);
            }
            PatchOp::Write { reg, value } => {
                log::trace!("{}: <- {:#x}", reg, value);
                regs.write(reg, value);
            }
            PatchOp::WriteCoreIndex { reg } => {
                let index = identity::core_index(regs);
                log::trace!("{}: <- core {}", reg, index);
                regs.write(reg, index);
            }
            PatchOp::Isb => regs.isb(),
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOp::Clear { reg, mask } => write!(f, "{} &= !{:#x}", reg, mask),
            PatchOp::Set { reg, bits } => write!(f, "{} |= {:#x}", reg, bits),
            PatchOp::Mask { reg, clear, set } => {
                write!(f, "{} = ({} & !{:#x}) | {:#x}", reg, reg, clear, set)
            }
            PatchOp::Write { reg, value } => write!(f, "{} = {:#x}", reg, value),
            PatchOp::WriteCoreIndex { reg } => write!(f, "{} = core index", reg),
            PatchOp::Isb => f.write_str("isb"),
        }
    }
}

/// Apply every op of `seq` in order.
pub fn apply_sequence<R: SysRegs + ?Sized>(regs: &mut R, seq: &PatchSequence) {
    for op in seq {
        op.apply(regs);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::sim::{Access, SimRegs};

    #[test]
    fn rmw_touches_only_its_bits() {
        let mut regs = SimRegs::new().with(SysReg::Hid5, 0x0000_ffff_0000_ffff);
        PatchOp::set(SysReg::Hid5, 1 << 61).apply(&mut regs);
        assert_eq!(regs.value(SysReg::Hid5), 0x2000_ffff_0000_ffff);

        PatchOp::clear(SysReg::Hid5, 0xff).apply(&mut regs);
        assert_eq!(regs.value(SysReg::Hid5), 0x2000_ffff_0000_ff00);

        PatchOp::mask(SysReg::Hid5, 0xf000, 0x3000).apply(&mut regs);
        assert_eq!(regs.value(SysReg::Hid5), 0x2000_ffff_0000_3f00);
    }

    #[test]
    fn rmw_reads_then_writes() {
        let mut regs = SimRegs::new().with(SysReg::Hid11, 1);
        PatchOp::set(SysReg::Hid11, 2).apply(&mut regs);
        assert_eq!(
            regs.log(),
            &[
                Access::Read(SysReg::Hid11, 1),
                Access::Write(SysReg::Hid11, 3)
            ][..]
        );
    }

    #[test]
    fn unchanged_values_are_still_written() {
        let mut regs = SimRegs::new().with(SysReg::Hid1, 1 << 54);
        PatchOp::set(SysReg::Hid1, 1 << 54).apply(&mut regs);
        assert_eq!(regs.writes(), vec![(SysReg::Hid1, 1 << 54)]);
    }

    #[test]
    fn core_index_is_read_at_apply_time() {
        let mut regs = SimRegs::new().with(SysReg::MpidrEl1, 0x8001_0003);
        PatchOp::WriteCoreIndex {
            reg: SysReg::ImpCoreIndex,
        }
        .apply(&mut regs);
        regs.set(SysReg::MpidrEl1, 0x8001_0005);
        PatchOp::WriteCoreIndex {
            reg: SysReg::ImpCoreIndex,
        }
        .apply(&mut regs);
        assert_eq!(
            regs.writes(),
            vec![(SysReg::ImpCoreIndex, 3), (SysReg::ImpCoreIndex, 5)]
        );
    }

    #[test]
    fn same_register_ops_are_not_coalesced() {
        let seq = [
            PatchOp::set(SysReg::Hid7, 1 << 20),
            PatchOp::mask(SysReg::Hid7, 3 << 24, 3 << 24),
        ];
        let mut regs = SimRegs::new();
        apply_sequence(&mut regs, &seq);
        assert_eq!(
            regs.log(),
            &[
                Access::Read(SysReg::Hid7, 0),
                Access::Write(SysReg::Hid7, 1 << 20),
                Access::Read(SysReg::Hid7, 1 << 20),
                Access::Write(SysReg::Hid7, (1 << 20) | (3 << 24)),
            ][..]
        );
    }

    #[test]
    fn order_is_significant() {
        let set_then_mask = [
            PatchOp::set(SysReg::Ehid20, 3 << 21),
            PatchOp::mask(SysReg::Ehid20, 3 << 21, 1 << 21),
        ];
        let mask_then_set = [set_then_mask[1], set_then_mask[0]];

        let mut a = SimRegs::new();
        apply_sequence(&mut a, &set_then_mask);
        let mut b = SimRegs::new();
        apply_sequence(&mut b, &mask_then_set);

        assert_eq!(a.value(SysReg::Ehid20), 1 << 21);
        assert_eq!(b.value(SysReg::Ehid20), 3 << 21);
    }

    #[test]
    fn display() {
        assert_eq!(
            alloc::format!("{}", PatchOp::clear(SysReg::Hid21, 1 << 19)),
            "HID21 &= !0x80000"
        );
        assert_eq!(alloc::format!("{}", PatchOp::Isb), "isb");
    }
}
