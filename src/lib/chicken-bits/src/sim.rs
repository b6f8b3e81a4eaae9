//! A simulated register bank that records every access.
//!
//! Registers that were never preset read as zero. Accessing a register in a
//! direction the hardware forbids panics, the same way a misencoded `msr`
//! would trap on silicon.
use alloc::{collections::BTreeMap, string::String, vec::Vec};

use crate::{
    fields::{val, MIDR},
    sysreg::{Console, SysReg, SysRegs},
};

/// One recorded register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(SysReg, u64),
    Write(SysReg, u64),
    Isb,
}

#[derive(Debug, Default, Clone)]
pub struct SimRegs {
    values: BTreeMap<SysReg, u64>,
    log: Vec<Access>,
}

impl SimRegs {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bank describing core `core` of an Apple part `part`.
    pub fn for_core(part: u16, core: u8, performance: bool) -> Self {
        let mut mpidr = 0x8000_0000 | core as u64;
        if performance {
            mpidr |= 1 << 16;
        }
        Self::new()
            .with(SysReg::MidrEl1, Self::midr_for_part(part))
            .with(SysReg::MpidrEl1, mpidr)
    }

    /// MIDR_EL1 as an Apple core with the given part number reports it.
    pub fn midr_for_part(part: u16) -> u64 {
        val(&MIDR::Implementer, 0x61)
            | val(&MIDR::Architecture, 0xf)
            | val(&MIDR::PartNum, part as u64)
    }

    pub fn with(mut self, reg: SysReg, value: u64) -> Self {
        self.set(reg, value);
        self
    }

    /// Preset a register without recording an access.
    pub fn set(&mut self, reg: SysReg, value: u64) {
        self.values.insert(reg, value);
    }

    pub fn value(&self, reg: SysReg) -> u64 {
        self.values.get(&reg).copied().unwrap_or(0)
    }

    pub fn log(&self) -> &[Access] {
        &self.log
    }

    /// Recorded writes, in order.
    pub fn writes(&self) -> Vec<(SysReg, u64)> {
        self.log
            .iter()
            .filter_map(|access| match *access {
                Access::Write(reg, value) => Some((reg, value)),
                _ => None,
            })
            .collect()
    }

    /// Registers written, in order, with repeats.
    pub fn written_regs(&self) -> Vec<SysReg> {
        self.writes().into_iter().map(|(reg, _)| reg).collect()
    }

    pub fn isb_count(&self) -> usize {
        self.log.iter().filter(|a| **a == Access::Isb).count()
    }

    /// Current values of every register that was preset or written.
    pub fn values(&self) -> impl Iterator<Item = (SysReg, u64)> + '_ {
        self.values.iter().map(|(reg, value)| (*reg, *value))
    }
}

impl SysRegs for SimRegs {
    fn read(&mut self, reg: SysReg) -> u64 {
        assert!(reg.access().readable(), "read of write-only {}", reg);
        let value = self.value(reg);
        self.log.push(Access::Read(reg, value));
        value
    }

    fn write(&mut self, reg: SysReg, value: u64) {
        assert!(reg.access().writable(), "write of read-only {}", reg);
        self.values.insert(reg, value);
        self.log.push(Access::Write(reg, value));
    }

    fn isb(&mut self) {
        self.log.push(Access::Isb);
    }
}

/// A console that keeps every line it was given.
#[derive(Debug, Default, Clone)]
pub struct RecordingConsole {
    pub lines: Vec<String>,
}

impl Console for RecordingConsole {
    fn puts(&mut self, msg: &str) {
        self.lines.push(String::from(msg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fields::bits,
        identity::{CoreRole, VariantKey},
    };

    #[test]
    fn unset_registers_read_zero() {
        let mut regs = SimRegs::new();
        assert_eq!(regs.read(SysReg::Hid9), 0);
        assert_eq!(regs.log(), &[Access::Read(SysReg::Hid9, 0)][..]);
    }

    #[test]
    fn presets_are_not_logged() {
        let regs = SimRegs::new().with(SysReg::Hid9, 7);
        assert!(regs.log().is_empty());
        assert_eq!(regs.value(SysReg::Hid9), 7);
    }

    #[test]
    fn core_builder_encodes_identity() {
        let regs = SimRegs::for_core(34, 3, false);
        assert_eq!(VariantKey::from_midr(regs.value(SysReg::MidrEl1)).part(), 34);
        assert_eq!(
            CoreRole::from_mpidr(regs.value(SysReg::MpidrEl1)),
            CoreRole::Efficiency
        );
        assert_eq!(regs.value(SysReg::MpidrEl1) & 0xff, 3);
        assert_ne!(regs.value(SysReg::MidrEl1) & bits(&MIDR::Implementer), 0);
    }

    #[test]
    #[should_panic(expected = "read-only")]
    fn identity_registers_reject_writes() {
        SimRegs::new().write(SysReg::MidrEl1, 0);
    }

    #[test]
    #[should_panic(expected = "write-only")]
    fn os_lock_rejects_reads() {
        SimRegs::new().read(SysReg::OslarEl1);
    }
}
