//! Direct system register access on the executing core.
//!
//! The architectural identity registers go through `aarch64-cpu`; the
//! implementation-defined ones have no names the assembler knows, so they are
//! accessed by their generic `sN_N_cN_cN_N` encodings.
use core::arch::asm;

use arm64::{
    asm::barrier,
    registers::{MIDR_EL1, MPIDR_EL1},
};
use registers::interfaces::Readable;

use crate::{
    dispatch::Dispatcher,
    sysreg::{Console, SysReg, SysRegs},
    table::M1,
    Options,
};

macro_rules! impdef_regs {
    ($($reg:ident => $asm:literal,)*) => {
        /// # Safety
        /// `reg` must be one of the implementation-defined registers listed here.
        unsafe fn mrs_impdef(reg: SysReg) -> u64 {
            match reg {
                $(SysReg::$reg => {
                    let value: u64;
                    asm!(concat!("mrs {}, ", $asm), out(reg) value, options(nomem, nostack, preserves_flags));
                    value
                })*
                other => panic!("{} has no implementation-defined encoding", other),
            }
        }

        /// # Safety
        /// `reg` must be one of the implementation-defined registers listed here,
        /// and `value` must be a setting the core tolerates.
        unsafe fn msr_impdef(reg: SysReg, value: u64) {
            match reg {
                $(SysReg::$reg => {
                    asm!(concat!("msr ", $asm, ", {}"), in(reg) value, options(nostack, preserves_flags));
                })*
                other => panic!("{} has no implementation-defined encoding", other),
            }
        }
    };
}

impdef_regs! {
    Hid0 => "s3_0_c15_c0_0",
    Hid1 => "s3_0_c15_c1_0",
    Hid3 => "s3_0_c15_c3_0",
    Hid4 => "s3_0_c15_c4_0",
    Ehid4 => "s3_0_c15_c4_1",
    Hid5 => "s3_0_c15_c5_0",
    Hid6 => "s3_0_c15_c6_0",
    Hid7 => "s3_0_c15_c7_0",
    Hid9 => "s3_0_c15_c9_0",
    Ehid9 => "s3_0_c15_c9_1",
    Ehid10 => "s3_0_c15_c10_1",
    Hid11 => "s3_0_c15_c11_0",
    Hid13 => "s3_0_c15_c14_0",
    Hid16 => "s3_0_c15_c15_2",
    Hid18 => "s3_0_c15_c11_2",
    Ehid20 => "s3_0_c15_c1_2",
    Hid21 => "s3_0_c15_c1_3",
    CycOvrd => "s3_5_c15_c5_0",
    AccCfg => "s3_5_c15_c4_0",
    ImpCoreIndex => "s3_4_c15_c5_0",
    ImpSmpCfg => "s3_4_c15_c1_4",
}

/// The registers of the core this code is running on.
#[derive(Debug)]
pub struct CpuRegs {
    _private: (),
}

impl CpuRegs {
    /// # Safety
    /// The caller must be running at EL2 or EL1 on an Apple core, early
    /// enough in boot that changing implementation-defined registers under
    /// running code is acceptable.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl SysRegs for CpuRegs {
    fn read(&mut self, reg: SysReg) -> u64 {
        match reg {
            SysReg::MidrEl1 => MIDR_EL1.get(),
            SysReg::MpidrEl1 => MPIDR_EL1.get(),
            SysReg::OslarEl1 => panic!("read of write-only {}", reg),
            // Safety: construction of CpuRegs vouched for the core.
            _ => unsafe { mrs_impdef(reg) },
        }
    }

    fn write(&mut self, reg: SysReg, value: u64) {
        match reg {
            SysReg::MidrEl1 | SysReg::MpidrEl1 => panic!("write of read-only {}", reg),
            SysReg::OslarEl1 => unsafe {
                asm!("msr oslar_el1, {}", in(reg) value, options(nostack, preserves_flags));
            },
            // Safety: construction of CpuRegs vouched for the core.
            _ => unsafe { msr_impdef(reg, value) },
        }
    }

    fn isb(&mut self) {
        barrier::isb(barrier::SY);
    }
}

/// Boot entry point: bring up the executing core against real hardware.
///
/// Returns the label of the detected variant.
///
/// # Safety
/// See [CpuRegs::new].
pub unsafe fn init_cpu_hw<C: Console + ?Sized>(console: &mut C, options: Options) -> &'static str {
    let mut regs = CpuRegs::new();
    Dispatcher::new(&M1)
        .with_options(options)
        .run(&mut regs, console)
        .label()
}
