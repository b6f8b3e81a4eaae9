//! Early-boot, per-core errata workarounds for Apple M1 family cores.
//!
//! Each core calls [init_cpu] once during bring-up. The core's identity is
//! decoded from `MIDR_EL1`/`MPIDR_EL1`, and the matching set of
//! implementation-defined "chicken bit" patches is applied before the rest of
//! boot continues. Register access goes through the [SysRegs] capability, so
//! the same engine runs against real hardware ([hw::CpuRegs]) or a simulated
//! register bank (`sim::SimRegs`, behind the `sim` feature).
#![no_std]

#[cfg(any(test, feature = "sim"))]
extern crate alloc;

pub mod dispatch;
pub mod error;
pub mod fields;
pub mod identity;
pub mod patch;
pub mod sysreg;
pub mod table;

#[cfg(target_arch = "aarch64")]
pub mod hw;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use dispatch::{init_cpu, Dispatcher, Options, Outcome, Stage};
pub use identity::{CoreRole, VariantKey};
pub use patch::PatchOp;
pub use sysreg::{Console, SysReg, SysRegs};
pub use table::{PatchTable, Variant, M1, UNKNOWN_LABEL};
