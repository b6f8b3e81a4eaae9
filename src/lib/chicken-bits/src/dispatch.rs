//! The per-core bring-up sequence.
//!
//! One run walks a fixed pipeline:
//!
//! ```text
//! Start -> RoleResolved -> VariantMatched -> CommonApplied -> FinalTuningApplied -> Done
//!                       \-> VariantUnknown ------------------/
//! ```
//!
//! An unrecognised part is not an error. It skips the variant and common
//! sequences, prints a notice, and still gets the final tuning.
use crate::{
    identity::{self, CoreRole, VariantKey},
    patch::{apply_sequence, PatchOp},
    sysreg::{Console, SysReg, SysRegs},
    table::{PatchTable, Variant, M1, UNKNOWN_LABEL},
};

/// Notice printed when the running part has no table entry.
pub const UNKNOWN_NOTICE: &str = "Unknown CPU type";

/// Run-time knobs for a bring-up run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Release the OS lock (`OSLAR_EL1 = 0`) before any patching, so external
    /// debug can attach.
    pub unlock_os_lock: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    RoleResolved,
    VariantMatched,
    VariantUnknown,
    CommonApplied,
    FinalTuningApplied,
    Done,
}

/// What a run found and did.
#[derive(Debug, Clone, Copy)]
pub struct Outcome<'t> {
    pub role: CoreRole,
    pub key: VariantKey,
    pub variant: Option<&'t Variant>,
}

impl<'t> Outcome<'t> {
    /// "<family> <variant>", or [UNKNOWN_LABEL].
    pub fn label(&self) -> &'static str {
        self.variant.map_or(UNKNOWN_LABEL, |v| v.label)
    }
}

/// Applies the patches of one [PatchTable] to the executing core.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'t> {
    table: &'t PatchTable,
    options: Options,
}

impl<'t> Dispatcher<'t> {
    pub const fn new(table: &'t PatchTable) -> Self {
        Self {
            table,
            options: Options {
                unlock_os_lock: false,
            },
        }
    }

    pub const fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn table(&self) -> &'t PatchTable {
        self.table
    }

    pub fn run<R, C>(&self, regs: &mut R, console: &mut C) -> Outcome<'t>
    where
        R: SysRegs + ?Sized,
        C: Console + ?Sized,
    {
        let mut stage = Stage::Start;

        if self.options.unlock_os_lock {
            PatchOp::write(SysReg::OslarEl1, 0).apply(regs);
        }

        let role = identity::core_role(regs);
        self.table.role_patch.op(role).apply(regs);
        advance(&mut stage, Stage::RoleResolved);

        let key = identity::variant_key(regs);
        let variant = self.table.lookup(key);
        match variant {
            Some(variant) => {
                log::info!("{}: {} ({})", role, variant.label, key);
                apply_sequence(regs, variant.sequence);
                advance(&mut stage, Stage::VariantMatched);

                apply_sequence(regs, self.table.common);
                advance(&mut stage, Stage::CommonApplied);
            }
            None => {
                log::warn!("{}: no {} workarounds for {}", role, self.table.family, key);
                console.puts(UNKNOWN_NOTICE);
                advance(&mut stage, Stage::VariantUnknown);
            }
        }

        apply_sequence(regs, self.table.final_tuning);
        advance(&mut stage, Stage::FinalTuningApplied);

        advance(&mut stage, Stage::Done);
        Outcome { role, key, variant }
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    log::debug!("bring-up: {:?} -> {:?}", stage, next);
    *stage = next;
}

/// Bring up the executing core with the M1 table and default options.
///
/// Returns the label of the detected variant, for the caller to report.
pub fn init_cpu<R, C>(regs: &mut R, console: &mut C) -> &'static str
where
    R: SysRegs + ?Sized,
    C: Console + ?Sized,
{
    Dispatcher::new(&M1).run(regs, console).label()
}
