use chicken_bits::{
    error::ParseSysRegError,
    sim::{RecordingConsole, SimRegs},
    Dispatcher, Options, SysReg, M1,
};
use clap::Parser;
use miette::IntoDiagnostic;
use tracing::Level;

mod report;

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
enum ArgError {
    #[error("`{0}` is not a number")]
    #[diagnostic(help("use decimal or 0x-prefixed hex"))]
    BadNumber(String),
    #[error("part number {0:#x} does not fit in 12 bits")]
    PartOutOfRange(u64),
    #[error("expected REG=VALUE, got `{0}`")]
    BadPreset(String),
    #[error(transparent)]
    BadRegister(#[from] ParseSysRegError),
    #[error("{0} is write-only and cannot be preset")]
    WriteOnly(SysReg),
}

fn parse_u64(s: &str) -> Result<u64, ArgError> {
    let s = s.trim().replace('_', "");
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| ArgError::BadNumber(s))
}

fn parse_part(s: &str) -> Result<u16, ArgError> {
    let part = parse_u64(s)?;
    if part > 0xfff {
        return Err(ArgError::PartOutOfRange(part));
    }
    Ok(part as u16)
}

fn parse_preset(s: &str) -> Result<(SysReg, u64), ArgError> {
    let (reg, value) = s
        .split_once('=')
        .ok_or_else(|| ArgError::BadPreset(s.to_string()))?;
    let reg: SysReg = reg.trim().parse()?;
    if !reg.access().readable() {
        return Err(ArgError::WriteOnly(reg));
    }
    Ok((reg, parse_u64(value)?))
}

/// Dry-run the per-core bring-up patches against a simulated register bank.
#[derive(clap::Parser, Clone, Debug)]
struct Cli {
    /// MIDR_EL1 part number of the simulated core.
    #[arg(long, default_value = "35", value_parser = parse_part)]
    part: u16,
    /// Raw MIDR_EL1 value; takes precedence over --part.
    #[arg(long, value_parser = parse_u64)]
    midr: Option<u64>,
    /// Core index within its cluster (MPIDR_EL1 Aff0).
    #[arg(long, default_value_t = 0)]
    core: u8,
    /// Simulate an efficiency core instead of a performance core.
    #[arg(long)]
    ecore: bool,
    /// Seed a register before the run, e.g. `HID4=0x800` or `s3_0_c15_c4_0=0x800`.
    #[arg(long = "preset", value_name = "REG=VALUE", value_parser = parse_preset)]
    presets: Vec<(SysReg, u64)>,
    /// Release the OS lock before patching.
    #[arg(long)]
    unlock_os_lock: bool,
    /// Print the known variants and their sequences, then exit.
    #[arg(long)]
    list: bool,
    /// Raise log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            unlock_os_lock: self.unlock_os_lock,
        }
    }

    fn simulated_core(&self) -> SimRegs {
        let mut regs = SimRegs::for_core(self.part, self.core, !self.ecore);
        if let Some(midr) = self.midr {
            regs.set(SysReg::MidrEl1, midr);
        }
        for (reg, value) in &self.presets {
            regs.set(*reg, *value);
        }
        regs
    }

    fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    tracing_log::LogTracer::init().into_diagnostic()?;
    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .without_time()
            .with_max_level(cli.log_level())
            .finish(),
    )
    .into_diagnostic()?;

    if cli.list {
        report::print_table(&M1);
        return Ok(());
    }

    let mut regs = cli.simulated_core();
    let mut console = RecordingConsole::default();
    let outcome = Dispatcher::new(&M1)
        .with_options(cli.options())
        .run(&mut regs, &mut console);

    tracing::info!("simulated {} on core {}", outcome.key, cli.core);
    report::print_run(&regs, &console, &outcome);

    Ok(())
}

#[cfg(test)]
mod tests {
    use chicken_bits::{CoreRole, UNKNOWN_LABEL};

    use super::*;

    fn run(args: &[&str]) -> (SimRegs, &'static str, CoreRole) {
        let cli = Cli::try_parse_from(std::iter::once("chicken-sim").chain(args.iter().copied()))
            .unwrap();
        let mut regs = cli.simulated_core();
        let mut console = RecordingConsole::default();
        let outcome = Dispatcher::new(&M1)
            .with_options(cli.options())
            .run(&mut regs, &mut console);
        (regs, outcome.label(), outcome.role)
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_u64("0x100").unwrap(), 0x100);
        assert_eq!(parse_u64("0X1_0000").unwrap(), 0x10000);
        assert_eq!(parse_u64("42").unwrap(), 42);
        assert!(matches!(parse_u64("0xzz"), Err(ArgError::BadNumber(_))));
        assert!(matches!(parse_part("0x1000"), Err(ArgError::PartOutOfRange(0x1000))));
    }

    #[test]
    fn presets() {
        assert_eq!(parse_preset("hid4=0x800").unwrap(), (SysReg::Hid4, 0x800));
        assert_eq!(
            parse_preset("s3_5_c15_c4_0=3").unwrap(),
            (SysReg::AccCfg, 3)
        );
        assert!(matches!(parse_preset("HID4"), Err(ArgError::BadPreset(_))));
        assert!(matches!(
            parse_preset("HID99=1"),
            Err(ArgError::BadRegister(ParseSysRegError::UnknownName))
        ));
        assert!(matches!(
            parse_preset("OSLAR_EL1=0"),
            Err(ArgError::WriteOnly(SysReg::OslarEl1))
        ));
    }

    #[test]
    fn default_is_a_firestorm_pcore() {
        let (regs, label, role) = run(&[]);
        assert_eq!(label, "M1 Firestorm");
        assert_eq!(role, CoreRole::Performance);
        assert_eq!(regs.value(SysReg::ImpSmpCfg), 0x100);
    }

    #[test]
    fn ecore_flag_and_part() {
        let (regs, label, role) = run(&["--part", "34", "--ecore", "--core", "3"]);
        assert_eq!(label, "M1 Icestorm");
        assert_eq!(role, CoreRole::Efficiency);
        assert_eq!(regs.value(SysReg::ImpCoreIndex), 3);
        assert_ne!(regs.value(SysReg::Ehid4), 0);
    }

    #[test]
    fn raw_midr_wins_over_part() {
        let (_, label, _) = run(&["--part", "34", "--midr", "0x611f0630"]);
        assert_eq!(label, UNKNOWN_LABEL);
    }

    #[test]
    fn presets_are_patched_not_replaced() {
        let (regs, _, _) = run(&["--preset", "HID3=0xffffffffffffffff", "--preset", "HID11=1"]);
        assert_eq!(regs.value(SysReg::Hid3), !((1 << 63) | (1 << 44)));
        assert_eq!(regs.value(SysReg::Hid11), 1 | (1 << 59));
    }

    #[test]
    fn os_lock_flag() {
        let (regs, _, _) = run(&["--unlock-os-lock"]);
        assert_eq!(regs.writes()[0], (SysReg::OslarEl1, 0));
    }
}
