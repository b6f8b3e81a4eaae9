//! Names, encodings and the access capability for the system registers touched
//! during core bring-up.
use core::{fmt, str::FromStr};

use crate::error::ParseSysRegError;

/// The `(op0, op1, CRn, CRm, op2)` tuple that selects a system register in
/// `mrs`/`msr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Encoding {
    pub op0: u8,
    pub op1: u8,
    pub crn: u8,
    pub crm: u8,
    pub op2: u8,
}

impl Encoding {
    pub const fn new(op0: u8, op1: u8, crn: u8, crm: u8, op2: u8) -> Self {
        Self {
            op0,
            op1,
            crn,
            crm,
            op2,
        }
    }
}

impl fmt::Display for Encoding {
    // Same spelling the assembler accepts for registers it has no name for.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "s{}_{}_c{}_c{}_{}",
            self.op0, self.op1, self.crn, self.crm, self.op2
        )
    }
}

impl FromStr for Encoding {
    type Err = ParseSysRegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix('s')
            .or_else(|| s.strip_prefix('S'))
            .ok_or(ParseSysRegError::MalformedEncoding)?;

        let mut parts = rest.split('_');
        let mut next = |crx: bool| -> Result<u8, ParseSysRegError> {
            let part = parts.next().ok_or(ParseSysRegError::MalformedEncoding)?;
            let digits = if crx {
                part.strip_prefix('c')
                    .or_else(|| part.strip_prefix('C'))
                    .ok_or(ParseSysRegError::MalformedEncoding)?
            } else {
                part
            };
            digits
                .parse()
                .map_err(|_| ParseSysRegError::MalformedEncoding)
        };

        let encoding = Encoding::new(
            next(false)?,
            next(false)?,
            next(true)?,
            next(true)?,
            next(false)?,
        );
        if parts.next().is_some() {
            return Err(ParseSysRegError::MalformedEncoding);
        }
        Ok(encoding)
    }
}

/// Which directions of access the hardware permits for a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl RegAccess {
    pub const fn readable(self) -> bool {
        !matches!(self, RegAccess::WriteOnly)
    }

    pub const fn writable(self) -> bool {
        !matches!(self, RegAccess::ReadOnly)
    }
}

macro_rules! sysregs {
    ($(
        $(#[$doc:meta])*
        $variant:ident => $name:literal, $access:ident, ($op0:literal, $op1:literal, $crn:literal, $crm:literal, $op2:literal);
    )*) => {
        /// A system register this crate knows how to name and access.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum SysReg {
            $(
                $(#[$doc])*
                $variant,
            )*
        }

        impl SysReg {
            /// Every known register, in declaration order.
            pub const ALL: &'static [SysReg] = &[$(SysReg::$variant),*];

            /// The conventional upper-case name of the register.
            pub const fn name(self) -> &'static str {
                match self {
                    $(SysReg::$variant => $name,)*
                }
            }

            pub const fn encoding(self) -> Encoding {
                match self {
                    $(SysReg::$variant => Encoding::new($op0, $op1, $crn, $crm, $op2),)*
                }
            }

            pub const fn access(self) -> RegAccess {
                match self {
                    $(SysReg::$variant => RegAccess::$access,)*
                }
            }
        }
    };
}

sysregs! {
    /// Main ID Register.
    MidrEl1 => "MIDR_EL1", ReadOnly, (3, 0, 0, 0, 0);
    /// Multiprocessor Affinity Register.
    MpidrEl1 => "MPIDR_EL1", ReadOnly, (3, 0, 0, 0, 5);
    /// OS Lock Access Register.
    OslarEl1 => "OSLAR_EL1", WriteOnly, (2, 0, 1, 0, 4);
    Hid0 => "HID0", ReadWrite, (3, 0, 15, 0, 0);
    Hid1 => "HID1", ReadWrite, (3, 0, 15, 1, 0);
    Hid3 => "HID3", ReadWrite, (3, 0, 15, 3, 0);
    /// Performance-core HID4; efficiency cores carry the same layout in EHID4.
    Hid4 => "HID4", ReadWrite, (3, 0, 15, 4, 0);
    Ehid4 => "EHID4", ReadWrite, (3, 0, 15, 4, 1);
    Hid5 => "HID5", ReadWrite, (3, 0, 15, 5, 0);
    Hid6 => "HID6", ReadWrite, (3, 0, 15, 6, 0);
    Hid7 => "HID7", ReadWrite, (3, 0, 15, 7, 0);
    Hid9 => "HID9", ReadWrite, (3, 0, 15, 9, 0);
    Ehid9 => "EHID9", ReadWrite, (3, 0, 15, 9, 1);
    Ehid10 => "EHID10", ReadWrite, (3, 0, 15, 10, 1);
    Hid11 => "HID11", ReadWrite, (3, 0, 15, 11, 0);
    Hid13 => "HID13", ReadWrite, (3, 0, 15, 14, 0);
    Hid16 => "HID16", ReadWrite, (3, 0, 15, 15, 2);
    Hid18 => "HID18", ReadWrite, (3, 0, 15, 11, 2);
    Ehid20 => "EHID20", ReadWrite, (3, 0, 15, 1, 2);
    Hid21 => "HID21", ReadWrite, (3, 0, 15, 1, 3);
    /// Cycle override: interrupt masking and WFI behaviour.
    CycOvrd => "CYC_OVRD", ReadWrite, (3, 5, 15, 5, 0);
    /// Apple core complex configuration.
    AccCfg => "ACC_CFG", ReadWrite, (3, 5, 15, 4, 0);
    /// Receives the core's Aff0 index during the family handshake.
    ImpCoreIndex => "IMP_CORE_INDEX", ReadWrite, (3, 4, 15, 5, 0);
    ImpSmpCfg => "IMP_SMP_CFG", ReadWrite, (3, 4, 15, 1, 4);
}

impl SysReg {
    /// Find the register with the given encoding.
    pub fn from_encoding(encoding: Encoding) -> Option<SysReg> {
        SysReg::ALL
            .iter()
            .copied()
            .find(|reg| reg.encoding() == encoding)
    }
}

impl fmt::Display for SysReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SysReg {
    type Err = ParseSysRegError;

    /// Accepts either a register name (`hid4`, `CYC_OVRD`) or a generic
    /// encoding (`s3_0_c15_c4_0`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(reg) = SysReg::ALL
            .iter()
            .copied()
            .find(|reg| reg.name().eq_ignore_ascii_case(s))
        {
            return Ok(reg);
        }

        match s.parse::<Encoding>() {
            Ok(encoding) => {
                SysReg::from_encoding(encoding).ok_or(ParseSysRegError::UnknownEncoding(encoding))
            }
            Err(_) => Err(ParseSysRegError::UnknownName),
        }
    }
}

/// Access to the executing core's system registers.
///
/// Implementations must always act on the core they run on: bring-up runs
/// concurrently on every core and each must see only its own identity.
pub trait SysRegs {
    fn read(&mut self, reg: SysReg) -> u64;

    fn write(&mut self, reg: SysReg, value: u64);

    /// Instruction synchronization barrier.
    fn isb(&mut self);
}

/// Low-level text output used for the bring-up notice.
pub trait Console {
    fn puts(&mut self, msg: &str);
}

impl<F: FnMut(&str)> Console for F {
    fn puts(&mut self, msg: &str) {
        self(msg)
    }
}
