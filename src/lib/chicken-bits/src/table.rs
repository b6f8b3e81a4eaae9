//! Per-variant workaround sequences.
//!
//! The table is plain data: adding a variant means adding a [Variant] entry,
//! not touching the dispatch code. Several steps below have no public
//! rationale; they are kept as-is because the vendor's own bring-up performs
//! them.
use crate::{
    fields::{
        bits, val, ACC_CFG, CYC_OVRD, EHID10, EHID20, EHID9, HID0, HID1, HID11, HID13, HID16,
        HID18, HID21, HID3, HID4, HID5, HID6, HID7, HID9,
    },
    identity::{CoreRole, VariantKey},
    patch::{PatchOp, PatchSequence},
    sysreg::SysReg,
};

/// Label returned when the running part is not in the table.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// A known core microarchitecture and the sequence specific to it.
#[derive(Debug)]
pub struct Variant {
    pub key: VariantKey,
    /// Human-readable "<family> <variant>" name.
    pub label: &'static str,
    pub sequence: &'static PatchSequence,
}

/// Patch applied to every core before variant dispatch. Efficiency and
/// performance cores carry the same field layout in different registers.
#[derive(Debug, Clone, Copy)]
pub struct RolePatch {
    pub efficiency: SysReg,
    pub performance: SysReg,
    pub bits: u64,
}

impl RolePatch {
    pub const fn op(&self, role: CoreRole) -> PatchOp {
        let reg = match role {
            CoreRole::Efficiency => self.efficiency,
            CoreRole::Performance => self.performance,
        };
        PatchOp::set(reg, self.bits)
    }
}

/// Everything the dispatch engine needs for one processor family.
#[derive(Debug)]
pub struct PatchTable {
    pub family: &'static str,
    pub role_patch: RolePatch,
    pub variants: &'static [Variant],
    /// Runs after the variant sequence, for known variants only.
    pub common: &'static PatchSequence,
    /// Runs last on every core, recognised or not.
    pub final_tuning: &'static PatchSequence,
}

impl PatchTable {
    pub fn lookup(&self, key: VariantKey) -> Option<&Variant> {
        self.variants.iter().find(|v| v.key == key)
    }
}

const PART_M1_ICESTORM: VariantKey = VariantKey::new(34);
const PART_M1_FIRESTORM: VariantKey = VariantKey::new(35);

const M1_ICESTORM: &PatchSequence = &[
    // Sibling merge in the LLC can let an uncached load violate memory ordering.
    PatchOp::set(SysReg::Hid5, bits(&HID5::DISABLE_FILL_2C_MERGE)),
    PatchOp::clear(SysReg::Ehid9, bits(&EHID9::DEV_2_THROTTLE_ENABLE)),
    // No store-to-load forwarding for uncached memory, to keep barrier ordering.
    PatchOp::set(
        SysReg::Ehid10,
        bits(&EHID10::FORCE_WAIT_STATE_DRAIN_UC) | bits(&EHID10::DISABLE_ZVA_TEMPORAL_TSO),
    ),
    PatchOp::set(SysReg::Ehid20, bits(&EHID20::TRAP_SMC)),
    PatchOp::set(
        SysReg::Ehid20,
        bits(&EHID20::FORCE_NONSPEC_IF_OLDEST_REDIR_VALID_AND_OLDER)
            | bits(&EHID20::FORCE_NONSPEC_IF_SPEC_FLUSH_POINTER_NE_BLK_RTR_POINTER),
    ),
    PatchOp::mask(
        SysReg::Ehid20,
        bits(&EHID20::FORCE_NONSPEC_TARGETED_TIMER_SEL),
        val(&EHID20::FORCE_NONSPEC_TARGETED_TIMER_SEL, 3),
    ),
];

const M1_FIRESTORM: &PatchSequence = &[
    // Cross-beat crypto (AES/PMUL) icache fusion is not disabled for
    // unconditional branch recoded instructions.
    PatchOp::set(
        SysReg::Hid0,
        bits(&HID0::SAME_PG_POWER_OPTIMIZATION)
            | bits(&HID0::FETCH_WIDTH_DISABLE)
            | bits(&HID0::CACHE_FUSION_DISABLE),
    ),
    PatchOp::set(SysReg::Hid1, bits(&HID1::TRAP_SMC)),
    PatchOp::clear(
        SysReg::Hid3,
        bits(&HID3::DEV_PCIE_THROTTLE_ENABLE) | bits(&HID3::DISABLE_ARBITER_FIX_BIF_CRD),
    ),
    // Post-silicon tuning of the STNT widget contiguous counter threshold.
    PatchOp::mask(
        SysReg::Hid4,
        bits(&HID4::STNT_COUNTER_THRESHOLD),
        val(&HID4::STNT_COUNTER_THRESHOLD, 3),
    ),
    // Sibling merge in the LLC can let an uncached load violate memory ordering.
    PatchOp::set(SysReg::Hid5, bits(&HID5::DISABLE_FILL_2C_MERGE)),
    PatchOp::mask(
        SysReg::Hid6,
        bits(&HID6::UP_CRD_TKN_INIT_C2),
        val(&HID6::UP_CRD_TKN_INIT_C2, 0),
    ),
    PatchOp::set(
        SysReg::Hid7,
        bits(&HID7::FORCE_NONSPEC_IF_STEPPING)
            | bits(&HID7::FORCE_NONSPEC_IF_SPEC_FLUSH_POINTER_INVALID_AND_MP_VALID),
    ),
    PatchOp::mask(
        SysReg::Hid7,
        bits(&HID7::FORCE_NONSPEC_TARGET_TIMER_SEL),
        val(&HID7::FORCE_NONSPEC_TARGET_TIMER_SEL, 3),
    ),
    PatchOp::set(
        SysReg::Hid9,
        bits(&HID9::TSO_ALLOW_DC_ZVA_WC)
            | bits(&HID9::TSO_SERIALIZE_VLD_MICROOPS)
            | bits(&HID9::FIX_BUG_51667805),
    ),
    PatchOp::set(SysReg::Hid11, bits(&HID11::DISABLE_LD_NT_WIDGET)),
    // Dummy cycles around NEX power gating, for correct temperature readings.
    PatchOp::mask(
        SysReg::Hid13,
        bits(&HID13::PRE_CYCLES),
        val(&HID13::PRE_CYCLES, 4),
    ),
    // Possibly the RF bank / multipass conflict livelock.
    PatchOp::set(
        SysReg::Hid16,
        bits(&HID16::SPAREBIT0)
            | bits(&HID16::SPAREBIT3)
            | bits(&HID16::ENABLE_MPX_PICK_45)
            | bits(&HID16::ENABLE_MP_CYCLONE_7),
    ),
    PatchOp::set(SysReg::Hid18, bits(&HID18::HVC_SPECULATION_DISABLE)),
    PatchOp::clear(SysReg::Hid21, bits(&HID21::ENABLE_LDREX_FILL_REPLY)),
];

const M1_COMMON: &PatchSequence = &[
    PatchOp::WriteCoreIndex {
        reg: SysReg::ImpCoreIndex,
    },
    PatchOp::write(SysReg::ImpSmpCfg, 0x100),
    PatchOp::Isb,
];

const M1_FINAL_TUNING: &PatchSequence = &[
    // Unmask external IRQ/FIQ, WFI mode 2 ("up").
    PatchOp::mask(
        SysReg::CycOvrd,
        bits(&CYC_OVRD::FIQ_MODE) | bits(&CYC_OVRD::IRQ_MODE) | bits(&CYC_OVRD::WFI_MODE),
        val(&CYC_OVRD::FIQ_MODE, 0) | val(&CYC_OVRD::IRQ_MODE, 0) | val(&CYC_OVRD::WFI_MODE, 2),
    ),
    // Keep branch predictor state across ACC sleep.
    PatchOp::mask(
        SysReg::AccCfg,
        bits(&ACC_CFG::BP_SLEEP),
        val(&ACC_CFG::BP_SLEEP, 3),
    ),
];

/// The Apple M1 family.
pub static M1: PatchTable = PatchTable {
    family: "M1",
    role_patch: RolePatch {
        efficiency: SysReg::Ehid4,
        performance: SysReg::Hid4,
        bits: bits(&HID4::DISABLE_DC_MVA) | bits(&HID4::DISABLE_DC_SW_L2_OPS),
    },
    variants: &[
        Variant {
            key: PART_M1_FIRESTORM,
            label: "M1 Firestorm",
            sequence: M1_FIRESTORM,
        },
        Variant {
            key: PART_M1_ICESTORM,
            label: "M1 Icestorm",
            sequence: M1_ICESTORM,
        },
    ],
    common: M1_COMMON,
    final_tuning: M1_FINAL_TUNING,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn all_sequences() -> impl Iterator<Item = &'static PatchOp> {
        M1.variants
            .iter()
            .flat_map(|v| v.sequence.iter())
            .chain(M1.common.iter())
            .chain(M1.final_tuning.iter())
    }

    #[test]
    fn keys_are_unique() {
        for (i, a) in M1.variants.iter().enumerate() {
            for b in &M1.variants[i + 1..] {
                assert_ne!(a.key, b.key);
            }
        }
    }

    #[test]
    fn lookup_hits_only_known_parts() {
        assert_eq!(M1.lookup(VariantKey::new(34)).map(|v| v.label), Some("M1 Icestorm"));
        assert_eq!(M1.lookup(VariantKey::new(35)).map(|v| v.label), Some("M1 Firestorm"));
        assert!(M1.lookup(VariantKey::new(99)).is_none());
        assert!(M1.lookup(VariantKey::new(0)).is_none());
    }

    #[test]
    fn labels_name_the_family() {
        for v in M1.variants {
            assert!(v.label.starts_with(M1.family), "{}", v.label);
            assert_ne!(v.label, UNKNOWN_LABEL);
        }
    }

    #[test]
    fn ops_respect_register_access() {
        for op in all_sequences() {
            if let Some(reg) = op.target() {
                assert!(reg.access().writable(), "{} is not writable", reg);
                if op.is_read_modify_write() {
                    assert!(reg.access().readable(), "{} is not readable", reg);
                }
            }
        }
    }

    #[test]
    fn mask_values_stay_inside_their_mask() {
        for op in all_sequences() {
            if let PatchOp::Mask { reg, clear, set } = *op {
                assert_eq!(set & !clear, 0, "{}: {:#x} escapes {:#x}", reg, set, clear);
            }
        }
    }

    #[test]
    fn no_op_is_empty() {
        for op in all_sequences() {
            match *op {
                PatchOp::Set { bits, .. } => assert_ne!(bits, 0),
                PatchOp::Clear { mask, .. } => assert_ne!(mask, 0),
                PatchOp::Mask { clear, .. } => assert_ne!(clear, 0),
                _ => {}
            }
        }
    }

    #[test]
    fn role_patch_targets() {
        assert_eq!(
            M1.role_patch.op(CoreRole::Efficiency),
            PatchOp::set(SysReg::Ehid4, (1 << 11) | (1 << 44))
        );
        assert_eq!(
            M1.role_patch.op(CoreRole::Performance),
            PatchOp::set(SysReg::Hid4, (1 << 11) | (1 << 44))
        );
    }

    #[test]
    fn common_ends_with_barrier() {
        assert_eq!(M1.common.last(), Some(&PatchOp::Isb));
    }
}
