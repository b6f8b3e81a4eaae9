//! Bit layouts of the registers patched during bring-up.
//!
//! Only the fields that the workaround sequences touch are described; the rest
//! of each register is left alone. Names follow the Apple HID register naming
//! used in public reverse-engineering notes.
use registers::{fields::Field, register_bitfields, RegisterLongName};

/// Mask covering every bit of `field`, in register position.
pub const fn bits<R: RegisterLongName>(field: &Field<u64, R>) -> u64 {
    field.mask << field.shift
}

/// `value` placed into `field`, truncated to the field width.
pub const fn val<R: RegisterLongName>(field: &Field<u64, R>, value: u64) -> u64 {
    (value & field.mask) << field.shift
}

register_bitfields! {
    u64,

    /// Main ID Register
    pub MIDR [
        Implementer OFFSET(24) NUMBITS(8) [],
        Variant OFFSET(20) NUMBITS(4) [],
        Architecture OFFSET(16) NUMBITS(4) [],
        PartNum OFFSET(4) NUMBITS(12) [],
        Revision OFFSET(0) NUMBITS(4) []
    ],

    /// Multiprocessor Affinity Register
    pub MPIDR [
        Aff3 OFFSET(32) NUMBITS(8) [],
        U OFFSET(30) NUMBITS(1) [],
        MT OFFSET(24) NUMBITS(1) [],
        Aff2 OFFSET(16) NUMBITS(8) [],
        // low bit of Aff2: set on performance clusters
        PerfCluster OFFSET(16) NUMBITS(1) [],
        Aff1 OFFSET(8) NUMBITS(8) [],
        Aff0 OFFSET(0) NUMBITS(8) []
    ],

    pub HID0 [
        FETCH_WIDTH_DISABLE OFFSET(28) NUMBITS(1) [],
        CACHE_FUSION_DISABLE OFFSET(36) NUMBITS(1) [],
        SAME_PG_POWER_OPTIMIZATION OFFSET(45) NUMBITS(1) []
    ],

    pub HID1 [
        TRAP_SMC OFFSET(54) NUMBITS(1) []
    ],

    pub HID3 [
        DISABLE_ARBITER_FIX_BIF_CRD OFFSET(44) NUMBITS(1) [],
        DEV_PCIE_THROTTLE_ENABLE OFFSET(63) NUMBITS(1) []
    ],

    /// Shared by HID4 (performance cores) and EHID4 (efficiency cores).
    pub HID4 [
        DISABLE_DC_MVA OFFSET(11) NUMBITS(1) [],
        STNT_COUNTER_THRESHOLD OFFSET(40) NUMBITS(2) [],
        DISABLE_DC_SW_L2_OPS OFFSET(44) NUMBITS(1) []
    ],

    pub HID5 [
        DISABLE_FILL_2C_MERGE OFFSET(61) NUMBITS(1) []
    ],

    pub HID6 [
        UP_CRD_TKN_INIT_C2 OFFSET(5) NUMBITS(5) []
    ],

    pub HID7 [
        FORCE_NONSPEC_IF_SPEC_FLUSH_POINTER_INVALID_AND_MP_VALID OFFSET(16) NUMBITS(1) [],
        FORCE_NONSPEC_IF_STEPPING OFFSET(20) NUMBITS(1) [],
        FORCE_NONSPEC_TARGET_TIMER_SEL OFFSET(24) NUMBITS(2) []
    ],

    pub HID9 [
        TSO_ALLOW_DC_ZVA_WC OFFSET(26) NUMBITS(1) [],
        TSO_SERIALIZE_VLD_MICROOPS OFFSET(29) NUMBITS(1) [],
        FIX_BUG_51667805 OFFSET(48) NUMBITS(1) []
    ],

    pub EHID9 [
        DEV_2_THROTTLE_ENABLE OFFSET(5) NUMBITS(1) []
    ],

    pub EHID10 [
        FORCE_WAIT_STATE_DRAIN_UC OFFSET(32) NUMBITS(1) [],
        DISABLE_ZVA_TEMPORAL_TSO OFFSET(49) NUMBITS(1) []
    ],

    pub HID11 [
        DISABLE_LD_NT_WIDGET OFFSET(59) NUMBITS(1) []
    ],

    pub HID13 [
        PRE_CYCLES OFFSET(14) NUMBITS(4) []
    ],

    pub HID16 [
        SPAREBIT0 OFFSET(56) NUMBITS(1) [],
        SPAREBIT3 OFFSET(59) NUMBITS(1) [],
        ENABLE_MPX_PICK_45 OFFSET(61) NUMBITS(1) [],
        ENABLE_MP_CYCLONE_7 OFFSET(62) NUMBITS(1) []
    ],

    pub HID18 [
        HVC_SPECULATION_DISABLE OFFSET(14) NUMBITS(1) []
    ],

    pub EHID20 [
        TRAP_SMC OFFSET(8) NUMBITS(1) [],
        FORCE_NONSPEC_IF_OLDEST_REDIR_VALID_AND_OLDER OFFSET(15) NUMBITS(1) [],
        FORCE_NONSPEC_IF_SPEC_FLUSH_POINTER_NE_BLK_RTR_POINTER OFFSET(16) NUMBITS(1) [],
        FORCE_NONSPEC_TARGETED_TIMER_SEL OFFSET(21) NUMBITS(2) []
    ],

    pub HID21 [
        ENABLE_LDREX_FILL_REPLY OFFSET(19) NUMBITS(1) []
    ],

    pub CYC_OVRD [
        FIQ_MODE OFFSET(20) NUMBITS(2) [],
        IRQ_MODE OFFSET(22) NUMBITS(2) [],
        WFI_MODE OFFSET(24) NUMBITS(2) []
    ],

    pub ACC_CFG [
        BP_SLEEP OFFSET(2) NUMBITS(2) []
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_masks() {
        assert_eq!(bits(&HID4::DISABLE_DC_MVA), 1 << 11);
        assert_eq!(bits(&HID4::STNT_COUNTER_THRESHOLD), 3 << 40);
        assert_eq!(bits(&HID6::UP_CRD_TKN_INIT_C2), 0x1f << 5);
        assert_eq!(bits(&HID13::PRE_CYCLES), 0xf << 14);
        assert_eq!(bits(&HID3::DEV_PCIE_THROTTLE_ENABLE), 1 << 63);
    }

    #[test]
    fn field_values_truncate() {
        assert_eq!(val(&CYC_OVRD::WFI_MODE, 2), 2 << 24);
        assert_eq!(val(&ACC_CFG::BP_SLEEP, 3), 0xc);
        // only two bits wide
        assert_eq!(val(&ACC_CFG::BP_SLEEP, 7), 0xc);
    }

    #[test]
    fn part_number_field() {
        assert_eq!(bits(&MIDR::PartNum), 0xfff << 4);
        assert_eq!(MIDR::PartNum.read(0x611f_0230), 0x23);
    }
}
