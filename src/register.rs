//! Register banks and well-known register ids.

/// The register file a decoded register operand lives in.
///
/// Registers are identified by a `(bank, id)` pair rather than one flat
/// enumeration; the id is the hardware encoding (0 = rAX/XMM0/CR0/...).
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RegBank {
    /// 8/16/32/64 bit general purpose registers.
    Gpr,
    /// Segment registers.
    Seg,
    /// 80-bit x87 stack registers.
    Fpu,
    /// 64-bit MMX registers.
    Mmx,
    /// 128/256/512 bit vector registers (XMM/YMM/ZMM).
    Sse,
    /// Control registers.
    Cr,
    /// Debug registers.
    Dr,
    /// Test registers.
    Tr,
    /// MPX bound registers.
    Bnd,
    /// AVX-512 mask registers.
    Msk,
    /// AMX tile registers.
    Tile,
    /// Model specific registers.
    Msr,
    /// Extended control registers.
    Xcr,
    /// System table registers (GDTR, IDTR, LDTR, TR).
    Sys,
    /// x87 control/tag/status words.
    X87,
    /// The MXCSR register.
    Mxcsr,
    /// The PKRU register.
    Pkru,
    /// The shadow stack pointer.
    Ssp,
    /// The FLAGS/EFLAGS/RFLAGS register.
    Flg,
    /// The instruction pointer.
    Rip,
    /// The user interrupt flag.
    Uif,
}

/// Well-known register ids, by bank.
pub mod regs {
    // General purpose registers (the 64-bit names; the id is width-agnostic).
    pub const RAX: u8 = 0;
    pub const RCX: u8 = 1;
    pub const RDX: u8 = 2;
    pub const RBX: u8 = 3;
    pub const RSP: u8 = 4;
    pub const RBP: u8 = 5;
    pub const RSI: u8 = 6;
    pub const RDI: u8 = 7;
    pub const R8: u8 = 8;
    pub const R9: u8 = 9;
    pub const R10: u8 = 10;
    pub const R11: u8 = 11;
    pub const R12: u8 = 12;
    pub const R13: u8 = 13;
    pub const R14: u8 = 14;
    pub const R15: u8 = 15;

    // High byte registers share the 4..7 id space with the `is_high8` flag.
    pub const AH: u8 = 4;
    pub const CH: u8 = 5;
    pub const DH: u8 = 6;
    pub const BH: u8 = 7;

    // The 8-bit index register used by XLAT.
    pub const AL: u8 = 0;

    // Segment registers, in hardware encoding order.
    pub const ES: u8 = 0;
    pub const CS: u8 = 1;
    pub const SS: u8 = 2;
    pub const DS: u8 = 3;
    pub const FS: u8 = 4;
    pub const GS: u8 = 5;

    // Control registers.
    pub const CR0: u8 = 0;
    pub const CR8: u8 = 8;

    // System table registers.
    pub const GDTR: u8 = 0;
    pub const IDTR: u8 = 1;
    pub const LDTR: u8 = 2;
    pub const TR: u8 = 3;

    // x87 control/tag/status words.
    pub const X87_CONTROL: u8 = 0;
    pub const X87_TAG: u8 = 1;
    pub const X87_STATUS: u8 = 2;

    // Model specific registers referenced as implicit operands.
    pub const IA32_TSC: u32 = 0x0000_0010;
    pub const IA32_SYSENTER_CS: u32 = 0x0000_0174;
    pub const IA32_SYSENTER_ESP: u32 = 0x0000_0175;
    pub const IA32_SYSENTER_EIP: u32 = 0x0000_0176;
    pub const IA32_STAR: u32 = 0xC000_0081;
    pub const IA32_LSTAR: u32 = 0xC000_0082;
    pub const IA32_FMASK: u32 = 0xC000_0084;
    pub const IA32_FS_BASE: u32 = 0xC000_0100;
    pub const IA32_GS_BASE: u32 = 0xC000_0101;
    pub const IA32_KERNEL_GS_BASE: u32 = 0xC000_0102;
    pub const IA32_TSC_AUX: u32 = 0xC000_0103;

    /// Placeholder id for an MSR/XCR selected at runtime by ECX.
    pub const BY_ECX: u32 = 0xFFFF_FFFF;
}

/// Upper bounds for the per-bank access arrays in
/// [`AccessMap`](crate::AccessMap).
pub mod bank_size {
    pub const GPR: usize = 32;
    pub const SEG: usize = 8;
    pub const FPU: usize = 8;
    pub const MMX: usize = 8;
    pub const SSE: usize = 32;
    pub const CR: usize = 16;
    pub const DR: usize = 16;
    pub const TR: usize = 16;
    pub const BND: usize = 4;
    pub const MSK: usize = 8;
    pub const TILE: usize = 8;
    pub const SYS: usize = 8;
    pub const X87: usize = 8;
}
