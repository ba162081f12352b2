//! Shared enumerations and flag sets used across the decoder.

#![allow(non_camel_case_types)]

use bitflags::bitflags;

/// Default code (disassembly) mode.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum MachineMode {
    /// 16-bit real/protected mode code.
    Legacy16,
    /// 32-bit protected mode code.
    Legacy32,
    /// 64-bit long mode code.
    #[default]
    Long64,
}

impl MachineMode {
    pub(crate) fn width(self) -> Width {
        match self {
            MachineMode::Legacy16 => Width::W16,
            MachineMode::Legacy32 => Width::W32,
            MachineMode::Long64 => Width::W64,
        }
    }
}

/// Default data width.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DataWidth {
    _16,
    _32,
    _64,
}

/// Default stack width.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum StackWidth {
    _16,
    _32,
    #[default]
    _64,
}

impl StackWidth {
    pub(crate) fn width(self) -> Width {
        match self {
            StackWidth::_16 => Width::W16,
            StackWidth::_32 => Width::W32,
            StackWidth::_64 => Width::W64,
        }
    }
}

/// A 16/32/64-bit width selector, used for operand, address and stack
/// widths, both raw and effective.
///
/// The numeric value is the width index: `2 << index` is the width in bytes.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Width {
    #[default]
    W16 = 0,
    W32 = 1,
    W64 = 2,
}

impl Width {
    /// Width in bytes: 2, 4 or 8.
    pub fn bytes(self) -> u32 {
        2 << self as u32
    }

    /// Width in bits: 16, 32 or 64.
    pub fn bits(self) -> u32 {
        self.bytes() * 8
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// A 128/256/512-bit vector length selector.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum VecWidth {
    #[default]
    V128 = 0,
    V256 = 1,
    V512 = 2,
}

impl VecWidth {
    /// Vector length in bytes: 16, 32 or 64.
    pub fn bytes(self) -> u32 {
        16 << self as u32
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Preferred vendor, used to resolve encodings that Intel, AMD, Cyrix and
/// Geode assign different meanings to.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Vendor {
    /// Decode any vendor's instructions.
    #[default]
    Any = 0,
    Intel = 1,
    Amd = 2,
    Geode = 3,
    Cyrix = 4,
}

bitflags! {
    /// Optional ISA features the decoder honors.
    ///
    /// Some byte sequences decode differently depending on whether a feature
    /// is available (typically falling back to a NOP-class instruction when
    /// it is not). `ALL` is the default.
    #[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct Features: u8 {
        const MPX = 0x01;
        const CET = 0x02;
        const CLDEMOTE = 0x04;
        const PITI = 0x08;
        const MOVRS = 0x10;
        const BHI = 0x20;
        const APX = 0x40;
        const ALL = 0xFF;
    }
}

/// The encoding scheme an instruction was decoded from.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum EncodingMode {
    #[default]
    Legacy = 0,
    Xop = 1,
    Vex = 2,
    Evex = 3,
}

/// The VEX prefix form, when [`EncodingMode::Vex`] is used.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum VexForm {
    #[default]
    Vex2,
    Vex3,
}

/// EVEX extension flavor of the matched instruction.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum EvexMode {
    /// Regular EVEX (AVX-512 and friends).
    #[default]
    Evex = 0,
    /// VEX instruction promoted to EVEX (APX).
    VexPromoted = 1,
    /// Legacy instruction promoted to EVEX (APX).
    LegacyPromoted = 2,
    /// APX conditional-instruction form (CCMP/CTEST/CFCMOV).
    Cond = 3,
}

/// EVEX embedded rounding control.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum EvexRounding {
    /// Round to nearest (even).
    #[default]
    NearestEven = 0,
    /// Round down (toward negative infinity).
    Down = 1,
    /// Round up (toward positive infinity).
    Up = 2,
    /// Round toward zero.
    Zero = 3,
}

/// Shadow-stack access kind carried by shadow-stack memory operands.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ShadowStackKind {
    /// Explicit memory operand accessed as shadow stack.
    Explicit,
    /// SSP used as base for a conventional load/store.
    SspLoadStore,
    /// SSP used as base for a push/pop access.
    SspPushPop,
    /// The privilege-0 SSP (IA32_PL0_SSP).
    Pl0Ssp,
}

/// EVEX tuple type; drives the compressed displacement scale factor.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum TupleType {
    #[default]
    None,
    /// Full vector.
    Fv,
    /// Half vector.
    Hv,
    /// Quarter vector.
    Qv,
    /// Tuple1 scalar, 8 bit.
    T1S8,
    /// Tuple1 scalar, 16 bit.
    T1S16,
    /// Tuple1 scalar, 32/64 bit.
    T1S,
    /// Tuple1 float, 32/64 bit.
    T1F,
    /// Tuple2.
    T2,
    /// Tuple4.
    T4,
    /// Tuple8.
    T8,
    /// Full vector memory.
    Fvm,
    /// Half vector memory.
    Hvm,
    /// Quarter vector memory.
    Qvm,
    /// Eighth vector memory.
    Ovm,
    /// 128-bit memory.
    M128,
    /// MOVDDUP-style duplication.
    Dup,
    /// Four 32-bit memory elements.
    T1_4X,
}

impl TupleType {
    /// Whether the tuple describes a scalar access.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            TupleType::T1S | TupleType::T1S8 | TupleType::T1S16 | TupleType::T1F
        )
    }
}

/// Exception class of the matched instruction.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum ExceptionClass {
    #[default]
    None,
    /// Legacy SSE and VEX-encoded instructions.
    SseAvx,
    /// EVEX-encoded instructions.
    Evex,
    /// Opmask instructions.
    Opmask,
    /// VEX-encoded AMX instructions.
    Amx,
}

/// CPUID gate: the feature a decoded instruction is conditioned on.
///
/// `None` means the instruction is available on any CPU the crate models.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum CpuidFeature {
    #[default]
    None,
    _3DNOW,
    ADX,
    APX_F,
    AVX,
    AVX2,
    AVX512F,
    AVX512FP16,
    BMI1,
    BMI2,
    CET_IBT,
    CET_SS,
    CLDEMOTE,
    CLFSH,
    CMOV,
    CX8,
    CX16,
    FPU,
    FXSR,
    LONGMODE,
    LZCNT,
    MMX,
    MOVBE,
    MPX,
    MSR,
    POPCNT,
    PREFETCHW,
    RDRAND,
    RDSEED,
    SSE,
    SSE2,
    SSE42,
    SSSE3,
    TBM,
    TSC,
    XOP,
    XSAVE,
}

/// Instruction category.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Category {
    #[default]
    Invalid,
    _3DNOW,
    APX,
    ARITH,
    AVX,
    AVX2,
    AVX512,
    BITBYTE,
    BMI1,
    BMI2,
    CALL,
    CET,
    CMOV,
    COND_BR,
    CONVERT,
    DATAXFER,
    DECIMAL,
    FLAGOP,
    GATHER,
    INTERRUPT,
    IO,
    IOSTRINGOP,
    KMASK,
    LOGICAL,
    LOGICAL_FP,
    MISC,
    MMX,
    MPX,
    NOP,
    POP,
    PREFETCH,
    PUSH,
    RET,
    ROTATE,
    SEMAPHORE,
    SHIFT,
    SSE,
    STRINGOP,
    SYSCALL,
    SYSRET,
    SYSTEM,
    UNCOND_BR,
    WIDENOP,
    X87_ALU,
    XOP,
    XSAVE,
}

/// Instruction set the encoding belongs to.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum IsaSet {
    #[default]
    UNKNOWN,
    _3DNOW,
    ADX,
    AMD,
    APX_F,
    AVX,
    AVX2,
    AVX512F,
    AVX512FP16,
    BMI1,
    BMI2,
    CET_IBT,
    CET_SS,
    CLDEMOTE,
    CLFSH,
    CMOV,
    CMPXCHG16B,
    CYRIX,
    FPU,
    FXSR,
    I86,
    I186,
    I286PROT,
    I386,
    I486,
    I64,
    KMASK,
    LONGMODE,
    LZCNT,
    MMX,
    MOVBE,
    MPX,
    PAUSE,
    PENTIUMREAL,
    POPCNT,
    PPRO,
    PREFETCH_NOP,
    RDPMC,
    RDRAND,
    RDSEED,
    SSE,
    SSE2,
    SSE42,
    SSSE3,
    TBM,
    X87,
    XOP,
    XSAVE,
}

/// Instruction class (mnemonic family).
///
/// Condition-coded families (`Jcc`, `SETcc`, `CMOVcc`, `CCMP`) are a single
/// class; the decoded condition is reported separately on the instruction
/// record.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Mnemonic {
    #[default]
    INVALID,
    AAA,
    AAD,
    AAM,
    AAS,
    ADC,
    ADCX,
    ADD,
    ADDPD,
    ADDPS,
    ADDSD,
    ADDSS,
    ADOX,
    AND,
    ANDN,
    ARPL,
    BEXTR,
    BLCFILL,
    BLSI,
    BLSMSK,
    BLSR,
    BNDCL,
    BNDCU,
    BNDLDX,
    BNDMK,
    BNDMOV,
    BNDSTX,
    BOUND,
    BSF,
    BSR,
    BSWAP,
    BT,
    BTC,
    BTR,
    BTS,
    BZHI,
    CALLFD,
    CALLFI,
    CALLNI,
    CALLNR,
    CBW,
    CCMP,
    CDQ,
    CDQE,
    CLC,
    CLD,
    CLDEMOTE,
    CLFLUSH,
    CLFLUSHOPT,
    CLI,
    CLRSSBSY,
    CLTS,
    CMC,
    CMOVcc,
    CMP,
    CMPPS,
    CMPS,
    CMPXCHG,
    CMPXCHG16B,
    CMPXCHG8B,
    CPUID,
    CQO,
    CRC32,
    CWD,
    CWDE,
    DAA,
    DAS,
    DEC,
    DIV,
    EMMS,
    ENDBR32,
    ENDBR64,
    ENTER,
    FADD,
    HLT,
    IDIV,
    IMUL,
    IN,
    INC,
    INS,
    INT,
    INT1,
    INT3,
    INTO,
    INVD,
    INVLPG,
    IRET,
    JCXZ,
    JMPFD,
    JMPFI,
    JMPNI,
    JMPNR,
    Jcc,
    KMOVW,
    LAHF,
    LAR,
    LDMXCSR,
    LDS,
    LEA,
    LEAVE,
    LES,
    LFENCE,
    LFS,
    LGDT,
    LGS,
    LIDT,
    LLDT,
    LMSW,
    LODS,
    LOOP,
    LOOPNZ,
    LOOPZ,
    LSL,
    LSS,
    LTR,
    LZCNT,
    MFENCE,
    MOV,
    MOVAPD,
    MOVAPS,
    MOVBE,
    MOVD,
    MOVDQA,
    MOVDQU,
    MOVQ,
    MOVS,
    MOVSD,
    MOVSS,
    MOVSX,
    MOVSXD,
    MOVUPD,
    MOVUPS,
    MOVZX,
    MOV_CR,
    MOV_DR,
    MUL,
    NEG,
    NOP,
    NOT,
    OR,
    OUT,
    OUTS,
    PALIGNR,
    PAUSE,
    PAVGUSB,
    PFADD,
    PFMUL,
    PFRCP,
    PI2FD,
    POP,
    POPA,
    POPCNT,
    POPF,
    PREFETCH,
    PREFETCHNTA,
    PREFETCHT0,
    PREFETCHT1,
    PREFETCHT2,
    PREFETCHW,
    PSHUFB,
    PUSH,
    PUSHA,
    PUSHF,
    PXOR,
    RCL,
    RCR,
    RDMSR,
    RDPMC,
    RDRAND,
    RDSEED,
    RDSSPD,
    RDSSPQ,
    RDTSC,
    RETF,
    RETN,
    ROL,
    ROR,
    SAHF,
    SAL,
    SAR,
    SARX,
    SBB,
    SCAS,
    SETcc,
    SFENCE,
    SGDT,
    SHL,
    SHLD,
    SHLX,
    SHR,
    SHRD,
    SHRX,
    SIDT,
    SLDT,
    SMSW,
    STC,
    STD,
    STI,
    STMXCSR,
    STOS,
    STR,
    SUB,
    SYSCALL,
    SYSENTER,
    SYSEXIT,
    SYSRET,
    TEST,
    TZCNT,
    UD1,
    UD2,
    VADDPD,
    VADDPH,
    VADDPS,
    VADDSD,
    VADDSS,
    VBLENDVPS,
    VCMPPS,
    VERR,
    VERW,
    VFRCZPS,
    VGATHERDPS,
    VMOVAPS,
    VMOVSD,
    VMOVSS,
    VMOVUPS,
    VPALIGNR,
    VPBROADCASTD,
    VPGATHERDD,
    VPROTB,
    VXORPS,
    VZEROALL,
    VZEROUPPER,
    WAIT,
    WBINVD,
    WRMSR,
    XADD,
    XCHG,
    XLAT,
    XOR,
    XORPD,
    XORPS,
    XRSTOR,
    XSAVE,
}

impl Mnemonic {
    /// Returns the lower-case textual form of this mnemonic class.
    ///
    /// Condition-coded classes return the family name (`"jcc"`, `"setcc"`,
    /// `"cmovcc"`); the concrete condition lives on the instruction record.
    pub fn name(self) -> &'static str {
        use Mnemonic::*;
        match self {
            INVALID => "invalid",
            AAA => "aaa",
            AAD => "aad",
            AAM => "aam",
            AAS => "aas",
            ADC => "adc",
            ADCX => "adcx",
            ADD => "add",
            ADDPD => "addpd",
            ADDPS => "addps",
            ADDSD => "addsd",
            ADDSS => "addss",
            ADOX => "adox",
            AND => "and",
            ANDN => "andn",
            ARPL => "arpl",
            BEXTR => "bextr",
            BLCFILL => "blcfill",
            BLSI => "blsi",
            BLSMSK => "blsmsk",
            BLSR => "blsr",
            BNDCL => "bndcl",
            BNDCU => "bndcu",
            BNDLDX => "bndldx",
            BNDMK => "bndmk",
            BNDMOV => "bndmov",
            BNDSTX => "bndstx",
            BOUND => "bound",
            BSF => "bsf",
            BSR => "bsr",
            BSWAP => "bswap",
            BT => "bt",
            BTC => "btc",
            BTR => "btr",
            BTS => "bts",
            BZHI => "bzhi",
            CALLFD => "call far",
            CALLFI => "call far",
            CALLNI => "call",
            CALLNR => "call",
            CBW => "cbw",
            CCMP => "ccmp",
            CDQ => "cdq",
            CDQE => "cdqe",
            CLC => "clc",
            CLD => "cld",
            CLDEMOTE => "cldemote",
            CLFLUSH => "clflush",
            CLFLUSHOPT => "clflushopt",
            CLI => "cli",
            CLRSSBSY => "clrssbsy",
            CLTS => "clts",
            CMC => "cmc",
            CMOVcc => "cmovcc",
            CMP => "cmp",
            CMPPS => "cmpps",
            CMPS => "cmps",
            CMPXCHG => "cmpxchg",
            CMPXCHG16B => "cmpxchg16b",
            CMPXCHG8B => "cmpxchg8b",
            CPUID => "cpuid",
            CQO => "cqo",
            CRC32 => "crc32",
            CWD => "cwd",
            CWDE => "cwde",
            DAA => "daa",
            DAS => "das",
            DEC => "dec",
            DIV => "div",
            EMMS => "emms",
            ENDBR32 => "endbr32",
            ENDBR64 => "endbr64",
            ENTER => "enter",
            FADD => "fadd",
            HLT => "hlt",
            IDIV => "idiv",
            IMUL => "imul",
            IN => "in",
            INC => "inc",
            INS => "ins",
            INT => "int",
            INT1 => "int1",
            INT3 => "int3",
            INTO => "into",
            INVD => "invd",
            INVLPG => "invlpg",
            IRET => "iret",
            JCXZ => "jcxz",
            JMPFD => "jmp far",
            JMPFI => "jmp far",
            JMPNI => "jmp",
            JMPNR => "jmp",
            Jcc => "jcc",
            KMOVW => "kmovw",
            LAHF => "lahf",
            LAR => "lar",
            LDMXCSR => "ldmxcsr",
            LDS => "lds",
            LEA => "lea",
            LEAVE => "leave",
            LES => "les",
            LFENCE => "lfence",
            LFS => "lfs",
            LGDT => "lgdt",
            LGS => "lgs",
            LIDT => "lidt",
            LLDT => "lldt",
            LMSW => "lmsw",
            LODS => "lods",
            LOOP => "loop",
            LOOPNZ => "loopnz",
            LOOPZ => "loopz",
            LSL => "lsl",
            LSS => "lss",
            LTR => "ltr",
            LZCNT => "lzcnt",
            MFENCE => "mfence",
            MOV => "mov",
            MOVAPD => "movapd",
            MOVAPS => "movaps",
            MOVBE => "movbe",
            MOVD => "movd",
            MOVDQA => "movdqa",
            MOVDQU => "movdqu",
            MOVQ => "movq",
            MOVS => "movs",
            MOVSD => "movsd",
            MOVSS => "movss",
            MOVSX => "movsx",
            MOVSXD => "movsxd",
            MOVUPD => "movupd",
            MOVUPS => "movups",
            MOVZX => "movzx",
            MOV_CR => "mov",
            MOV_DR => "mov",
            MUL => "mul",
            NEG => "neg",
            NOP => "nop",
            NOT => "not",
            OR => "or",
            OUT => "out",
            OUTS => "outs",
            PALIGNR => "palignr",
            PAUSE => "pause",
            PAVGUSB => "pavgusb",
            PFADD => "pfadd",
            PFMUL => "pfmul",
            PFRCP => "pfrcp",
            PI2FD => "pi2fd",
            POP => "pop",
            POPA => "popa",
            POPCNT => "popcnt",
            POPF => "popf",
            PREFETCH => "prefetch",
            PREFETCHNTA => "prefetchnta",
            PREFETCHT0 => "prefetcht0",
            PREFETCHT1 => "prefetcht1",
            PREFETCHT2 => "prefetcht2",
            PREFETCHW => "prefetchw",
            PSHUFB => "pshufb",
            PUSH => "push",
            PUSHA => "pusha",
            PUSHF => "pushf",
            PXOR => "pxor",
            RCL => "rcl",
            RCR => "rcr",
            RDMSR => "rdmsr",
            RDPMC => "rdpmc",
            RDRAND => "rdrand",
            RDSEED => "rdseed",
            RDSSPD => "rdsspd",
            RDSSPQ => "rdsspq",
            RDTSC => "rdtsc",
            RETF => "ret far",
            RETN => "ret",
            ROL => "rol",
            ROR => "ror",
            SAHF => "sahf",
            SAL => "sal",
            SAR => "sar",
            SARX => "sarx",
            SBB => "sbb",
            SCAS => "scas",
            SETcc => "setcc",
            SFENCE => "sfence",
            SGDT => "sgdt",
            SHL => "shl",
            SHLD => "shld",
            SHLX => "shlx",
            SHR => "shr",
            SHRD => "shrd",
            SHRX => "shrx",
            SIDT => "sidt",
            SLDT => "sldt",
            SMSW => "smsw",
            STC => "stc",
            STD => "std",
            STI => "sti",
            STMXCSR => "stmxcsr",
            STOS => "stos",
            STR => "str",
            SUB => "sub",
            SYSCALL => "syscall",
            SYSENTER => "sysenter",
            SYSEXIT => "sysexit",
            SYSRET => "sysret",
            TEST => "test",
            TZCNT => "tzcnt",
            UD1 => "ud1",
            UD2 => "ud2",
            VADDPD => "vaddpd",
            VADDPH => "vaddph",
            VADDPS => "vaddps",
            VADDSD => "vaddsd",
            VADDSS => "vaddss",
            VBLENDVPS => "vblendvps",
            VCMPPS => "vcmpps",
            VERR => "verr",
            VERW => "verw",
            VFRCZPS => "vfrczps",
            VGATHERDPS => "vgatherdps",
            VMOVAPS => "vmovaps",
            VMOVSD => "vmovsd",
            VMOVSS => "vmovss",
            VMOVUPS => "vmovups",
            VPALIGNR => "vpalignr",
            VPBROADCASTD => "vpbroadcastd",
            VPGATHERDD => "vpgatherdd",
            VPROTB => "vprotb",
            VXORPS => "vxorps",
            VZEROALL => "vzeroall",
            VZEROUPPER => "vzeroupper",
            WAIT => "wait",
            WBINVD => "wbinvd",
            WRMSR => "wrmsr",
            XADD => "xadd",
            XCHG => "xchg",
            XLAT => "xlat",
            XOR => "xor",
            XORPD => "xorpd",
            XORPS => "xorps",
            XRSTOR => "xrstor",
            XSAVE => "xsave",
        }
    }
}

bitflags! {
    /// RFLAGS bit positions, used by the flags-access descriptors.
    ///
    /// The bits match the hardware layout of the FLAGS register, so masks
    /// can be applied to a live RFLAGS value directly.
    #[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct RflagsBits: u32 {
        const CF = 1 << 0;
        const PF = 1 << 2;
        const AF = 1 << 4;
        const ZF = 1 << 6;
        const SF = 1 << 7;
        const TF = 1 << 8;
        const IF = 1 << 9;
        const DF = 1 << 10;
        const OF = 1 << 11;
        const IOPL = 3 << 12;
        const NT = 1 << 14;
        const RF = 1 << 16;
        const VM = 1 << 17;
        const AC = 1 << 18;
        const VIF = 1 << 19;
        const VIP = 1 << 20;
        const ID = 1 << 21;
    }
}

/// Per-flag access summary extracted from the matched database entry.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct FlagsAccess {
    /// Flags read (tested) by the instruction.
    pub tested: RflagsBits,
    /// Flags modified according to the result.
    pub modified: RflagsBits,
    /// Flags always set to 1.
    pub set: RflagsBits,
    /// Flags always cleared to 0.
    pub cleared: RflagsBits,
    /// Flags left in an undefined state.
    pub undefined: RflagsBits,
}

/// Access mode of one x87 status-word condition bit.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum FpuFlagAccess {
    Cleared = 0,
    Set = 1,
    Modified = 2,
    #[default]
    Undefined = 3,
}

/// x87 C0-C3 condition-bit access, valid for FPU instructions.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct FpuFlags {
    pub c0: FpuFlagAccess,
    pub c1: FpuFlagAccess,
    pub c2: FpuFlagAccess,
    pub c3: FpuFlagAccess,
}
