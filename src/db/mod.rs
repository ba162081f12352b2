//! The instruction database: entry metadata, packed operand specifiers and
//! the dispatch-graph node type.
//!
//! Everything in this module is immutable, `'static`, and laid out the way
//! an offline table generator emits it; the decoder only reads it.

use bitflags::bitflags;

use crate::enums::{
    Category, CpuidFeature, EvexMode, ExceptionClass, FpuFlags, IsaSet, Mnemonic, RflagsBits,
    TupleType,
};
use crate::operand::OpAccess;

mod entries;
mod modrm;
mod rex2;
mod tables;

pub use entries::INSTRUCTIONS;
pub(crate) use modrm::{disp_size_16, disp_size_3264, modrm_kind, ModRmKind};
pub(crate) use rex2::rex2_allows;
pub(crate) use tables::{EVEX_ROOT, LEGACY_ROOT, VEX_ROOT, XOP_ROOT};

bitflags! {
    /// Per-entry attribute bits.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct InsAttributes: u32 {
        /// The instruction has a ModRM byte.
        const MODRM        = 0x0000_0001;
        /// Operand forced to 64 bit in long mode; 0x66 is ignored.
        const F64          = 0x0000_0002;
        /// Operand defaults to 64 bit in long mode.
        const D64          = 0x0000_0004;
        /// Only valid in 64-bit mode.
        const O64          = 0x0000_0008;
        /// Invalid in 64-bit mode.
        const I64          = 0x0000_0010;
        /// Condition code in the low 4 opcode bits.
        const COND         = 0x0000_0020;
        /// SSE condition byte in the immediate.
        const SSE_CONDB    = 0x0000_0040;
        /// VSIB addressing.
        const VSIB         = 0x0000_0080;
        /// MIB addressing.
        const MIB          = 0x0000_0100;
        /// XOP/VEX/EVEX.L is ignored.
        const LIG          = 0x0000_0200;
        /// XOP/VEX/EVEX.W is ignored.
        const WIG          = 0x0000_0400;
        /// 3DNow! encoding; the opcode is the last byte.
        const _3DNOW       = 0x0000_0800;
        /// MOV to/from CR with LOCK selects CR8 (32-bit, AMD).
        const LOCK_SPECIAL = 0x0000_1000;
        /// k0 is not accepted as mask.
        const MMASK        = 0x0000_2000;
        /// Zeroing not permitted on memory.
        const NOMZ         = 0x0000_4000;
        /// 128-bit encoding not permitted.
        const NOL0         = 0x0000_8000;
        /// 16-bit addressing not supported.
        const NOA16        = 0x0001_0000;
        /// ModRM.mod is forced to register; no SIB/displacement.
        const MFR          = 0x0002_0000;
        /// SIMD instruction operating on vector registers.
        const VECTOR       = 0x0004_0000;
        /// Mandatory 0x66 that still changes operand size (MOVBE/CRC32).
        const S66          = 0x0008_0000;
        /// Bitbase addressing (BT family).
        const BITBASE      = 0x0010_0000;
        /// Address generator; no memory access (LEA/MPX).
        const AG           = 0x0020_0000;
        /// Shadow-stack access.
        const SHS          = 0x0040_0000;
        /// CET tracked indirect branch.
        const CETT         = 0x0080_0000;
        /// Serializing instruction.
        const SERIAL       = 0x0100_0000;
        /// RIP-relative addressing not supported.
        const NO_RIP_REL   = 0x0200_0000;
        /// 0x66 not accepted.
        const NO66         = 0x0400_0000;
        /// Sibmem addressing (AMX).
        const SIBMEM       = 0x0800_0000;
        /// 0x67 ignored in 64-bit mode (MPX).
        const I67          = 0x1000_0000;
        /// EVEX embedded rounding is ignored.
        const IER          = 0x2000_0000;
        /// VEX/EVEX.W ignored outside 64-bit mode.
        const IWO64        = 0x4000_0000;
        /// EVEX compressed prefix behaves as the 0x66 size prefix.
        const SCALABLE     = 0x8000_0000;
    }
}

bitflags! {
    /// Legacy prefixes an entry accepts.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct ValidPrefixes: u16 {
        const REP         = 0x0001;
        const REP_COND    = 0x0002;
        const LOCK        = 0x0004;
        const HLE         = 0x0008;
        const XACQUIRE    = 0x0010;
        const XRELEASE    = 0x0020;
        const BND         = 0x0040;
        const BHINT       = 0x0080;
        const HLE_NO_LOCK = 0x0100;
        const DNT         = 0x0200;
    }
}

bitflags! {
    /// EVEX decorators an entry accepts.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct ValidDecorators: u8 {
        const ER        = 0x01;
        const SAE       = 0x02;
        const ZERO      = 0x04;
        const MASK      = 0x08;
        const BROADCAST = 0x10;
        const ND        = 0x20;
        const ZU        = 0x40;
        const NF        = 0x80;
    }
}

bitflags! {
    /// CPU operating modes an entry is valid in.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct ValidModes: u32 {
        const RING0    = 0x0000_0001;
        const RING1    = 0x0000_0002;
        const RING2    = 0x0000_0004;
        const RING3    = 0x0000_0008;
        const REAL     = 0x0000_0010;
        const V8086    = 0x0000_0020;
        const PROT     = 0x0000_0040;
        const COMPAT   = 0x0000_0080;
        const LONG     = 0x0000_0100;
        const SMM      = 0x0000_1000;
        const SMM_OFF  = 0x0000_2000;
        const SGX      = 0x0000_4000;
        const SGX_OFF  = 0x0000_8000;
        const TSX      = 0x0001_0000;
        const TSX_OFF  = 0x0002_0000;
        const VMXR     = 0x0004_0000;
        const VMXN     = 0x0008_0000;
        const VMXR_SEAM = 0x0010_0000;
        const VMXN_SEAM = 0x0020_0000;
        const VMX_OFF  = 0x0040_0000;
        const ANY      = 0xFFFF_FFFF;
        const RING_ALL = 0x0000_000F;
        const MODE_ALL = 0x0000_01F0;
        /// Ring 0 only (the common privileged pattern).
        const KERNEL   = 0xFFFF_FFF1;
        /// Everything except real mode and virtual-8086.
        const NO_REAL  = 0xFFFF_FFCF;
    }
}

/// Payload-byte descriptor (`Ipb`): what trails the addressing bytes.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Ipb {
    #[default]
    None,
    /// One byte immediate.
    Ib,
    /// Two byte immediate.
    Iw,
    /// Four byte immediate.
    Id,
    /// Operand-size immediate (2/4/8).
    Iv,
    /// Operand-size immediate capped at 4 bytes (2/4/4).
    Iz,
    /// Word immediate followed by byte immediate (ENTER).
    Iwb,
    /// Two byte immediates.
    Ibb,
    /// One byte relative offset.
    Jb,
    /// Operand-size relative offset capped at 4 bytes.
    Jz,
    /// Far pointer, 4/6/10 bytes by operand mode.
    Ap,
    /// 8 byte near absolute address.
    Aq,
    /// Moffset sized by address mode.
    Oa,
    /// is4 SSE register-in-immediate byte.
    Lb,
}

/// One instruction-database entry, selected by the dispatch walker.
#[derive(Copy, Clone, Debug)]
pub struct IdbEntry {
    pub mnemonic: Mnemonic,
    pub category: Category,
    pub isa_set: IsaSet,
    pub valid_modes: ValidModes,
    pub valid_prefixes: ValidPrefixes,
    pub valid_decorators: ValidDecorators,
    pub operands: &'static [OpSpecifier],
    pub attributes: InsAttributes,
    pub ipb: Ipb,
    pub tuple: TupleType,
    pub evex_mode: EvexMode,
    pub exc_class: ExceptionClass,
    pub exc_type: u8,
    pub cpuid: CpuidFeature,
    pub tested: RflagsBits,
    pub modified: RflagsBits,
    pub set: RflagsBits,
    pub cleared: RflagsBits,
    pub fpu_flags: FpuFlags,
    pub cs_access: OpAccess,
    pub rip_access: OpAccess,
    pub rfl_access: OpAccess,
    pub mem1_access: OpAccess,
    pub mem2_access: OpAccess,
    pub stk_access: OpAccess,
    pub stk_words: u8,
}

impl IdbEntry {
    /// The all-defaults entry the table data builds on.
    pub const EMPTY: IdbEntry = IdbEntry {
        mnemonic: Mnemonic::INVALID,
        category: Category::Invalid,
        isa_set: IsaSet::UNKNOWN,
        valid_modes: ValidModes::ANY,
        valid_prefixes: ValidPrefixes::empty(),
        valid_decorators: ValidDecorators::empty(),
        operands: &[],
        attributes: InsAttributes::empty(),
        ipb: Ipb::None,
        tuple: TupleType::None,
        evex_mode: EvexMode::Evex,
        exc_class: ExceptionClass::None,
        exc_type: 0,
        cpuid: CpuidFeature::None,
        tested: RflagsBits::empty(),
        modified: RflagsBits::empty(),
        set: RflagsBits::empty(),
        cleared: RflagsBits::empty(),
        fpu_flags: FpuFlags {
            c0: crate::enums::FpuFlagAccess::Undefined,
            c1: crate::enums::FpuFlagAccess::Undefined,
            c2: crate::enums::FpuFlagAccess::Undefined,
            c3: crate::enums::FpuFlagAccess::Undefined,
        },
        cs_access: OpAccess::empty(),
        rip_access: OpAccess::empty(),
        rfl_access: OpAccess::empty(),
        mem1_access: OpAccess::empty(),
        mem2_access: OpAccess::empty(),
        stk_access: OpAccess::empty(),
        stk_words: 0,
    };

    /// Looks up an entry by the index stored in a terminal dispatch node.
    pub fn get(index: u16) -> Option<&'static IdbEntry> {
        INSTRUCTIONS.get(index as usize)
    }

    // Const builders used by the generated entry data.

    pub(crate) const fn with_prefixes(mut self, v: ValidPrefixes) -> Self {
        self.valid_prefixes = v;
        self
    }

    pub(crate) const fn with_decorators(mut self, v: ValidDecorators) -> Self {
        self.valid_decorators = v;
        self
    }

    pub(crate) const fn with_modes(mut self, v: ValidModes) -> Self {
        self.valid_modes = v;
        self
    }

    pub(crate) const fn with_ipb(mut self, ipb: Ipb) -> Self {
        self.ipb = ipb;
        self
    }

    pub(crate) const fn with_tuple(mut self, tuple: TupleType) -> Self {
        self.tuple = tuple;
        self
    }

    pub(crate) const fn with_evex_mode(mut self, mode: EvexMode) -> Self {
        self.evex_mode = mode;
        self
    }

    pub(crate) const fn with_cpuid(mut self, cpuid: CpuidFeature) -> Self {
        self.cpuid = cpuid;
        self
    }

    pub(crate) const fn with_exc(mut self, class: ExceptionClass, ty: u8) -> Self {
        self.exc_class = class;
        self.exc_type = ty;
        self
    }

    pub(crate) const fn with_tested(mut self, flags: RflagsBits) -> Self {
        self.tested = flags;
        self.rfl_access = OpAccess::from_bits_retain(self.rfl_access.bits() | OpAccess::READ.bits());
        self
    }

    pub(crate) const fn with_modified(mut self, flags: RflagsBits) -> Self {
        self.modified = flags;
        self.rfl_access =
            OpAccess::from_bits_retain(self.rfl_access.bits() | OpAccess::WRITE.bits());
        self
    }

    pub(crate) const fn with_set(mut self, flags: RflagsBits) -> Self {
        self.set = flags;
        self.rfl_access =
            OpAccess::from_bits_retain(self.rfl_access.bits() | OpAccess::WRITE.bits());
        self
    }

    pub(crate) const fn with_cleared(mut self, flags: RflagsBits) -> Self {
        self.cleared = flags;
        self.rfl_access =
            OpAccess::from_bits_retain(self.rfl_access.bits() | OpAccess::WRITE.bits());
        self
    }

    pub(crate) const fn with_fpu_flags(mut self, fpu: FpuFlags) -> Self {
        self.fpu_flags = fpu;
        self
    }

    pub(crate) const fn with_mem_access(mut self, mem1: OpAccess, mem2: OpAccess) -> Self {
        self.mem1_access = mem1;
        self.mem2_access = mem2;
        self
    }

    pub(crate) const fn with_stack(mut self, access: OpAccess, words: u8) -> Self {
        self.stk_access = access;
        self.stk_words = words;
        self
    }

    pub(crate) const fn with_rip(mut self, access: OpAccess) -> Self {
        self.rip_access = access;
        self
    }

    pub(crate) const fn with_cs(mut self, access: OpAccess) -> Self {
        self.cs_access = access;
        self
    }
}

/// Operand type code: selects the operand variant and the field extraction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum OpType {
    /// Implicit constant 1.
    One = 0,
    RIp,
    RAx,
    Ah,
    RCx,
    RDx,
    RBx,
    RSp,
    RBp,
    RSi,
    RDi,
    RR11,
    SegCs,
    SegSs,
    SegDs,
    SegEs,
    SegFs,
    SegGs,
    St0,
    Sti,
    Cr0,
    Gdtr,
    Idtr,
    Ldtr,
    TaskReg,
    X87Control,
    X87Tag,
    X87Status,
    Mxcsr,
    Pkru,
    Ssp,
    Uif,
    /// MSR selected by ECX.
    Msr,
    Tsc,
    TscAux,
    Star,
    LStar,
    FMask,
    FsBase,
    GsBase,
    KGsBase,
    Xcr,
    Xcr0,
    /// An entire register bank (PUSHA/XSAVE family).
    Bank,
    /// Far pointer or near address in the instruction bytes.
    A,
    /// GPR in XOP/VEX.vvvv.
    B,
    /// Control register in ModRM.reg.
    C,
    /// Debug register in ModRM.reg.
    D,
    /// GPR or memory in ModRM.rm.
    E,
    /// Flags register.
    F,
    /// GPR in ModRM.reg.
    G,
    /// Vector register in XOP/VEX/EVEX.vvvv.
    H,
    /// Immediate.
    I,
    /// First of two immediates.
    I1,
    /// Second of two immediates.
    I2,
    /// Relative offset.
    J,
    /// The stack.
    K,
    /// Vector register in the is4 immediate.
    L,
    /// Memory in ModRM.rm.
    M,
    /// MMX register in ModRM.rm.
    N,
    /// Moffset.
    O,
    /// MMX register in ModRM.reg.
    P,
    /// MMX register or memory in ModRM.rm.
    Q,
    /// GPR in ModRM.rm (register forms only).
    R,
    /// Segment register in ModRM.reg.
    S,
    /// Test register in ModRM.reg.
    T,
    /// Vector register in ModRM.rm (register forms only).
    U,
    /// Vector register in ModRM.reg.
    V,
    /// Vector register or memory in ModRM.rm.
    W,
    /// DS:rSI string source.
    X,
    /// ES:rDI string destination.
    Y,
    /// GPR in the low 3 opcode bits.
    Z,
    /// Bound register in ModRM.reg.
    RB,
    /// Bound register or memory in ModRM.rm.
    MB,
    /// Mask register in ModRM.reg.
    RK,
    /// Mask register in XOP/VEX/EVEX.vvvv.
    VK,
    /// Mask register or memory in ModRM.rm.
    MK,
    /// Mask register in EVEX.aaa.
    AK,
    /// Tile register in ModRM.reg.
    RT,
    /// Tile register in ModRM.rm.
    MT,
    /// Tile register in VEX.vvvv.
    VT,
    /// 2-bit immediate in the is4 byte.
    M2zI,
    /// `[rBX + AL]` (XLAT).
    PBxAl,
    /// `[rAX]`.
    PAx,
    /// `[rCX]`.
    PCx,
    /// `[sBP]` (ENTER nesting).
    PBp,
    /// `[rDI]` without the string flag (MASKMOV family).
    PDi,
    /// Shadow stack addressed by SSP (load/store).
    Shs,
    /// Shadow stack addressed by IA32_PL0_SSP.
    Shs0,
    /// Shadow stack push/pop through SSP.
    ShsP,
    /// MSR-address table at [rSI].
    Smt,
    /// MSR-address table at [rDI].
    Dmt,
    /// Memory addressed by ModRM.reg with forced ES segment.
    RM,
    /// Memory addressed by ModRM.rm even when mod is 3.
    MM,
    /// Default-flags value in VEX.vvvv (APX conditional forms).
    Dfv,
}

/// Operand size code: resolves to a byte count given the effective modes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum OpSize {
    /// No memory access.
    None = 0,
    /// 8 bit.
    B,
    /// 16 bit.
    W,
    /// 32 bit.
    D,
    /// 64 bit.
    Q,
    /// 128 bit.
    Dq,
    /// 256 bit.
    Qq,
    /// 512 bit.
    Oq,
    /// Operand-size sized (2/4/8).
    V,
    /// Operand-size sized, capped at 4 (2/4/4).
    Z,
    /// Two consecutive words (BOUND).
    A,
    /// 8/16 bit by operand size; 64 bit in long mode (JrCXZ counters).
    C,
    /// Far pointer: 4/6/10 bytes.
    P,
    /// Descriptor: 6/6/10 bytes.
    S,
    /// 32/64 bit by W.
    Y,
    /// 80 bit packed BCD.
    Fa,
    /// 16 bit real.
    Fw,
    /// 32 bit real.
    Fd,
    /// 64 bit real.
    Fq,
    /// 80 bit real.
    Ft,
    /// FPU environment: 14/28 bytes.
    Fe,
    /// FPU state: 94/108 bytes.
    Fs,
    /// Extended state: 512 bytes.
    Rx,
    /// One cache line.
    Cl,
    /// Address-size sized.
    Asz,
    /// Stack-size sized.
    Ssz,
    /// Full vector: 16/32/64 bytes.
    Fv,
    /// Half vector.
    Hv,
    /// Quarter vector.
    Qv,
    /// Eighth vector.
    Ev,
    /// Lower vector lane (same byte counts as `Fv`).
    X,
    /// 64 bit scalar element.
    Sd,
    /// 32 bit scalar element.
    Ss,
    /// 16 bit scalar element.
    Sh,
    /// MIB: base and index form a pointer, no sized access.
    Mib,
    /// VSIB, 32-bit indexes in XMM.
    Vm32x,
    /// VSIB, 32-bit indexes in YMM.
    Vm32y,
    /// VSIB, 32-bit indexes in ZMM.
    Vm32z,
    /// VSIB, 64-bit indexes in XMM.
    Vm64x,
    /// VSIB, 64-bit indexes in YMM.
    Vm64y,
    /// VSIB, 64-bit indexes in ZMM.
    Vm64z,
    /// VSIB, 32-bit indexes, register width follows the vector length.
    Vm32n,
    /// VSIB, 64-bit indexes, register width follows the vector length.
    Vm64n,
}

/// Operand flag bits inside a packed specifier.
pub mod opf {
    /// Default (implicit) operand.
    pub const DEFAULT: u8 = 0x01;
    /// Sign-extended to the first operand's size.
    pub const SEX_OP1: u8 = 0x02;
    /// Sign-extended to the default word size.
    pub const SEX_DWS: u8 = 0x04;
}

/// Operand decorator bits inside a packed specifier.
pub mod opd {
    pub const MASK: u8 = 0x01;
    pub const ZERO: u8 = 0x02;
    pub const BCAST: u8 = 0x04;
    /// Broadcast element is 16 bit.
    pub const B16: u8 = 0x10;
    /// Broadcast element is 32 bit.
    pub const B32: u8 = 0x20;
    /// Broadcast element is 64 bit.
    pub const B64: u8 = 0x40;
}

/// A packed operand specifier.
///
/// The 64-bit layout matches the generated tables:
/// `type:8 | size:8 | flags:8 | access:8 | decorators:8 | block:8`, low to
/// high. The named accessors are the only supported way to consume it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OpSpecifier(pub u64);

impl OpSpecifier {
    pub const fn new(
        ty: OpType,
        size: OpSize,
        flags: u8,
        access: u8,
        decorators: u8,
        block: u8,
    ) -> Self {
        OpSpecifier(
            ty as u64
                | (size as u64) << 8
                | (flags as u64) << 16
                | (access as u64) << 24
                | (decorators as u64) << 32
                | (block as u64) << 40,
        )
    }

    pub fn op_type(self) -> OpType {
        // The table data is emitted from the same enum, so the round-trip is
        // total; the fallback arm keeps the function panic-free regardless.
        OpType::from_u8((self.0 & 0xFF) as u8)
    }

    pub fn op_size(self) -> OpSize {
        OpSize::from_u8(((self.0 >> 8) & 0xFF) as u8)
    }

    pub fn flags(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub fn access(self) -> OpAccess {
        OpAccess::from_bits_truncate(((self.0 >> 24) & 0xFF) as u8)
    }

    pub fn decorators(self) -> u8 {
        ((self.0 >> 32) & 0xFF) as u8
    }

    pub fn block(self) -> u8 {
        ((self.0 >> 40) & 0xFF) as u8
    }
}

macro_rules! impl_from_u8 {
    ($ty:ident, $max:ident) => {
        impl $ty {
            pub(crate) fn from_u8(raw: u8) -> $ty {
                if raw <= $ty::$max as u8 {
                    // Values are emitted from this enum; the repr is dense.
                    unsafe { core::mem::transmute(raw) }
                } else {
                    $ty::$max
                }
            }
        }
    };
}

impl_from_u8!(OpType, Dfv);
impl_from_u8!(OpSize, Vm64n);

/// One edge in the dispatch graph.
pub type Edge = Option<&'static DispatchNode>;

/// Register-constraint and register-distinctness filter kinds.
///
/// Each filter either passes (continuing along the node's single edge) or
/// rejects the encoding with a specific status.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FilterKind {
    /// Reject in 64-bit mode.
    No64,
    /// Reject outside 64-bit mode.
    No1632,
    /// Reject RIP-relative forms.
    NoRipRel,
    /// Reject 16-bit addressing.
    NoA16,
    /// Reject the 0x66 prefix.
    No66,
    /// Reject the 0x67 prefix.
    No67,
    /// Reject any REP prefix.
    NoRep,
    /// Reject REX2.
    NoRex2,
    /// Reject L == 0.
    NoL0,
    /// vvvv must be 0.
    NoV,
    /// V' must be 0.
    NoVp,
    /// vvvv and V' must both be 0.
    NoVvp,
    /// GPR in reg must be < 16 unless APX is on.
    RRLt16,
    /// GPR in vvvv must be < 16 unless APX is on.
    RVLt16,
    /// Segment register in reg must be 0..=5.
    SRIn012345,
    /// Segment register in reg must be 0 or 2..=5 (no CS).
    SRIn02345,
    /// Bound register in reg must be < 4.
    BRLt4,
    /// Bound register in rm must be < 4 (register forms).
    BMLt4,
    /// Control register in reg must be 0, 2, 3, 4 or 8.
    CRIn02348,
    /// Debug register in reg must be < 8.
    DRLt8,
    /// Test register in reg must be < 8.
    QRLt8,
    /// Mask register in reg must be < 8.
    KRLt8,
    /// Mask register in vvvv must be < 8.
    KVLt8,
    /// Tile register in reg must be < 8.
    TRLt8,
    /// Tile register in rm must be < 8 (register forms).
    TMLt8,
    /// Tile register in vvvv must be < 8.
    TVLt8,
    /// VSIB index, destination and vvvv must be pairwise distinct.
    VXneVRneVV,
    /// VSIB index must differ from the destination.
    VXneVR,
    /// Tile destination and both sources must be pairwise distinct.
    TRneTMneTV,
    /// Vector destination must differ from vvvv and (register) rm.
    VRneVVneVM,
    /// GPRs in vvvv and rm must not be rSP.
    RVne4RMne4,
    /// GPR in vvvv must differ from GPR in rm.
    RVneRM,
}

/// A node of the dispatch graph.
///
/// Each variant selects the next edge from a single decoded attribute; a
/// `None` edge means the encoding does not exist.
pub enum DispatchNode {
    /// Terminal: index into [`INSTRUCTIONS`].
    Ins(u16),
    /// 3DNow!-style trailing opcode: fetch one byte and index by it.
    OpcodeLast(&'static [Edge; 256]),
    /// `[mem, reg]` by ModRM.mod.
    ModRmMod([Edge; 2]),
    /// By ModRM.reg.
    ModRmReg([Edge; 8]),
    /// By ModRM.rm.
    ModRmRm([Edge; 8]),
    /// `[none, 66, f3, f2]`.
    MandatoryPrefix([Edge; 4]),
    /// `[fallback, 16, 32, 64]` by code mode.
    Mode([Edge; 4]),
    /// `[fallback, 16, 32, 64, d64, f64]` by operand mode.
    Dsize([Edge; 6]),
    /// `[fallback, 16, 32, 64]` by address mode.
    Asize([Edge; 4]),
    /// `[fallback, repz, rep, rexb, rexw, mo64, riprel, rex2, rex2w]`.
    Auxiliary([Edge; 9]),
    /// `[any, intel, amd, geode, cyrix]` by preferred vendor.
    Vendor([Edge; 5]),
    /// `[fallback, mpx, cet, cldemote, piti, movrs, bhi]` by enabled features.
    Feature([Edge; 7]),
    /// By the map id extension field.
    ExM([Edge; 8]),
    /// By the compressed-prefix extension field.
    ExPp([Edge; 4]),
    /// By L'L (with the SAE/ER maximum-length special case).
    ExL([Edge; 4]),
    /// By W.
    ExW([Edge; 2]),
    /// By W, treated as 0 outside 64-bit mode.
    ExWi([Edge; 2]),
    /// By EVEX.ND.
    ExNd([Edge; 2]),
    /// By EVEX.NF.
    ExNf([Edge; 2]),
    /// By EVEX.SC.
    ExSc([Edge; 16]),
    /// By the compressed `L'L:pp:nd:nf` index.
    ExLpdf([Edge; 64]),
    /// Predicate filter with a single outgoing edge.
    Filter(FilterKind, Edge),
}

/// Auxiliary-node cell indices.
pub mod aux {
    pub const NONE: usize = 0;
    pub const REPZ: usize = 1;
    pub const REP: usize = 2;
    pub const REXB: usize = 3;
    pub const REXW: usize = 4;
    pub const MO64: usize = 5;
    pub const RIPREL: usize = 6;
    pub const REX2: usize = 7;
    pub const REX2W: usize = 8;
}

/// Feature-node cell indices.
pub mod feat {
    pub const NONE: usize = 0;
    pub const MPX: usize = 1;
    pub const CET: usize = 2;
    pub const CLDEMOTE: usize = 3;
    pub const PITI: usize = 4;
    pub const MOVRS: usize = 5;
    pub const BHI: usize = 6;
}

/// Dsize-node cell indices (beyond the width cells).
pub mod dsz {
    pub const NONE: usize = 0;
    pub const D64: usize = 4;
    pub const F64: usize = 5;
}

/// A 256-cell opcode table, the root of each per-map dispatch graph.
pub struct OpcodeTable(pub [Edge; 256]);

impl OpcodeTable {
    /// Builds a table from `(opcode, node)` pairs; unlisted cells stay empty.
    pub const fn build(cells: &[(u8, &'static DispatchNode)]) -> OpcodeTable {
        let mut table: [Edge; 256] = [None; 256];
        let mut i = 0;
        while i < cells.len() {
            table[cells[i].0 as usize] = Some(cells[i].1);
            i += 1;
        }
        OpcodeTable(table)
    }

    pub fn lookup(&self, opcode: u8) -> Edge {
        self.0[opcode as usize]
    }
}

/// Builds a 256-cell trailing-opcode map for [`DispatchNode::OpcodeLast`].
pub const fn build_map256(cells: &[(u8, &'static DispatchNode)]) -> [Edge; 256] {
    let mut table: [Edge; 256] = [None; 256];
    let mut i = 0;
    while i < cells.len() {
        table[cells[i].0 as usize] = Some(cells[i].1);
        i += 1;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specifier_roundtrip() {
        let spec = OpSpecifier::new(
            OpType::G,
            OpSize::V,
            opf::DEFAULT,
            (OpAccess::READ | OpAccess::WRITE).bits(),
            opd::MASK | opd::ZERO,
            4,
        );
        assert_eq!(spec.op_type(), OpType::G);
        assert_eq!(spec.op_size(), OpSize::V);
        assert_eq!(spec.flags(), opf::DEFAULT);
        assert_eq!(spec.access(), OpAccess::READ | OpAccess::WRITE);
        assert_eq!(spec.decorators(), opd::MASK | opd::ZERO);
        assert_eq!(spec.block(), 4);
    }

    #[test]
    fn opcode_table_is_sparse() {
        static NODE: DispatchNode = DispatchNode::Ins(0);
        const T: OpcodeTable = OpcodeTable::build(&[(0x90, &NODE)]);
        assert!(T.lookup(0x90).is_some());
        assert!(T.lookup(0x91).is_none());
    }
}
