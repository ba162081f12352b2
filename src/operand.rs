//! Operand data model and operand materialization.
//!
//! Materialization expands one compact operand specifier from the matched
//! database entry into a full [`Operand`], using the decoded prefix state,
//! ModRM/SIB bytes and payload values of the instruction.

use bitflags::bitflags;

use crate::db::{opd, opf, IdbEntry, InsAttributes, OpSize, OpSpecifier, OpType};
use crate::enums::{EncodingMode, MachineMode, Mnemonic, ShadowStackKind, TupleType, Width};
use crate::insn::{CompactInstruction, FarAddr};
use crate::register::{regs, RegBank};
use crate::status::{Result, Status};

/// Size reported for operands spanning one cache line.
pub const SIZE_CACHE_LINE: u32 = 0xFFFF_FFFE;

/// Size reported for operands whose size is unknowable statically.
pub const SIZE_UNKNOWN: u32 = 0xFFFF_FFFF;

bitflags! {
    /// Operand access mode. The bits are combinable.
    #[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct OpAccess: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        const COND_READ = 0x04;
        const COND_WRITE = 0x08;
        const PREFETCH = 0x10;
    }
}

impl OpAccess {
    /// Read or conditionally read.
    pub fn any_read(self) -> bool {
        self.intersects(OpAccess::READ | OpAccess::COND_READ)
    }

    /// Written or conditionally written.
    pub fn any_write(self) -> bool {
        self.intersects(OpAccess::WRITE | OpAccess::COND_WRITE)
    }
}

/// Where the operand is encoded inside the instruction.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum OpEncoding {
    /// Implicit / suppressed; not encoded anywhere.
    #[default]
    S,
    /// ModRM.reg.
    R,
    /// ModRM.rm (+ SIB).
    M,
    /// XOP/VEX/EVEX.vvvv.
    V,
    /// Subsequent instruction bytes (displacement/offset/address).
    D,
    /// Low 3 opcode bits.
    O,
    /// Immediate bytes.
    I,
    /// The CL register.
    C,
    /// The constant 1.
    One,
    /// Register encoded in the is4 immediate.
    L,
    /// EVEX.aaa.
    A,
    /// MSR or XCR selected by ECX.
    E,
}

/// Per-operand flag bits.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct OperandFlags {
    /// The operand is implicit/default.
    pub is_default: bool,
    /// Sign-extended to the first operand's size.
    pub sign_extended_op1: bool,
    /// Sign-extended to the default word size.
    pub sign_extended_dws: bool,
}

/// A decoded register operand.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RegInfo {
    /// The register bank.
    pub bank: RegBank,
    /// Register id inside the bank (an MSR number for the MSR bank).
    pub id: u32,
    /// Register size in bytes. May differ from the operand size.
    pub size: u32,
    /// Number of registers accessed, starting at `id` (block addressing).
    pub count: u8,
    /// True for AH/CH/DH/BH.
    pub is_high8: bool,
    /// True when block addressing is used.
    pub is_block: bool,
    /// True when the upper bits are zeroed (APX ND/ZU semantics).
    pub is_zero_upper: bool,
}

/// VSIB details of a gather/scatter memory operand.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct VsibInfo {
    /// Size of one index element, in bytes.
    pub index_size: u8,
    /// Size of one data element, in bytes.
    pub elem_size: u8,
    /// Number of elements gathered/scattered.
    pub elem_count: u8,
}

/// Broadcast details of an EVEX memory operand.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BroadcastInfo {
    /// Number of times the element is replicated.
    pub count: u8,
    /// Size of the broadcast element, in bytes.
    pub size: u8,
}

/// A decoded memory operand.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MemInfo {
    /// Whether a segment is used to address the memory.
    pub has_seg: bool,
    /// The segment register id.
    pub seg: u8,
    pub has_base: bool,
    /// Base register id (always a GPR).
    pub base: u8,
    /// Base register size in bytes.
    pub base_size: u32,
    pub has_index: bool,
    /// Index register id (a GPR, or a vector register for VSIB).
    pub index: u8,
    /// Index register size in bytes.
    pub index_size: u32,
    /// Scale: 1, 2, 4 or 8. Meaningful when an index is present.
    pub scale: u8,
    pub has_disp: bool,
    /// Sign-extended displacement.
    pub disp: i64,
    /// Raw displacement size, in bytes.
    pub disp_size: u8,
    /// Compressed-displacement scale, when EVEX disp8*N applies.
    pub comp_disp_size: u8,
    pub has_comp_disp: bool,
    /// RIP-relative addressing; base and index are not used.
    pub is_rip_rel: bool,
    /// Implicit stack access.
    pub is_stack: bool,
    /// `[rSI]`/`[rDI]` inside a string operation.
    pub is_string: bool,
    /// Direct addressing (moffset forms).
    pub is_direct: bool,
    /// Bit-base addressing (BT family).
    pub is_bitbase: bool,
    /// Address generation only; no memory access is made.
    pub is_ag: bool,
    /// MIB addressing (MPX).
    pub is_mib: bool,
    /// Sibmem addressing (AMX).
    pub is_sibmem: bool,
    /// VSIB addressing details, if the index is a vector register.
    pub vsib: Option<VsibInfo>,
    /// Broadcast details, if the memory operand is broadcast.
    pub broadcast: Option<BroadcastInfo>,
    /// Shadow-stack access kind, if this is a shadow-stack operand.
    pub shadow_stack: Option<ShadowStackKind>,
}

/// A decoded immediate.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ImmInfo {
    /// The immediate value; sign-extended when the operand flags say so.
    pub value: u64,
    /// Raw encoded size, in bytes.
    pub raw_size: u8,
}

/// A decoded relative branch offset.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RelInfo {
    /// Sign-extended offset relative to the end of the instruction.
    pub offset: i64,
    /// Raw encoded size, in bytes.
    pub raw_size: u8,
}

/// Default flags value of APX conditional instructions.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DefaultFlags {
    pub cf: bool,
    pub zf: bool,
    pub sf: bool,
    pub of: bool,
}

/// The operand payload, by operand type.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum OperandKind {
    /// Unused slot.
    #[default]
    None,
    Reg(RegInfo),
    Mem(MemInfo),
    Imm(ImmInfo),
    /// Relative offset; target is `rip + length + offset`.
    Offs(RelInfo),
    /// Absolute far address.
    Addr(FarAddr),
    /// Implicit constant.
    Const(u64),
    /// A whole register bank is accessed.
    Bank(RegBank),
    /// Default-flags value (APX conditional forms).
    Dfv(DefaultFlags),
}

/// Per-operand decorator activation.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Decorator {
    /// Masking active for this operand.
    pub has_mask: bool,
    /// The mask register (k1..k7) when masking is active.
    pub mask_reg: u8,
    /// Zeroing (rather than merging) active.
    pub has_zero: bool,
    /// Broadcast active for this (memory) operand.
    pub has_broadcast: bool,
    /// SAE placement marker.
    pub has_sae: bool,
    /// Embedded-rounding placement marker.
    pub has_er: bool,
}

/// One fully materialized operand.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Operand {
    /// The operand payload.
    pub kind: OperandKind,
    /// Amount of data processed, in bytes. For registers this may be less
    /// than the register size.
    pub size: u32,
    /// Raw encoded size, before forced widening/sign extension.
    pub raw_size: u32,
    /// Access mode.
    pub access: OpAccess,
    /// Encoding slot.
    pub encoding: OpEncoding,
    /// Misc flags.
    pub flags: OperandFlags,
    /// Decorator activation.
    pub decorator: Decorator,
}

impl Operand {
    /// Whether the operand is the (implicit) stack.
    pub fn is_stack(&self) -> bool {
        matches!(self.kind, OperandKind::Mem(m) if m.is_stack)
    }
}

/// Sign extends a `size`-byte value to 64 bits.
pub(crate) fn sign_ex(size: u8, value: u64) -> i64 {
    match size {
        1 => value as u8 as i8 as i64,
        2 => value as u16 as i16 as i64,
        4 => value as u32 as i32 as i64,
        _ => value as i64,
    }
}

fn reg_op(bank: RegBank, id: u32, size: u32) -> OperandKind {
    OperandKind::Reg(RegInfo {
        bank,
        id,
        size,
        count: 1,
        is_high8: false,
        is_block: false,
        is_zero_upper: false,
    })
}

/// Effective segment for a memory operand, honoring overrides.
fn seg_override(ins: &CompactInstruction, default_seg: u8) -> u8 {
    if ins.seg == 0 {
        return default_seg;
    }

    // In 64-bit mode only FS and GS have segmentation semantics.
    if ins.def_code == MachineMode::Long64 && ins.seg != 0x64 && ins.seg != 0x65 {
        return default_seg;
    }

    match ins.seg {
        0x2E => regs::CS,
        0x36 => regs::SS,
        0x3E => regs::DS,
        0x26 => regs::ES,
        0x64 => regs::FS,
        0x65 => regs::GS,
        _ => default_seg,
    }
}

/// Compressed displacement scale per tuple type and vector length.
fn comp_disp_size(ins: &CompactInstruction, entry: &IdbEntry, mem_size: u32) -> u8 {
    const FV: [u8; 4] = [16, 32, 64, 1];
    const HV: [u8; 4] = [8, 16, 32, 1];
    const QV: [u8; 4] = [4, 8, 16, 1];
    const DUP: [u8; 4] = [8, 32, 64, 1];
    const FVM: [u8; 4] = [16, 32, 64, 1];
    const HVM: [u8; 4] = [8, 16, 32, 1];
    const QVM: [u8; 4] = [4, 8, 16, 1];
    const OVM: [u8; 4] = [2, 4, 8, 1];

    if ins.has_broadcast {
        // Broadcast uses the element size as scale: 2, 4 or 8.
        return mem_size as u8;
    }

    let l = (ins.exs.l & 3) as usize;

    match entry.tuple {
        TupleType::Fv => FV[l],
        TupleType::Hv => HV[l],
        TupleType::Qv => QV[l],
        TupleType::Dup => DUP[l],
        TupleType::Fvm => FVM[l],
        TupleType::Hvm => HVM[l],
        TupleType::Qvm => QVM[l],
        TupleType::Ovm => OVM[l],
        TupleType::M128 => 16,
        TupleType::T1S8 => 1,
        TupleType::T1S16 => 2,
        TupleType::T1S => {
            if entry.attributes.contains(InsAttributes::WIG) || ins.exs.w == 0 {
                4
            } else {
                8
            }
        }
        TupleType::T1F => mem_size as u8,
        TupleType::T2 => {
            if ins.exs.w != 0 {
                16
            } else {
                8
            }
        }
        TupleType::T4 => {
            if ins.exs.w != 0 {
                32
            } else {
                16
            }
        }
        TupleType::T8 => 32,
        TupleType::T1_4X => 16,
        TupleType::None => 1,
    }
}

/// 16-bit ModRM memory forms.
fn parse_memory_16(ins: &CompactInstruction, mem: &mut MemInfo) {
    let (base, index, seg) = match ins.modrm.rm() {
        0 => (Some(regs::RBX), Some(regs::RSI), regs::DS),
        1 => (Some(regs::RBX), Some(regs::RDI), regs::DS),
        2 => (Some(regs::RBP), Some(regs::RSI), regs::SS),
        3 => (Some(regs::RBP), Some(regs::RDI), regs::SS),
        4 => (Some(regs::RSI), None, regs::DS),
        5 => (Some(regs::RDI), None, regs::DS),
        6 if ins.modrm.mod_() != 0 => (Some(regs::RBP), None, regs::SS),
        // mod 0, rm 6: direct 16-bit address.
        6 => (None, None, regs::DS),
        _ => (Some(regs::RBX), None, regs::DS),
    };

    if let Some(base) = base {
        mem.has_base = true;
        mem.base = base;
        mem.base_size = 2;
    }

    if let Some(index) = index {
        mem.has_index = true;
        mem.index = index;
        mem.index_size = 2;
        mem.scale = 1;
    }

    mem.seg = seg;
    mem.has_disp = ins.has_disp;
    mem.disp_size = ins.disp_length;
    mem.disp = if ins.has_disp {
        sign_ex(ins.disp_length, u64::from(ins.displacement))
    } else {
        0
    };
}

/// 32/64-bit ModRM memory forms, including SIB and VSIB.
fn parse_memory_3264(
    ins: &CompactInstruction,
    entry: &IdbEntry,
    mem: &mut MemInfo,
    vsib_reg_size: u32,
) {
    let def_size = if ins.addr_mode == Width::W32 { 4 } else { 8 };

    // Implicit segment is DS, unless the base selects the stack.
    mem.seg = regs::DS;

    if ins.has_sib {
        // Base absent when mod is 0 and SIB.base is 5.
        if ins.modrm.mod_() == 0 && ins.sib.base() == 5 {
            // Displacement-only; not RIP-relative.
        } else {
            mem.has_base = true;
            mem.base_size = def_size;
            mem.base = ins.gpr_b();

            if mem.base == regs::RSP || mem.base == regs::RBP {
                mem.seg = regs::SS;
            }
        }

        if entry.attributes.contains(InsAttributes::VSIB) {
            // A vector index; id 4 is valid here, and bit 4 comes from V'.
            mem.has_index = true;
            mem.index_size = vsib_reg_size;
            mem.index = ins.vec_x();
            mem.scale = 1 << ins.sib.scale();
        } else {
            mem.index = ins.gpr_x();

            if mem.index != regs::RSP {
                mem.has_index = true;
                mem.index_size = def_size;
                mem.scale = 1 << ins.sib.scale();
            }
        }
    } else if ins.modrm.mod_() == 0 && ins.modrm.rm() == 5 {
        // In long mode this is RIP-relative; in 32-bit modes it is a plain
        // direct address.
        mem.is_rip_rel = ins.is_rip_relative;
    } else {
        mem.has_base = true;
        mem.base_size = def_size;
        mem.base = ins.gpr_m();

        if mem.base == regs::RSP || mem.base == regs::RBP {
            mem.seg = regs::SS;
        }
    }

    mem.has_disp = ins.has_disp;
    mem.disp_size = ins.disp_length;
    mem.disp = if ins.has_disp {
        sign_ex(ins.disp_length, u64::from(ins.displacement))
    } else {
        0
    };
}

fn high8(ins: &CompactInstruction, size: u32, reg: u32) -> bool {
    size == 1 && reg >= 4 && ins.encoding == EncodingMode::Legacy && !ins.has_rex && !ins.has_rex2
}

/// Expands one compact operand specifier into a full operand record.
pub(crate) fn materialize(
    ins: &CompactInstruction,
    entry: &IdbEntry,
    spec: OpSpecifier,
) -> Result<Operand> {
    let mut op = Operand::default();

    let width = ins.exs_w_effective();
    let opt = spec.op_type();
    let ops = spec.op_size();
    let opd_bits = spec.decorators();
    let opb = spec.block();

    op.access = spec.access();
    op.flags = OperandFlags {
        is_default: spec.flags() & opf::DEFAULT != 0,
        sign_extended_op1: spec.flags() & opf::SEX_OP1 != 0,
        sign_extended_dws: spec.flags() & opf::SEX_DWS != 0,
    };
    op.encoding = OpEncoding::S;

    let l_index = (ins.exs.l & 3).min(2) as usize;

    //
    // Resolve the size code into a byte count.
    //
    let size: u32 = match ops {
        OpSize::Asz => ins.addr_mode.bytes(),
        OpSize::Ssz => ins.def_stack.width().bytes(),
        OpSize::None => 0,
        OpSize::B => 1,
        OpSize::W => 2,
        OpSize::D => 4,
        OpSize::Q => 8,
        OpSize::Dq => 16,
        OpSize::Qq => 32,
        OpSize::Oq => 64,
        OpSize::Fa => 10,
        OpSize::Fw => 2,
        OpSize::Fd => 4,
        OpSize::Fq => 8,
        OpSize::Ft => 10,
        OpSize::Fe => {
            if ins.ef_op_mode == Width::W16 {
                14
            } else {
                28
            }
        }
        OpSize::Fs => {
            if ins.ef_op_mode == Width::W16 {
                94
            } else {
                108
            }
        }
        OpSize::Rx => 512,
        OpSize::Cl => SIZE_CACHE_LINE,
        OpSize::V => ins.ef_op_mode.bytes(),
        OpSize::Y => {
            if ins.ef_op_mode == Width::W64 {
                8
            } else {
                4
            }
        }
        OpSize::Z => {
            if ins.ef_op_mode == Width::W16 {
                2
            } else {
                4
            }
        }
        OpSize::A => {
            if ins.def_code == MachineMode::Long64 {
                return Err(Status::InvalidInstruction);
            }
            if ins.ef_op_mode == Width::W16 {
                4
            } else {
                8
            }
        }
        OpSize::C => match ins.def_code {
            MachineMode::Legacy16 => {
                if ins.has_op_size {
                    2
                } else {
                    1
                }
            }
            MachineMode::Legacy32 => {
                if ins.has_op_size {
                    2
                } else {
                    4
                }
            }
            MachineMode::Long64 => 8,
        },
        OpSize::P => [4u32, 6, 10][ins.ef_op_mode.index()],
        OpSize::S => [6u32, 6, 10][ins.def_code.width().index()],
        OpSize::Fv | OpSize::X => [16u32, 32, 64][ins.ef_vec_mode.index()],
        OpSize::Hv => [8u32, 16, 32][ins.ef_vec_mode.index()],
        OpSize::Qv => [4u32, 8, 16][ins.ef_vec_mode.index()],
        OpSize::Ev => [2u32, 4, 8][ins.ef_vec_mode.index()],
        OpSize::Sd => 8,
        OpSize::Ss => 4,
        OpSize::Sh => 2,
        OpSize::Mib => 0,
        OpSize::Vm32x | OpSize::Vm32y | OpSize::Vm32z | OpSize::Vm32n => {
            [4u32, 8, 16][l_index] * if width { 8 } else { 4 }
        }
        OpSize::Vm64x | OpSize::Vm64y | OpSize::Vm64z | OpSize::Vm64n => {
            [2u32, 4, 8][l_index] * if width { 8 } else { 4 }
        }
    };

    // VSIB geometry, fixed by the size code.
    let (vsib_index_size, vsib_index_count, vsib_reg_size): (u8, u8, u32) = match ops {
        OpSize::Vm32x => (4, [4, 8, 16][l_index], 16),
        OpSize::Vm32y => (4, [4, 8, 16][l_index], 32),
        OpSize::Vm32z => (4, [4, 8, 16][l_index], 64),
        OpSize::Vm32n => (4, [4, 8, 16][l_index], [16u32, 32, 64][l_index]),
        OpSize::Vm64x => (8, [2, 4, 8][l_index], 16),
        OpSize::Vm64y => (8, [2, 4, 8][l_index], 32),
        OpSize::Vm64z => (8, [2, 4, 8][l_index], 64),
        OpSize::Vm64n => (8, [2, 4, 8][l_index], [16u32, 32, 64][l_index]),
        _ => (0, 0, 0),
    };

    op.size = size;
    op.raw_size = size;
    let bcst_size = size;

    let mut is_memory = false;

    //
    // Resolve the type code.
    //
    match opt {
        OpType::One => {
            op.encoding = OpEncoding::One;
            op.kind = OperandKind::Const(1);
        }
        OpType::RIp => op.kind = reg_op(RegBank::Rip, 0, size),
        OpType::RAx => op.kind = reg_op(RegBank::Gpr, regs::RAX.into(), size),
        OpType::Ah => {
            op.kind = reg_op(RegBank::Gpr, regs::AH.into(), 1);
            if let OperandKind::Reg(ref mut r) = op.kind {
                r.is_high8 = true;
            }
        }
        OpType::RCx => op.kind = reg_op(RegBank::Gpr, regs::RCX.into(), size),
        OpType::RDx => op.kind = reg_op(RegBank::Gpr, regs::RDX.into(), size),
        OpType::RBx => op.kind = reg_op(RegBank::Gpr, regs::RBX.into(), size),
        OpType::RSp => op.kind = reg_op(RegBank::Gpr, regs::RSP.into(), size),
        OpType::RBp => op.kind = reg_op(RegBank::Gpr, regs::RBP.into(), size),
        OpType::RSi => op.kind = reg_op(RegBank::Gpr, regs::RSI.into(), size),
        OpType::RDi => op.kind = reg_op(RegBank::Gpr, regs::RDI.into(), size),
        OpType::RR11 => op.kind = reg_op(RegBank::Gpr, regs::R11.into(), size),
        OpType::SegCs => op.kind = reg_op(RegBank::Seg, regs::CS.into(), size),
        OpType::SegSs => op.kind = reg_op(RegBank::Seg, regs::SS.into(), size),
        OpType::SegDs => op.kind = reg_op(RegBank::Seg, regs::DS.into(), size),
        OpType::SegEs => op.kind = reg_op(RegBank::Seg, regs::ES.into(), size),
        OpType::SegFs => op.kind = reg_op(RegBank::Seg, regs::FS.into(), size),
        OpType::SegGs => op.kind = reg_op(RegBank::Seg, regs::GS.into(), size),
        OpType::St0 => op.kind = reg_op(RegBank::Fpu, 0, 10),
        OpType::Sti => {
            op.encoding = OpEncoding::M;
            op.kind = reg_op(RegBank::Fpu, ins.modrm.rm().into(), 10);
        }
        OpType::Cr0 => op.kind = reg_op(RegBank::Cr, regs::CR0.into(), size),
        OpType::Gdtr => op.kind = reg_op(RegBank::Sys, regs::GDTR.into(), size),
        OpType::Idtr => op.kind = reg_op(RegBank::Sys, regs::IDTR.into(), size),
        OpType::Ldtr => op.kind = reg_op(RegBank::Sys, regs::LDTR.into(), size),
        OpType::TaskReg => op.kind = reg_op(RegBank::Sys, regs::TR.into(), size),
        OpType::X87Control => op.kind = reg_op(RegBank::X87, regs::X87_CONTROL.into(), 2),
        OpType::X87Tag => op.kind = reg_op(RegBank::X87, regs::X87_TAG.into(), 2),
        OpType::X87Status => op.kind = reg_op(RegBank::X87, regs::X87_STATUS.into(), 2),
        OpType::Mxcsr => op.kind = reg_op(RegBank::Mxcsr, 0, 4),
        OpType::Pkru => op.kind = reg_op(RegBank::Pkru, 0, 4),
        OpType::Ssp => op.kind = reg_op(RegBank::Ssp, 0, size),
        OpType::Uif => op.kind = reg_op(RegBank::Uif, 0, 1),
        OpType::Msr => {
            op.encoding = OpEncoding::E;
            op.kind = reg_op(RegBank::Msr, regs::BY_ECX, 8);
        }
        OpType::Tsc => op.kind = reg_op(RegBank::Msr, regs::IA32_TSC, 8),
        OpType::TscAux => op.kind = reg_op(RegBank::Msr, regs::IA32_TSC_AUX, 8),
        OpType::Star => op.kind = reg_op(RegBank::Msr, regs::IA32_STAR, 8),
        OpType::LStar => op.kind = reg_op(RegBank::Msr, regs::IA32_LSTAR, 8),
        OpType::FMask => op.kind = reg_op(RegBank::Msr, regs::IA32_FMASK, 8),
        OpType::FsBase => op.kind = reg_op(RegBank::Msr, regs::IA32_FS_BASE, 8),
        OpType::GsBase => op.kind = reg_op(RegBank::Msr, regs::IA32_GS_BASE, 8),
        OpType::KGsBase => op.kind = reg_op(RegBank::Msr, regs::IA32_KERNEL_GS_BASE, 8),
        OpType::Xcr => {
            op.encoding = OpEncoding::E;
            op.kind = reg_op(RegBank::Xcr, regs::BY_ECX, 8);
        }
        OpType::Xcr0 => op.kind = reg_op(RegBank::Xcr, 0, 8),
        OpType::Bank => {
            if entry.mnemonic == Mnemonic::PUSHA || entry.mnemonic == Mnemonic::POPA {
                op.size = u32::from(ins.word_length);
                op.kind = OperandKind::Reg(RegInfo {
                    bank: RegBank::Gpr,
                    id: regs::RAX.into(),
                    size: u32::from(ins.word_length),
                    count: 8,
                    is_high8: false,
                    is_block: true,
                    is_zero_upper: false,
                });
            } else {
                op.kind = OperandKind::Bank(RegBank::Sse);
            }
        }
        OpType::F => op.kind = reg_op(RegBank::Flg, 0, size),
        OpType::A => {
            op.encoding = OpEncoding::D;
            op.kind = OperandKind::Addr(ins.address);
        }
        OpType::B => {
            op.encoding = OpEncoding::V;
            op.kind = reg_op(RegBank::Gpr, ins.gpr_v().into(), size);
        }
        OpType::C => {
            let mut id = ins.cr_r();
            // LOCK before MOV to/from CR selects CR8 on some AMD parts.
            if ins.def_code != MachineMode::Long64 && ins.has_lock {
                id |= 0x8;
            }
            op.encoding = OpEncoding::R;
            op.kind = reg_op(RegBank::Cr, id.into(), size);
        }
        OpType::D => {
            op.encoding = OpEncoding::R;
            op.kind = reg_op(RegBank::Dr, ins.dr_r().into(), size);
        }
        OpType::T => {
            op.encoding = OpEncoding::R;
            op.kind = reg_op(RegBank::Tr, ins.tr_r().into(), size);
        }
        OpType::S => {
            op.encoding = OpEncoding::R;
            op.kind = reg_op(RegBank::Seg, ins.seg_r().into(), size);
        }
        OpType::E => {
            if !ins.modrm.is_reg_form() {
                is_memory = true;
            } else {
                let id = ins.gpr_m();
                op.encoding = OpEncoding::M;
                op.kind = reg_op(RegBank::Gpr, id.into(), size);
                if let OperandKind::Reg(ref mut r) = op.kind {
                    r.is_high8 = high8(ins, size, id.into());
                }
            }
        }
        OpType::R => {
            let id = ins.gpr_m();
            op.encoding = OpEncoding::M;
            op.kind = reg_op(RegBank::Gpr, id.into(), size);
            if let OperandKind::Reg(ref mut r) = op.kind {
                r.is_high8 = high8(ins, size, id.into());
            }
        }
        OpType::G => {
            let id = ins.gpr_r();
            op.encoding = OpEncoding::R;
            op.kind = reg_op(RegBank::Gpr, id.into(), size);
            if let OperandKind::Reg(ref mut r) = op.kind {
                r.is_high8 = high8(ins, size, id.into());
            }
        }
        OpType::I => {
            op.encoding = OpEncoding::I;
            let mut value = ins.immediate1;
            if op.flags.sign_extended_dws || op.flags.sign_extended_op1 {
                // The immediate is sign extended to the default word size.
                op.size = ins.ef_op_mode.bytes();
                value = sign_ex(size as u8, value) as u64;
            }
            op.kind = OperandKind::Imm(ImmInfo {
                value,
                raw_size: size as u8,
            });
        }
        OpType::I1 => {
            op.encoding = OpEncoding::I;
            op.kind = OperandKind::Imm(ImmInfo {
                value: ins.immediate1,
                raw_size: size as u8,
            });
        }
        OpType::I2 => {
            op.encoding = OpEncoding::I;
            op.kind = OperandKind::Imm(ImmInfo {
                value: ins.immediate2.into(),
                raw_size: size as u8,
            });
        }
        OpType::M2zI => {
            op.encoding = OpEncoding::L;
            op.kind = OperandKind::Imm(ImmInfo {
                value: (ins.sse_immediate & 3).into(),
                raw_size: size as u8,
            });
        }
        OpType::J => {
            op.encoding = OpEncoding::D;
            // Forced to the word length; watch 0x66-prefixed branches.
            op.size = u32::from(ins.word_length);
            op.kind = OperandKind::Offs(RelInfo {
                offset: sign_ex(size as u8, u64::from(ins.relative_offset)),
                raw_size: size as u8,
            });
        }
        OpType::P => {
            op.encoding = OpEncoding::R;
            op.kind = reg_op(RegBank::Mmx, ins.mmx_r().into(), 8);
        }
        OpType::Q => {
            if !ins.modrm.is_reg_form() {
                is_memory = true;
            } else {
                op.encoding = OpEncoding::M;
                op.kind = reg_op(RegBank::Mmx, ins.mmx_m().into(), 8);
            }
        }
        OpType::N => {
            op.encoding = OpEncoding::M;
            op.kind = reg_op(RegBank::Mmx, ins.mmx_m().into(), 8);
        }
        OpType::O => {
            op.encoding = OpEncoding::D;
            op.kind = OperandKind::Mem(MemInfo {
                has_seg: true,
                seg: seg_override(ins, regs::DS),
                has_disp: true,
                is_direct: true,
                disp_size: ins.moffset_length,
                disp: ins.moffset as i64,
                ..MemInfo::default()
            });
        }
        OpType::M => is_memory = true,
        OpType::H => {
            op.encoding = OpEncoding::V;
            op.kind = reg_op(RegBank::Sse, ins.vec_v().into(), size.max(16));
        }
        OpType::L => {
            let id = ins.vec_l() & if ins.def_code == MachineMode::Long64 { 0xF } else { 0x7 };
            op.encoding = OpEncoding::L;
            op.kind = reg_op(RegBank::Sse, id.into(), size.max(16));
        }
        OpType::V => {
            op.encoding = OpEncoding::R;
            op.kind = reg_op(RegBank::Sse, ins.vec_r().into(), size.max(16));
        }
        OpType::W => {
            if !ins.modrm.is_reg_form() {
                is_memory = true;
            } else {
                op.encoding = OpEncoding::M;
                op.kind = reg_op(RegBank::Sse, ins.vec_m().into(), size.max(16));
            }
        }
        OpType::U => {
            op.encoding = OpEncoding::M;
            op.kind = reg_op(RegBank::Sse, ins.vec_m().into(), size.max(16));
        }
        OpType::K => {
            op.kind = OperandKind::Mem(MemInfo {
                is_stack: true,
                has_base: true,
                base: regs::RSP,
                base_size: ins.def_stack.width().bytes(),
                has_seg: true,
                seg: regs::SS,
                ..MemInfo::default()
            });
        }
        OpType::X | OpType::Y | OpType::PDi => {
            let uses_rsi = opt == OpType::X;
            op.kind = OperandKind::Mem(MemInfo {
                has_base: true,
                base: if uses_rsi { regs::RSI } else { regs::RDI },
                base_size: ins.addr_mode.bytes(),
                has_seg: true,
                // DS:rSI honors overrides; ES:rDI does not.
                seg: if uses_rsi {
                    seg_override(ins, regs::DS)
                } else {
                    regs::ES
                },
                is_string: opt != OpType::PDi,
                ..MemInfo::default()
            });
        }
        OpType::PBxAl => {
            op.kind = OperandKind::Mem(MemInfo {
                has_base: true,
                has_index: true,
                base: regs::RBX,
                base_size: ins.addr_mode.bytes(),
                index: regs::AL,
                index_size: 1,
                scale: 1,
                has_seg: true,
                seg: seg_override(ins, regs::DS),
                ..MemInfo::default()
            });
        }
        OpType::PAx | OpType::PCx => {
            op.kind = OperandKind::Mem(MemInfo {
                has_base: true,
                base: if opt == OpType::PAx { regs::RAX } else { regs::RCX },
                base_size: ins.addr_mode.bytes(),
                has_seg: true,
                seg: seg_override(ins, regs::DS),
                ..MemInfo::default()
            });
        }
        OpType::PBp => {
            op.kind = OperandKind::Mem(MemInfo {
                has_base: true,
                base: regs::RBP,
                base_size: ins.def_stack.width().bytes(),
                has_seg: true,
                seg: regs::SS,
                ..MemInfo::default()
            });
        }
        OpType::Shs => {
            op.kind = OperandKind::Mem(MemInfo {
                shadow_stack: Some(ShadowStackKind::SspLoadStore),
                ..MemInfo::default()
            });
        }
        OpType::Shs0 => {
            op.kind = OperandKind::Mem(MemInfo {
                shadow_stack: Some(ShadowStackKind::Pl0Ssp),
                ..MemInfo::default()
            });
        }
        OpType::ShsP => {
            op.kind = OperandKind::Mem(MemInfo {
                shadow_stack: Some(ShadowStackKind::SspPushPop),
                ..MemInfo::default()
            });
        }
        OpType::Smt | OpType::Dmt => {
            op.kind = OperandKind::Mem(MemInfo {
                has_base: true,
                base: if opt == OpType::Smt { regs::RSI } else { regs::RDI },
                base_size: ins.addr_mode.bytes(),
                // Linear addresses; only usable in 64-bit mode.
                has_seg: false,
                ..MemInfo::default()
            });
        }
        OpType::RM => {
            op.encoding = OpEncoding::R;
            op.kind = OperandKind::Mem(MemInfo {
                has_base: true,
                base: ins.gpr_r(),
                base_size: ins.addr_mode.bytes(),
                has_seg: true,
                seg: regs::ES,
                ..MemInfo::default()
            });
        }
        OpType::MM => {
            op.encoding = OpEncoding::M;
            op.kind = OperandKind::Mem(MemInfo {
                has_base: true,
                base: ins.gpr_m(),
                base_size: ins.addr_mode.bytes(),
                has_seg: true,
                seg: seg_override(ins, regs::DS),
                ..MemInfo::default()
            });
        }
        OpType::Z => {
            let id = ins.gpr_o();
            op.encoding = OpEncoding::O;
            op.kind = reg_op(RegBank::Gpr, id.into(), size);
            if let OperandKind::Reg(ref mut r) = op.kind {
                r.is_high8 = high8(ins, size, id.into());
            }
        }
        OpType::RB => {
            op.encoding = OpEncoding::R;
            op.kind = reg_op(RegBank::Bnd, ins.bnd_r().into(), size);
        }
        OpType::MB => {
            if !ins.modrm.is_reg_form() {
                is_memory = true;
            } else {
                op.encoding = OpEncoding::M;
                op.kind = reg_op(RegBank::Bnd, ins.bnd_m().into(), size);
            }
        }
        OpType::RK => {
            op.encoding = OpEncoding::R;
            op.kind = reg_op(RegBank::Msk, ins.msk_r().into(), 8);
        }
        OpType::VK => {
            op.encoding = OpEncoding::V;
            op.kind = reg_op(RegBank::Msk, ins.msk_v().into(), 8);
        }
        OpType::MK => {
            if !ins.modrm.is_reg_form() {
                is_memory = true;
            } else {
                op.encoding = OpEncoding::M;
                op.kind = reg_op(RegBank::Msk, ins.msk_m().into(), 8);
            }
        }
        OpType::AK => {
            op.encoding = OpEncoding::A;
            op.kind = reg_op(RegBank::Msk, ins.msk_a().into(), 8);
        }
        OpType::RT => {
            op.encoding = OpEncoding::R;
            op.kind = reg_op(RegBank::Tile, ins.tmm_r().into(), size);
        }
        OpType::MT => {
            op.encoding = OpEncoding::M;
            op.kind = reg_op(RegBank::Tile, ins.tmm_m().into(), size);
        }
        OpType::VT => {
            op.encoding = OpEncoding::V;
            op.kind = reg_op(RegBank::Tile, ins.tmm_v().into(), size);
        }
        OpType::Dfv => {
            op.encoding = OpEncoding::V;
            op.size = 0;
            op.kind = OperandKind::Dfv(DefaultFlags {
                cf: ins.exs.v & 1 != 0,
                zf: ins.exs.v >> 1 & 1 != 0,
                sf: ins.exs.v >> 2 & 1 != 0,
                of: ins.exs.v >> 3 & 1 != 0,
            });
        }
    }

    //
    // ModRM-based memory forms share one expansion path.
    //
    if is_memory {
        op.encoding = OpEncoding::M;

        let mut mem = MemInfo {
            has_seg: true,
            ..MemInfo::default()
        };

        if ins.addr_mode == Width::W16 {
            parse_memory_16(ins, &mut mem);
        } else {
            parse_memory_3264(ins, entry, &mut mem, vsib_reg_size);
        }

        if ins.has_seg {
            mem.seg = seg_override(ins, mem.seg);
        }

        if entry.attributes.contains(InsAttributes::VSIB) {
            mem.vsib = Some(VsibInfo {
                index_size: vsib_index_size,
                elem_size: (size / u32::from(vsib_index_count.max(1))) as u8,
                elem_count: vsib_index_count,
            });
        }

        if entry.attributes.contains(InsAttributes::SIBMEM) {
            mem.is_sibmem = true;
        }

        // Broadcast fixes the element size; the total access size was saved
        // above and yields the replication count.
        if ins.has_broadcast {
            let elem: u32 = if opd_bits & opd::B32 != 0 {
                4
            } else if opd_bits & opd::B64 != 0 {
                8
            } else if opd_bits & opd::B16 != 0 {
                2
            } else if width {
                8
            } else {
                4
            };

            op.size = elem;
            mem.broadcast = Some(BroadcastInfo {
                size: elem as u8,
                count: (bcst_size / elem) as u8,
            });
        }

        if ins.has_comp_disp {
            mem.has_comp_disp = true;
            mem.comp_disp_size = comp_disp_size(ins, entry, op.size);
        }

        mem.is_mib = entry.attributes.contains(InsAttributes::MIB);
        mem.is_bitbase = entry.attributes.contains(InsAttributes::BITBASE);

        if entry.attributes.contains(InsAttributes::AG) {
            // Address generation ignores segment prefixes.
            mem.is_ag = true;
            mem.has_seg = false;
            mem.seg = 0;
        }

        if entry.attributes.contains(InsAttributes::SHS) {
            mem.shadow_stack = Some(ShadowStackKind::Explicit);
        }

        op.kind = OperandKind::Mem(mem);
    }

    //
    // Block registers and zero-upper semantics.
    //
    if let OperandKind::Reg(ref mut r) = op.kind {
        if opb != 0 {
            // The block base is aligned down to the block size.
            r.count = opb;
            r.id &= !(u32::from(opb) - 1);
            r.is_block = true;
        }

        if (ins.has_nd || ins.has_zu) && op.access.contains(OpAccess::WRITE) && !op.flags.is_default
        {
            r.is_zero_upper = true;
        }
    }

    //
    // Per-operand decorators, from the already computed activation state.
    //
    if opd_bits != 0 {
        if opd_bits & opd::MASK != 0 && ins.has_mask {
            op.decorator.has_mask = true;
            op.decorator.mask_reg = ins.exs.k;
        }

        if opd_bits & opd::ZERO != 0 && ins.has_zero {
            op.decorator.has_zero = true;
        }

        if opd_bits & opd::BCAST != 0 && ins.has_broadcast {
            op.decorator.has_broadcast = true;
        }
    }

    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_extension() {
        assert_eq!(sign_ex(1, 0x80), -128);
        assert_eq!(sign_ex(1, 0x7F), 127);
        assert_eq!(sign_ex(2, 0xFFFF), -1);
        assert_eq!(sign_ex(4, 0x8000_0000), -0x8000_0000i64);
        assert_eq!(sign_ex(8, 0x1234), 0x1234);
    }

    #[test]
    fn access_composites() {
        assert!((OpAccess::READ | OpAccess::WRITE).any_read());
        assert!(OpAccess::COND_WRITE.any_write());
        assert!(!OpAccess::PREFETCH.any_read());
        assert!(!OpAccess::PREFETCH.any_write());
    }
}
