//! Decoded instruction records.

use core::ops::Deref;

use crate::db::{IdbEntry, InsAttributes, ValidDecorators, ValidModes, ValidPrefixes};
use crate::enums::{
    Category, CpuidFeature, EncodingMode, EvexMode, EvexRounding, ExceptionClass, Features,
    FlagsAccess, FpuFlags, IsaSet, MachineMode, Mnemonic, StackWidth, TupleType, Vendor, VecWidth,
    VexForm, Width,
};
use crate::operand::{Operand, OperandKind};
use crate::raw::{Evex, ModRm, Rex, Rex2, Sib, Vex2, Vex3, Xop};
use crate::status::{Result, Status};

/// 15 bytes is the maximum length of one x86 instruction.
pub const MAX_INSTRUCTION_LENGTH: usize = 15;

/// No instruction carries more than 10 operands, implicit ones included.
pub const MAX_OPERAND_COUNT: usize = 10;

/// The extended prefix payload, at most one of which may be present.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ExtPrefix {
    #[default]
    None,
    Vex2(Vex2),
    Vex3(Vex3),
    Xop(Xop),
    Evex(Evex),
    Rex2(Rex2),
}

/// The flat extension-bit vector, unifying REX/REX2/XOP/VEX/EVEX fields.
///
/// Inverted hardware fields are stored normalized (already un-inverted);
/// fields that do not exist in the active encoding are zero.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[allow(missing_docs)]
pub struct ExtBits {
    pub w: u8,
    pub r: u8,
    pub x: u8,
    pub b: u8,
    /// R' / R4: bit 4 of the reg extension.
    pub rp: u8,
    /// X4: bit 4 of the index extension.
    pub x4: u8,
    /// B4: bit 4 of the base/rm extension.
    pub b4: u8,
    /// vvvv.
    pub v: u8,
    /// V' / V4: bit 4 of vvvv.
    pub vp: u8,
    /// Opcode map id.
    pub m: u8,
    /// Compressed legacy prefix (pp).
    pub p: u8,
    /// L or L'L.
    pub l: u8,
    /// EVEX.z.
    pub z: u8,
    /// EVEX.aaa.
    pub k: u8,
    /// EVEX.b (broadcast / rounding context).
    pub bm: u8,
    /// APX no-flags.
    pub nf: u8,
    /// APX new-data-destination.
    pub nd: u8,
    /// APX standard condition code.
    pub sc: u8,
}

/// A far `selector:offset` address operandized by direct CALL/JMP.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FarAddr {
    pub segment: u16,
    pub offset: u32,
}

/// Static branch classification, derived from implicit RIP/CS access.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BranchInfo {
    pub is_branch: bool,
    pub is_conditional: bool,
    pub is_indirect: bool,
    pub is_far: bool,
}

/// A decoded instruction without materialized operands.
///
/// This is the output of [`Decoder::decode_compact`](crate::Decoder), and
/// the operand-free core of [`Instruction`]. Everything the dispatch
/// pipeline produced is here: raw bytes and per-component offsets, prefix
/// state, the extension-bit vector, effective sizes, decorator activation
/// and the matched database entry.
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
#[derive(Copy, Clone, Debug, Default)]
pub struct CompactInstruction {
    /// The instruction bytes (up to 15; the 16th byte is never used).
    pub bytes: [u8; 16],
    /// Total instruction length, 1..=15.
    pub length: u8,

    /// Code mode the instruction was decoded under.
    pub def_code: MachineMode,
    /// Default stack width the instruction was decoded under.
    pub def_stack: StackWidth,
    /// Vendor preference used for decoding.
    pub vendor: Vendor,
    /// Feature mask used for decoding.
    pub features: Features,

    /// Encoding scheme.
    pub encoding: EncodingMode,
    /// VEX form, when `encoding` is VEX.
    pub vex_form: VexForm,
    /// The extended prefix payload bytes, if any.
    pub ext_prefix: ExtPrefix,

    /// Raw (pre-entry) operand mode.
    pub op_mode: Width,
    /// Effective operand mode.
    pub ef_op_mode: Width,
    /// Effective address mode.
    pub addr_mode: Width,
    /// Raw vector length.
    pub vec_mode: VecWidth,
    /// Effective vector length.
    pub ef_vec_mode: VecWidth,
    /// The natural stack word length in bytes (2, 4 or 8).
    pub word_length: u8,

    // Prefix presence.
    pub has_rex: bool,
    pub has_rex2: bool,
    pub has_vex: bool,
    pub has_xop: bool,
    pub has_evex: bool,
    pub has_op_size: bool,
    pub has_addr_size: bool,
    pub has_lock: bool,
    pub has_repnz_xacquire_bnd: bool,
    pub has_rep_repz_xrelease: bool,
    pub has_seg: bool,
    /// The last F2/F3 prefix byte, 0 if none.
    pub rep: u8,
    /// The last effective segment-override byte, 0 if none.
    pub seg: u8,
    /// REX byte, when `has_rex`.
    pub rex: Rex,

    // Instruction chunks.
    pub has_modrm: bool,
    pub modrm: ModRm,
    pub has_sib: bool,
    pub sib: Sib,
    pub has_disp: bool,
    pub has_addr: bool,
    pub has_moffset: bool,
    pub has_imm1: bool,
    pub has_imm2: bool,
    pub has_rel_offs: bool,
    pub has_sse_imm: bool,

    // Mandatory-prefix reinterpretation.
    pub has_mandatory_66: bool,
    pub has_mandatory_f2: bool,
    pub has_mandatory_f3: bool,

    // Prefix activation.
    pub is_repeated: bool,
    pub is_xacquire_enabled: bool,
    pub is_xrelease_enabled: bool,
    pub is_lock_enabled: bool,
    pub is_bnd_enabled: bool,
    pub is_bhint_enabled: bool,
    pub is_dnt_enabled: bool,
    pub is_rip_relative: bool,
    pub is_cet_tracked: bool,

    // Decorator activation.
    pub has_mask: bool,
    pub has_zero: bool,
    pub has_broadcast: bool,
    pub has_er: bool,
    pub has_sae: bool,
    pub has_ign_er: bool,
    pub has_comp_disp: bool,
    pub has_nd: bool,
    pub has_nf: bool,
    pub has_zu: bool,
    pub has_dfv: bool,
    /// Rounding mode, when `has_er`.
    pub rounding: EvexRounding,

    /// The flat extension-bit view.
    pub exs: ExtBits,

    // Component lengths, 0 when the component is absent.
    pub pref_length: u8,
    pub op_length: u8,
    pub disp_length: u8,
    pub addr_length: u8,
    pub moffset_length: u8,
    pub imm1_length: u8,
    pub imm2_length: u8,
    pub rel_offs_length: u8,

    // Component offsets from the start of the instruction.
    pub op_offset: u8,
    pub main_op_offset: u8,
    pub modrm_offset: u8,
    pub disp_offset: u8,
    pub addr_offset: u8,
    pub moffset_offset: u8,
    pub imm1_offset: u8,
    pub imm2_offset: u8,
    pub rel_offs_offset: u8,
    pub sse_imm_offset: u8,

    /// The primary (nominal) opcode byte.
    pub primary_opcode: u8,
    /// Raw displacement, unsigned, `disp_length` bytes valid.
    pub displacement: u32,
    /// Relative offset, unsigned, `rel_offs_length` bytes valid.
    pub relative_offset: u32,
    /// Moffset direct address.
    pub moffset: u64,
    /// Far pointer operand.
    pub address: FarAddr,
    /// First immediate.
    pub immediate1: u64,
    /// Second immediate (ENTER).
    pub immediate2: u8,
    /// is4 byte: a register (and possibly a 2-bit immediate).
    pub sse_immediate: u8,
    /// SSE condition code, when the entry carries one.
    pub sse_condition: u8,
    /// Condition code from the low opcode bits (Jcc/SETcc/CMOVcc) or the
    /// APX SC field.
    pub condition: u8,

    /// EVEX extension flavor of the matched entry.
    pub evex_mode: EvexMode,
    /// Number of operands the full record materializes.
    pub operands_count: u8,
    /// Number of explicit operands.
    pub exp_operands_count: u8,
    /// Number of stack words touched.
    pub stack_words: u8,
    /// Combined memory access of the instruction.
    pub memory_access: crate::operand::OpAccess,
    /// Static branch classification.
    pub branch_info: BranchInfo,

    /// Index of the matched database entry.
    pub entry_index: u16,
}

impl CompactInstruction {
    /// The matched instruction-database entry.
    pub fn entry(&self) -> &'static IdbEntry {
        // The index was produced by the dispatch walker, which validates it.
        IdbEntry::get(self.entry_index).unwrap_or(&IdbEntry::EMPTY)
    }

    /// The instruction class.
    pub fn mnemonic(&self) -> Mnemonic {
        self.entry().mnemonic
    }

    /// The instruction category.
    pub fn category(&self) -> Category {
        self.entry().category
    }

    /// The instruction set the encoding belongs to.
    pub fn isa_set(&self) -> IsaSet {
        self.entry().isa_set
    }

    /// The CPUID feature gating the instruction.
    pub fn cpuid(&self) -> CpuidFeature {
        self.entry().cpuid
    }

    /// Entry attribute bits.
    pub fn attributes(&self) -> InsAttributes {
        self.entry().attributes
    }

    /// Modes the instruction is architecturally valid in.
    pub fn valid_modes(&self) -> ValidModes {
        self.entry().valid_modes
    }

    /// Legacy prefixes the instruction accepts.
    pub fn valid_prefixes(&self) -> ValidPrefixes {
        self.entry().valid_prefixes
    }

    /// EVEX decorators the instruction accepts.
    pub fn valid_decorators(&self) -> ValidDecorators {
        self.entry().valid_decorators
    }

    /// RFLAGS access summary.
    pub fn flags_access(&self) -> FlagsAccess {
        let e = self.entry();
        let undefined = e.set & e.cleared;
        FlagsAccess {
            tested: e.tested,
            modified: e.modified,
            set: e.set ^ undefined,
            cleared: e.cleared ^ undefined,
            undefined,
        }
    }

    /// x87 C0-C3 access, meaningful for FPU instructions.
    pub fn fpu_flags_access(&self) -> FpuFlags {
        self.entry().fpu_flags
    }

    /// Exception class and type.
    pub fn exception(&self) -> (ExceptionClass, u8) {
        (self.entry().exc_class, self.entry().exc_type)
    }

    /// EVEX tuple type.
    pub fn tuple_type(&self) -> TupleType {
        self.entry().tuple
    }

    /// The decoded instruction bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.length as usize]
    }

    /// Whether the W field is honored (not W-ignored) and set.
    pub(crate) fn exs_w_effective(&self) -> bool {
        self.exs.w != 0 && !self.entry().attributes.contains(InsAttributes::WIG)
    }

    // Register-number extraction, applying the extension bits the way the
    // active encoding defines them.

    pub(crate) fn gpr_r(&self) -> u8 {
        self.exs.rp << 4 | self.exs.r << 3 | self.modrm.reg()
    }

    pub(crate) fn gpr_m(&self) -> u8 {
        self.exs.b4 << 4 | self.exs.b << 3 | self.modrm.rm()
    }

    pub(crate) fn gpr_v(&self) -> u8 {
        self.exs.vp << 4 | self.exs.v
    }

    pub(crate) fn gpr_b(&self) -> u8 {
        self.exs.b4 << 4 | self.exs.b << 3 | self.sib.base()
    }

    pub(crate) fn gpr_x(&self) -> u8 {
        self.exs.x4 << 4 | self.exs.x << 3 | self.sib.index()
    }

    pub(crate) fn gpr_o(&self) -> u8 {
        self.exs.b4 << 4 | self.exs.b << 3 | (self.primary_opcode & 7)
    }

    pub(crate) fn vec_r(&self) -> u8 {
        self.exs.rp << 4 | self.exs.r << 3 | self.modrm.reg()
    }

    pub(crate) fn vec_m(&self) -> u8 {
        self.exs.x << 4 | self.exs.b << 3 | self.modrm.rm()
    }

    pub(crate) fn vec_v(&self) -> u8 {
        self.exs.vp << 4 | self.exs.v
    }

    /// VSIB index: bit 4 comes from V'.
    pub(crate) fn vec_x(&self) -> u8 {
        self.exs.vp << 4 | self.exs.x << 3 | self.sib.index()
    }

    /// is4 register: high nibble of the SSE immediate.
    pub(crate) fn vec_l(&self) -> u8 {
        self.sse_immediate >> 4
    }

    pub(crate) fn seg_r(&self) -> u8 {
        self.modrm.reg()
    }

    pub(crate) fn cr_r(&self) -> u8 {
        self.exs.r << 3 | self.modrm.reg()
    }

    pub(crate) fn dr_r(&self) -> u8 {
        self.exs.r << 3 | self.modrm.reg()
    }

    pub(crate) fn tr_r(&self) -> u8 {
        self.modrm.reg()
    }

    pub(crate) fn bnd_r(&self) -> u8 {
        self.exs.r << 3 | self.modrm.reg()
    }

    pub(crate) fn bnd_m(&self) -> u8 {
        self.exs.b << 3 | self.modrm.rm()
    }

    pub(crate) fn msk_r(&self) -> u8 {
        self.modrm.reg()
    }

    pub(crate) fn msk_m(&self) -> u8 {
        self.modrm.rm()
    }

    pub(crate) fn msk_v(&self) -> u8 {
        self.exs.v
    }

    pub(crate) fn msk_a(&self) -> u8 {
        self.exs.k
    }

    pub(crate) fn mmx_r(&self) -> u8 {
        self.modrm.reg()
    }

    pub(crate) fn mmx_m(&self) -> u8 {
        self.modrm.rm()
    }

    pub(crate) fn tmm_r(&self) -> u8 {
        self.modrm.reg()
    }

    pub(crate) fn tmm_m(&self) -> u8 {
        self.modrm.rm()
    }

    pub(crate) fn tmm_v(&self) -> u8 {
        self.exs.v
    }
}

/// A fully decoded instruction: the compact record plus its operand list.
///
/// Dereferences to [`CompactInstruction`], so every compact accessor is
/// available here as well.
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
#[derive(Copy, Clone, Debug)]
pub struct Instruction {
    pub(crate) inner: CompactInstruction,
    pub(crate) operands: [Operand; MAX_OPERAND_COUNT],
}

impl Instruction {
    /// All operands, implicit ones included.
    pub fn operands(&self) -> &[Operand] {
        &self.operands[..self.inner.operands_count as usize]
    }

    /// Explicit (printed) operands only.
    pub fn explicit_operands(&self) -> &[Operand] {
        &self.operands[..self.inner.exp_operands_count as usize]
    }

    /// The compact record this instruction wraps.
    pub fn compact(&self) -> &CompactInstruction {
        &self.inner
    }

    /// Computes the target of the relative-offset operand, if the
    /// instruction has one, given the address the instruction was fetched
    /// from.
    pub fn relative_target(&self, rip: u64) -> Result<u64> {
        for op in self.operands() {
            if let OperandKind::Offs(rel) = op.kind {
                let next = rip.wrapping_add(u64::from(self.inner.length));
                return Ok(next.wrapping_add(rel.offset as u64));
            }
        }
        Err(Status::InvalidParameter)
    }
}

impl Deref for Instruction {
    type Target = CompactInstruction;

    fn deref(&self) -> &CompactInstruction {
        &self.inner
    }
}
