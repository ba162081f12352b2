//! Binary instruction decoding.
//!
//! The [`Decoder`] is a plain configuration value; every decode call runs
//! the full pipeline on a transient context and either returns a complete
//! record or a typed status. Nothing is allocated and no state is shared
//! between calls.

use crate::db::{self, aux, dsz, feat, DispatchNode, Edge, FilterKind, IdbEntry, InsAttributes, Ipb,
    ValidDecorators, ValidPrefixes};
use crate::enums::{
    DataWidth, EncodingMode, EvexMode, EvexRounding, Features, MachineMode, StackWidth, Vendor,
    VecWidth, VexForm, Width,
};
use crate::insn::{
    CompactInstruction, ExtPrefix, FarAddr, Instruction, MAX_INSTRUCTION_LENGTH, MAX_OPERAND_COUNT,
};
use crate::operand::{self, Operand};
use crate::raw::{Evex, ModRm, Rex, Rex2, Sib, Vex2, Vex3, Xop};
use crate::status::{Result, Status};

// Prefix byte classes, per code mode.
const PFX_NONE: u8 = 0;
const PFX_LEGACY: u8 = 1;
const PFX_REX: u8 = 2;
const PFX_EXT: u8 = 3;

const fn build_prefix_map(long_mode: bool) -> [u8; 256] {
    let mut map = [PFX_NONE; 256];

    // Group 1.
    map[0xF0] = PFX_LEGACY;
    map[0xF2] = PFX_LEGACY;
    map[0xF3] = PFX_LEGACY;
    // Group 2.
    map[0x2E] = PFX_LEGACY;
    map[0x36] = PFX_LEGACY;
    map[0x3E] = PFX_LEGACY;
    map[0x26] = PFX_LEGACY;
    map[0x64] = PFX_LEGACY;
    map[0x65] = PFX_LEGACY;
    // Groups 3 and 4.
    map[0x66] = PFX_LEGACY;
    map[0x67] = PFX_LEGACY;

    // Extended encoding introducers. Outside 64-bit mode the handlers fall
    // back to the legacy instructions sharing these bytes.
    map[0xC4] = PFX_EXT;
    map[0xC5] = PFX_EXT;
    map[0x62] = PFX_EXT;
    map[0x8F] = PFX_EXT;

    if long_mode {
        let mut b = 0x40;
        while b <= 0x4F {
            map[b] = PFX_REX;
            b += 1;
        }
        map[0xD5] = PFX_EXT;
    }

    map
}

static PREFIX_MAP_1632: [u8; 256] = build_prefix_map(false);
static PREFIX_MAP_64: [u8; 256] = build_prefix_map(true);

/// An instruction decoder for one machine configuration.
#[derive(Clone, Debug)]
pub struct Decoder {
    mode: MachineMode,
    stack: StackWidth,
    vendor: Vendor,
    features: Features,
}

impl Decoder {
    /// Creates a decoder for the given code mode and stack width. The
    /// vendor defaults to [`Vendor::Any`], the feature mask to everything.
    pub fn new(mode: MachineMode, stack: StackWidth) -> Decoder {
        Decoder {
            mode,
            stack,
            vendor: Vendor::Any,
            features: Features::ALL,
        }
    }

    /// A 64-bit decoder.
    pub fn new64() -> Decoder {
        Decoder::new(MachineMode::Long64, StackWidth::_64)
    }

    /// A 32-bit decoder.
    pub fn new32() -> Decoder {
        Decoder::new(MachineMode::Legacy32, StackWidth::_32)
    }

    /// A 16-bit decoder.
    pub fn new16() -> Decoder {
        Decoder::new(MachineMode::Legacy16, StackWidth::_16)
    }

    /// Creates a decoder with an explicit data width as well. The data
    /// width only matters to callers that surface it; decoding itself is
    /// driven by the code mode and prefixes.
    pub fn new_full(mode: MachineMode, _data: DataWidth, stack: StackWidth) -> Decoder {
        Decoder::new(mode, stack)
    }

    /// Sets the preferred vendor, used to resolve conflicting encodings.
    pub fn vendor(mut self, vendor: Vendor) -> Decoder {
        self.vendor = vendor;
        self
    }

    /// Sets the enabled ISA feature mask.
    pub fn features(mut self, features: Features) -> Decoder {
        self.features = features;
        self
    }

    /// Decodes one instruction and materializes all of its operands.
    pub fn decode(&self, code: &[u8]) -> Result<Instruction> {
        let compact = self.decode_compact(code)?;
        let entry = compact.entry();

        let mut operands = [Operand::default(); MAX_OPERAND_COUNT];
        for (i, spec) in entry.operands.iter().enumerate() {
            operands[i] = operand::materialize(&compact, entry, *spec)?;
        }

        Ok(Instruction {
            inner: compact,
            operands,
        })
    }

    /// Decodes one instruction without materializing operands.
    ///
    /// This runs the whole pipeline except operand expansion and is the
    /// fast path for scanning. Use [`Decoder::materialize_operand`] to
    /// expand individual operands later.
    pub fn decode_compact(&self, code: &[u8]) -> Result<CompactInstruction> {
        if code.is_empty() {
            return Err(Status::InvalidParameter);
        }

        let mut ins = CompactInstruction {
            def_code: self.mode,
            def_stack: self.stack,
            vendor: self.vendor,
            features: self.features,
            addr_mode: self.mode.width(),
            op_mode: if self.mode == MachineMode::Legacy16 {
                Width::W16
            } else {
                Width::W32
            },
            ..CompactInstruction::default()
        };

        let cached = code.len().min(16);
        ins.bytes[..cached].copy_from_slice(&code[..cached]);

        decode_internal(self, &mut ins, code)?;

        Ok(ins)
    }

    /// Expands one operand of a previously decoded compact instruction.
    ///
    /// The result is identical to the corresponding entry of
    /// [`Instruction::operands`].
    pub fn materialize_operand(&self, ins: &CompactInstruction, index: u8) -> Result<Operand> {
        let entry = ins.entry();
        let spec = entry
            .operands
            .get(index as usize)
            .ok_or(Status::InvalidParameter)?;
        operand::materialize(ins, entry, *spec)
    }

    /// Returns an iterator yielding `(instruction, ip)` pairs over `code`.
    ///
    /// Iteration stops at the first byte sequence that fails to decode.
    pub fn instruction_iterator<'d, 'b>(
        &'d self,
        code: &'b [u8],
        ip: u64,
    ) -> InstructionIterator<'d, 'b> {
        InstructionIterator {
            decoder: self,
            code,
            ip,
        }
    }
}

/// Iterator over the instructions of a byte buffer.
pub struct InstructionIterator<'d, 'b> {
    decoder: &'d Decoder,
    code: &'b [u8],
    ip: u64,
}

impl<'d, 'b> Iterator for InstructionIterator<'d, 'b> {
    type Item = (Instruction, u64);

    fn next(&mut self) -> Option<Self::Item> {
        match self.decoder.decode(self.code) {
            Ok(ins) => {
                let len = usize::from(ins.length);
                self.code = &self.code[len..];
                let item = (ins, self.ip);
                self.ip += u64::from(ins.length);
                Some(item)
            }
            Err(_) => None,
        }
    }
}

fn increment_length(ins: &mut CompactInstruction, amount: u8) -> Result {
    ins.length += amount;
    if usize::from(ins.length) > MAX_INSTRUCTION_LENGTH {
        return Err(Status::InstructionTooLong);
    }
    Ok(())
}

fn want(code: &[u8], offset: usize, count: usize) -> Result {
    if offset + count > code.len() {
        return Err(Status::BufferTooSmall);
    }
    Ok(())
}

fn read_u16(code: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([code[offset], code[offset + 1]])
}

fn read_u32(code: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        code[offset],
        code[offset + 1],
        code[offset + 2],
        code[offset + 3],
    ])
}

fn read_u64(code: &[u8], offset: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&code[offset..offset + 8]);
    u64::from_le_bytes(b)
}

fn has_conflicting_prefix(ins: &CompactInstruction) -> bool {
    ins.has_op_size
        || ins.has_repnz_xacquire_bnd
        || ins.has_rep_repz_xrelease
        || ins.has_rex
        || ins.has_rex2
        || ins.has_lock
}

//
// Extended prefix handlers. Each is entered with `offset` pointing at the
// introducer byte; returning Ok without consuming anything means "this is
// not an extended prefix here" and the byte decodes as a legacy opcode.
//

fn fetch_xop(ins: &mut CompactInstruction, code: &[u8], offset: usize) -> Result {
    want(code, offset, 2)?;

    // Low map values mean the legacy POP Ev form of 0x8F.
    if code[offset + 1] & 0x1F < 8 {
        return Ok(());
    }

    want(code, offset, 3)?;

    if has_conflicting_prefix(ins) {
        return Err(Status::XopWithPrefix);
    }

    let xop = Xop([code[offset], code[offset + 1], code[offset + 2]]);

    ins.has_xop = true;
    ins.encoding = EncodingMode::Xop;
    ins.ext_prefix = ExtPrefix::Xop(xop);

    ins.exs.w = xop.w();
    ins.exs.r = !xop.r() & 1;
    ins.exs.x = !xop.x() & 1;
    ins.exs.b = !xop.b() & 1;
    ins.exs.l = xop.l();
    ins.exs.v = !xop.v() & 0xF;
    ins.exs.m = xop.m();
    ins.exs.p = xop.p();

    if ins.def_code != MachineMode::Long64 {
        // XOP.R and XOP.X must be set (inverted) outside 64-bit mode.
        if (ins.exs.r | ins.exs.x) == 1 {
            return Err(Status::InvalidEncodingInMode);
        }

        if ins.exs.v & 0x8 != 0 {
            return Err(Status::InvalidEncodingInMode);
        }

        ins.exs.b = 0;
    } else if ins.exs.w == 1 {
        ins.op_mode = Width::W64;
    }

    increment_length(ins, 3)
}

fn fetch_vex2(ins: &mut CompactInstruction, code: &[u8], offset: usize) -> Result {
    want(code, offset, 2)?;

    if ins.def_code != MachineMode::Long64 && code[offset + 1] & 0xC0 != 0xC0 {
        // LDS outside 64-bit mode.
        return Ok(());
    }

    if has_conflicting_prefix(ins) {
        return Err(Status::VexWithPrefix);
    }

    let vex = Vex2([code[offset], code[offset + 1]]);

    ins.has_vex = true;
    ins.encoding = EncodingMode::Vex;
    ins.vex_form = VexForm::Vex2;
    ins.ext_prefix = ExtPrefix::Vex2(vex);

    // The two-byte form always selects the 0F map.
    ins.exs.m = 1;
    ins.exs.r = !vex.r() & 1;
    ins.exs.v = !vex.v() & 0xF;
    ins.exs.l = vex.l();
    ins.exs.p = vex.p();

    if ins.def_code != MachineMode::Long64 {
        ins.exs.v &= 7;
    }

    increment_length(ins, 2)
}

fn fetch_vex3(ins: &mut CompactInstruction, code: &[u8], offset: usize) -> Result {
    want(code, offset, 2)?;

    if ins.def_code != MachineMode::Long64 && code[offset + 1] & 0xC0 != 0xC0 {
        // LES outside 64-bit mode.
        return Ok(());
    }

    want(code, offset, 3)?;

    if has_conflicting_prefix(ins) {
        return Err(Status::VexWithPrefix);
    }

    let vex = Vex3([code[offset], code[offset + 1], code[offset + 2]]);

    ins.has_vex = true;
    ins.encoding = EncodingMode::Vex;
    ins.vex_form = VexForm::Vex3;
    ins.ext_prefix = ExtPrefix::Vex3(vex);

    ins.exs.r = !vex.r() & 1;
    ins.exs.x = !vex.x() & 1;
    ins.exs.b = !vex.b() & 1;
    ins.exs.m = vex.m() & 7;
    ins.exs.w = vex.w();
    ins.exs.v = !vex.v() & 0xF;
    ins.exs.l = vex.l();
    ins.exs.p = vex.p();

    if ins.def_code != MachineMode::Long64 {
        // VEX.R and VEX.X were checked by the form test above.
        ins.exs.v &= 7;
        ins.exs.b = 0;
    } else if ins.exs.w == 1 {
        ins.op_mode = Width::W64;
    }

    increment_length(ins, 3)
}

fn fetch_evex(
    decoder: &Decoder,
    ins: &mut CompactInstruction,
    code: &[u8],
    offset: usize,
) -> Result {
    want(code, offset, 2)?;

    if ins.def_code != MachineMode::Long64 && code[offset + 1] & 0xC0 != 0xC0 {
        // BOUND outside 64-bit mode.
        return Ok(());
    }

    want(code, offset, 4)?;

    if has_conflicting_prefix(ins) {
        return Err(Status::EvexWithPrefix);
    }

    let evex = Evex([
        code[offset],
        code[offset + 1],
        code[offset + 2],
        code[offset + 3],
    ]);

    ins.has_evex = true;
    ins.encoding = EncodingMode::Evex;
    ins.ext_prefix = ExtPrefix::Evex(evex);

    if evex.m() == 0 {
        return Err(Status::InvalidEncoding);
    }

    if !decoder.features.contains(Features::APX) {
        // Maps 4 and 7 exist only with APX.
        if evex.m() == 4 || evex.m() == 7 {
            return Err(Status::InvalidEncoding);
        }

        // For regular EVEX, B4 must be 0 and U must be 1.
        if evex.b4() != 0 || evex.u() != 1 {
            return Err(Status::InvalidEncoding);
        }
    }

    // Optimistically extract every field; the flavor-specific validation
    // and zeroing happens after the entry is known.
    ins.exs.r = !evex.r() & 1;
    ins.exs.x = !evex.x() & 1;
    ins.exs.b = !evex.b() & 1;
    ins.exs.rp = !evex.rp() & 1;
    ins.exs.x4 = !evex.u() & 1;
    ins.exs.b4 = evex.b4();
    ins.exs.m = evex.m();
    ins.exs.w = evex.w();
    ins.exs.v = !evex.v() & 0xF;
    ins.exs.vp = !evex.vp() & 1;
    ins.exs.p = evex.p();
    ins.exs.z = evex.z();
    ins.exs.l = evex.l();
    ins.exs.bm = evex.bm();
    ins.exs.k = evex.a();
    ins.exs.nf = evex.nf();
    ins.exs.nd = evex.nd();
    ins.exs.sc = evex.sc();

    if ins.def_code != MachineMode::Long64 {
        // The high extension bits have no effect outside 64-bit mode.
        ins.exs.r = 0;
        ins.exs.x = 0;
        ins.exs.b = 0;
        ins.exs.rp = 0;
        ins.exs.b4 = 0;
        ins.exs.x4 = 0;
        ins.exs.v &= 0x7;

        if ins.exs.vp == 1 {
            return Err(Status::BadEvexVPrime);
        }
    } else if ins.exs.w == 1 {
        ins.op_mode = Width::W64;
    }

    increment_length(ins, 4)
}

fn fetch_rex2(
    decoder: &Decoder,
    ins: &mut CompactInstruction,
    code: &[u8],
    offset: usize,
) -> Result {
    if ins.def_code != MachineMode::Long64 {
        // AAD outside 64-bit mode.
        return Ok(());
    }

    if !decoder.features.contains(Features::APX) {
        // Without APX, 0xD5 is not a prefix; the opcode path rejects it.
        return Ok(());
    }

    if ins.has_rex {
        return Err(Status::InvalidPrefixSequence);
    }

    // The payload byte plus at least one opcode byte must follow.
    want(code, offset, 3)?;

    let rex2 = Rex2([code[offset], code[offset + 1]]);

    ins.has_rex2 = true;
    ins.encoding = EncodingMode::Legacy;
    ins.ext_prefix = ExtPrefix::Rex2(rex2);

    ins.exs.r = rex2.r3();
    ins.exs.rp = rex2.r4();
    ins.exs.x = rex2.x3();
    ins.exs.x4 = rex2.x4();
    ins.exs.b = rex2.b3();
    ins.exs.b4 = rex2.b4();
    ins.exs.w = rex2.w();
    ins.exs.m = rex2.m0();

    // The opcode must be REX2 compatible in the selected map.
    if !db::rex2_allows(rex2.m0(), code[offset + 2]) {
        return Err(Status::InvalidEncoding);
    }

    if ins.exs.w == 1 {
        ins.op_mode = Width::W64;
    }

    increment_length(ins, 2)
}

//
// Stage 1: the prefix scanner.
//

fn fetch_prefixes(decoder: &Decoder, ins: &mut CompactInstruction, code: &[u8]) -> Result {
    let map: &[u8; 256] = if ins.def_code == MachineMode::Long64 {
        &PREFIX_MAP_64
    } else {
        &PREFIX_MAP_1632
    };

    let mut offset = 0usize;

    loop {
        let prefix = code[offset];

        match map[prefix as usize] {
            PFX_LEGACY => match prefix {
                0xF0 => ins.has_lock = true,
                0xF3 => {
                    ins.rep = 0xF3;
                    ins.has_rep_repz_xrelease = true;
                }
                0xF2 => {
                    ins.rep = 0xF2;
                    ins.has_repnz_xacquire_bnd = true;
                }
                0x2E | 0x36 | 0x3E | 0x26 | 0x64 | 0x65 => {
                    if ins.def_code == MachineMode::Long64 {
                        if prefix == 0x64 || prefix == 0x65 {
                            // The last FS/GS always wins.
                            ins.seg = prefix;
                            ins.has_seg = true;
                        } else if prefix == 0x3E && ins.seg != 0x64 && ins.seg != 0x65 {
                            // Do-not-track counts only without FS/GS.
                            ins.seg = prefix;
                            ins.has_seg = true;
                        } else if ins.seg != 0x64 && ins.seg != 0x65 && ins.seg != 0x3E {
                            ins.seg = prefix;
                            ins.has_seg = true;
                        }
                    } else {
                        ins.seg = prefix;
                        ins.has_seg = true;
                    }
                }
                0x66 => {
                    ins.has_op_size = true;
                    ins.op_mode = if ins.def_code == MachineMode::Legacy16 {
                        Width::W32
                    } else {
                        Width::W16
                    };
                }
                0x67 => {
                    ins.has_addr_size = true;
                    ins.addr_mode = if ins.def_code == MachineMode::Legacy32 {
                        Width::W16
                    } else {
                        Width::W32
                    };
                }
                _ => {}
            },
            PFX_REX => {
                // At least one opcode byte must follow.
                if offset + 1 >= code.len() {
                    return Err(Status::BufferTooSmall);
                }

                let next = map[code[offset + 1] as usize];
                if next != PFX_LEGACY && next != PFX_REX {
                    // REX counts only as the last prefix before the opcode;
                    // a later legacy or REX prefix overwrites it. A later
                    // extended prefix keeps it and then rejects the mix.
                    let rex = Rex(prefix);
                    ins.has_rex = true;
                    ins.rex = rex;
                    ins.exs.w = rex.w();
                    ins.exs.r = rex.r();
                    ins.exs.x = rex.x();
                    ins.exs.b = rex.b();

                    if ins.exs.w == 1 {
                        ins.op_mode = Width::W64;
                    }
                }
            }
            PFX_EXT => {
                match prefix {
                    0x8F => fetch_xop(ins, code, offset)?,
                    0xC5 => fetch_vex2(ins, code, offset)?,
                    0xC4 => fetch_vex3(ins, code, offset)?,
                    0x62 => fetch_evex(decoder, ins, code, offset)?,
                    0xD5 => fetch_rex2(decoder, ins, code, offset)?,
                    _ => return Err(Status::InvalidInstruction),
                }

                // An extended prefix is the last prefix; the next byte must
                // be the opcode.
                break;
            }
            _ => break,
        }

        ins.length += 1;
        offset += 1;
        if usize::from(ins.length) > MAX_INSTRUCTION_LENGTH {
            return Err(Status::InstructionTooLong);
        }

        // At least one more byte must be available.
        want(code, offset, 1)?;
    }

    ins.pref_length = ins.length;
    ins.op_offset = ins.length;
    ins.main_op_offset = ins.length;

    Ok(())
}

//
// Stage 2: the opcode fetcher. Legacy escape bytes are walked here; for
// the extended encodings the map id came from the prefix payload.
//

fn fetch_opcodes(ins: &mut CompactInstruction, code: &[u8]) -> Result {
    let mut offset = usize::from(ins.length);

    want(code, offset, 1)?;
    ins.primary_opcode = code[offset];
    ins.op_length = 1;
    offset += 1;

    if ins.primary_opcode == 0x0F && ins.encoding == EncodingMode::Legacy && !ins.has_rex2 {
        ins.exs.m = 1;

        want(code, offset, 1)?;
        ins.primary_opcode = code[offset];
        ins.op_length += 1;
        ins.main_op_offset += 1;
        offset += 1;

        if ins.primary_opcode == 0x38 || ins.primary_opcode == 0x3A {
            ins.exs.m = if ins.primary_opcode == 0x38 { 2 } else { 3 };

            want(code, offset, 1)?;
            ins.primary_opcode = code[offset];
            ins.op_length += 1;
            ins.main_op_offset += 1;
        }
    }

    increment_length(ins, ins.op_length)
}

/// Fetches the 3DNow!-style trailing opcode.
fn fetch_opcode_last(ins: &mut CompactInstruction, code: &[u8]) -> Result {
    let offset = usize::from(ins.length);
    want(code, offset, 1)?;

    ins.primary_opcode = code[offset];
    ins.op_length += 1;
    increment_length(ins, 1)?;

    ins.main_op_offset = ins.length - 1;
    Ok(())
}

//
// Stage 3: ModRM, SIB and displacement.
//

fn fetch_displacement(
    ins: &mut CompactInstruction,
    code: &[u8],
    offset: usize,
    disp_size: u8,
) -> Result {
    want(code, offset, disp_size.into())?;

    ins.has_disp = true;
    ins.disp_length = disp_size;
    ins.disp_offset = offset as u8;

    ins.displacement = match disp_size {
        1 => code[offset].into(),
        2 => read_u16(code, offset).into(),
        4 => read_u32(code, offset),
        _ => return Err(Status::InvalidParameter),
    };

    ins.is_rip_relative = ins.def_code == MachineMode::Long64
        && ins.modrm.mod_() == 0
        && ins.modrm.rm() == 5;

    increment_length(ins, disp_size)
}

fn fetch_modrm_sib_disp(ins: &mut CompactInstruction, code: &[u8]) -> Result {
    let kind = match db::modrm_kind(ins.encoding, ins.exs.m, ins.primary_opcode) {
        Some(kind) => kind,
        None => return Err(Status::InvalidEncoding),
    };

    if kind == db::ModRmKind::None {
        return Ok(());
    }

    let mut offset = usize::from(ins.length);

    want(code, offset, 1)?;
    ins.has_modrm = true;
    ins.modrm_offset = offset as u8;
    ins.modrm = ModRm(code[offset]);
    increment_length(ins, 1)?;
    offset += 1;

    // Register-forced forms (CR/DR moves) never carry SIB or displacement.
    if kind == db::ModRmKind::RegOnly {
        return Ok(());
    }

    let mut base = ins.modrm.rm();

    if ins.modrm.rm() == 4 && ins.modrm.mod_() != 3 && ins.addr_mode != Width::W16 {
        want(code, offset, 1)?;
        ins.has_sib = true;
        ins.sib = Sib(code[offset]);
        increment_length(ins, 1)?;
        offset += 1;

        base = ins.sib.base();
    }

    if ins.modrm.mod_() != 3 {
        let disp_size = if ins.addr_mode == Width::W16 {
            db::disp_size_16(ins.modrm.mod_(), base)
        } else {
            db::disp_size_3264(ins.modrm.mod_(), base)
        };

        if disp_size != 0 {
            fetch_displacement(ins, code, offset, disp_size)?;
        }
    }

    Ok(())
}

//
// Stage 5: payload bytes (immediates, offsets, addresses).
//

fn fetch_immediate(ins: &mut CompactInstruction, code: &[u8], size: u8) -> Result {
    let offset = usize::from(ins.length);
    want(code, offset, size.into())?;

    ins.has_imm1 = true;
    ins.imm1_length = size;
    ins.imm1_offset = offset as u8;

    ins.immediate1 = match size {
        1 => code[offset].into(),
        2 => read_u16(code, offset).into(),
        4 => read_u32(code, offset).into(),
        8 => read_u64(code, offset),
        _ => return Err(Status::InvalidParameter),
    };

    increment_length(ins, size)
}

fn fetch_immediate2(ins: &mut CompactInstruction, code: &[u8]) -> Result {
    let offset = usize::from(ins.length);
    want(code, offset, 1)?;

    ins.has_imm2 = true;
    ins.imm2_length = 1;
    ins.imm2_offset = offset as u8;
    ins.immediate2 = code[offset];

    increment_length(ins, 1)
}

fn fetch_relative_offset(ins: &mut CompactInstruction, code: &[u8], size: u8) -> Result {
    let offset = usize::from(ins.length);
    want(code, offset, size.into())?;

    ins.has_rel_offs = true;
    ins.rel_offs_length = size;
    ins.rel_offs_offset = offset as u8;

    ins.relative_offset = match size {
        1 => code[offset].into(),
        2 => read_u16(code, offset).into(),
        4 => read_u32(code, offset),
        _ => return Err(Status::InvalidParameter),
    };

    ins.is_rip_relative = true;

    increment_length(ins, size)
}

fn fetch_address_far(ins: &mut CompactInstruction, code: &[u8], size: u8) -> Result {
    let offset = usize::from(ins.length);
    want(code, offset, size.into())?;

    ins.has_addr = true;
    ins.addr_length = size;
    ins.addr_offset = offset as u8;

    ins.address = match size {
        4 => FarAddr {
            offset: read_u16(code, offset).into(),
            segment: read_u16(code, offset + 2),
        },
        6 => FarAddr {
            offset: read_u32(code, offset),
            segment: read_u16(code, offset + 4),
        },
        _ => return Err(Status::InvalidParameter),
    };

    increment_length(ins, size)
}

fn fetch_moffset(ins: &mut CompactInstruction, code: &[u8], size: u8) -> Result {
    let offset = usize::from(ins.length);
    want(code, offset, size.into())?;

    ins.has_moffset = true;
    ins.moffset_length = size;
    ins.moffset_offset = offset as u8;

    ins.moffset = match size {
        2 => read_u16(code, offset).into(),
        4 => read_u32(code, offset).into(),
        8 => read_u64(code, offset),
        _ => return Err(Status::InvalidParameter),
    };

    increment_length(ins, size)
}

fn fetch_sse_immediate(ins: &mut CompactInstruction, code: &[u8]) -> Result {
    let offset = usize::from(ins.length);
    want(code, offset, 1)?;

    ins.has_sse_imm = true;
    ins.sse_imm_offset = offset as u8;
    ins.sse_immediate = code[offset];

    increment_length(ins, 1)
}

fn fetch_payload_bytes(ins: &mut CompactInstruction, code: &[u8], ipb: Ipb) -> Result {
    const ZSZ: [u8; 3] = [2, 4, 4];
    const VSZ: [u8; 3] = [2, 4, 8];
    const PSZ: [u8; 3] = [4, 6, 10];

    match ipb {
        Ipb::None => Ok(()),
        Ipb::Ib => fetch_immediate(ins, code, 1),
        Ipb::Iw => fetch_immediate(ins, code, 2),
        Ipb::Id => fetch_immediate(ins, code, 4),
        Ipb::Iv => fetch_immediate(ins, code, VSZ[ins.ef_op_mode.index()]),
        Ipb::Iz => fetch_immediate(ins, code, ZSZ[ins.ef_op_mode.index()]),
        Ipb::Iwb => {
            fetch_immediate(ins, code, 2)?;
            fetch_immediate2(ins, code)
        }
        Ipb::Ibb => {
            fetch_immediate(ins, code, 1)?;
            fetch_immediate2(ins, code)
        }
        Ipb::Jb => fetch_relative_offset(ins, code, 1),
        Ipb::Jz => fetch_relative_offset(ins, code, ZSZ[ins.ef_op_mode.index()]),
        Ipb::Ap => fetch_address_far(ins, code, PSZ[ins.ef_op_mode.index()]),
        Ipb::Aq => {
            // 64-bit absolute near target.
            let offset = usize::from(ins.length);
            want(code, offset, 8)?;
            ins.has_addr = true;
            ins.addr_length = 8;
            ins.addr_offset = offset as u8;
            ins.address = FarAddr {
                segment: 0,
                offset: read_u64(code, offset) as u32,
            };
            increment_length(ins, 8)
        }
        Ipb::Oa => fetch_moffset(ins, code, VSZ[ins.addr_mode.index()]),
        Ipb::Lb => fetch_sse_immediate(ins, code),
    }
}

//
// Stage 4: the dispatch walker.
//

fn edge_or_invalid(edge: Edge) -> Result<&'static DispatchNode> {
    edge.ok_or(Status::InvalidEncoding)
}

fn apply_filter(
    decoder: &Decoder,
    ins: &CompactInstruction,
    kind: FilterKind,
) -> Result {
    let apx = decoder.features.contains(Features::APX);

    let ok = match kind {
        FilterKind::No64 => {
            if ins.def_code == MachineMode::Long64 {
                return Err(Status::InvalidEncodingInMode);
            }
            true
        }
        FilterKind::No1632 => {
            if ins.def_code != MachineMode::Long64 {
                return Err(Status::InvalidEncodingInMode);
            }
            true
        }
        FilterKind::NoRipRel => {
            if ins.is_rip_relative {
                return Err(Status::RipRelAddressingNotSupported);
            }
            true
        }
        FilterKind::NoA16 => {
            if ins.addr_mode == Width::W16 {
                return Err(Status::Addressing16NotSupported);
            }
            true
        }
        FilterKind::No66 => !ins.has_op_size,
        FilterKind::No67 => !ins.has_addr_size,
        FilterKind::NoRep => ins.rep == 0,
        FilterKind::NoRex2 => !ins.has_rex2,
        FilterKind::NoL0 => ins.exs.l != 0,
        FilterKind::NoV => {
            if ins.exs.v != 0 {
                return Err(Status::VexVvvvMustBeZero);
            }
            true
        }
        FilterKind::NoVp => {
            if ins.exs.vp != 0 {
                return Err(Status::BadEvexVPrime);
            }
            true
        }
        FilterKind::NoVvp => {
            if ins.exs.v != 0 {
                return Err(Status::VexVvvvMustBeZero);
            }
            if ins.exs.vp != 0 {
                return Err(Status::BadEvexVPrime);
            }
            true
        }
        FilterKind::RRLt16 => apx || ins.gpr_r() < 16,
        FilterKind::RVLt16 => apx || ins.gpr_v() < 16,
        FilterKind::SRIn012345 => ins.seg_r() < 6,
        FilterKind::SRIn02345 => {
            if ins.seg_r() == 1 {
                return Err(Status::CsLoad);
            }
            ins.seg_r() < 6
        }
        FilterKind::BRLt4 => ins.bnd_r() < 4,
        FilterKind::BMLt4 => ins.bnd_m() < 4 || ins.modrm.mod_() != 3,
        FilterKind::CRIn02348 => matches!(ins.cr_r(), 0 | 2 | 3 | 4 | 8),
        FilterKind::DRLt8 => ins.dr_r() < 8,
        FilterKind::QRLt8 => ins.tr_r() < 8,
        FilterKind::KRLt8 => ins.msk_r() < 8,
        FilterKind::KVLt8 => ins.msk_v() < 8,
        FilterKind::TRLt8 => ins.tmm_r() < 8,
        FilterKind::TMLt8 => ins.tmm_m() < 8 || ins.modrm.mod_() != 3,
        FilterKind::TVLt8 => ins.tmm_v() < 8,
        FilterKind::VXneVRneVV => {
            if ins.vec_x() != ins.vec_r()
                && ins.vec_x() != ins.vec_v()
                && ins.vec_r() != ins.vec_v()
            {
                true
            } else {
                return Err(Status::InvalidVsibRegs);
            }
        }
        FilterKind::VXneVR => {
            if ins.vec_x() != ins.vec_r() {
                true
            } else {
                return Err(Status::InvalidVsibRegs);
            }
        }
        FilterKind::TRneTMneTV => {
            if ins.tmm_r() != ins.tmm_m()
                && ins.tmm_r() != ins.tmm_v()
                && ins.tmm_v() != ins.tmm_m()
            {
                true
            } else {
                return Err(Status::InvalidTileRegs);
            }
        }
        FilterKind::VRneVVneVM => {
            if ins.vec_r() != ins.vec_v()
                && (ins.vec_r() != ins.vec_m() || ins.modrm.mod_() != 3)
            {
                true
            } else {
                return Err(Status::InvalidDestRegs);
            }
        }
        FilterKind::RVne4RMne4 => {
            if ins.gpr_v() != 4 && ins.gpr_m() != 4 {
                true
            } else {
                return Err(Status::InvalidDestRegs);
            }
        }
        FilterKind::RVneRM => {
            if ins.gpr_v() != ins.gpr_m() {
                true
            } else {
                return Err(Status::InvalidDestRegs);
            }
        }
    };

    if ok {
        Ok(())
    } else {
        Err(match kind {
            FilterKind::No66 | FilterKind::No67 | FilterKind::NoRep | FilterKind::NoRex2
            | FilterKind::NoL0 => Status::InvalidEncoding,
            _ => Status::InvalidRegisterInInstruction,
        })
    }
}

fn walk_tables(
    decoder: &Decoder,
    ins: &mut CompactInstruction,
    code: &[u8],
) -> Result<&'static IdbEntry> {
    let root = match ins.encoding {
        EncodingMode::Legacy => db::LEGACY_ROOT.get(usize::from(ins.exs.m)).copied().flatten(),
        EncodingMode::Xop => {
            let m = usize::from(ins.exs.m);
            if (8..=10).contains(&m) {
                db::XOP_ROOT[m - 8]
            } else {
                None
            }
        }
        EncodingMode::Vex => db::VEX_ROOT.get(usize::from(ins.exs.m)).copied().flatten(),
        EncodingMode::Evex => db::EVEX_ROOT.get(usize::from(ins.exs.m)).copied().flatten(),
    };

    let root = root.ok_or(Status::InvalidEncoding)?;
    let mut node = edge_or_invalid(root.lookup(ins.primary_opcode))?;

    loop {
        node = match node {
            DispatchNode::Ins(index) => {
                let entry = IdbEntry::get(*index).ok_or(Status::InvalidEncoding)?;
                ins.entry_index = *index;
                ins.evex_mode = entry.evex_mode;
                return Ok(entry);
            }

            DispatchNode::OpcodeLast(table) => {
                fetch_opcode_last(ins, code)?;
                edge_or_invalid(table[usize::from(ins.primary_opcode)])?
            }

            DispatchNode::ModRmMod(cells) => {
                edge_or_invalid(cells[usize::from(ins.modrm.mod_() == 3)])?
            }

            DispatchNode::ModRmReg(cells) => {
                edge_or_invalid(cells[usize::from(ins.modrm.reg())])?
            }

            DispatchNode::ModRmRm(cells) => edge_or_invalid(cells[usize::from(ins.modrm.rm())])?,

            DispatchNode::MandatoryPrefix(cells) => {
                if ins.rep == 0xF2 {
                    ins.has_mandatory_f2 = true;
                    edge_or_invalid(cells[3])?
                } else if ins.rep == 0xF3 {
                    ins.has_mandatory_f3 = true;
                    edge_or_invalid(cells[2])?
                } else if ins.has_op_size {
                    ins.has_mandatory_66 = true;
                    edge_or_invalid(cells[1])?
                } else {
                    edge_or_invalid(cells[0])?
                }
            }

            DispatchNode::Mode(cells) => {
                let idx = ins.def_code.width().index() + 1;
                edge_or_invalid(cells[idx].or(cells[0]))?
            }

            DispatchNode::Dsize(cells) => {
                if ins.def_code == MachineMode::Long64 {
                    if cells[dsz::D64].is_some() && (!ins.has_op_size || ins.exs.w != 0) {
                        edge_or_invalid(cells[dsz::D64])?
                    } else if cells[dsz::F64].is_some() {
                        edge_or_invalid(cells[dsz::F64])?
                    } else {
                        let idx = ins.op_mode.index() + 1;
                        edge_or_invalid(cells[idx].or(cells[dsz::NONE]))?
                    }
                } else {
                    let idx = ins.op_mode.index() + 1;
                    edge_or_invalid(cells[idx].or(cells[dsz::NONE]))?
                }
            }

            DispatchNode::Asize(cells) => {
                let idx = ins.addr_mode.index() + 1;
                edge_or_invalid(cells[idx].or(cells[0]))?
            }

            DispatchNode::Auxiliary(cells) => {
                let pick = if ins.rep == 0xF3 && cells[aux::REPZ].is_some() {
                    cells[aux::REPZ]
                } else if ins.rep != 0 && cells[aux::REP].is_some() {
                    cells[aux::REP]
                } else if (ins.exs.b != 0 || ins.exs.b4 != 0) && cells[aux::REXB].is_some() {
                    cells[aux::REXB]
                } else if ins.exs.w != 0 && cells[aux::REXW].is_some() {
                    cells[aux::REXW]
                } else if ins.def_code == MachineMode::Long64 && cells[aux::MO64].is_some() {
                    cells[aux::MO64]
                } else if ins.is_rip_relative && cells[aux::RIPREL].is_some() {
                    cells[aux::RIPREL]
                } else if ins.has_rex2 && cells[aux::REX2].is_some() {
                    cells[aux::REX2]
                } else if ins.has_rex2 && ins.exs.w != 0 && cells[aux::REX2W].is_some() {
                    cells[aux::REX2W]
                } else {
                    cells[aux::NONE]
                };
                edge_or_invalid(pick)?
            }

            DispatchNode::Vendor(cells) => {
                let idx = decoder.vendor as usize;
                edge_or_invalid(cells[idx].or(cells[Vendor::Any as usize]))?
            }

            DispatchNode::Feature(cells) => {
                let f = decoder.features;
                let pick = if cells[feat::MPX].is_some() && f.contains(Features::MPX) {
                    cells[feat::MPX]
                } else if cells[feat::CET].is_some() && f.contains(Features::CET) {
                    cells[feat::CET]
                } else if cells[feat::CLDEMOTE].is_some() && f.contains(Features::CLDEMOTE) {
                    cells[feat::CLDEMOTE]
                } else if cells[feat::PITI].is_some() && f.contains(Features::PITI) {
                    cells[feat::PITI]
                } else if cells[feat::MOVRS].is_some() && f.contains(Features::MOVRS) {
                    cells[feat::MOVRS]
                } else if cells[feat::BHI].is_some() && f.contains(Features::BHI) {
                    cells[feat::BHI]
                } else {
                    cells[feat::NONE]
                };
                edge_or_invalid(pick)?
            }

            DispatchNode::ExM(cells) => {
                edge_or_invalid(cells.get(usize::from(ins.exs.m)).copied().flatten())?
            }

            DispatchNode::ExPp(cells) => edge_or_invalid(cells[usize::from(ins.exs.p & 3)])?,

            DispatchNode::ExL(cells) => {
                if ins.has_evex
                    && ins.exs.m != 4
                    && ins.exs.bm != 0
                    && ins.modrm.mod_() == 3
                {
                    // SAE/ER forces L'L to the maximum lane the instruction
                    // provides. EVEX map 4 carries promoted legacy
                    // instructions with no SAE/ER/broadcast semantics.
                    edge_or_invalid(cells[2].or(cells[1]).or(cells[0]))?
                } else {
                    edge_or_invalid(cells[usize::from(ins.exs.l & 3)])?
                }
            }

            DispatchNode::ExW(cells) => edge_or_invalid(cells[usize::from(ins.exs.w & 1)])?,

            DispatchNode::ExWi(cells) => {
                let w = if ins.def_code == MachineMode::Long64 {
                    ins.exs.w & 1
                } else {
                    0
                };
                edge_or_invalid(cells[usize::from(w)])?
            }

            DispatchNode::ExNd(cells) => edge_or_invalid(cells[usize::from(ins.exs.nd & 1)])?,

            DispatchNode::ExNf(cells) => edge_or_invalid(cells[usize::from(ins.exs.nf & 1)])?,

            DispatchNode::ExSc(cells) => edge_or_invalid(cells[usize::from(ins.exs.sc & 0xF)])?,

            DispatchNode::ExLpdf(cells) => {
                let idx = usize::from(ins.exs.l & 3) << 4
                    | usize::from(ins.exs.p & 3) << 2
                    | usize::from(ins.exs.nd & 1) << 1
                    | usize::from(ins.exs.nf & 1);
                edge_or_invalid(cells[idx])?
            }

            DispatchNode::Filter(kind, next) => {
                apply_filter(decoder, ins, *kind)?;
                edge_or_invalid(*next)?
            }
        };
    }
}

//
// Stage 6: post-decode resolution.
//

fn get_addr_and_op_mode(decoder: &Decoder, ins: &mut CompactInstruction, entry: &IdbEntry) {
    let attrs = entry.attributes;

    if ins.def_code != MachineMode::Long64 && attrs.contains(InsAttributes::IWO64) {
        // Some instructions treat VEX/EVEX.W as 0 outside 64-bit mode.
        ins.exs.w = 0;
    }

    let w64 = ins.exs.w != 0 && !attrs.contains(InsAttributes::WIG);
    let f64 = attrs.contains(InsAttributes::F64) && decoder.vendor != Vendor::Amd;
    let d64 = attrs.contains(InsAttributes::D64)
        || (attrs.contains(InsAttributes::F64) && decoder.vendor == Vendor::Amd);

    // A mandatory 0x66 is not a size prefix, except where it still is
    // (MOVBE/CRC32); scalable EVEX forms treat pp==1 the same way.
    let has66 = (ins.has_op_size
        && (!ins.has_mandatory_66 || attrs.contains(InsAttributes::S66)))
        || (ins.exs.p == 1 && attrs.contains(InsAttributes::SCALABLE));

    ins.ef_op_mode = match ins.def_code {
        MachineMode::Legacy16 => {
            if has66 {
                Width::W32
            } else {
                Width::W16
            }
        }
        MachineMode::Legacy32 => {
            if has66 {
                Width::W16
            } else {
                Width::W32
            }
        }
        MachineMode::Long64 => {
            if w64 || f64 || (d64 && !has66) {
                Width::W64
            } else if has66 {
                Width::W16
            } else {
                Width::W32
            }
        }
    };

    if ins.def_code == MachineMode::Long64 && attrs.contains(InsAttributes::I67) {
        ins.addr_mode = Width::W64;
    }

    ins.word_length = ins.ef_op_mode.bytes() as u8;
}

fn get_vector_length(ins: &mut CompactInstruction, entry: &IdbEntry) -> Result {
    if ins.has_er || ins.has_sae || ins.has_ign_er {
        // SAE/ER forces the vector length: scalar forms stay at 128 bits,
        // EVEX.U = 0 selects 256 (AVX10), everything else 512.
        let evex_u = match ins.ext_prefix {
            ExtPrefix::Evex(e) => e.u(),
            _ => 1,
        };

        let len = if entry.tuple.is_scalar() {
            VecWidth::V128
        } else if evex_u == 0 {
            VecWidth::V256
        } else {
            VecWidth::V512
        };

        ins.vec_mode = len;
        ins.ef_vec_mode = len;
        return Ok(());
    }

    let lig = entry.attributes.contains(InsAttributes::LIG);

    match ins.exs.l {
        0 => {
            ins.vec_mode = VecWidth::V128;
            ins.ef_vec_mode = VecWidth::V128;
        }
        1 => {
            ins.vec_mode = VecWidth::V256;
            ins.ef_vec_mode = if lig { VecWidth::V128 } else { VecWidth::V256 };
        }
        2 => {
            ins.vec_mode = VecWidth::V512;
            ins.ef_vec_mode = if lig { VecWidth::V128 } else { VecWidth::V512 };
        }
        _ => return Err(Status::BadEvexLL),
    }

    Ok(())
}

fn get_prefix_activation(ins: &mut CompactInstruction, entry: &IdbEntry) -> Result {
    let valid = entry.valid_prefixes;

    // LOCK is valid for memory-destination RMW forms, plus the MOV-to-CR
    // CR8 alias in 32-bit mode.
    if ins.has_lock {
        if entry.attributes.contains(InsAttributes::LOCK_SPECIAL)
            && ins.def_code == MachineMode::Legacy32
        {
            // LOCK selects CR8; handled during operand materialization.
        } else if valid.contains(ValidPrefixes::LOCK) && ins.modrm.mod_() != 3 {
            ins.is_lock_enabled = true;
        } else {
            return Err(Status::BadLockPrefix);
        }
    }

    if ins.rep != 0 {
        let rep_enabled = valid.contains(ValidPrefixes::REP);
        let repc_enabled = valid.contains(ValidPrefixes::REP_COND);

        ins.is_bnd_enabled = valid.contains(ValidPrefixes::BND) && ins.rep == 0xF2;
        ins.is_repeated = rep_enabled || repc_enabled;

        // XACQUIRE/XRELEASE need LOCK (or the HLE-without-LOCK forms) and a
        // memory destination.
        if (ins.is_lock_enabled || valid.contains(ValidPrefixes::HLE_NO_LOCK))
            && ins.modrm.mod_() != 3
        {
            if valid.intersects(ValidPrefixes::XACQUIRE | ValidPrefixes::HLE) && ins.rep == 0xF2 {
                ins.is_xacquire_enabled = true;
            } else if valid.intersects(ValidPrefixes::XRELEASE | ValidPrefixes::HLE)
                && ins.rep == 0xF3
            {
                ins.is_xrelease_enabled = true;
            }
        }
    }

    if ins.seg != 0 {
        ins.is_bhint_enabled = valid.contains(ValidPrefixes::BHINT)
            && matches!(ins.seg, 0x2E | 0x3E | 0x64);

        ins.is_dnt_enabled = valid.contains(ValidPrefixes::DNT) && ins.seg == 0x3E;
    }

    ins.is_cet_tracked = entry.attributes.contains(InsAttributes::CETT) && !ins.is_dnt_enabled;

    Ok(())
}

fn get_decorator_activation(
    decoder: &Decoder,
    ins: &mut CompactInstruction,
    entry: &IdbEntry,
) -> Result {
    // Reserved-bit masks for EVEX payload byte 3, per extension flavor.
    const B3_MASK: [u8; 4] = [0x00, 0xD3, 0xE3, 0xE0];

    let valid = entry.valid_decorators;

    let evex = match ins.ext_prefix {
        ExtPrefix::Evex(e) => e,
        _ => return Err(Status::InvalidInstruction),
    };

    if ins.evex_mode == EvexMode::Evex {
        // EVEX.U doubles as X4 for memory forms and as the 256-bit SAE/ER
        // selector for reg-reg forms with b set.
        if evex.u() != 1 && ins.modrm.mod_() == 3 && ins.exs.bm == 0 {
            return Err(Status::BadEvexU);
        }

        if ins.exs.bm == 1 {
            if ins.modrm.mod_() == 3 {
                if valid.contains(ValidDecorators::ER) {
                    ins.has_er = true;
                    ins.has_sae = true;
                    ins.rounding = match ins.exs.l & 3 {
                        0 => EvexRounding::NearestEven,
                        1 => EvexRounding::Down,
                        2 => EvexRounding::Up,
                        _ => EvexRounding::Zero,
                    };
                } else if valid.contains(ValidDecorators::SAE) {
                    ins.has_sae = true;
                } else if entry.attributes.contains(InsAttributes::IER) {
                    // Encoded like rounding, but ignored by the instruction.
                    ins.has_ign_er = true;
                } else {
                    return Err(Status::ErSaeNotSupported);
                }
            } else if valid.contains(ValidDecorators::BROADCAST) {
                ins.has_broadcast = true;
            } else {
                return Err(Status::BroadcastNotSupported);
            }
        }

        if ins.exs.k != 0 {
            if valid.contains(ValidDecorators::MASK) {
                ins.has_mask = true;
            } else {
                return Err(Status::MaskNotSupported);
            }
        } else if entry.attributes.contains(InsAttributes::MMASK) {
            return Err(Status::MaskRequired);
        }

        if ins.exs.z != 0 {
            if !valid.contains(ValidDecorators::ZERO) {
                return Err(Status::ZeroingNotSupported);
            }
            if !ins.has_mask {
                return Err(Status::ZeroingNoMask);
            }
            if ins.modrm.mod_() == 3 || !entry.mem1_access.any_write() {
                ins.has_zero = true;
            } else {
                return Err(Status::ZeroingOnMemory);
            }
        }

        // 8-bit displacements use the compressed scheme.
        ins.has_comp_disp = ins.has_disp && ins.disp_length == 1;

        // The APX payload fields do not exist in regular EVEX.
        ins.exs.nd = 0;
        ins.exs.nf = 0;
        ins.exs.sc = 0;
    } else {
        // The promoted/conditional flavors exist only under APX.
        if !decoder.features.contains(Features::APX) {
            return Err(Status::InvalidEncoding);
        }

        if evex.0[3] & B3_MASK[ins.evex_mode as usize] != 0 {
            return Err(Status::InvalidEvexByte3);
        }

        if evex.u() == 0 && ins.modrm.mod_() == 3 {
            return Err(Status::BadEvexU);
        }

        ins.has_nd = ins.exs.nd != 0 && valid.contains(ValidDecorators::ND);
        ins.has_nf = ins.exs.nf != 0 && valid.contains(ValidDecorators::NF);
        ins.has_zu = ins.exs.nd != 0 && valid.contains(ValidDecorators::ZU);
        ins.has_dfv = ins.evex_mode == EvexMode::Cond;

        // Regular-EVEX fields are not valid in the APX flavors.
        ins.exs.z = 0;
        ins.exs.l = 0;
        ins.exs.bm = 0;
        ins.exs.k = 0;
    }

    Ok(())
}

fn copy_instruction_info(ins: &mut CompactInstruction, entry: &IdbEntry) {
    ins.operands_count = entry.operands.len() as u8;
    ins.exp_operands_count = entry
        .operands
        .iter()
        .filter(|spec| spec.flags() & db::opf::DEFAULT == 0)
        .count() as u8;

    ins.stack_words = entry.stk_words;

    ins.memory_access = entry.mem2_access
        | if ins.modrm.mod_() != 3 {
            entry.mem1_access
        } else {
            crate::operand::OpAccess::empty()
        };

    if entry.rip_access.any_write() {
        ins.branch_info.is_branch = true;
        ins.branch_info.is_conditional =
            entry.rip_access.contains(crate::operand::OpAccess::COND_WRITE);
        ins.branch_info.is_far = !entry.cs_access.is_empty();
        ins.branch_info.is_indirect = ins.has_modrm;
    }

    if entry.attributes.contains(InsAttributes::COND) {
        ins.condition = ins.primary_opcode & 0xF;
    }

    if ins.evex_mode == EvexMode::Cond && ins.has_evex {
        ins.condition = ins.exs.sc;
    }

    if entry.attributes.contains(InsAttributes::SSE_CONDB) {
        ins.sse_condition = ins.immediate1 as u8;
    }
}

fn decode_internal(decoder: &Decoder, ins: &mut CompactInstruction, code: &[u8]) -> Result {
    fetch_prefixes(decoder, ins, code)?;

    fetch_opcodes(ins, code)?;

    fetch_modrm_sib_disp(ins, code)?;

    // Walking the tables performs most validity checks; an invalid encoding
    // simply runs into an empty edge.
    let entry = walk_tables(decoder, ins, code)?;

    get_addr_and_op_mode(decoder, ins, entry);

    if entry.ipb != Ipb::None {
        fetch_payload_bytes(ins, code, entry.ipb)?;
    }

    match ins.encoding {
        EncodingMode::Legacy => get_prefix_activation(ins, entry)?,
        EncodingMode::Evex => get_decorator_activation(decoder, ins, entry)?,
        _ => {}
    }

    if entry.attributes.contains(InsAttributes::VECTOR) {
        get_vector_length(ins, entry)?;
    }

    copy_instruction_info(ins, entry);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_maps_differ_only_where_expected() {
        for b in 0..=255u8 {
            let m32 = PREFIX_MAP_1632[b as usize];
            let m64 = PREFIX_MAP_64[b as usize];
            match b {
                0x40..=0x4F => {
                    assert_eq!(m32, PFX_NONE);
                    assert_eq!(m64, PFX_REX);
                }
                0xD5 => {
                    assert_eq!(m32, PFX_NONE);
                    assert_eq!(m64, PFX_EXT);
                }
                _ => assert_eq!(m32, m64),
            }
        }
    }

    #[test]
    fn length_cap_is_enforced() {
        let mut ins = CompactInstruction::default();
        ins.length = 15;
        assert_eq!(increment_length(&mut ins, 1), Err(Status::InstructionTooLong));
    }
}
