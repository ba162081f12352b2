//! REX2 opcode compatibility tables.
//!
//! REX2 may only precede opcodes explicitly listed as compatible; branches,
//! prefixes and the escape bytes are excluded by the APX specification.

struct Rex2Bitmap([u64; 4]);

impl Rex2Bitmap {
    const fn empty() -> Rex2Bitmap {
        Rex2Bitmap([0; 4])
    }

    const fn set_range(mut self, first: u8, last: u8) -> Rex2Bitmap {
        let mut b = first as usize;
        while b <= last as usize {
            self.0[b / 64] |= 1 << (b % 64);
            b += 1;
        }
        self
    }

    const fn set(self, opcode: u8) -> Rex2Bitmap {
        self.set_range(opcode, opcode)
    }

    fn allows(&self, opcode: u8) -> bool {
        self.0[usize::from(opcode) / 64] >> (usize::from(opcode) % 64) & 1 != 0
    }
}

// One-byte map.
static REX2_MAP_0: Rex2Bitmap = Rex2Bitmap::empty()
    .set_range(0x00, 0x05) // ADD
    .set_range(0x08, 0x0D) // OR
    .set_range(0x10, 0x15) // ADC
    .set_range(0x18, 0x1D) // SBB
    .set_range(0x20, 0x25) // AND
    .set_range(0x28, 0x2D) // SUB
    .set_range(0x30, 0x35) // XOR
    .set_range(0x38, 0x3D) // CMP
    .set_range(0x50, 0x5F) // PUSH/POP
    .set(0x63) // MOVSXD
    .set(0x69)
    .set(0x6B) // IMUL
    .set_range(0x80, 0x8F) // group 1, TEST, XCHG, MOV, LEA, group 1A
    .set_range(0x90, 0x97) // XCHG
    .set_range(0xA4, 0xAD) // string ops
    .set_range(0xB0, 0xBF) // MOV imm
    .set_range(0xC0, 0xC1) // group 2
    .set_range(0xC6, 0xC7) // group 11
    .set_range(0xD0, 0xD3) // group 2
    .set_range(0xF6, 0xF7) // group 3
    .set_range(0xFE, 0xFF); // groups 4/5

// 0F map.
static REX2_MAP_1: Rex2Bitmap = Rex2Bitmap::empty()
    .set_range(0x40, 0x4F) // CMOVcc
    .set_range(0x90, 0x9F) // SETcc
    .set(0xA3) // BT
    .set_range(0xA4, 0xA5) // SHLD
    .set(0xAB) // BTS
    .set_range(0xAC, 0xAD) // SHRD
    .set(0xAF) // IMUL
    .set_range(0xB0, 0xB1) // CMPXCHG
    .set(0xB3) // BTR
    .set_range(0xB6, 0xB7) // MOVZX
    .set_range(0xBA, 0xBD) // group 8, BTC, BSF, BSR
    .set_range(0xBE, 0xBF) // MOVSX
    .set_range(0xC0, 0xC1) // XADD
    .set_range(0xC8, 0xCF); // BSWAP

pub(crate) fn rex2_allows(map: u8, opcode: u8) -> bool {
    match map {
        0 => REX2_MAP_0.allows(opcode),
        1 => REX2_MAP_1.allows(opcode),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rex2_compat_samples() {
        assert!(rex2_allows(0, 0x01)); // ADD Ev, Gv
        assert!(rex2_allows(0, 0x8B)); // MOV Gv, Ev
        assert!(!rex2_allows(0, 0x70)); // Jcc is not REX2 compatible
        assert!(!rex2_allows(0, 0x0F)); // escape byte
        assert!(rex2_allows(1, 0xB6)); // MOVZX
        assert!(!rex2_allows(1, 0x80)); // Jcc near
        assert!(!rex2_allows(2, 0x00));
    }
}
