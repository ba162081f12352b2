//! Byte-accurate views over instruction encoding bytes.
//!
//! Prefixes and the ModRM/SIB bytes are kept as plain bytes and decoded
//! through accessor methods; bit positions follow the Intel/AMD SDM. Fields
//! that the hardware stores inverted (`~R`, `~vvvv`, ...) are returned raw
//! here; the prefix scanner is responsible for normalizing them into the
//! flat extension-bit vector.

/// The ModRM byte: `mod:2 | reg:3 | rm:3`.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ModRm(pub u8);

impl ModRm {
    pub fn mod_(self) -> u8 {
        self.0 >> 6
    }

    pub fn reg(self) -> u8 {
        (self.0 >> 3) & 7
    }

    pub fn rm(self) -> u8 {
        self.0 & 7
    }

    /// Whether the rm field selects a register (`mod == 3`).
    pub fn is_reg_form(self) -> bool {
        self.mod_() == 3
    }
}

/// The SIB byte: `scale:2 | index:3 | base:3`.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Sib(pub u8);

impl Sib {
    pub fn scale(self) -> u8 {
        self.0 >> 6
    }

    pub fn index(self) -> u8 {
        (self.0 >> 3) & 7
    }

    pub fn base(self) -> u8 {
        self.0 & 7
    }
}

/// The one-byte REX prefix (`0x40..=0x4F`).
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Rex(pub u8);

impl Rex {
    pub fn w(self) -> u8 {
        (self.0 >> 3) & 1
    }

    pub fn r(self) -> u8 {
        (self.0 >> 2) & 1
    }

    pub fn x(self) -> u8 {
        (self.0 >> 1) & 1
    }

    pub fn b(self) -> u8 {
        self.0 & 1
    }
}

/// The two-byte VEX prefix (`C5 xx`).
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Vex2(pub [u8; 2]);

impl Vex2 {
    /// `~R` as encoded.
    pub fn r(self) -> u8 {
        (self.0[1] >> 7) & 1
    }

    /// `~vvvv` as encoded.
    pub fn v(self) -> u8 {
        (self.0[1] >> 3) & 0xF
    }

    pub fn l(self) -> u8 {
        (self.0[1] >> 2) & 1
    }

    pub fn p(self) -> u8 {
        self.0[1] & 3
    }
}

/// The three-byte VEX prefix (`C4 xx xx`).
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Vex3(pub [u8; 3]);

impl Vex3 {
    /// `~R` as encoded.
    pub fn r(self) -> u8 {
        (self.0[1] >> 7) & 1
    }

    /// `~X` as encoded.
    pub fn x(self) -> u8 {
        (self.0[1] >> 6) & 1
    }

    /// `~B` as encoded.
    pub fn b(self) -> u8 {
        (self.0[1] >> 5) & 1
    }

    /// The `m-mmmm` opcode map selector.
    pub fn m(self) -> u8 {
        self.0[1] & 0x1F
    }

    pub fn w(self) -> u8 {
        (self.0[2] >> 7) & 1
    }

    /// `~vvvv` as encoded.
    pub fn v(self) -> u8 {
        (self.0[2] >> 3) & 0xF
    }

    pub fn l(self) -> u8 {
        (self.0[2] >> 2) & 1
    }

    pub fn p(self) -> u8 {
        self.0[2] & 3
    }
}

/// The three-byte XOP prefix (`8F xx xx`); same layout as VEX3.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Xop(pub [u8; 3]);

impl Xop {
    pub fn r(self) -> u8 {
        (self.0[1] >> 7) & 1
    }

    pub fn x(self) -> u8 {
        (self.0[1] >> 6) & 1
    }

    pub fn b(self) -> u8 {
        (self.0[1] >> 5) & 1
    }

    pub fn m(self) -> u8 {
        self.0[1] & 0x1F
    }

    pub fn w(self) -> u8 {
        (self.0[2] >> 7) & 1
    }

    pub fn v(self) -> u8 {
        (self.0[2] >> 3) & 0xF
    }

    pub fn l(self) -> u8 {
        (self.0[2] >> 2) & 1
    }

    pub fn p(self) -> u8 {
        self.0[2] & 3
    }
}

/// The four-byte EVEX prefix (`62 xx xx xx`), including the APX payload
/// fields carried in byte 3.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Evex(pub [u8; 4]);

impl Evex {
    /// Opcode map, bits 0-2 of byte 1.
    pub fn m(self) -> u8 {
        self.0[1] & 7
    }

    /// `B4`, bit 3 of byte 1 (APX; reserved-zero otherwise).
    pub fn b4(self) -> u8 {
        (self.0[1] >> 3) & 1
    }

    /// `~R'`, bit 4 of byte 1.
    pub fn rp(self) -> u8 {
        (self.0[1] >> 4) & 1
    }

    /// `~B`, bit 5 of byte 1.
    pub fn b(self) -> u8 {
        (self.0[1] >> 5) & 1
    }

    /// `~X`, bit 6 of byte 1.
    pub fn x(self) -> u8 {
        (self.0[1] >> 6) & 1
    }

    /// `~R`, bit 7 of byte 1.
    pub fn r(self) -> u8 {
        (self.0[1] >> 7) & 1
    }

    pub fn p(self) -> u8 {
        self.0[2] & 3
    }

    /// `U` (a.k.a. `~X4`), bit 2 of byte 2: reserved-one for non-APX EVEX.
    pub fn u(self) -> u8 {
        (self.0[2] >> 2) & 1
    }

    /// `~vvvv`, bits 3-6 of byte 2.
    pub fn v(self) -> u8 {
        (self.0[2] >> 3) & 0xF
    }

    pub fn w(self) -> u8 {
        (self.0[2] >> 7) & 1
    }

    /// `aaa` opmask selector, bits 0-2 of byte 3.
    pub fn a(self) -> u8 {
        self.0[3] & 7
    }

    /// `~V'`, bit 3 of byte 3.
    pub fn vp(self) -> u8 {
        (self.0[3] >> 3) & 1
    }

    /// Broadcast / rounding-control / SAE context, bit 4 of byte 3.
    pub fn bm(self) -> u8 {
        (self.0[3] >> 4) & 1
    }

    /// `L'L`, bits 5-6 of byte 3.
    pub fn l(self) -> u8 {
        (self.0[3] >> 5) & 3
    }

    /// Zeroing/merging, bit 7 of byte 3.
    pub fn z(self) -> u8 {
        (self.0[3] >> 7) & 1
    }

    /// `NF` (no-flags), bit 2 of byte 3 in the APX flavors.
    pub fn nf(self) -> u8 {
        (self.0[3] >> 2) & 1
    }

    /// `ND` (new data destination), bit 4 of byte 3 in the APX flavors.
    pub fn nd(self) -> u8 {
        (self.0[3] >> 4) & 1
    }

    /// `SC` (standard condition), bits 0-3 of byte 3 in the conditional
    /// flavor.
    pub fn sc(self) -> u8 {
        self.0[3] & 0xF
    }
}

/// The two-byte REX2 prefix (`D5 xx`, APX).
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Rex2(pub [u8; 2]);

impl Rex2 {
    /// Opcode map selector: 0 = one-byte map, 1 = 0F map.
    pub fn m0(self) -> u8 {
        (self.0[1] >> 7) & 1
    }

    pub fn r4(self) -> u8 {
        (self.0[1] >> 6) & 1
    }

    pub fn x4(self) -> u8 {
        (self.0[1] >> 5) & 1
    }

    pub fn b4(self) -> u8 {
        (self.0[1] >> 4) & 1
    }

    pub fn w(self) -> u8 {
        (self.0[1] >> 3) & 1
    }

    pub fn r3(self) -> u8 {
        (self.0[1] >> 2) & 1
    }

    pub fn x3(self) -> u8 {
        (self.0[1] >> 1) & 1
    }

    pub fn b3(self) -> u8 {
        self.0[1] & 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modrm_fields() {
        let m = ModRm(0xD8); // 11 011 000
        assert_eq!(m.mod_(), 3);
        assert_eq!(m.reg(), 3);
        assert_eq!(m.rm(), 0);
        assert!(m.is_reg_form());
    }

    #[test]
    fn sib_fields() {
        let s = Sib(0x84); // 10 000 100
        assert_eq!(s.scale(), 2);
        assert_eq!(s.index(), 0);
        assert_eq!(s.base(), 4);
    }

    #[test]
    fn rex_fields() {
        let r = Rex(0x4C); // W=1 R=1 X=0 B=0
        assert_eq!(r.w(), 1);
        assert_eq!(r.r(), 1);
        assert_eq!(r.x(), 0);
        assert_eq!(r.b(), 0);
    }

    #[test]
    fn vex2_fields() {
        // C5 F8: ~R=1, ~vvvv=1111, L=0, pp=00 (vzeroupper).
        let v = Vex2([0xC5, 0xF8]);
        assert_eq!(v.r(), 1);
        assert_eq!(v.v(), 0xF);
        assert_eq!(v.l(), 0);
        assert_eq!(v.p(), 0);
    }

    #[test]
    fn vex3_fields() {
        // C4 E2 7D: ~R=1 ~X=1 ~B=1 m=2; W=0 ~vvvv=1111 L=1 pp=01.
        let v = Vex3([0xC4, 0xE2, 0x7D]);
        assert_eq!(v.r(), 1);
        assert_eq!(v.x(), 1);
        assert_eq!(v.b(), 1);
        assert_eq!(v.m(), 2);
        assert_eq!(v.w(), 0);
        assert_eq!(v.v(), 0xF);
        assert_eq!(v.l(), 1);
        assert_eq!(v.p(), 1);
    }

    #[test]
    fn evex_fields() {
        // 62 F1 7C 48: map 1, ~R=1 ~X=1 ~B=1 ~R'=1; pp=00 U=1 ~vvvv=1111 W=0;
        // aaa=0 ~V'=1 b=0 L'L=2 z=0.
        let e = Evex([0x62, 0xF1, 0x7C, 0x48]);
        assert_eq!(e.m(), 1);
        assert_eq!(e.b4(), 0);
        assert_eq!(e.rp(), 1);
        assert_eq!(e.r(), 1);
        assert_eq!(e.x(), 1);
        assert_eq!(e.b(), 1);
        assert_eq!(e.p(), 0);
        assert_eq!(e.u(), 1);
        assert_eq!(e.v(), 0xF);
        assert_eq!(e.w(), 0);
        assert_eq!(e.a(), 0);
        assert_eq!(e.vp(), 1);
        assert_eq!(e.bm(), 0);
        assert_eq!(e.l(), 2);
        assert_eq!(e.z(), 0);
    }

    #[test]
    fn rex2_fields() {
        // D5 48: M0=0, R4=1, X4=0, B4=0, W=1, R3=0, X3=0, B3=0.
        let r = Rex2([0xD5, 0x48]);
        assert_eq!(r.m0(), 0);
        assert_eq!(r.r4(), 1);
        assert_eq!(r.x4(), 0);
        assert_eq!(r.b4(), 0);
        assert_eq!(r.w(), 1);
        assert_eq!(r.r3(), 0);
        assert_eq!(r.x3(), 0);
        assert_eq!(r.b3(), 0);
    }
}
