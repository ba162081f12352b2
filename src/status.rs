//! Status code utilities.

use core::{fmt, result};

/// A convenience alias for a Result, holding either a value or a status.
pub type Result<T = ()> = result::Result<T, Status>;

/// Status code describing why a decode attempt was rejected.
///
/// Every pipeline stage reports failure through one of these variants; a
/// failed decode never exposes a partially filled instruction record.
#[cfg_attr(feature = "serialization", derive(serde::Deserialize, serde::Serialize))]
#[non_exhaustive]
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub enum Status {
    /// The caller-provided buffer ends before the instruction does. Retry
    /// with more bytes.
    BufferTooSmall,
    /// A well-formed prefix/opcode sequence would exceed 15 bytes.
    InstructionTooLong,
    /// No instruction exists for the decoded byte sequence.
    InvalidEncoding,
    /// The encoding exists, but not in the current code mode.
    InvalidEncodingInMode,
    /// Incompatible prefix combination (e.g. REX followed by REX2).
    InvalidPrefixSequence,
    /// XOP encountered while LOCK, REP, 0x66, REX or REX2 was already seen.
    XopWithPrefix,
    /// VEX encountered while LOCK, REP, 0x66, REX or REX2 was already seen.
    VexWithPrefix,
    /// EVEX encountered while LOCK, REP, 0x66, REX or REX2 was already seen.
    EvexWithPrefix,
    /// EVEX.vvvv encodes an unaddressable register.
    BadEvexV,
    /// EVEX.V' must be 0 (after inversion) in the current mode.
    BadEvexVPrime,
    /// EVEX.L'L encodes a reserved vector length.
    BadEvexLL,
    /// EVEX.U is reserved for the decoded form.
    BadEvexU,
    /// Reserved bits set in EVEX payload byte 3 for the decoded form.
    InvalidEvexByte3,
    /// The encoding requires VEX/EVEX.vvvv to be zero.
    VexVvvvMustBeZero,
    /// A register-number constraint failed (bank-specific upper bounds or
    /// allowed-set checks).
    InvalidRegisterInInstruction,
    /// VSIB index, destination and source registers must be distinct.
    InvalidVsibRegs,
    /// AMX tile registers must be pairwise distinct.
    InvalidTileRegs,
    /// Destination register must differ from the source registers.
    InvalidDestRegs,
    /// LOCK used on an instruction or form that does not accept it.
    BadLockPrefix,
    /// The instruction requires a mask register other than k0.
    MaskRequired,
    /// Masking used, but the instruction does not accept a mask.
    MaskNotSupported,
    /// Zeroing used on a memory destination.
    ZeroingOnMemory,
    /// Zeroing used without masking.
    ZeroingNoMask,
    /// Zeroing used, but the instruction does not support it.
    ZeroingNotSupported,
    /// Broadcast used, but the instruction does not support it.
    BroadcastNotSupported,
    /// Embedded rounding / SAE used, but the instruction supports neither.
    ErSaeNotSupported,
    /// The instruction cannot use RIP-relative addressing.
    RipRelAddressingNotSupported,
    /// The instruction cannot use 16-bit addressing.
    Addressing16NotSupported,
    /// An attempt to load the CS register.
    CsLoad,
    /// Internal inconsistency while decoding. Should not be observable.
    InvalidInstruction,
    /// Invalid argument passed by the caller (e.g. an empty buffer).
    InvalidParameter,
}

impl Status {
    /// Whether the failure may be fixed by supplying more input bytes.
    pub fn needs_more_data(self) -> bool {
        self == Status::BufferTooSmall
    }

    /// Returns a human readable description of this status code.
    pub fn description(self) -> &'static str {
        match self {
            Status::BufferTooSmall => {
                "the buffer is too small to contain the whole instruction"
            }
            Status::InstructionTooLong => {
                "the instruction exceeds the maximum length of 15 bytes"
            }
            Status::InvalidEncoding => "invalid encoding (no such instruction)",
            Status::InvalidEncodingInMode => {
                "the encoding is not valid in the current operating mode"
            }
            Status::InvalidPrefixSequence => "invalid prefix sequence",
            Status::XopWithPrefix => "XOP cannot follow legacy or REX prefixes",
            Status::VexWithPrefix => "VEX cannot follow legacy or REX prefixes",
            Status::EvexWithPrefix => "EVEX cannot follow legacy or REX prefixes",
            Status::BadEvexV => "invalid register encoded in EVEX.vvvv",
            Status::BadEvexVPrime => "EVEX.V' field must be zero",
            Status::BadEvexLL => "reserved EVEX.L'L value",
            Status::BadEvexU => "reserved EVEX.U value",
            Status::InvalidEvexByte3 => "reserved bits set in EVEX payload byte 3",
            Status::VexVvvvMustBeZero => "VEX/EVEX.vvvv must be zero",
            Status::InvalidRegisterInInstruction => "invalid register encoded",
            Status::InvalidVsibRegs => "VSIB registers must be distinct",
            Status::InvalidTileRegs => "tile registers must be distinct",
            Status::InvalidDestRegs => {
                "destination register must be distinct from the sources"
            }
            Status::BadLockPrefix => "the instruction does not accept LOCK",
            Status::MaskRequired => "the instruction requires a non-zero mask",
            Status::MaskNotSupported => "the instruction does not accept a mask",
            Status::ZeroingOnMemory => "zeroing is not valid with a memory destination",
            Status::ZeroingNoMask => "zeroing requires masking",
            Status::ZeroingNotSupported => "the instruction does not accept zeroing",
            Status::BroadcastNotSupported => "the instruction does not accept broadcast",
            Status::ErSaeNotSupported => {
                "the instruction accepts neither embedded rounding nor SAE"
            }
            Status::RipRelAddressingNotSupported => {
                "the instruction cannot use RIP-relative addressing"
            }
            Status::Addressing16NotSupported => {
                "the instruction cannot use 16-bit addressing"
            }
            Status::CsLoad => "CS cannot be loaded",
            Status::InvalidInstruction => "inconsistent instruction state",
            Status::InvalidParameter => "an invalid parameter was passed",
        }
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Status {}
