//! # dis86
//!
//! A pure-Rust x86/x86-64 instruction decoder: bytes in, a fully resolved
//! instruction record out.
//!
//! The decoder understands legacy, REX, REX2, XOP, VEX and EVEX encodings
//! (including the APX extension flavors), resolves effective operand,
//! address and vector sizes, validates prefix and decorator usage, and
//! materializes every operand with its access semantics.
//!
//! Decoding is a pure function: no allocation, no I/O, no global state.
//! The crate is `no_std` by default capable; the `std` feature only adds
//! `std::error::Error` for [`Status`].
//!
//! ```
//! use dis86::{Decoder, Mnemonic};
//!
//! let decoder = Decoder::new64();
//! let ins = decoder.decode(&[0x48, 0x89, 0xD8]).unwrap(); // mov rax, rbx
//!
//! assert_eq!(ins.mnemonic(), Mnemonic::MOV);
//! assert_eq!(ins.length, 3);
//! assert_eq!(ins.operands().len(), 2);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

mod access;
mod db;
mod decoder;
mod enums;
mod insn;
mod operand;
mod raw;
mod register;
mod status;

pub use access::{AccessMap, OperandRlut};
pub use db::{
    IdbEntry, InsAttributes, Ipb, OpSize, OpSpecifier, OpType, ValidDecorators, ValidModes,
    ValidPrefixes,
};
pub use decoder::{Decoder, InstructionIterator};
pub use enums::*;
pub use insn::{
    BranchInfo, CompactInstruction, ExtBits, ExtPrefix, FarAddr, Instruction,
    MAX_INSTRUCTION_LENGTH, MAX_OPERAND_COUNT,
};
pub use operand::{
    BroadcastInfo, Decorator, DefaultFlags, ImmInfo, MemInfo, OpAccess, OpEncoding, Operand,
    OperandFlags, OperandKind, RegInfo, RelInfo, VsibInfo, SIZE_CACHE_LINE, SIZE_UNKNOWN,
};
pub use raw::{Evex, ModRm, Rex, Rex2, Sib, Vex2, Vex3, Xop};
pub use register::{bank_size, regs, RegBank};
pub use status::{Result, Status};
