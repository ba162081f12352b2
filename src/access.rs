//! Aggregated access information derived from the operand list.

use crate::insn::Instruction;
use crate::operand::{OpAccess, Operand, OperandKind};
use crate::register::{bank_size, regs, RegBank};
use crate::status::{Result, Status};

/// Flat per-register access map over every bank (MSR/XCR excluded), plus
/// RIP, flags, stack and memory.
///
/// Each cell is an [`OpAccess`] bit set; untouched registers stay empty.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AccessMap {
    pub rip: OpAccess,
    pub flags: OpAccess,
    pub stack: OpAccess,
    pub mem: OpAccess,
    pub mxcsr: OpAccess,
    pub pkru: OpAccess,
    pub ssp: OpAccess,
    pub gpr: [OpAccess; bank_size::GPR],
    pub seg: [OpAccess; bank_size::SEG],
    pub fpu: [OpAccess; bank_size::FPU],
    pub mmx: [OpAccess; bank_size::MMX],
    pub sse: [OpAccess; bank_size::SSE],
    pub cr: [OpAccess; bank_size::CR],
    pub dr: [OpAccess; bank_size::DR],
    pub tr: [OpAccess; bank_size::TR],
    pub bnd: [OpAccess; bank_size::BND],
    pub msk: [OpAccess; bank_size::MSK],
    pub tile: [OpAccess; bank_size::TILE],
    pub sys: [OpAccess; bank_size::SYS],
    pub x87: [OpAccess; bank_size::X87],
}

fn mark(cells: &mut [OpAccess], index: usize, access: OpAccess) -> Result {
    match cells.get_mut(index) {
        Some(cell) => {
            *cell |= access;
            Ok(())
        }
        None => Err(Status::InvalidInstruction),
    }
}

/// Borrowed reverse-lookup over the operand list.
///
/// Implicit register slots are filled only for operands flagged as default;
/// an explicit `add rax, rcx` leaves `rax` empty, while `cpuid` points it
/// at the implicit accumulator operand.
#[derive(Clone, Copy, Debug, Default)]
pub struct OperandRlut<'a> {
    /// First destination operand.
    pub dst1: Option<&'a Operand>,
    /// Second destination operand.
    pub dst2: Option<&'a Operand>,
    /// First source operand.
    pub src1: Option<&'a Operand>,
    /// Second source operand.
    pub src2: Option<&'a Operand>,
    /// Third source operand.
    pub src3: Option<&'a Operand>,
    /// Fourth source operand.
    pub src4: Option<&'a Operand>,
    /// First memory operand.
    pub mem1: Option<&'a Operand>,
    /// Second memory operand.
    pub mem2: Option<&'a Operand>,
    /// The stack operand.
    pub stack: Option<&'a Operand>,
    /// Implicit flags register operand.
    pub flags: Option<&'a Operand>,
    /// Implicit instruction-pointer operand.
    pub rip: Option<&'a Operand>,
    /// Implicit CS operand.
    pub cs: Option<&'a Operand>,
    /// Implicit SS operand.
    pub ss: Option<&'a Operand>,
    /// Implicit rAX..rDI operands, by register id.
    pub gpr: [Option<&'a Operand>; 8],
}

impl Instruction {
    /// Aggregates per-register, per-flag and memory/stack access into a
    /// flat map.
    pub fn access_map(&self) -> Result<AccessMap> {
        let mut map = AccessMap::default();

        for op in self.operands() {
            match op.kind {
                OperandKind::Mem(mem) => {
                    if mem.is_stack {
                        map.stack |= op.access;
                        map.gpr[usize::from(regs::RSP)] |= OpAccess::READ | OpAccess::WRITE;
                        map.seg[usize::from(regs::SS)] |= OpAccess::READ;
                    } else {
                        map.mem |= op.access;

                        if mem.has_seg {
                            mark(&mut map.seg, mem.seg.into(), OpAccess::READ)?;
                        }

                        if mem.has_base {
                            mark(&mut map.gpr, mem.base.into(), OpAccess::READ)?;
                        }

                        if mem.has_index {
                            if mem.vsib.is_some() {
                                mark(&mut map.sse, mem.index.into(), OpAccess::READ)?;
                            } else {
                                mark(&mut map.gpr, mem.index.into(), OpAccess::READ)?;
                            }
                        }
                    }
                }
                OperandKind::Reg(reg) => {
                    let id = reg.id as usize;
                    match reg.bank {
                        RegBank::Gpr => {
                            for k in 0..usize::from(reg.count) {
                                // High-8 ids alias the low GPR slots.
                                let slot = if reg.is_high8 {
                                    id.checked_sub(4).ok_or(Status::InvalidInstruction)?
                                } else {
                                    id
                                };
                                mark(&mut map.gpr, slot + k, op.access)?;
                            }
                        }
                        RegBank::Seg => mark(&mut map.seg, id, op.access)?,
                        RegBank::Fpu => mark(&mut map.fpu, id, op.access)?,
                        RegBank::Mmx => mark(&mut map.mmx, id, op.access)?,
                        RegBank::Sse => {
                            for k in 0..usize::from(reg.count) {
                                mark(&mut map.sse, id + k, op.access)?;
                            }
                        }
                        RegBank::Cr => mark(&mut map.cr, id, op.access)?,
                        RegBank::Dr => mark(&mut map.dr, id, op.access)?,
                        RegBank::Tr => mark(&mut map.tr, id, op.access)?,
                        RegBank::Bnd => mark(&mut map.bnd, id, op.access)?,
                        RegBank::Msk => mark(&mut map.msk, id, op.access)?,
                        RegBank::Tile => mark(&mut map.tile, id, op.access)?,
                        RegBank::Sys => mark(&mut map.sys, id, op.access)?,
                        RegBank::X87 => mark(&mut map.x87, id, op.access)?,
                        RegBank::Mxcsr => map.mxcsr |= op.access,
                        RegBank::Pkru => map.pkru |= op.access,
                        RegBank::Ssp => map.ssp |= op.access,
                        RegBank::Flg => map.flags |= op.access,
                        RegBank::Rip => map.rip |= op.access,
                        // MSRs and XCRs are not part of the flat map.
                        RegBank::Msr | RegBank::Xcr | RegBank::Uif => {}
                    }

                    // Masked operands also read the mask register.
                    if op.decorator.has_mask {
                        mark(&mut map.msk, op.decorator.mask_reg.into(), OpAccess::READ)?;
                    }
                }
                _ => {}
            }
        }

        Ok(map)
    }

    /// Builds a reverse-lookup over the operand list: destinations, sources,
    /// memory/stack operands and the usual implicit registers.
    pub fn operand_lookup(&self) -> OperandRlut<'_> {
        let mut rlut = OperandRlut::default();

        for op in self.operands() {
            if op.access.any_write() {
                if rlut.dst1.is_none() {
                    rlut.dst1 = Some(op);
                } else if rlut.dst2.is_none() {
                    rlut.dst2 = Some(op);
                }
            }

            if op.access.any_read() {
                if rlut.src1.is_none() {
                    rlut.src1 = Some(op);
                } else if rlut.src2.is_none() {
                    rlut.src2 = Some(op);
                } else if rlut.src3.is_none() {
                    rlut.src3 = Some(op);
                } else if rlut.src4.is_none() {
                    rlut.src4 = Some(op);
                }
            }

            match op.kind {
                OperandKind::Mem(mem) => {
                    if rlut.mem1.is_none() {
                        rlut.mem1 = Some(op);
                    } else if rlut.mem2.is_none() {
                        rlut.mem2 = Some(op);
                    }

                    if mem.is_stack {
                        rlut.stack = Some(op);
                    }
                }
                OperandKind::Reg(reg) if op.flags.is_default => match reg.bank {
                    RegBank::Flg => rlut.flags = Some(op),
                    RegBank::Rip => rlut.rip = Some(op),
                    RegBank::Seg if reg.id == u32::from(regs::CS) => rlut.cs = Some(op),
                    RegBank::Seg if reg.id == u32::from(regs::SS) => rlut.ss = Some(op),
                    RegBank::Gpr if reg.id < 8 => {
                        rlut.gpr[reg.id as usize] = Some(op);
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        rlut
    }
}
