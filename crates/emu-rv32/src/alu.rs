//! Arithmetic, logic, shifts and upper-immediate instructions.

use crate::Exception;
use crate::decode::AluOp;
use crate::hart::Hart;

/// Apply an ALU operation to two 32-bit operands.
///
/// Shift amounts take the low five bits of the second operand. The same
/// table serves the register and immediate forms: SLTIU compares against
/// the sign-extended immediate reinterpreted as unsigned, which is exactly
/// the unsigned comparison below.
fn apply(op: AluOp, a: u32, b: u32) -> u32 {
    match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::Sll => a << (b & 0x1F),
        AluOp::Slt => u32::from((a as i32) < (b as i32)),
        AluOp::Sltu => u32::from(a < b),
        AluOp::Xor => a ^ b,
        AluOp::Srl => a >> (b & 0x1F),
        AluOp::Sra => ((a as i32) >> (b & 0x1F)) as u32,
        AluOp::Or => a | b,
        AluOp::And => a & b,
    }
}

impl Hart {
    pub(crate) fn exec_alu(&mut self, op: AluOp, rd: u8, rs1: u8, rs2: u8) -> Result<(), Exception> {
        let result = apply(op, self.reg(rs1), self.reg(rs2));
        self.set_reg(rd, result);
        self.advance();
        Ok(())
    }

    pub(crate) fn exec_alu_imm(
        &mut self,
        op: AluOp,
        rd: u8,
        rs1: u8,
        imm: i32,
    ) -> Result<(), Exception> {
        let result = apply(op, self.reg(rs1), imm as u32);
        self.set_reg(rd, result);
        self.advance();
        Ok(())
    }

    /// LUI: rd = imm[31:12] << 12, low twelve bits zero.
    pub(crate) fn exec_lui(&mut self, rd: u8, imm: u32) -> Result<(), Exception> {
        self.set_reg(rd, imm);
        self.advance();
        Ok(())
    }

    /// AUIPC: rd = pc + (imm[31:12] << 12).
    pub(crate) fn exec_auipc(&mut self, rd: u8, imm: u32) -> Result<(), Exception> {
        let result = self.pc().wrapping_add(imm);
        self.set_reg(rd, result);
        self.advance();
        Ok(())
    }
}
