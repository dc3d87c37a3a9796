//! Execution dispatch.
//!
//! One match over the decoded operand record. The handlers live in
//! `alu.rs`, `branches.rs`, `memory_ops.rs` and `system.rs`; each handler
//! is responsible for leaving the PC correct (fall through by four, or
//! assign a target).

use crate::Exception;
use crate::decode::{Decoded, Op};
use crate::hart::{HaltReason, Hart};

impl Hart {
    /// Execute one decoded action and bump the retire counter.
    pub(crate) fn execute(&mut self, decoded: &Decoded) -> Result<(), Exception> {
        self.bump_retired();
        match decoded.op {
            Op::Alu { op, rd, rs1, rs2 } => self.exec_alu(op, rd, rs1, rs2),
            Op::AluImm { op, rd, rs1, imm } => self.exec_alu_imm(op, rd, rs1, imm),
            Op::Lui { rd, imm } => self.exec_lui(rd, imm),
            Op::Auipc { rd, imm } => self.exec_auipc(rd, imm),
            Op::Load {
                width,
                rd,
                rs1,
                offset,
            } => self.exec_load(width, rd, rs1, offset),
            Op::Store {
                width,
                rs1,
                rs2,
                offset,
            } => self.exec_store(width, rs1, rs2, offset),
            Op::Branch {
                cond,
                rs1,
                rs2,
                offset,
            } => self.exec_branch(cond, rs1, rs2, offset),
            Op::Jal { rd, offset } => self.exec_jal(rd, offset),
            Op::Jalr { rd, rs1, offset } => self.exec_jalr(rd, rs1, offset),
            Op::Csr { op, src, rd, csr } => self.exec_csr(op, src, rd, csr),
            Op::Fence | Op::FenceI => self.exec_fence(),
            Op::Ecall => self.exec_terminate(HaltReason::Ecall),
            Op::Ebreak => self.exec_terminate(HaltReason::Ebreak),
            Op::SfenceVma { rs1, rs2 } => self.exec_sfence_vma(rs1, rs2),
            Op::Unknown { word } => self.exec_unknown(word),
        }
    }
}
