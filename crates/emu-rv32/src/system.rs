//! SYSTEM-class instructions: CSR access, fences, environment calls.

use crate::Exception;
use crate::decode::{CsrOp, CsrSrc};
use crate::hart::{HaltReason, Hart};

impl Hart {
    /// CSR read-modify-write. rd receives the pre-write value; the write
    /// always happens, even when it leaves the register unchanged.
    pub(crate) fn exec_csr(
        &mut self,
        op: CsrOp,
        src: CsrSrc,
        rd: u8,
        csr: u16,
    ) -> Result<(), Exception> {
        let old = self.csr(csr);
        let operand = match src {
            CsrSrc::Reg(rs1) => self.reg(rs1),
            CsrSrc::Imm(uimm) => uimm,
        };
        let new = match op {
            CsrOp::Swap => operand,
            CsrOp::SetBits => old | operand,
            CsrOp::ClearBits => old & !operand,
        };
        self.set_csr(csr, new);
        self.set_reg(rd, old);
        self.advance();
        Ok(())
    }

    /// FENCE and FENCE.I: ordering no-ops on a single in-order hart.
    pub(crate) fn exec_fence(&mut self) -> Result<(), Exception> {
        self.advance();
        Ok(())
    }

    /// ECALL and EBREAK terminate the run.
    pub(crate) fn exec_terminate(&mut self, reason: HaltReason) -> Result<(), Exception> {
        self.halt(reason);
        Ok(())
    }

    /// SFENCE.VMA: flush TLB entries scoped by the operands. With either
    /// operand at x0 the scope widens, so flush everything; with both
    /// given, drop the single (page, ASID) pairing.
    pub(crate) fn exec_sfence_vma(&mut self, rs1: u8, rs2: u8) -> Result<(), Exception> {
        if rs1 == 0 || rs2 == 0 {
            self.mmu_mut().tlb_clear();
        } else {
            let vaddr = self.reg(rs1);
            let asid = self.reg(rs2);
            self.mmu_mut().tlb_remove(vaddr, asid);
        }
        self.advance();
        Ok(())
    }

    /// Unknown major opcodes terminate the run rather than trap.
    pub(crate) fn exec_unknown(&mut self, word: u32) -> Result<(), Exception> {
        log::warn!("unknown opcode word {word:#010x}");
        self.halt(HaltReason::UnknownOpcode);
        Ok(())
    }
}
