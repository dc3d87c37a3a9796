//! Conditional branches and jumps.
//!
//! Branch offsets are PC-relative, already sign-extended by the decoder.
//! JAL and JALR write the sequential return address (pc + 4) to rd before
//! assigning the target; JALR clears bit 0 of the computed target.

use crate::Exception;
use crate::decode::BranchCond;
use crate::hart::Hart;

impl Hart {
    pub(crate) fn exec_branch(
        &mut self,
        cond: BranchCond,
        rs1: u8,
        rs2: u8,
        offset: i32,
    ) -> Result<(), Exception> {
        let a = self.reg(rs1);
        let b = self.reg(rs2);
        let taken = match cond {
            BranchCond::Eq => a == b,
            BranchCond::Ne => a != b,
            BranchCond::Lt => (a as i32) < (b as i32),
            BranchCond::Ge => (a as i32) >= (b as i32),
            BranchCond::LtUnsigned => a < b,
            BranchCond::GeUnsigned => a >= b,
        };
        if taken {
            self.set_pc(self.pc().wrapping_add(offset as u32));
        } else {
            self.advance();
        }
        Ok(())
    }

    pub(crate) fn exec_jal(&mut self, rd: u8, offset: i32) -> Result<(), Exception> {
        let link = self.pc().wrapping_add(4);
        let target = self.pc().wrapping_add(offset as u32);
        self.set_reg(rd, link);
        self.set_pc(target);
        Ok(())
    }

    pub(crate) fn exec_jalr(&mut self, rd: u8, rs1: u8, offset: i32) -> Result<(), Exception> {
        // Read rs1 before writing rd: they may be the same register.
        let target = self.reg(rs1).wrapping_add(offset as u32) & !1;
        let link = self.pc().wrapping_add(4);
        self.set_reg(rd, link);
        self.set_pc(target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    fn hart() -> Hart {
        Hart::new(Memory::new(64))
    }

    #[test]
    fn taken_branch_adds_offset() {
        let mut h = hart();
        h.set_pc(0x10);
        h.exec_branch(BranchCond::Eq, 0, 0, 8).expect("executes");
        assert_eq!(h.pc(), 0x18);
    }

    #[test]
    fn untaken_branch_falls_through() {
        let mut h = hart();
        h.set_reg(1, 1);
        h.set_pc(0x10);
        h.exec_branch(BranchCond::Eq, 0, 1, 8).expect("executes");
        assert_eq!(h.pc(), 0x14);
    }

    #[test]
    fn backward_branch_goes_negative() {
        let mut h = hart();
        h.set_pc(0x20);
        h.exec_branch(BranchCond::Ne, 0, 0, -4).expect("executes");
        // Not taken: x0 == x0.
        assert_eq!(h.pc(), 0x24);
        h.set_reg(1, 5);
        h.exec_branch(BranchCond::Ne, 0, 1, -4).expect("executes");
        assert_eq!(h.pc(), 0x20);
    }

    #[test]
    fn signed_versus_unsigned_branch_conditions() {
        let mut h = hart();
        h.set_reg(1, 0xFFFF_FFFF); // -1 signed
        h.set_reg(2, 1);
        h.set_pc(0);
        h.exec_branch(BranchCond::Lt, 1, 2, 8).expect("executes");
        assert_eq!(h.pc(), 8); // taken: -1 < 1
        h.set_pc(0);
        h.exec_branch(BranchCond::LtUnsigned, 1, 2, 8).expect("executes");
        assert_eq!(h.pc(), 4); // not taken: MAX > 1
    }

    #[test]
    fn jal_links_return_address() {
        let mut h = hart();
        h.set_pc(0x100);
        h.exec_jal(1, 0x40).expect("executes");
        assert_eq!(h.reg(1), 0x104);
        assert_eq!(h.pc(), 0x140);
    }

    #[test]
    fn jalr_clears_bit_zero_of_target() {
        let mut h = hart();
        h.set_reg(5, 0x201);
        h.set_pc(0x10);
        h.exec_jalr(1, 5, 2).expect("executes");
        assert_eq!(h.pc(), 0x202);
        assert_eq!(h.reg(1), 0x14);
    }

    #[test]
    fn jalr_with_same_source_and_destination() {
        let mut h = hart();
        h.set_reg(1, 0x80);
        h.set_pc(0x10);
        h.exec_jalr(1, 1, 0).expect("executes");
        // The jump used the old x1; the link overwrote it afterwards.
        assert_eq!(h.pc(), 0x80);
        assert_eq!(h.reg(1), 0x14);
    }
}
