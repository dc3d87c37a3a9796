//! Loads and stores.
//!
//! The effective address is rs1 plus the sign-extended 12-bit offset,
//! translated through the MMU as a data access. When translation page-
//! faults the access does not happen: the trap has already redirected the
//! PC, so the handler returns without touching rd or advancing.
//!
//! The 64-bit widths (LD, LWU, SD) exist as forward-compatibility hooks;
//! loads truncate into the 32-bit register file and SD stores the
//! zero-extended register.

use crate::Exception;
use crate::decode::{LoadWidth, StoreWidth};
use crate::hart::Hart;
use crate::mmu::Access;

impl Hart {
    pub(crate) fn exec_load(
        &mut self,
        width: LoadWidth,
        rd: u8,
        rs1: u8,
        offset: i32,
    ) -> Result<(), Exception> {
        let vaddr = self.reg(rs1).wrapping_add(offset as u32);
        let loaded = match width {
            LoadWidth::Byte => self.load_byte(vaddr)?.map(|v| v as i8 as i32 as u32),
            LoadWidth::ByteUnsigned => self.load_byte(vaddr)?.map(u32::from),
            LoadWidth::Half => self.load_halfword(vaddr)?.map(|v| v as i16 as i32 as u32),
            LoadWidth::HalfUnsigned => self.load_halfword(vaddr)?.map(u32::from),
            LoadWidth::Word | LoadWidth::WordUnsigned => self.load_word(vaddr)?,
            LoadWidth::Double => self.load_doubleword(vaddr)?.map(|v| v as u32),
        };
        let Some(value) = loaded else {
            return Ok(());
        };
        self.set_reg(rd, value);
        self.advance();
        Ok(())
    }

    pub(crate) fn exec_store(
        &mut self,
        width: StoreWidth,
        rs1: u8,
        rs2: u8,
        offset: i32,
    ) -> Result<(), Exception> {
        let vaddr = self.reg(rs1).wrapping_add(offset as u32);
        let value = self.reg(rs2);
        let done = match width {
            StoreWidth::Byte => self.store_byte(vaddr, value as u8)?,
            StoreWidth::Half => self.store_halfword(vaddr, value as u16)?,
            StoreWidth::Word => self.store_word(vaddr, value)?,
            StoreWidth::Double => self.store_doubleword(vaddr, u64::from(value))?,
        };
        if done {
            self.advance();
        }
        Ok(())
    }

    fn load_byte(&mut self, vaddr: u32) -> Result<Option<u8>, Exception> {
        match self.translate(vaddr, Access::Read)? {
            Some(paddr) => Ok(Some(self.memory().read_byte(paddr)?)),
            None => Ok(None),
        }
    }

    fn load_halfword(&mut self, vaddr: u32) -> Result<Option<u16>, Exception> {
        match self.translate(vaddr, Access::Read)? {
            Some(paddr) => Ok(Some(self.memory().read_halfword(paddr)?)),
            None => Ok(None),
        }
    }

    fn load_word(&mut self, vaddr: u32) -> Result<Option<u32>, Exception> {
        match self.translate(vaddr, Access::Read)? {
            Some(paddr) => Ok(Some(self.memory().read_word(paddr)?)),
            None => Ok(None),
        }
    }

    fn load_doubleword(&mut self, vaddr: u32) -> Result<Option<u64>, Exception> {
        match self.translate(vaddr, Access::Read)? {
            Some(paddr) => Ok(Some(self.memory().read_doubleword(paddr)?)),
            None => Ok(None),
        }
    }

    fn store_byte(&mut self, vaddr: u32, value: u8) -> Result<bool, Exception> {
        match self.translate(vaddr, Access::Write)? {
            Some(paddr) => {
                self.memory_mut().write_byte(paddr, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn store_halfword(&mut self, vaddr: u32, value: u16) -> Result<bool, Exception> {
        match self.translate(vaddr, Access::Write)? {
            Some(paddr) => {
                self.memory_mut().write_halfword(paddr, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn store_word(&mut self, vaddr: u32, value: u32) -> Result<bool, Exception> {
        match self.translate(vaddr, Access::Write)? {
            Some(paddr) => {
                self.memory_mut().write_word(paddr, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn store_doubleword(&mut self, vaddr: u32, value: u64) -> Result<bool, Exception> {
        match self.translate(vaddr, Access::Write)? {
            Some(paddr) => {
                self.memory_mut().write_doubleword(paddr, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
