//! The hart: architectural state and the fetch/execute driver.
//!
//! Owns the register files, the physical memory, the MMU and the block
//! cache. Translated memory access lives here because a page fault needs
//! the trap CSRs and the PC in addition to the MMU.
//!
//! Every executed action leaves the PC architecturally correct on its own:
//! straight-line actions advance it by four, control-flow actions assign
//! their target directly. The driver never adjusts the PC itself.

use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::Exception;
use crate::block::{BLOCK_CAP, BlockCache};
use crate::csr::{self, CsrFile};
use crate::decode::decode;
use crate::memory::Memory;
use crate::mmu::{Access, Mmu, TranslateError};
use crate::registers::{REG_NAMES, SP};

/// Why a run ended, other than the PC walking off the end of memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    Ecall,
    Ebreak,
    /// An unknown major opcode was executed.
    UnknownOpcode,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ecall => write!(f, "ECALL"),
            Self::Ebreak => write!(f, "EBREAK"),
            Self::UnknownOpcode => write!(f, "unknown opcode"),
        }
    }
}

/// A single RV32 hardware thread.
pub struct Hart {
    gpr: [u32; 32],
    csr: CsrFile,
    pc: u32,
    /// Count of executed semantic actions.
    retired: u64,
    halt: Option<HaltReason>,
    mem: Memory,
    mmu: Mmu,
    cache: BlockCache,
}

impl Hart {
    /// Create a hart owning the given memory, with all state zeroed.
    #[must_use]
    pub fn new(mem: Memory) -> Self {
        Self {
            gpr: [0; 32],
            csr: CsrFile::new(),
            pc: 0,
            retired: 0,
            halt: None,
            mem,
            mmu: Mmu::new(),
            cache: BlockCache::new(),
        }
    }

    #[must_use]
    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    #[must_use]
    pub fn reg(&self, reg: u8) -> u32 {
        self.gpr[usize::from(reg & 0x1F)]
    }

    /// Write a register. x0 is hard-wired to zero: writes to it are inert.
    pub fn set_reg(&mut self, reg: u8, value: u32) {
        let reg = reg & 0x1F;
        if reg != 0 {
            self.gpr[usize::from(reg)] = value;
        }
    }

    #[must_use]
    pub fn csr(&self, addr: u16) -> u32 {
        self.csr.read(addr)
    }

    pub fn set_csr(&mut self, addr: u16, value: u32) {
        self.csr.write(addr, value);
    }

    #[must_use]
    pub fn retired(&self) -> u64 {
        self.retired
    }

    #[must_use]
    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halt
    }

    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    #[must_use]
    pub fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    pub fn mmu_mut(&mut self) -> &mut Mmu {
        &mut self.mmu
    }

    #[must_use]
    pub fn cache(&self) -> &BlockCache {
        &self.cache
    }

    /// Initialize the stack pointer and drive [`Hart::step`] until the PC
    /// leaves physical memory.
    pub fn run(&mut self) -> Result<(), Exception> {
        self.set_reg(SP, (self.mem.len() as u32).wrapping_sub(1));
        while self.step()? {}
        Ok(())
    }

    /// Execute one unit of work: a whole cached block on a hit, otherwise
    /// fetch/decode at the current PC and either execute a lone
    /// control-flow instruction or build and run a new block.
    ///
    /// Returns false once the PC is at or past the end of memory.
    pub fn step(&mut self) -> Result<bool, Exception> {
        if self.run_cached_block()? {
            return Ok(self.running());
        }

        let entry_pc = self.pc;
        let Some(word) = self.fetch(entry_pc)? else {
            // Fetch faulted; the PC now points at the trap vector.
            return Ok(self.running());
        };
        let decoded = decode(word)?;

        if decoded.is_control_flow {
            // A block would hold only this instruction; execute it without
            // installing anything.
            self.execute(&decoded)?;
        } else {
            self.build_block(entry_pc)?;
            self.run_cached_block()?;
        }
        Ok(self.running())
    }

    fn running(&self) -> bool {
        (self.pc as usize) < self.mem.len()
    }

    /// Run the block installed under the current PC, if any.
    ///
    /// Execution stops early when an action does not fall through to the
    /// next one (a page-fault redirect, or the terminating control-flow
    /// action), which keeps a cached run observationally identical to
    /// stepping the same words one at a time.
    fn run_cached_block(&mut self) -> Result<bool, Exception> {
        let Some(block) = self.cache.get(self.pc) else {
            return Ok(false);
        };
        let block = Rc::clone(block);
        for action in block.iter() {
            let before = self.pc;
            self.execute(action)?;
            if self.pc != before.wrapping_add(4) {
                break;
            }
        }
        Ok(true)
    }

    /// Fetch and decode from `entry_pc` until the first control-flow action
    /// or the length cap, then install the block.
    ///
    /// A fetch translation failure mid-build discards the partial block
    /// (installed blocks always end properly); at most the first decoded
    /// action is executed so the run still makes progress, and the fault
    /// itself fires later on the single-instruction path with the correct
    /// PC.
    fn build_block(&mut self, entry_pc: u32) -> Result<(), Exception> {
        let mut actions = Vec::new();
        let mut pc = entry_pc;
        loop {
            let Some(word) = self.fetch_for_block(pc)? else {
                if let Some(first) = actions.first().copied() {
                    self.execute(&first)?;
                }
                return Ok(());
            };
            let decoded = decode(word)?;
            let stop = decoded.is_control_flow;
            actions.push(decoded);
            if stop || actions.len() >= BLOCK_CAP {
                break;
            }
            pc = pc.wrapping_add(4);
        }
        self.cache.insert(entry_pc, actions);
        Ok(())
    }

    /// Translated instruction fetch. `None` means the fetch page-faulted
    /// and the trap has been taken.
    fn fetch(&mut self, vaddr: u32) -> Result<Option<u32>, Exception> {
        match self.translate(vaddr, Access::Execute)? {
            Some(paddr) => Ok(Some(self.mem.read_word(paddr)?)),
            None => Ok(None),
        }
    }

    /// Like [`Hart::fetch`] but without taking the trap on a page fault;
    /// used while building a block, where no instruction is executing yet.
    fn fetch_for_block(&mut self, vaddr: u32) -> Result<Option<u32>, Exception> {
        match self.mmu.translate(&mut self.mem, vaddr, Access::Execute) {
            Ok(paddr) => Ok(Some(self.mem.read_word(paddr)?)),
            Err(TranslateError::PageFault) => Ok(None),
            Err(TranslateError::Memory(e)) => Err(e.into()),
        }
    }

    /// Translate a virtual address, taking the page-fault trap on failure.
    ///
    /// `Ok(None)` means the access must not happen: the trap CSRs are
    /// updated and the PC points at the trap vector.
    pub(crate) fn translate(
        &mut self,
        vaddr: u32,
        access: Access,
    ) -> Result<Option<u32>, Exception> {
        match self.mmu.translate(&mut self.mem, vaddr, access) {
            Ok(paddr) => Ok(Some(paddr)),
            Err(TranslateError::PageFault) => {
                self.take_page_fault(vaddr, access);
                Ok(None)
            }
            Err(TranslateError::Memory(e)) => Err(e.into()),
        }
    }

    /// Record the fault in the trap CSRs and redirect the PC to mtvec.
    fn take_page_fault(&mut self, vaddr: u32, access: Access) {
        self.csr.write(csr::MCAUSE, access as u32);
        self.csr.write(csr::MEPC, self.pc);
        self.csr.write(csr::MTVAL, vaddr);

        let mstatus = self.csr.read(csr::MSTATUS);
        self.csr.write(csr::MSTATUS, (mstatus | 1 << 7) & !(1 << 3));

        self.pc = self.csr.read(csr::MTVEC);
        log::warn!("page fault at vaddr={vaddr:#010x}, cause={}", access as u32);
    }

    /// Record the reason and park the PC past the end of memory, which the
    /// driver's termination predicate picks up.
    pub(crate) fn halt(&mut self, reason: HaltReason) {
        log::warn!("halted by {reason}");
        self.halt = Some(reason);
        self.pc = self.mem.len() as u32;
    }

    pub(crate) fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }

    pub(crate) fn bump_retired(&mut self) {
        self.retired += 1;
    }

    /// Render the register file for the end-of-run report, two registers
    /// per line with their ABI names.
    #[must_use]
    pub fn dump_registers(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== REGISTER DUMP ===");
        let _ = writeln!(out, "PC: {:#010x} ({})", self.pc, self.pc);
        for (i, value) in self.gpr.iter().enumerate() {
            let sep = if i % 2 == 0 { " | " } else { "\n" };
            let _ = write!(
                out,
                "x{i:02} ({:<5}): {value:#010x} ({:>11}){sep}",
                REG_NAMES[i], *value as i32
            );
        }
        let _ = write!(out, "=====================");
        out
    }
}
