//! Top-level machine: one hart plus its memory image.

use crate::Exception;
use crate::config::MachineConfig;
use crate::hart::Hart;
use crate::memory::Memory;
use crate::page_table::{BOOT_MAP_SHIFT, BOOT_SATP, BOOT_TABLE_ADDR, build_boot_page_table};

/// A loadable program image: entry point plus LOAD segments.
///
/// Produced by the ELF loader; the machine only needs addresses and bytes.
pub struct Image<'a> {
    /// Virtual entry point.
    pub entry: u64,
    /// (virtual address, payload) per LOAD segment.
    pub segments: &'a [(u64, &'a [u8])],
}

/// Single-hart RV32 machine.
pub struct Machine {
    hart: Hart,
    enable_mmu: bool,
}

impl Machine {
    #[must_use]
    pub fn new(config: &MachineConfig) -> Self {
        Self {
            hart: Hart::new(Memory::new(config.memory_size)),
            enable_mmu: config.enable_mmu,
        }
    }

    /// Copy an image into memory and point the PC at its entry.
    ///
    /// The minimum segment address becomes the image base; every segment
    /// lands at `vaddr - base`, and the PC at `entry - base`. With the MMU
    /// enabled the segments are additionally displaced by the bootstrap
    /// mapping shift, so translated fetches find the loaded bytes.
    pub fn load_image(&mut self, image: &Image<'_>) -> Result<(), Exception> {
        let shift = if self.enable_mmu { BOOT_MAP_SHIFT } else { 0 };
        let mem = self.hart.memory_mut();
        for (vaddr, _) in image.segments {
            mem.set_image_base(*vaddr);
        }
        for (vaddr, data) in image.segments {
            mem.store_data(data, *vaddr + shift)?;
        }

        let pc = image.entry.wrapping_sub(mem.image_base()) as u32;
        log::info!("entry pc {pc:#010x}");
        self.hart.set_pc(pc);
        Ok(())
    }

    /// Run to completion. With the MMU enabled, the bootstrap page table is
    /// built and satp switched to Sv32 first.
    pub fn run(&mut self) -> Result<(), Exception> {
        if self.enable_mmu {
            build_boot_page_table(self.hart.memory_mut(), BOOT_TABLE_ADDR)?;
            self.hart.mmu_mut().set_satp(BOOT_SATP);
        }
        self.hart.run()
    }

    #[must_use]
    pub fn hart(&self) -> &Hart {
        &self.hart
    }

    pub fn hart_mut(&mut self) -> &mut Hart {
        &mut self.hart
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_lands_at_vaddr_minus_base() {
        let mut machine = Machine::new(&MachineConfig {
            memory_size: 4096,
            enable_mmu: false,
        });
        let code = 0x0050_0093u32.to_le_bytes(); // addi x1, x0, 5
        let data = [0xAAu8; 4];
        let segments = [(0x1_0000u64, &code[..]), (0x1_0100u64, &data[..])];
        let image = Image {
            entry: 0x1_0000,
            segments: &segments,
        };
        machine.load_image(&image).expect("loads");

        assert_eq!(machine.hart().pc(), 0);
        assert_eq!(
            machine.hart().memory().read_word(0).expect("in range"),
            0x0050_0093
        );
        assert_eq!(
            machine.hart().memory().read_word(0x100).expect("in range"),
            0xAAAA_AAAA
        );
    }

    #[test]
    fn translated_run_finds_the_loaded_image() {
        // With the MMU on, the image is displaced by the mapping shift and
        // the whole fetch/execute path goes through translation.
        let mut machine = Machine::new(&MachineConfig {
            enable_mmu: true,
            ..MachineConfig::default()
        });
        let mut program = Vec::new();
        for word in [0x0050_0093u32, 0x0000_0073] {
            program.extend_from_slice(&word.to_le_bytes());
        }
        let segments = [(0x1_0000u64, &program[..])];
        let image = Image {
            entry: 0x1_0000,
            segments: &segments,
        };
        machine.load_image(&image).expect("loads");
        machine.run().expect("runs");

        assert_eq!(machine.hart().reg(1), 5);
        assert_eq!(machine.hart().halt_reason(), Some(crate::HaltReason::Ecall));
        assert!(machine.hart().mmu().stats().misses > 0);
    }

    #[test]
    fn runs_a_loaded_program_to_completion() {
        let mut machine = Machine::new(&MachineConfig {
            memory_size: 4096,
            enable_mmu: false,
        });
        let mut program = Vec::new();
        for word in [0x0050_0093u32, 0x0000_0073] {
            program.extend_from_slice(&word.to_le_bytes());
        }
        let segments = [(0x2_0000u64, &program[..])];
        let image = Image {
            entry: 0x2_0000,
            segments: &segments,
        };
        machine.load_image(&image).expect("loads");
        machine.run().expect("runs");

        assert_eq!(machine.hart().reg(1), 5);
        assert_eq!(machine.hart().retired(), 2);
    }
}
