//! Machine configuration.

/// Default physical memory image: 64 MiB, large enough for the bootstrap
/// page tables at 32 MiB and any statically-linked image the loader feeds
/// in. Must stay a power of two for the bootstrap mapping policy.
pub const DEFAULT_MEMORY_SIZE: usize = 64 * 1024 * 1024;

/// Configuration for a single-hart RV32 machine.
pub struct MachineConfig {
    /// Physical memory capacity in bytes.
    pub memory_size: usize,
    /// Enable Sv32 translation through the bootstrap page table.
    pub enable_mmu: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            enable_mmu: false,
        }
    }
}
