//! Basic-block cache.
//!
//! Maps an entry PC to the straight-line run of decoded actions starting
//! there, so each block is decoded at most once. A block ends at the first
//! action whose control-flow flag is set, or at [`BLOCK_CAP`] actions. The
//! cache never evicts; blocks live for the whole run.
//!
//! Stores are not observed: a program that rewrites its own code may keep
//! executing stale blocks.

use std::collections::HashMap;
use std::rc::Rc;

use crate::decode::Decoded;

/// Maximum number of actions per block.
pub const BLOCK_CAP: usize = 100;

/// Entry-PC-keyed cache of decoded basic blocks.
#[derive(Default)]
pub struct BlockCache {
    blocks: HashMap<u32, Rc<[Decoded]>>,
}

impl BlockCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a block. Re-installing under the same PC replaces the block,
    /// so duplicate installation is idempotent.
    pub fn insert(&mut self, entry_pc: u32, actions: Vec<Decoded>) {
        debug_assert!(!actions.is_empty());
        debug_assert!(actions.len() <= BLOCK_CAP);
        self.blocks.insert(entry_pc, actions.into());
    }

    #[must_use]
    pub fn get(&self, entry_pc: u32) -> Option<&Rc<[Decoded]>> {
        self.blocks.get(&entry_pc)
    }

    #[must_use]
    pub fn contains(&self, entry_pc: u32) -> bool {
        self.blocks.contains_key(&entry_pc)
    }

    /// Number of cached blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;

    #[test]
    fn reinstalling_a_block_is_idempotent() {
        let mut cache = BlockCache::new();
        let block = vec![decode(0x0050_0093).expect("valid")];
        cache.insert(0x100, block.clone());
        cache.insert(0x100, block);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(0x100).expect("installed").len(), 1);
    }

    #[test]
    fn lookup_misses_unknown_pc() {
        let cache = BlockCache::new();
        assert!(cache.get(0).is_none());
        assert!(!cache.contains(0));
    }
}
