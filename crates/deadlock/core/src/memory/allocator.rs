// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Contiguous memory allocation
//!
//! Memory is a list of blocks in address order that tile `0..memory_size`.
//! An allocation takes a free block chosen by the configured [`FitStrategy`]
//! and splits off the unused tail as a new free block. Deallocation frees
//! every block a process holds and merges runs of adjacent free blocks, so
//! no two free blocks are ever neighbours.
//!
//! External fragmentation is `(1 - largest_free / total_free) * 100`: zero
//! when all free memory is one block, approaching 100 as it scatters.

use std::cmp::Reverse;
use std::fmt;
use std::time::{Duration, Instant};

use deadlock_common::{AllocatorConfig, FitStrategy, MemoryError, MemoryResult};
use serde::Serialize;
use tracing::{debug, warn};

use super::block::MemoryBlock;

/// Read-out of allocator counters and current memory usage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryStatistics {
    pub strategy: FitStrategy,
    pub total_memory: u64,
    pub free_memory: u64,
    pub used_memory: u64,
    pub free_blocks: usize,
    pub used_blocks: usize,
    pub total_blocks: usize,
    /// External fragmentation in percent
    pub fragmentation: f64,
    /// Successful allocations
    pub allocations: u64,
    /// Allocations refused for lack of a large enough block
    pub allocation_failures: u64,
    /// Successful deallocations
    pub deallocations: u64,
    /// Running average block search time in microseconds
    pub average_search_time_us: u64,
}

#[derive(Debug, Clone, Default)]
struct Counters {
    allocations: u64,
    allocation_failures: u64,
    deallocations: u64,
    average_search_time_us: u64,
}

/// Contiguous allocator over a fixed amount of memory
#[derive(Debug, Clone)]
pub struct MemoryAllocator {
    memory_size: u64,
    strategy: FitStrategy,
    blocks: Vec<MemoryBlock>,
    counters: Counters,
}

impl MemoryAllocator {
    /// Create an allocator with all memory in one free block
    pub fn new(config: AllocatorConfig) -> MemoryResult<Self> {
        if config.memory_size == 0 {
            return Err(MemoryError::InvalidMemorySize);
        }
        Ok(Self {
            memory_size: config.memory_size,
            strategy: config.strategy,
            blocks: vec![MemoryBlock::free(0, config.memory_size)],
            counters: Counters::default(),
        })
    }

    pub fn with_strategy(memory_size: u64, strategy: FitStrategy) -> MemoryResult<Self> {
        Self::new(AllocatorConfig { memory_size, strategy })
    }

    pub fn strategy(&self) -> FitStrategy {
        self.strategy
    }

    pub fn memory_size(&self) -> u64 {
        self.memory_size
    }

    /// Blocks in address order
    pub fn blocks(&self) -> &[MemoryBlock] {
        &self.blocks
    }

    /// Allocate `size` contiguous units to `owner`, returning the new block.
    ///
    /// A process may hold several blocks. On failure nothing changes apart
    /// from the failure counter.
    pub fn allocate(&mut self, owner: &str, size: u64) -> MemoryResult<MemoryBlock> {
        if size == 0 {
            return Err(MemoryError::ZeroSizedRequest(owner.to_string()));
        }

        let search_start = Instant::now();
        let selected = self.select(size);
        self.record_search(search_start.elapsed());

        let Some((index, block)) = selected.and_then(|index| self.blocks.get_mut(index).map(|block| (index, block))) else {
            self.counters.allocation_failures += 1;
            let largest_free = self.largest_free_block();
            warn!(owner, size, largest_free, strategy = ?self.strategy, "Allocation failed: no free block large enough");
            return Err(MemoryError::OutOfMemory {
                owner: owner.to_string(),
                requested: size,
                largest_free,
            });
        };

        let remainder = block.size - size;
        block.size = size;
        block.owner = Some(owner.to_string());
        let allocated = block.clone();
        if remainder > 0 {
            self.blocks.insert(index + 1, MemoryBlock::free(allocated.start + size, remainder));
        }

        self.counters.allocations += 1;
        debug!(owner, size, start = allocated.start, strategy = ?self.strategy, "Memory allocated");
        Ok(allocated)
    }

    /// Free every block held by `owner`, returning the number of units freed
    pub fn deallocate(&mut self, owner: &str) -> MemoryResult<u64> {
        let mut freed = 0;
        for block in self.blocks.iter_mut().filter(|block| block.is_held_by(owner)) {
            block.owner = None;
            freed += block.size;
        }
        if freed == 0 {
            return Err(MemoryError::UnknownOwner(owner.to_string()));
        }

        self.counters.deallocations += 1;
        self.merge_free_neighbours();
        debug!(owner, freed, free_blocks = self.free_blocks().count(), "Memory deallocated");
        Ok(freed)
    }

    /// Units currently held by `owner`
    pub fn held_by(&self, owner: &str) -> u64 {
        self.blocks.iter().filter(|block| block.is_held_by(owner)).map(|block| block.size).sum()
    }

    pub fn free_memory(&self) -> u64 {
        self.free_blocks().map(|block| block.size).sum()
    }

    pub fn used_memory(&self) -> u64 {
        self.memory_size - self.free_memory()
    }

    /// Size of the largest free block, zero when memory is full
    pub fn largest_free_block(&self) -> u64 {
        self.free_blocks().map(|block| block.size).max().unwrap_or(0)
    }

    /// External fragmentation in percent
    pub fn fragmentation(&self) -> f64 {
        let free = self.free_memory();
        if free == 0 {
            return 0.0;
        }
        (1.0 - self.largest_free_block() as f64 / free as f64) * 100.0
    }

    pub fn statistics(&self) -> MemoryStatistics {
        let free_blocks = self.free_blocks().count();
        MemoryStatistics {
            strategy: self.strategy,
            total_memory: self.memory_size,
            free_memory: self.free_memory(),
            used_memory: self.used_memory(),
            free_blocks,
            used_blocks: self.blocks.len() - free_blocks,
            total_blocks: self.blocks.len(),
            fragmentation: self.fragmentation(),
            allocations: self.counters.allocations,
            allocation_failures: self.counters.allocation_failures,
            deallocations: self.counters.deallocations,
            average_search_time_us: self.counters.average_search_time_us,
        }
    }

    fn free_blocks(&self) -> impl Iterator<Item = &MemoryBlock> {
        self.blocks.iter().filter(|block| block.is_free())
    }

    /// Index of the free block the strategy places `size` units in
    fn select(&self, size: u64) -> Option<usize> {
        let mut candidates = self.blocks.iter().enumerate().filter(|(_, block)| block.is_free() && block.size >= size);
        let chosen = match self.strategy {
            FitStrategy::FirstFit => candidates.next(),
            // min_by_key keeps the first of equal keys, so ties go to the lowest address
            FitStrategy::BestFit => candidates.min_by_key(|(_, block)| block.size),
            FitStrategy::WorstFit => candidates.min_by_key(|(_, block)| Reverse(block.size)),
        };
        chosen.map(|(index, _)| index)
    }

    fn merge_free_neighbours(&mut self) {
        self.blocks.dedup_by(|next, previous| {
            if previous.is_free() && next.is_free() {
                previous.size += next.size;
                true
            } else {
                false
            }
        });
    }

    fn record_search(&mut self, search_time: Duration) {
        let search_time_us = u64::try_from(search_time.as_micros()).unwrap_or(u64::MAX);
        let average = &mut self.counters.average_search_time_us;
        *average = if *average == 0 { search_time_us } else { (*average + search_time_us) / 2 };
    }
}

impl fmt::Display for MemoryAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.strategy {
            FitStrategy::FirstFit => "First Fit",
            FitStrategy::BestFit => "Best Fit",
            FitStrategy::WorstFit => "Worst Fit",
        };
        writeln!(f, "Memory State - {name}")?;
        for block in &self.blocks {
            writeln!(f, "{block}")?;
        }
        Ok(())
    }
}
