//! Capacity policy for connection buffers.
//!
//! A buffer must be large enough that every consumer's smallest useful request
//! fits, and its length must land on a granularity every party can divide:
//! the page size (mapping), the upstream output multiple (writes), and each
//! downstream block's `decimation * output_multiple` (reads). Otherwise space
//! accounting can settle on a free count no request ever matches and the
//! pipeline stalls.

use super::region::page_size;
use crate::math::{granularity_items, lcm, round_up};

/// Consumption granularity of one downstream block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsumerHint {
    /// Block history (1 for no look-back).
    pub history: usize,
    /// Input items consumed per output item, rounded up for fractional rates.
    pub decimation: u64,
    /// The block's output multiple.
    pub output_multiple: usize,
}

impl Default for ConsumerHint {
    fn default() -> Self {
        Self {
            history: 1,
            decimation: 1,
            output_multiple: 1,
        }
    }
}

impl ConsumerHint {
    /// Input items per smallest output request.
    pub fn chunk_items(&self) -> usize {
        (self.decimation.max(1) as usize).saturating_mul(self.output_multiple.max(1))
    }
}

/// Sizing request for one connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferSizing {
    /// Target size in bytes before rounding.
    pub default_bytes: usize,
    /// Output multiple of the writing block.
    pub upstream_output_multiple: usize,
    /// One hint per downstream reader.
    pub consumers: Vec<ConsumerHint>,
}

impl BufferSizing {
    /// Sizing for a connection with the given upstream multiple and consumers.
    pub fn for_connection(
        default_bytes: usize,
        upstream_output_multiple: usize,
        consumers: &[ConsumerHint],
    ) -> Self {
        Self {
            default_bytes,
            upstream_output_multiple: upstream_output_multiple.max(1),
            consumers: consumers.to_vec(),
        }
    }

    /// Smallest step, in items, that the capacity must be a multiple of.
    pub fn granularity_items(&self, item_size: usize) -> usize {
        self.consumers.iter().fold(
            lcm(
                granularity_items(item_size, page_size()),
                self.upstream_output_multiple,
            ),
            |acc, c| lcm(acc, c.chunk_items()),
        )
    }

    /// Smallest capacity that always admits one full request from every party.
    pub fn minimum_items(&self) -> usize {
        let largest = self
            .consumers
            .iter()
            .map(|c| c.chunk_items().max(c.history))
            .chain(core::iter::once(self.upstream_output_multiple))
            .max()
            .unwrap_or(1);
        largest.saturating_mul(2)
    }

    /// Final capacity in items for `item_size`-byte items.
    pub fn capacity_items(&self, item_size: usize) -> usize {
        let requested = (self.default_bytes / item_size.max(1)).max(self.minimum_items());
        let capacity = round_up(requested, self.granularity_items(item_size));
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "buffer_sizing: requested {requested} items of {item_size} bytes, granularity {}, capacity {capacity}",
            self.granularity_items(item_size)
        );
        capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_page_granular() {
        let sizing = BufferSizing::for_connection(1000, 1, &[ConsumerHint::default()]);
        let cap = sizing.capacity_items(4);
        assert_eq!((cap * 4) % page_size(), 0);
        assert!(cap * 4 >= 1000);
    }

    #[test]
    fn consumer_chunks_divide_capacity() {
        let hints = [
            ConsumerHint {
                history: 1,
                decimation: 3,
                output_multiple: 1,
            },
            ConsumerHint {
                history: 1,
                decimation: 1,
                output_multiple: 5,
            },
        ];
        let sizing = BufferSizing::for_connection(4096, 1, &hints);
        let cap = sizing.capacity_items(4);
        assert_eq!(cap % 3, 0);
        assert_eq!(cap % 5, 0);
    }

    #[test]
    fn long_history_raises_minimum() {
        let hints = [ConsumerHint {
            history: 10_000,
            ..ConsumerHint::default()
        }];
        let sizing = BufferSizing::for_connection(64, 1, &hints);
        assert_eq!(sizing.minimum_items(), 20_000);
        assert!(sizing.capacity_items(4) >= 20_000);
    }
}
