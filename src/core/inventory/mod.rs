//! # Inventory Module
//!
//! The inventory table is the hand-off between metadata extraction and move
//! planning. [`InventoryPipeline`] builds it from disk; [`load_inventory`]
//! reads one back, possibly edited or produced by another tool.

mod pipeline;
mod table;

pub use pipeline::{
    status_path, InventoryBuilder, InventoryConfig, InventoryPipeline, InventoryResult,
    CHECKPOINT_STATUS_FILE, DEFAULT_CHECKPOINT_EVERY,
};
pub use table::{
    load_inventory, parse_table_date, read_inventory, recompute_statuses, save_inventory,
    to_candidates, write_inventory, InventoryRecord, InventoryTable,
};
