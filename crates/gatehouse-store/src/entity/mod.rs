//! database entity models for sea-orm.

pub mod kv_entry;
