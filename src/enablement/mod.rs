//! Tool-group enablement: the persisted store and the per-turn filter.

pub mod filter;
pub mod store;

pub use filter::filter_enabled;
pub use store::{EnablementMap, EnablementStore, ENABLEMENT_KEY};
