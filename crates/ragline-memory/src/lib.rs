//! Ragline Memory - TTL-bounded session storage and the durable
//! persistence seam

pub mod cache;
pub mod durable;
pub mod store;

pub use cache::{CacheBackend, MemoryCache};
pub use durable::{DurableStore, NullDurableStore};
pub use store::{SessionRecord, SessionStore};
