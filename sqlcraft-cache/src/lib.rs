//! Pluggable second-level cache (§4.11): a `Cache` trait, a base in-memory
//! store, a stack of independent decorators that each add one feature
//! (eviction policy, scheduling, logging, blocking, serialization,
//! synchronization), and a per-session transactional staging overlay.

#![deny(missing_docs)]
#![warn(unused_imports)]

mod blocking;
mod cache;
mod fifo;
mod logging;
mod lru;
mod scheduled;
mod serialized;
mod soft;
mod synchronized;
mod transactional;
mod weak;

pub use blocking::BlockingCache;
pub use cache::{Cache, PerpetualCache};
pub use fifo::FifoCache;
pub use logging::LoggingCache;
pub use lru::LruCache;
pub use scheduled::ScheduledCache;
pub use serialized::SerializedCache;
pub use soft::SoftCache;
pub use synchronized::SynchronizedCache;
pub use transactional::TransactionalCache;
pub use weak::WeakCache;
