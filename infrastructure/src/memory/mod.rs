//! Memory-side adapters

mod compression;
mod in_memory_store;
mod jsonl_store;
mod loopback;

pub use compression::MarkerCompressionCodec;
pub use in_memory_store::InMemoryStore;
pub use jsonl_store::JsonlStore;
pub use loopback::LoopbackTransport;
