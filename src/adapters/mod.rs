// Adapters layer: concrete stores behind the domain ports.

pub mod memory;
pub mod postgrest;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
