pub mod hold;
pub mod memory_feed;
pub mod memory_store;

pub use hold::Hold;
pub use memory_feed::MemoryChangeFeed;
pub use memory_store::MemoryRecordStore;
