pub mod app_config;
pub mod memory_store;
pub mod redis_repo;
pub mod telemetry;

pub use memory_store::MemoryBookingStore;
pub use redis_repo::{RedisSeatLocks, SeatLockedStore, SeatLocks};
