mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::{PoolSettings, PostgresRepository};
