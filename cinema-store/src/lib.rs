pub mod app_config;
pub mod memory;
pub mod redis_repo;

pub use app_config::Config;
pub use memory::MemoryStorage;
pub use redis_repo::RedisStorage;
