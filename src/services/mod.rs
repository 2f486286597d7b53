pub mod decoder;
pub mod gateway;
pub mod query_cache;
pub mod recency;
pub mod switcher;

pub use gateway::{create_gateway, ProcessGateway};
pub use query_cache::{CacheState, QueryCache};
pub use switcher::WindowSwitcher;
