mod connection_info;
mod database_type;
mod pool_settings;
mod secret;

pub use connection_info::{ConnectionUri, DatabaseName};
pub use database_type::{DatabaseType, UnknownDatabaseType};
pub use pool_settings::PoolSettings;
pub use secret::Secret;
