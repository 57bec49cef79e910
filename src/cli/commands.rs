pub mod create_superuser;
pub mod initdb;
pub mod migrate_and_serve;
pub mod serve;

pub use create_superuser::create_superuser;
pub use initdb::init_database;
pub use migrate_and_serve::migrate_and_serve;
pub use serve::serve;
