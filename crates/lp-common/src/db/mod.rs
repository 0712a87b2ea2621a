pub mod choume_master;
pub mod land_prices;
pub mod migrations;
pub mod pool;

// Keep re-exports unique so downstream crates see a single symbol per helper.
pub use choume_master::{load_master, upsert_master, MasterStoreError};
pub use land_prices::{
    fetch_prices_for_area, write_year_batch, AreaKey, LandPriceStoreError, YearWriteOutcome,
};
pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool_from_url, DbPoolError, PgPool};
