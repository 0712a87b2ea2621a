use deadpool_postgres::PoolError;
use tokio_postgres::Error as PgError;
use tracing::instrument;

use crate::choume::{ChoumeCode, ChoumeEntry, ChoumeMaster};
use crate::db::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum MasterStoreError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
}

/// マスタ全件を choume_code キーで upsert する（land_prices から参照されるため削除はしない）
#[instrument(skip(pool, master))]
pub async fn upsert_master(
    pool: &PgPool,
    city_code: &str,
    master: &ChoumeMaster,
) -> Result<u64, MasterStoreError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let stmt = tx
        .prepare(
            "INSERT INTO chika.choume (choume_code, city_code, choume_name)
             VALUES ($1, $2, $3)
             ON CONFLICT (choume_code) DO UPDATE SET
                 choume_name = EXCLUDED.choume_name,
                 city_code = EXCLUDED.city_code",
        )
        .await?;

    let mut written = 0u64;
    for entry in master.entries() {
        written += tx
            .execute(&stmt, &[&entry.code.as_str(), &city_code, &entry.name])
            .await?;
    }
    tx.commit().await?;

    Ok(written)
}

/// 対象市区町村のマスタ全件をメモリに読み込む
#[instrument(skip(pool))]
pub async fn load_master(pool: &PgPool, city_code: &str) -> Result<ChoumeMaster, MasterStoreError> {
    let client = pool.get().await?;

    let rows = client
        .query(
            "SELECT choume_code, choume_name FROM chika.choume
             WHERE city_code = $1
             ORDER BY choume_name",
            &[&city_code],
        )
        .await?;

    let entries = rows
        .iter()
        .map(|row| ChoumeEntry {
            code: ChoumeCode::new(row.get::<_, String>("choume_code")),
            name: row.get("choume_name"),
        })
        .collect();

    Ok(ChoumeMaster::new(entries))
}
