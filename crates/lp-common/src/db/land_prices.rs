use deadpool_postgres::PoolError;
use tokio_postgres::{Error as PgError, Row};
use tracing::instrument;

use crate::choume::ChoumeCode;
use crate::db::PgPool;
use crate::{LandPriceRecord, DATA_SOURCE_KOKUDO};

#[derive(Debug, thiserror::Error)]
pub enum LandPriceStoreError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    /// 年バッチのトランザクションが途中で失敗した。ロールバック済みで
    /// コミットは0件なので、原因を除いて再実行すればよい。
    #[error("year {year}: batch rolled back after attempting {attempted} records (0 committed): {source}")]
    Transaction {
        year: i32,
        attempted: usize,
        #[source]
        source: PgError,
    },
    #[error("failed to map land price row: {0}")]
    Mapping(String),
}

// 識別キー (survey_year, original_address) と created_at は衝突時も据え置く
const UPSERT_SQL: &str = "INSERT INTO chika.land_prices (
    survey_year,
    original_address,
    choume_code,
    official_price,
    data_source,
    land_area,
    land_use,
    building_coverage_ratio,
    floor_area_ratio,
    road_direction,
    road_width,
    nearest_station,
    station_distance
) VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13
)
ON CONFLICT (survey_year, original_address) DO UPDATE SET
    choume_code = EXCLUDED.choume_code,
    official_price = EXCLUDED.official_price,
    data_source = EXCLUDED.data_source,
    land_area = EXCLUDED.land_area,
    land_use = EXCLUDED.land_use,
    building_coverage_ratio = EXCLUDED.building_coverage_ratio,
    floor_area_ratio = EXCLUDED.floor_area_ratio,
    road_direction = EXCLUDED.road_direction,
    road_width = EXCLUDED.road_width,
    nearest_station = EXCLUDED.nearest_station,
    station_distance = EXCLUDED.station_distance;";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWriteOutcome {
    pub attempted: usize,
    pub written: u64,
}

/// 1年分のバッチを単一トランザクションで upsert する。
///
/// 途中で失敗した年は丸ごとロールバックされ、「部分的に書けた年」は
/// 存在しない。同じバッチの再投入は行数を増やさない（冪等）。
#[instrument(skip(pool, records))]
pub async fn write_year_batch(
    pool: &PgPool,
    year: i32,
    records: &[LandPriceRecord],
) -> Result<YearWriteOutcome, LandPriceStoreError> {
    let attempted = records.len();
    if attempted == 0 {
        return Ok(YearWriteOutcome {
            attempted: 0,
            written: 0,
        });
    }

    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let stmt = tx
        .prepare(UPSERT_SQL)
        .await
        .map_err(|source| LandPriceStoreError::Transaction {
            year,
            attempted,
            source,
        })?;

    let mut written = 0u64;
    for record in records {
        let choume_code = record.choume_code.as_ref().map(ChoumeCode::as_str);
        written += tx
            .execute(
                &stmt,
                &[
                    &record.survey_year,
                    &record.original_address,
                    &choume_code,
                    &record.official_price,
                    &DATA_SOURCE_KOKUDO,
                    &record.land_area,
                    &record.land_use,
                    &record.building_coverage_ratio,
                    &record.floor_area_ratio,
                    &record.road_direction,
                    &record.road_width,
                    &record.nearest_station,
                    &record.station_distance,
                ],
            )
            .await
            .map_err(|source| LandPriceStoreError::Transaction {
                year,
                attempted,
                source,
            })?;
    }

    tx.commit()
        .await
        .map_err(|source| LandPriceStoreError::Transaction {
            year,
            attempted,
            source,
        })?;

    Ok(YearWriteOutcome { attempted, written })
}

/// 集計側が価格系列を引くときのキー。
/// マスタ未解決（choume_code が NULL）のレコードは生住所の部分一致で拾う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaKey<'a> {
    Choume(&'a ChoumeCode),
    AddressContains(&'a str),
}

const SELECT_BY_CHOUME_SQL: &str = "SELECT survey_year, original_address, choume_code, \
     official_price, land_area, land_use, building_coverage_ratio, floor_area_ratio, \
     road_direction, road_width, nearest_station, station_distance \
     FROM chika.land_prices \
     WHERE choume_code = $1 \
     ORDER BY survey_year ASC, original_address ASC";

const SELECT_BY_ADDRESS_SQL: &str = "SELECT survey_year, original_address, choume_code, \
     official_price, land_area, land_use, building_coverage_ratio, floor_area_ratio, \
     road_direction, road_width, nearest_station, station_distance \
     FROM chika.land_prices \
     WHERE original_address LIKE $1 \
     ORDER BY survey_year ASC, original_address ASC";

/// 1町丁目の全年次の価格レコードを調査年の昇順で返す。
#[instrument(skip(pool))]
pub async fn fetch_prices_for_area(
    pool: &PgPool,
    key: AreaKey<'_>,
) -> Result<Vec<LandPriceRecord>, LandPriceStoreError> {
    let client = pool.get().await?;

    let rows = match key {
        AreaKey::Choume(code) => {
            client
                .query(SELECT_BY_CHOUME_SQL, &[&code.as_str()])
                .await?
        }
        AreaKey::AddressContains(fragment) => {
            let pattern = format!("%{fragment}%");
            client.query(SELECT_BY_ADDRESS_SQL, &[&pattern]).await?
        }
    };

    rows.iter().map(row_to_record).collect()
}

fn row_to_record(row: &Row) -> Result<LandPriceRecord, LandPriceStoreError> {
    Ok(LandPriceRecord {
        survey_year: row.try_get("survey_year")?,
        original_address: row.try_get("original_address")?,
        choume_code: row
            .try_get::<_, Option<String>>("choume_code")?
            .map(ChoumeCode::new),
        official_price: row.try_get("official_price")?,
        land_area: row.try_get("land_area")?,
        land_use: row.try_get("land_use")?,
        building_coverage_ratio: row.try_get("building_coverage_ratio")?,
        floor_area_ratio: row.try_get("floor_area_ratio")?,
        road_direction: row.try_get("road_direction")?,
        road_width: row.try_get("road_width")?,
        nearest_station: row.try_get("nearest_station")?,
        station_distance: row.try_get("station_distance")?,
    })
}
