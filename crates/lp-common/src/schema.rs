/// chika.land_prices スキーマ定義。
///
/// (survey_year, original_address) の UNIQUE 制約が再インポートの冪等性を支える。
/// 同一キーの再投入は upsert で既存行の属性を上書きする。
pub const LAND_PRICES_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS chika.land_prices (
    id SERIAL PRIMARY KEY,
    choume_code VARCHAR(11),
    survey_year INTEGER NOT NULL,
    official_price INTEGER NOT NULL,
    data_source VARCHAR(50) NOT NULL DEFAULT '地価公示',
    original_address TEXT NOT NULL,
    land_area INTEGER,
    land_use VARCHAR(50),
    building_coverage_ratio INTEGER,
    floor_area_ratio INTEGER,
    road_direction VARCHAR(10),
    road_width DOUBLE PRECISION,
    nearest_station VARCHAR(100),
    station_distance INTEGER,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_land_prices_year_address UNIQUE (survey_year, original_address)
);

CREATE INDEX IF NOT EXISTS idx_land_prices_year ON chika.land_prices(survey_year);
CREATE INDEX IF NOT EXISTS idx_land_prices_choume ON chika.land_prices(choume_code);
"#;

/// 町丁目マスタ。(choume_name → choume_code) の引き当てに使う。
/// land_prices 側から参照されるだけで、インポート処理はここを書き換えない
/// （マスタ投入は lp-master-import が担う）。
pub const CHOUME_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS chika.choume (
    choume_code VARCHAR(11) PRIMARY KEY,
    city_code VARCHAR(5) NOT NULL,
    choume_name TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_choume_city ON chika.choume(city_code);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn land_prices_ddl_contains_identity_and_indexes() {
        for required in [
            "survey_year",
            "original_address",
            "official_price",
            "choume_code",
            "UNIQUE (survey_year, original_address)",
            "idx_land_prices_year",
            "idx_land_prices_choume",
        ] {
            assert!(LAND_PRICES_DDL.contains(required), "missing: {required}");
        }
    }

    #[test]
    fn optional_columns_are_nullable() {
        for column in [
            "land_area INTEGER,",
            "land_use VARCHAR(50),",
            "building_coverage_ratio INTEGER,",
            "road_width DOUBLE PRECISION,",
            "station_distance INTEGER,",
        ] {
            assert!(LAND_PRICES_DDL.contains(column), "missing: {column}");
            assert!(!column.contains("NOT NULL"));
        }
    }

    #[test]
    fn choume_ddl_keys_the_master_by_code() {
        for required in [
            "choume_code VARCHAR(11) PRIMARY KEY",
            "city_code VARCHAR(5) NOT NULL",
            "choume_name TEXT NOT NULL",
            "idx_choume_city",
        ] {
            assert!(CHOUME_DDL.contains(required), "missing: {required}");
        }
    }
}
