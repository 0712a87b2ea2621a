pub mod choume;
pub mod db;
pub mod extract;
pub mod feature;
pub mod logging;
pub mod mapping;
pub mod normalize;
pub mod release;
pub mod run;
pub mod run_id;
pub mod schema;

use serde::{Deserialize, Serialize};

use choume::ChoumeCode;

/// 全レコード共通の data_source 値（国土数値情報 地価公示）
pub const DATA_SOURCE_KOKUDO: &str = "地価公示";

/// インポート対象の市区町村。実行ごとに明示的に渡す
/// （プロセス全体の既定値は持たない。別区向けの実行を並べても互いに汚染しない）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCity {
    /// 市区町村コード（5桁、例: 世田谷区 = "13112"）
    pub code: String,
    /// 住所文字列から接頭辞として除去される市区町村名
    pub name: String,
}

impl TargetCity {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// 地価公示1地点・1調査年分の統一レコード。
///
/// 同一キー (survey_year, original_address) での再インポートは
/// upsert で既存行を上書きする（重複行は作らない）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandPriceRecord {
    pub survey_year: i32,
    /// 正規化済み住所（ストレージの一意キーの片割れ）
    pub original_address: String,
    /// マスタ解決済みの町丁目コード。未解決なら None のまま保存する
    pub choume_code: Option<ChoumeCode>,
    /// 公示価格（円/㎡）
    pub official_price: i32,
    pub land_area: Option<i32>,
    pub land_use: Option<String>,
    pub building_coverage_ratio: Option<i32>,
    pub floor_area_ratio: Option<i32>,
    pub road_direction: Option<String>,
    pub road_width: Option<f64>,
    pub nearest_station: Option<String>,
    pub station_distance: Option<i32>,
}
