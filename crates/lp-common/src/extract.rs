use thiserror::Error;

use crate::feature::{Feature, FeatureCollection};
use crate::mapping::FieldMapping;
use crate::normalize::normalize_address;
use crate::{LandPriceRecord, TargetCity};

/// 用途地域の語彙。ここに無い値はノイズとして捨てる（NULL 保存）。
const LAND_USE_VOCAB: &[&str] = &[
    "1低専", "2低専", "1中専", "2中専", "1住居", "2住居", "準住居", "近商", "商業", "準工",
    "工業", "工専",
];

/// GeoJSON 化されたリリースは全セルが文字列で、欠損がこれらの値で埋まっている
const MISSING_SENTINELS: &[&str] = &["", "_", "false", "None"];

/// 必須項目（住所・価格）を欠いた地点。バッチは止めず、報告して読み飛ばす
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("feature {index}: address is missing or blank")]
    MissingAddress { index: usize },
    #[error("feature {index}: price is missing")]
    MissingPrice { index: usize },
    #[error("feature {index}: price {raw:?} is not a number")]
    InvalidPrice { index: usize, raw: String },
}

/// 1調査年分のコレクションから対象市区町村のレコードを遅延抽出する。
///
/// - 市区町村コードが一致しない地点は黙って読み飛ばす
///   （都県全域ファイルなので大半は対象外。エラーではない）
/// - 任意項目の欠損は None。0 で埋めない
pub fn extract_records<'a>(
    collection: &'a FeatureCollection,
    mapping: &'static FieldMapping,
    year: i32,
    target: &'a TargetCity,
) -> impl Iterator<Item = Result<LandPriceRecord, MalformedRecord>> + 'a {
    collection.iter().enumerate().filter_map(move |(index, feature)| {
        if feature.get(mapping.city_code) != Some(target.code.as_str()) {
            return None;
        }
        Some(extract_one(feature, mapping, year, target, index))
    })
}

fn extract_one(
    feature: &Feature,
    mapping: &'static FieldMapping,
    year: i32,
    target: &TargetCity,
    index: usize,
) -> Result<LandPriceRecord, MalformedRecord> {
    let raw_address = match feature.get(mapping.address) {
        Some(addr) if is_meaningful(addr) => addr,
        _ => return Err(MalformedRecord::MissingAddress { index }),
    };
    let original_address = normalize_address(raw_address, &target.name);
    if original_address.is_empty() {
        return Err(MalformedRecord::MissingAddress { index });
    }

    let official_price = match feature.get(mapping.price) {
        None => return Err(MalformedRecord::MissingPrice { index }),
        Some(raw) => parse_price(raw).ok_or_else(|| MalformedRecord::InvalidPrice {
            index,
            raw: raw.to_string(),
        })?,
    };

    let mut record = LandPriceRecord {
        survey_year: year,
        original_address,
        official_price,
        land_area: feature.get(mapping.land_area).and_then(parse_optional_i32),
        ..LandPriceRecord::default()
    };

    if let Some(ext) = &mapping.extended {
        record.road_direction = feature.get(ext.road_direction).and_then(parse_optional_text);
        record.road_width = feature.get(ext.road_width).and_then(parse_optional_f64);
        record.nearest_station = feature.get(ext.nearest_station).and_then(parse_optional_text);
        record.station_distance = feature
            .get(ext.station_distance)
            .and_then(parse_optional_i32_nonzero);
        record.land_use = feature.get(ext.land_use).and_then(parse_land_use);
        record.building_coverage_ratio = feature
            .get(ext.building_coverage)
            .and_then(parse_optional_i32_nonzero);
        record.floor_area_ratio = feature
            .get(ext.floor_area_ratio)
            .and_then(parse_optional_i32_nonzero);
    }

    Ok(record)
}

fn is_meaningful(raw: &str) -> bool {
    !MISSING_SENTINELS.contains(&raw.trim())
}

/// 公示価格（円/㎡）のパース。
/// 一部リリースは価格を100円単位で収録しているため、1万円/㎡未満は桁を揃える。
fn parse_price(raw: &str) -> Option<i32> {
    if !is_meaningful(raw) {
        return None;
    }
    let value = raw.trim().parse::<f64>().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }

    let mut price = value as i64;
    if price < 10_000 {
        price *= 100;
    }
    i32::try_from(price).ok()
}

fn parse_optional_text(raw: &str) -> Option<String> {
    is_meaningful(raw).then(|| raw.trim().to_string())
}

fn parse_optional_i32(raw: &str) -> Option<i32> {
    if !is_meaningful(raw) {
        return None;
    }
    let value = raw.trim().parse::<f64>().ok()?;
    i32::try_from(value as i64).ok()
}

/// 幅員・距離・建蔽率などは 0 が「未調査」の意味で入っている年があるため 0 も欠損扱い
fn parse_optional_i32_nonzero(raw: &str) -> Option<i32> {
    parse_optional_i32(raw).filter(|v| *v != 0)
}

fn parse_optional_f64(raw: &str) -> Option<f64> {
    if !is_meaningful(raw) {
        return None;
    }
    raw.trim().parse::<f64>().ok().filter(|v| *v != 0.0)
}

fn parse_land_use(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    LAND_USE_VOCAB.contains(&trimmed).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setagaya() -> TargetCity {
        TargetCity::new("13112", "世田谷区")
    }

    fn feature_2025(pairs: &[(&str, &str)]) -> Feature {
        Feature::from_attributes(pairs.iter().copied())
    }

    fn collect(
        collection: &FeatureCollection,
        year: i32,
    ) -> (Vec<LandPriceRecord>, Vec<MalformedRecord>) {
        let mapping = FieldMapping::for_year(year).expect("mapping");
        let target = setagaya();
        let mut records = Vec::new();
        let mut malformed = Vec::new();
        for outcome in extract_records(collection, mapping, year, &target) {
            match outcome {
                Ok(record) => records.push(record),
                Err(err) => malformed.push(err),
            }
        }
        (records, malformed)
    }

    #[test]
    fn keeps_only_the_target_municipality() {
        // 2025年リリース: city_code=L01_001, address=L01_025, price=L01_008
        let collection = FeatureCollection::from_features(vec![
            feature_2025(&[
                ("L01_001", "13112"),
                ("L01_025", "三軒茶屋1丁目10番"),
                ("L01_008", "1480000"),
            ]),
            feature_2025(&[
                ("L01_001", "13103"),
                ("L01_025", "上大崎3丁目1番"),
                ("L01_008", "2500000"),
            ]),
        ]);

        let (records, malformed) = collect(&collection, 2025);
        assert_eq!(records.len(), 1);
        assert!(malformed.is_empty());

        let record = &records[0];
        assert_eq!(record.survey_year, 2025);
        assert_eq!(record.original_address, "三軒茶屋1丁目10番");
        assert_eq!(record.official_price, 1_480_000);
    }

    #[test]
    fn missing_mandatory_fields_are_reported_not_fatal() {
        let collection = FeatureCollection::from_features(vec![
            feature_2025(&[("L01_001", "13112"), ("L01_008", "1480000")]),
            feature_2025(&[("L01_001", "13112"), ("L01_025", "豪徳寺1丁目2番")]),
            feature_2025(&[
                ("L01_001", "13112"),
                ("L01_025", "用賀2丁目1番"),
                ("L01_008", "_"),
            ]),
            feature_2025(&[
                ("L01_001", "13112"),
                ("L01_025", "桜丘2丁目5番"),
                ("L01_008", "620000"),
            ]),
        ]);

        let (records, malformed) = collect(&collection, 2025);
        assert_eq!(records.len(), 1, "妥当な1件だけ残る");
        assert_eq!(malformed.len(), 3);
        assert!(matches!(malformed[0], MalformedRecord::MissingAddress { index: 0 }));
        assert!(matches!(malformed[1], MalformedRecord::MissingPrice { index: 1 }));
        assert!(matches!(
            malformed[2],
            MalformedRecord::InvalidPrice { index: 2, .. }
        ));
    }

    #[test]
    fn optional_fields_fall_back_to_none_not_zero() {
        let collection = FeatureCollection::from_features(vec![feature_2025(&[
            ("L01_001", "13112"),
            ("L01_025", "成城6丁目5番"),
            ("L01_008", "980000"),
            ("L01_042", "0"),
            ("L01_050", "_"),
            ("L01_051", "謎の値"),
            ("L01_057", "0"),
        ])]);

        let (records, _) = collect(&collection, 2025);
        let record = &records[0];
        assert_eq!(record.road_width, None, "0 は未調査扱い");
        assert_eq!(record.station_distance, None);
        assert_eq!(record.land_use, None, "語彙外の用途地域は捨てる");
        assert_eq!(record.building_coverage_ratio, None);
    }

    #[test]
    fn extended_attributes_are_extracted_when_mapped() {
        let collection = FeatureCollection::from_features(vec![feature_2025(&[
            ("L01_001", "13112"),
            ("L01_025", "奥沢7丁目2番"),
            ("L01_008", "890000"),
            ("L01_027", "120"),
            ("L01_041", "南"),
            ("L01_042", "5.5"),
            ("L01_048", "自由が丘"),
            ("L01_050", "800"),
            ("L01_051", "1低専"),
            ("L01_057", "50"),
            ("L01_058", "100"),
        ])]);

        let (records, _) = collect(&collection, 2025);
        let record = &records[0];
        assert_eq!(record.land_area, Some(120));
        assert_eq!(record.road_direction.as_deref(), Some("南"));
        assert_eq!(record.road_width, Some(5.5));
        assert_eq!(record.nearest_station.as_deref(), Some("自由が丘"));
        assert_eq!(record.station_distance, Some(800));
        assert_eq!(record.land_use.as_deref(), Some("1低専"));
        assert_eq!(record.building_coverage_ratio, Some(50));
        assert_eq!(record.floor_area_ratio, Some(100));
    }

    #[test]
    fn legacy_mapping_ignores_extended_attributes() {
        // 2005年リリース: city_code=L01_017, address=L01_019, price=L01_006
        let collection = FeatureCollection::from_features(vec![Feature::from_attributes([
            ("L01_017", "13112"),
            ("L01_019", "世田谷区赤堤２丁目１番"),
            ("L01_006", "450000"),
            ("L01_020", "150"),
        ])]);

        let (records, malformed) = collect(&collection, 2005);
        assert!(malformed.is_empty());
        let record = &records[0];
        assert_eq!(record.original_address, "赤堤2丁目1番");
        assert_eq!(record.land_area, Some(150));
        assert_eq!(record.land_use, None);
        assert_eq!(record.road_width, None);
    }

    #[test]
    fn prices_published_in_hundred_yen_units_are_rescaled() {
        assert_eq!(parse_price("5300"), Some(530_000));
        assert_eq!(parse_price("530000"), Some(530_000));
        assert_eq!(parse_price("1480000"), Some(1_480_000));
    }

    #[test]
    fn price_sentinels_and_garbage_are_invalid() {
        for raw in ["", "_", "false", "None", "abc", "-1", "0"] {
            assert_eq!(parse_price(raw), None, "raw: {raw:?}");
        }
    }
}
