use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// 定義外の年は近隣年のマッピングで代用してはならない
    /// （代用すると別の属性列を価格として読むことになり、黙って壊れる）。
    #[error("no field mapping defined for survey year {0}")]
    NotDefined(i32),
}

/// 2018年以降のリリースにのみ存在する拡張属性のキー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedKeys {
    pub road_direction: &'static str,
    pub road_width: &'static str,
    pub nearest_station: &'static str,
    pub station_distance: &'static str,
    pub land_use: &'static str,
    pub building_coverage: &'static str,
    pub floor_area_ratio: &'static str,
}

/// 調査年レンジごとの属性キー対応表。
///
/// 地価公示データは数年おきに属性の採番が変わる。隣接年で +1〜+5 ずれる年も
/// あり、ずれ幅は規則的でないため、各レンジはサンプルデータと突き合わせて
/// 個別に確定させたものをそのまま持つ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub city_code: &'static str,
    pub city_name: &'static str,
    pub address: &'static str,
    pub price: &'static str,
    pub land_area: &'static str,
    pub extended: Option<ExtendedKeys>,
}

const MAPPING_2000_2011: FieldMapping = FieldMapping {
    city_code: "L01_017",
    city_name: "L01_018",
    address: "L01_019",
    price: "L01_006",
    land_area: "L01_020",
    extended: None,
};

// 2012年リリースで配布形態が変わったが属性採番は据え置かれた。
// 独立に検証したレンジなので 2000-2011 とは別枠で持つ。
const MAPPING_2012_2017: FieldMapping = FieldMapping {
    city_code: "L01_017",
    city_name: "L01_018",
    address: "L01_019",
    price: "L01_006",
    land_area: "L01_020",
    extended: None,
};

const MAPPING_2018_2021: FieldMapping = FieldMapping {
    city_code: "L01_021",
    city_name: "L01_022",
    address: "L01_023",
    price: "L01_006",
    land_area: "L01_024",
    extended: Some(ExtendedKeys {
        road_direction: "L01_037",
        road_width: "L01_038",
        nearest_station: "L01_045",
        station_distance: "L01_046",
        land_use: "L01_047",
        building_coverage: "L01_052",
        floor_area_ratio: "L01_053",
    }),
};

const MAPPING_2022_2023: FieldMapping = FieldMapping {
    city_code: "L01_022",
    city_name: "L01_023",
    address: "L01_024",
    price: "L01_006",
    land_area: "L01_026",
    extended: Some(ExtendedKeys {
        road_direction: "L01_040",
        road_width: "L01_041",
        nearest_station: "L01_048",
        station_distance: "L01_049",
        land_use: "L01_050",
        building_coverage: "L01_056",
        floor_area_ratio: "L01_057",
    }),
};

// 2024年から価格が L01_006 → L01_008 に移動している。
// ここを旧キーのまま読むと前年比データを価格として取り込んでしまう。
const MAPPING_2024_2025: FieldMapping = FieldMapping {
    city_code: "L01_001",
    city_name: "L01_024",
    address: "L01_025",
    price: "L01_008",
    land_area: "L01_027",
    extended: Some(ExtendedKeys {
        road_direction: "L01_041",
        road_width: "L01_042",
        nearest_station: "L01_048",
        station_distance: "L01_050",
        land_use: "L01_051",
        building_coverage: "L01_057",
        floor_area_ratio: "L01_058",
    }),
};

impl FieldMapping {
    /// 調査年に対応するマッピングを返す。定義外の年は `NotDefined`。
    pub fn for_year(year: i32) -> Result<&'static FieldMapping, MappingError> {
        match year {
            2000..=2011 => Ok(&MAPPING_2000_2011),
            2012..=2017 => Ok(&MAPPING_2012_2017),
            2018..=2021 => Ok(&MAPPING_2018_2021),
            2022..=2023 => Ok(&MAPPING_2022_2023),
            2024..=2025 => Ok(&MAPPING_2024_2025),
            other => Err(MappingError::NotDefined(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_year_carries_mandatory_keys() {
        for year in 2000..=2025 {
            let mapping = FieldMapping::for_year(year).expect("supported year");
            assert!(!mapping.address.is_empty(), "address key for {year}");
            assert!(!mapping.price.is_empty(), "price key for {year}");
            assert!(!mapping.city_code.is_empty(), "city_code key for {year}");
        }
    }

    #[test]
    fn years_outside_all_ranges_are_rejected() {
        assert_eq!(FieldMapping::for_year(1999), Err(MappingError::NotDefined(1999)));
        assert_eq!(FieldMapping::for_year(2026), Err(MappingError::NotDefined(2026)));
    }

    #[test]
    fn price_key_moved_in_2024() {
        let y2023 = FieldMapping::for_year(2023).expect("2023");
        let y2024 = FieldMapping::for_year(2024).expect("2024");
        assert_eq!(y2023.price, "L01_006");
        assert_eq!(y2024.price, "L01_008");
    }

    #[test]
    fn attribute_numbering_shifts_between_adjacent_buckets() {
        let y2021 = FieldMapping::for_year(2021).expect("2021");
        let y2022 = FieldMapping::for_year(2022).expect("2022");
        assert_ne!(y2021.address, y2022.address);
        assert_ne!(y2021.land_area, y2022.land_area);
    }

    #[test]
    fn legacy_years_have_no_extended_attributes() {
        assert!(FieldMapping::for_year(2005).expect("2005").extended.is_none());
        assert!(FieldMapping::for_year(2017).expect("2017").extended.is_none());
        assert!(FieldMapping::for_year(2018).expect("2018").extended.is_some());
    }
}
