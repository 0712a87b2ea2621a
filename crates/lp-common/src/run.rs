use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{error, info, instrument, warn};

use crate::choume::ChoumeMaster;
use crate::db::{land_prices, PgPool};
use crate::extract::{extract_records, MalformedRecord};
use crate::feature::{read_source, FeatureCollection, SourceError};
use crate::mapping::{FieldMapping, MappingError};
use crate::release::{ReleaseError, SourceRelease};
use crate::{LandPriceRecord, TargetCity};

/// 年次インポートの進行段階。失敗はどの段階からでも起こり得る
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStep {
    Pending,
    Extracting,
    Matching,
    Writing,
    Done,
    Failed,
}

impl ImportStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStep::Pending => "pending",
            ImportStep::Extracting => "extracting",
            ImportStep::Matching => "matching",
            ImportStep::Writing => "writing",
            ImportStep::Done => "done",
            ImportStep::Failed => "failed",
        }
    }
}

impl fmt::Display for ImportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum YearImportError {
    #[error(transparent)]
    Release(#[from] ReleaseError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Store(#[from] land_prices::LandPriceStoreError),
}

/// 1年分のインポート失敗。その年のバッチだけが打ち切られたことを表す
#[derive(Debug, thiserror::Error)]
#[error("year {year} failed while {step}: {error}")]
pub struct YearImportFailure {
    pub year: i32,
    pub step: ImportStep,
    #[source]
    pub error: YearImportError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearImportReport {
    pub year: i32,
    pub step: ImportStep,
    pub extracted: usize,
    pub malformed: usize,
    pub unresolved: usize,
    pub written: u64,
    pub error: Option<String>,
}

impl YearImportReport {
    fn failed(failure: &YearImportFailure) -> Self {
        Self {
            year: failure.year,
            step: ImportStep::Failed,
            extracted: 0,
            malformed: 0,
            unresolved: 0,
            written: 0,
            error: Some(failure.to_string()),
        }
    }

    pub fn is_done(&self) -> bool {
        self.step == ImportStep::Done
    }
}

/// 複数年実行のサマリー（オペレータ向け報告の元データ）
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<YearImportReport>,
}

impl RunSummary {
    pub fn succeeded_years(&self) -> Vec<i32> {
        self.reports
            .iter()
            .filter(|r| r.is_done())
            .map(|r| r.year)
            .collect()
    }

    /// 失敗した年 = インポート済みレンジに残る穴。再実行で埋める
    pub fn failed_years(&self) -> Vec<i32> {
        self.reports
            .iter()
            .filter(|r| !r.is_done())
            .map(|r| r.year)
            .collect()
    }

    pub fn total_written(&self) -> u64 {
        self.reports.iter().map(|r| r.written).sum()
    }

    pub fn total_malformed(&self) -> usize {
        self.reports.iter().map(|r| r.malformed).sum()
    }

    pub fn total_unresolved(&self) -> usize {
        self.reports.iter().map(|r| r.unresolved).sum()
    }
}

/// 複数年インポートの実行パラメータ。プロセス全体の設定には依存せず、
/// これ一式を変えるだけで別の市区町村・別DBへの実行を並べられる。
#[derive(Debug, Clone)]
pub struct ImportParams {
    pub data_dir: PathBuf,
    pub pref_code: String,
    pub target: TargetCity,
    pub from_year: i32,
    pub to_year: i32,
}

/// コレクションから対象市区町村のレコードを取り出す（抽出段階の純粋部分）
pub fn extract_batch(
    collection: &FeatureCollection,
    mapping: &'static FieldMapping,
    year: i32,
    target: &TargetCity,
) -> (Vec<LandPriceRecord>, Vec<MalformedRecord>) {
    let mut records = Vec::new();
    let mut malformed = Vec::new();
    for outcome in extract_records(collection, mapping, year, target) {
        match outcome {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!(year, %err, "skipping malformed feature");
                malformed.push(err);
            }
        }
    }
    (records, malformed)
}

/// 1年分のインポートを最後まで実行する。
///
/// pending → extracting → matching → writing → done と進み、
/// 失敗した段階でその年だけを打ち切る（他の年の成否には影響しない）。
#[instrument(skip(pool, master, data_dir), fields(city = %target.code))]
pub async fn import_year(
    pool: &PgPool,
    master: &ChoumeMaster,
    data_dir: &Path,
    pref_code: &str,
    target: &TargetCity,
    year: i32,
) -> Result<YearImportReport, YearImportFailure> {
    let fail = |step: ImportStep| {
        move |error: YearImportError| YearImportFailure { year, step, error }
    };

    info!(year, step = %ImportStep::Pending, "year import queued");

    info!(year, step = %ImportStep::Extracting, "reading source release");
    let release = SourceRelease::for_year(year, pref_code)
        .map_err(|e| fail(ImportStep::Extracting)(e.into()))?;
    let mapping =
        FieldMapping::for_year(year).map_err(|e| fail(ImportStep::Extracting)(e.into()))?;
    let path = release.resolve(data_dir);
    let collection =
        read_source(&path, release.format).map_err(|e| fail(ImportStep::Extracting)(e.into()))?;

    let (mut records, malformed) = extract_batch(&collection, mapping, year, target);
    info!(
        year,
        step = %ImportStep::Matching,
        total_features = collection.len(),
        extracted = records.len(),
        malformed = malformed.len(),
        "resolving choume codes"
    );
    let unresolved = master.resolve_batch(&mut records);

    info!(
        year,
        step = %ImportStep::Writing,
        records = records.len(),
        unresolved,
        "writing year batch"
    );
    let outcome = land_prices::write_year_batch(pool, year, &records)
        .await
        .map_err(|e| fail(ImportStep::Writing)(e.into()))?;

    let report = YearImportReport {
        year,
        step: ImportStep::Done,
        extracted: records.len(),
        malformed: malformed.len(),
        unresolved,
        written: outcome.written,
        error: None,
    };
    info!(
        year,
        step = %ImportStep::Done,
        written = report.written,
        malformed = report.malformed,
        unresolved = report.unresolved,
        "year import done"
    );
    Ok(report)
}

/// 複数年を順に取り込む。年は独立した作業単位で、失敗した年は
/// サマリーに記録して次の年へ進む（全体を中断しない）。
pub async fn import_years(
    pool: &PgPool,
    master: &ChoumeMaster,
    params: &ImportParams,
) -> RunSummary {
    let mut summary = RunSummary::default();

    for year in params.from_year..=params.to_year {
        match import_year(
            pool,
            master,
            &params.data_dir,
            &params.pref_code,
            &params.target,
            year,
        )
        .await
        {
            Ok(report) => summary.reports.push(report),
            Err(failure) => {
                error!(
                    year = failure.year,
                    step = %failure.step,
                    error = %failure.error,
                    "year import failed; continuing with the next year"
                );
                summary.reports.push(YearImportReport::failed(&failure));
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;

    fn setagaya() -> TargetCity {
        TargetCity::new("13112", "世田谷区")
    }

    fn sample_master() -> ChoumeMaster {
        ChoumeMaster::from_area_names(
            "13112",
            ["三軒茶屋1丁目", "三軒茶屋2丁目"].map(String::from),
        )
    }

    #[test]
    fn step_names_follow_the_lifecycle() {
        assert_eq!(ImportStep::Pending.as_str(), "pending");
        assert_eq!(ImportStep::Extracting.as_str(), "extracting");
        assert_eq!(ImportStep::Matching.as_str(), "matching");
        assert_eq!(ImportStep::Writing.as_str(), "writing");
        assert_eq!(ImportStep::Done.as_str(), "done");
        assert_eq!(ImportStep::Failed.as_str(), "failed");
    }

    #[test]
    fn extract_and_match_fill_the_batch() {
        let collection = FeatureCollection::from_features(vec![
            Feature::from_attributes([
                ("L01_001", "13112"),
                ("L01_025", "三軒茶屋1丁目10番"),
                ("L01_008", "1480000"),
            ]),
            Feature::from_attributes([
                ("L01_001", "13112"),
                ("L01_025", "等々力3丁目5番"),
                ("L01_008", "720000"),
            ]),
            Feature::from_attributes([("L01_001", "13112"), ("L01_008", "999999")]),
        ]);
        let mapping = FieldMapping::for_year(2025).expect("mapping");

        let (mut records, malformed) = extract_batch(&collection, mapping, 2025, &setagaya());
        assert_eq!(records.len(), 2);
        assert_eq!(malformed.len(), 1);

        let unresolved = sample_master().resolve_batch(&mut records);
        assert_eq!(unresolved, 1, "等々力はマスタに無い");
        assert!(records[0].choume_code.is_some());
        assert!(records[1].choume_code.is_none(), "未解決でも保持される");
    }

    #[test]
    fn geojson_document_flows_through_extraction_and_matching() {
        let doc = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [139.67, 35.64]},
                    "properties": {
                        "L01_001": "13112",
                        "L01_025": "東京都世田谷区三軒茶屋１丁目１０番",
                        "L01_008": "1480000"
                    }
                },
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [139.72, 35.63]},
                    "properties": {
                        "L01_001": "13103",
                        "L01_025": "東京都品川区上大崎３丁目１番",
                        "L01_008": "2500000"
                    }
                }
            ]
        }"#;

        let collection = crate::feature::parse_geojson(doc.as_bytes()).expect("valid geojson");
        let mapping = FieldMapping::for_year(2025).expect("mapping");
        let (mut records, malformed) = extract_batch(&collection, mapping, 2025, &setagaya());
        let unresolved = sample_master().resolve_batch(&mut records);

        assert!(malformed.is_empty());
        assert_eq!(records.len(), 1, "対象区の1件だけ残る");
        assert_eq!(unresolved, 0);

        let record = &records[0];
        assert_eq!(record.survey_year, 2025);
        assert_eq!(record.original_address, "三軒茶屋1丁目10番");
        assert_eq!(record.official_price, 1_480_000);
        assert!(record.choume_code.is_some());
    }

    #[test]
    fn summary_separates_done_and_failed_years() {
        let mut summary = RunSummary::default();
        summary.reports.push(YearImportReport {
            year: 2023,
            step: ImportStep::Done,
            extracted: 40,
            malformed: 1,
            unresolved: 2,
            written: 40,
            error: None,
        });
        summary.reports.push(YearImportReport::failed(&YearImportFailure {
            year: 2026,
            step: ImportStep::Extracting,
            error: YearImportError::Mapping(MappingError::NotDefined(2026)),
        }));

        assert_eq!(summary.succeeded_years(), vec![2023]);
        assert_eq!(summary.failed_years(), vec![2026]);
        assert_eq!(summary.total_written(), 40);
        assert_eq!(summary.total_malformed(), 1);
        assert_eq!(summary.total_unresolved(), 2);

        let failed = &summary.reports[1];
        assert_eq!(failed.step, ImportStep::Failed);
        assert_eq!(failed.written, 0);
        let message = failed.error.as_deref().expect("failure message");
        assert!(message.contains("2026"));
        assert!(message.contains("extracting"));
    }
}
