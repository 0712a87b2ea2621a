use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReleaseError {
    #[error("no source release defined for survey year {0}")]
    NotDefined(i32),
}

/// 配布ファイルのエンコーディング。
/// 2017年以前は Shapefile（属性は .dbf サイドカー、Shift_JIS）、
/// 2018年以降は GeoJSON（UTF-8）で読む。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Shapefile,
    GeoJson,
}

/// 1調査年分の配布ファイルの所在。
///
/// 配布レイアウトは年によってまちまち（GML サブディレクトリの有無、
/// ファイル名の形、Shapefile 側に属性が入っていない年）なので、
/// 推測せず年ごとの表として持つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRelease {
    pub year: i32,
    pub format: SourceFormat,
    relative: PathBuf,
}

impl SourceRelease {
    /// 調査年の配布ファイル定義を返す。定義外の年は `NotDefined`。
    pub fn for_year(year: i32, pref_code: &str) -> Result<Self, ReleaseError> {
        let yy = year % 100;
        let (format, relative) = match year {
            2000..=2011 => (
                SourceFormat::Shapefile,
                format!("{year}_{pref_code}/L01-{yy:02}_{pref_code}-g_LandPrice.shp"),
            ),
            2012..=2014 | 2016..=2017 => (
                SourceFormat::Shapefile,
                format!("{year}_{pref_code}/L01-{yy:02}_{pref_code}.shp"),
            ),
            2015 => (
                SourceFormat::Shapefile,
                format!("{year}_{pref_code}/L01-{yy:02}_{pref_code}_GML/L01-{yy:02}_{pref_code}.shp"),
            ),
            // 2019・2022年は Shapefile 側に属性が収録されていないため GeoJSON 直置きを読む
            2019 | 2022 => (
                SourceFormat::GeoJson,
                format!("{year}_{pref_code}/L01-{yy:02}_{pref_code}.geojson"),
            ),
            2018 | 2020..=2021 | 2023..=2025 => (
                SourceFormat::GeoJson,
                format!("{year}_{pref_code}/L01-{yy:02}_{pref_code}_GML/L01-{yy:02}_{pref_code}.geojson"),
            ),
            other => return Err(ReleaseError::NotDefined(other)),
        };

        Ok(Self {
            year,
            format,
            relative: PathBuf::from(relative),
        })
    }

    /// データディレクトリ直下の実パスへ解決する
    pub fn resolve(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.relative)
    }
}
