use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::normalize::halfwidth;
use crate::LandPriceRecord;

/// 町丁目コード（市区町村コード5桁 + 連番6桁の11桁）。
/// マスタが払い出す安定識別子で、このクレートからは書き換えない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChoumeCode(String);

impl ChoumeCode {
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        if code.len() != 11 {
            warn!(%code, "unexpected choume_code length (expected 11 digits)");
        }
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChoumeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoumeEntry {
    pub code: ChoumeCode,
    /// 丁目サフィックスを除いた正準名（例: 三軒茶屋1）
    pub name: String,
}

/// 住所解決の結果。未解決は異常ではなく日常的に起きる（第一級の値として扱う）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoumeMatch {
    Resolved(ChoumeCode),
    Unresolved,
}

impl ChoumeMatch {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ChoumeMatch::Resolved(_))
    }

    pub fn code(self) -> Option<ChoumeCode> {
        match self {
            ChoumeMatch::Resolved(code) => Some(code),
            ChoumeMatch::Unresolved => None,
        }
    }
}

/// 対象市区町村の町丁目マスタ（メモリ常駐の照合テーブル）
#[derive(Debug, Clone, Default)]
pub struct ChoumeMaster {
    entries: Vec<ChoumeEntry>,
}

impl ChoumeMaster {
    pub fn new(entries: Vec<ChoumeEntry>) -> Self {
        Self { entries }
    }

    /// 生の町丁目名リスト（例: areas CSV の「三軒茶屋1丁目」列）からマスタを組む。
    /// 名前順に並べてから連番を振るので、同じ入力からは常に同じコードが出る。
    pub fn from_area_names<I>(city_code: &str, names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut normalized: Vec<String> = names
            .into_iter()
            .map(|name| normalize_choume_name(&name))
            .filter(|name| !name.is_empty())
            .collect();
        normalized.sort();
        normalized.dedup();

        let entries = normalized
            .into_iter()
            .enumerate()
            .map(|(index, name)| ChoumeEntry {
                code: ChoumeCode::new(format!("{city_code}{:06}", index + 1)),
                name,
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ChoumeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 正規化済み住所を前方一致で町丁目コードへ解決する。
    ///
    /// 複数エントリが前方一致する場合は最長一致を採る
    /// （「北烏山10丁目…」が「北烏山1」に吸われないために必須）。
    pub fn resolve(&self, normalized_address: &str) -> ChoumeMatch {
        let mut best: Option<&ChoumeEntry> = None;
        for entry in &self.entries {
            if entry.name.is_empty() || !normalized_address.starts_with(entry.name.as_str()) {
                continue;
            }
            if best.map_or(true, |current| entry.name.len() > current.name.len()) {
                best = Some(entry);
            }
        }

        match best {
            Some(entry) => ChoumeMatch::Resolved(entry.code.clone()),
            None => ChoumeMatch::Unresolved,
        }
    }

    /// バッチ全件の町丁目コードを解決し、未解決件数を返す。
    /// 未解決レコードは choume_code を空のまま残す（破棄しない）。
    pub fn resolve_batch(&self, records: &mut [LandPriceRecord]) -> usize {
        let mut unresolved = 0;
        for record in records.iter_mut() {
            match self.resolve(&record.original_address) {
                ChoumeMatch::Resolved(code) => record.choume_code = Some(code),
                ChoumeMatch::Unresolved => unresolved += 1,
            }
        }
        unresolved
    }
}

/// 「三軒茶屋１丁目」→「三軒茶屋1」（マスタ側の正準名）
pub fn normalize_choume_name(raw: &str) -> String {
    halfwidth(raw).replace("丁目", "").trim().to_string()
}
