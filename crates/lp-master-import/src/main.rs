use std::fs::File;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use dotenvy::dotenv;
use lp_common::choume::ChoumeMaster;
use lp_common::db::{
    create_pool_from_url, run_migrations, upsert_master, DbPoolError, MasterStoreError,
    MigrationError,
};
use lp_common::logging;
use tracing::info;

/// areas CSV（町丁目名の一覧）から町丁目マスタを組み立てて投入する。
///
/// choume_code は名前順の連番から決定的に払い出すため、
/// 同じ CSV からは何度流しても同じマスタになる。
#[derive(Debug, Parser)]
#[command(name = "lp-master-import", about = "Load the choume master table from an areas CSV")]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// areas CSV のパス（`choume` 列に「三軒茶屋1丁目」形式の名前を持つ）
    #[arg(long, env = "LP_AREAS_CSV")]
    csv: PathBuf,

    /// 対象市区町村コード（5桁、choume_code の上位桁になる）
    #[arg(long, env = "LP_CITY_CODE", default_value = "13112")]
    city_code: String,

    /// 起動時にスキーマ・マイグレーションを適用する
    #[arg(long, default_value_t = false)]
    init_schema: bool,
}

#[derive(Debug, thiserror::Error)]
enum MasterImportError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse areas csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("areas csv has no `{0}` column")]
    MissingColumn(&'static str),
    #[error(transparent)]
    Pool(#[from] DbPoolError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Store(#[from] MasterStoreError),
}

const CHOUME_COLUMN: &str = "choume";

/// CSV の `choume` 列から町丁目名を列挙する（空行は読み飛ばす）
fn read_area_names<R: io::Read>(reader: R) -> Result<Vec<String>, MasterImportError> {
    let mut csv_reader = csv::Reader::from_reader(reader);

    let column = csv_reader
        .headers()?
        .iter()
        .position(|h| h.trim() == CHOUME_COLUMN)
        .ok_or(MasterImportError::MissingColumn(CHOUME_COLUMN))?;

    let mut names = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        if let Some(name) = row.get(column) {
            if !name.trim().is_empty() {
                names.push(name.trim().to_string());
            }
        }
    }
    Ok(names)
}

async fn run() -> Result<(), MasterImportError> {
    dotenv().ok();
    logging::init_tracing_subscriber("lp-master-import");
    logging::install_tracing_panic_hook("lp-master-import");

    let cli = Cli::parse();

    let file = File::open(&cli.csv).map_err(|source| MasterImportError::Io {
        path: cli.csv.display().to_string(),
        source,
    })?;
    let names = read_area_names(file)?;
    let master = ChoumeMaster::from_area_names(&cli.city_code, names);
    info!(
        csv = %cli.csv.display(),
        city_code = %cli.city_code,
        entries = master.len(),
        "built choume master from areas csv"
    );

    let pool = create_pool_from_url(&cli.database_url)?;
    if cli.init_schema {
        run_migrations(&pool).await?;
    }

    let written = upsert_master(&pool, &cli.city_code, &master).await?;
    info!(written, "choume master upserted");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(error = %err, "lp-master-import failed");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_the_choume_column_by_header() {
        let csv = "area_id,choume,station\n1,三軒茶屋1丁目,三軒茶屋\n2,三軒茶屋2丁目,三軒茶屋\n3,,\n";
        let names = read_area_names(csv.as_bytes()).expect("valid csv");
        assert_eq!(names, vec!["三軒茶屋1丁目", "三軒茶屋2丁目"]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let csv = "area_id,name\n1,三軒茶屋\n";
        let err = read_area_names(csv.as_bytes()).expect_err("no choume column");
        assert!(matches!(err, MasterImportError::MissingColumn(_)));
    }

    #[test]
    fn names_flow_into_a_deterministic_master() {
        let csv = "choume\n上用賀６丁目\n上用賀6丁目\n桜丘１丁目\n";
        let names = read_area_names(csv.as_bytes()).expect("valid csv");
        let master = ChoumeMaster::from_area_names("13112", names);
        assert_eq!(master.len(), 2, "表記ゆれは正規化後に重複排除される");
    }
}
