use std::path::PathBuf;

use clap::Parser;
use dotenvy::dotenv;
use lp_common::db::{
    create_pool_from_url, load_master, run_migrations, DbPoolError, MasterStoreError,
    MigrationError,
};
use lp_common::run::{import_years, ImportParams};
use lp_common::{logging, run_id, TargetCity};
use tracing::{info, warn};

/// 国土数値情報（地価公示）の複数年一括インポート。
///
/// 年は独立した作業単位として順に処理し、失敗した年はサマリーに
/// 記録して次の年へ進む。完了済みの年は再実行しても重複しない。
#[derive(Debug, Parser)]
#[command(name = "lp-importer", about = "Multi-year land price import into PostgreSQL")]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// 年度別サブディレクトリを含む生データ置き場
    #[arg(long, env = "LP_DATA_DIR")]
    data_dir: PathBuf,

    /// 都道府県コード（2桁、配布ファイル名の一部）
    #[arg(long, env = "LP_PREF_CODE", default_value = "13")]
    pref_code: String,

    /// 対象市区町村コード（5桁）
    #[arg(long, env = "LP_CITY_CODE", default_value = "13112")]
    city_code: String,

    /// 対象市区町村名（住所正規化で接頭辞として除去される）
    #[arg(long, env = "LP_CITY_NAME", default_value = "世田谷区")]
    city_name: String,

    #[arg(long, env = "LP_FROM_YEAR", default_value_t = 2000)]
    from_year: i32,

    #[arg(long, env = "LP_TO_YEAR", default_value_t = 2025)]
    to_year: i32,

    /// 起動時にスキーマ・マイグレーションを適用する
    #[arg(long, default_value_t = false)]
    init_schema: bool,
}

#[derive(Debug, thiserror::Error)]
enum ImporterError {
    #[error(transparent)]
    Pool(#[from] DbPoolError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Master(#[from] MasterStoreError),
    #[error("no year succeeded; see the run summary above")]
    NothingImported,
}

async fn run() -> Result<(), ImporterError> {
    dotenv().ok();
    logging::init_tracing_subscriber("lp-importer");
    logging::install_tracing_panic_hook("lp-importer");

    let cli = Cli::parse();
    let pool = create_pool_from_url(&cli.database_url)?;

    if cli.init_schema {
        run_migrations(&pool).await?;
    }

    let master = load_master(&pool, &cli.city_code).await?;
    if master.is_empty() {
        warn!(
            city_code = %cli.city_code,
            "choume master is empty; every record will be stored unresolved \
             (run lp-master-import first)"
        );
    }

    info!(
        run_id = run_id::get(),
        from_year = cli.from_year,
        to_year = cli.to_year,
        city_code = %cli.city_code,
        master_entries = master.len(),
        "starting multi-year land price import"
    );

    let params = ImportParams {
        data_dir: cli.data_dir,
        pref_code: cli.pref_code,
        target: TargetCity::new(cli.city_code, cli.city_name),
        from_year: cli.from_year,
        to_year: cli.to_year,
    };
    let summary = import_years(&pool, &master, &params).await;

    let succeeded = summary.succeeded_years();
    let failed = summary.failed_years();
    info!(
        run_id = run_id::get(),
        succeeded_years = succeeded.len(),
        failed_years = failed.len(),
        written = summary.total_written(),
        malformed = summary.total_malformed(),
        unresolved = summary.total_unresolved(),
        "import run finished"
    );
    if !failed.is_empty() {
        // 完了済みの年はそのまま有効。失敗した年だけ原因を除いて再実行すればよい
        warn!(years = ?failed, "these survey years remain as gaps until re-imported");
    }

    if succeeded.is_empty() {
        return Err(ImporterError::NothingImported);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(error = %err, "lp-importer failed");
        std::process::exit(1);
    }
}
