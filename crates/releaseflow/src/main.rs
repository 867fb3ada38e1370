mod commands;
mod docker;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "releaseflow")]
#[command(about = "タグを導出し、1回のビルドで全タグをレジストリに公開する。", long_about = None)]
struct Cli {
    /// デバッグログを表示
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

/// トリガーイベントの明示指定（省略時は GitHub Actions の環境変数）
#[derive(Args, Debug, Clone)]
pub struct EventArgs {
    /// イベント種別 (push, pull_request)
    #[arg(long)]
    pub event: Option<String>,
    /// 対象ブランチ（PRの場合はマージ先）
    #[arg(short, long)]
    pub branch: Option<String>,
    /// リポジトリのオーナー
    #[arg(long)]
    pub owner: Option<String>,
    /// リポジトリ名
    #[arg(long)]
    pub repository: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// 設定ファイルのパス
    #[arg(short, long, env = "RELEASEFLOW_CONFIG")]
    pub config: Option<PathBuf>,
    /// 実行タイムスタンプ（UNIX秒）。省略時は現在時刻
    #[arg(long, env = "RELEASEFLOW_TIMESTAMP")]
    pub timestamp: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// イメージをビルドし、全タグをプッシュ
    Release {
        #[command(flatten)]
        event: EventArgs,
        #[command(flatten)]
        run: RunArgs,
        /// 実行結果をJSONで書き出すパス
        #[arg(long)]
        report: Option<PathBuf>,
        /// タグごとのプッシュを順番に実行
        #[arg(long)]
        sequential: bool,
    },
    /// 導出されるタグを表示（ビルドしない）
    Tags {
        #[command(flatten)]
        event: EventArgs,
        #[command(flatten)]
        run: RunArgs,
        /// JSONで出力
        #[arg(long)]
        json: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrに出力（stdoutは結果表示用）
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Release {
            event,
            run,
            report,
            sequential,
        } => {
            let success =
                commands::release::handle(&event, &run, report.as_deref(), sequential).await?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Tags { event, run, json } => {
            commands::tags::handle(&event, &run, json)?;
        }
        Commands::Version => {
            println!("releaseflow {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
