use super::print_loaded_config;
use crate::docker;
use crate::{EventArgs, RunArgs};
use colored::Colorize;
use releaseflow_build::{ImageBuilder, ImagePusher, RegistrySession};
use releaseflow_core::{
    BuildFailure, Pipeline, PipelineError, PublishStatus, RunReport, TriggerEvent, plan,
};
use std::path::Path;

/// リリースを1回実行
///
/// # Returns
/// * `Ok(true)` - 全タグのプッシュに成功、または追跡対象外でスキップ
/// * `Ok(false)` - ビルド失敗、または1つ以上のタグのプッシュに失敗
pub async fn handle(
    event_args: &EventArgs,
    run_args: &RunArgs,
    report_path: Option<&Path>,
    sequential: bool,
) -> anyhow::Result<bool> {
    // Init: タイムスタンプはここで一度だけ取得し、以降は値を渡す
    let timestamp = run_args.timestamp();

    let loaded = run_args.load_config()?;
    let mut config = loaded.config.clone();
    if sequential {
        config.publish.concurrent = false;
    }

    let event = TriggerEvent::from_env(&event_args.overrides()).map_err(PipelineError::from)?;

    println!("{}", "リリースを開始します...".green());
    print_loaded_config(&loaded);

    // Docker接続の前に追跡対象か判定する
    let release_plan = match plan(&config, &event, timestamp) {
        Ok(release_plan) => release_plan,
        Err(e) if e.is_skip() => {
            println!("{} {}。スキップします。", "⏭".yellow(), e);
            return Ok(true);
        }
        Err(e) => return Err(e.into()),
    };

    println!("ブランチ: {}", release_plan.branch.cyan());
    println!("タイムスタンプ: {}", release_plan.timestamp.to_string().cyan());
    println!();
    println!(
        "{}",
        format!("公開するタグ ({} 個):", release_plan.tags.len()).bold()
    );
    for reference in release_plan.references() {
        println!("  • {}", reference.cyan());
    }

    println!();
    println!("{}", "Dockerに接続中...".blue());
    let docker_conn = docker::init_docker_with_error_handling().await?;
    let session = RegistrySession::discover()?;
    if let Some(source) = session.source() {
        tracing::debug!("Using registry credentials from {}", source.display());
    }

    let builder =
        ImageBuilder::new(docker_conn.clone()).with_remove_local(config.publish.remove_local);
    let pusher = ImagePusher::new(docker_conn, session);
    let mut pipeline = Pipeline::new(config, &loaded.project_root, builder, pusher);

    println!();
    println!("{}", "🔨 イメージをビルド中...".green().bold());

    match pipeline.run(&event, timestamp).await {
        Ok(report) => {
            print_summary(&report);
            if let Some(path) = report_path {
                write_report(path, &report)?;
            }
            Ok(report.is_success())
        }
        Err(PipelineError::Build(failure)) => {
            print_build_failure(&failure);
            if let Some(path) = report_path {
                let report = RunReport::build_failed(
                    release_plan.timestamp,
                    release_plan.repository.clone(),
                    release_plan.tags.clone(),
                    failure,
                );
                write_report(path, &report)?;
            }
            Ok(false)
        }
        Err(e) if e.is_skip() => Ok(true),
        Err(e) => Err(e.into()),
    }
}

fn print_summary(report: &RunReport) {
    println!();
    println!("{}", "結果サマリー:".bold());
    for result in &report.results {
        let reference = report.repository.reference(&result.tag);
        match result.status {
            PublishStatus::Success => println!("  {} {}", "✓".green(), reference.cyan()),
            PublishStatus::Failed => eprintln!(
                "  {} {}: {}",
                "✗".red().bold(),
                reference,
                result.error_detail.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    println!();
    if report.is_success() {
        println!(
            "{}",
            "✓ すべてのタグがプッシュされました！".green().bold()
        );
    } else {
        eprintln!(
            "{} プッシュに失敗したタグ: {}",
            "✗".red().bold(),
            report.failed_tags().join(", ")
        );
    }
}

fn print_build_failure(failure: &BuildFailure) {
    eprintln!();
    eprintln!("{} {}", "✗ ビルドエラー:".red().bold(), failure.message);
    if !failure.diagnostic.is_empty() {
        eprintln!();
        eprintln!("{}", "ビルド出力:".yellow());
        eprintln!("{}", failure.diagnostic);
    }
    eprintln!("{}", "プッシュは実行されませんでした。".yellow());
}

fn write_report(path: &Path, report: &RunReport) -> anyhow::Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(report)?)?;
    tracing::info!("Wrote report to {}", path.display());
    Ok(())
}
