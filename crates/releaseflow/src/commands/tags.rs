use super::print_loaded_config;
use crate::{EventArgs, RunArgs};
use colored::Colorize;
use releaseflow_core::{PipelineError, TriggerEvent, plan};

/// 導出されるタグを表示（ドライラン）
pub fn handle(event_args: &EventArgs, run_args: &RunArgs, json: bool) -> anyhow::Result<()> {
    let timestamp = run_args.timestamp();
    let loaded = run_args.load_config()?;

    // ドライランではイベント種別を省略できる
    let mut overrides = event_args.overrides();
    if overrides.event.is_none() && std::env::var("GITHUB_EVENT_NAME").is_err() {
        overrides.event = Some("push".to_string());
    }
    let event = TriggerEvent::from_env(&overrides).map_err(PipelineError::from)?;

    match plan(&loaded.config, &event, timestamp) {
        Ok(release_plan) => {
            if json {
                let output = serde_json::json!({
                    "branch": release_plan.branch,
                    "timestamp": release_plan.timestamp,
                    "repository": release_plan.repository.to_string(),
                    "tags": release_plan.tags,
                    "references": release_plan.references(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_loaded_config(&loaded);
                println!("ブランチ: {}", release_plan.branch.cyan());
                println!();
                for reference in release_plan.references() {
                    println!("  • {}", reference.cyan());
                }
            }
            Ok(())
        }
        Err(e) if e.is_skip() => {
            if json {
                println!("{}", serde_json::json!({ "skipped": e.to_string() }));
            } else {
                println!("{} {}", "⏭".yellow(), e);
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
