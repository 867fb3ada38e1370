pub mod release;
pub mod tags;

use crate::{EventArgs, RunArgs};
use colored::Colorize;
use releaseflow_config::LoadedConfig;
use releaseflow_core::{EventOverrides, RunTimestamp};

impl EventArgs {
    pub fn overrides(&self) -> EventOverrides {
        EventOverrides {
            event: self.event.clone(),
            branch: self.branch.clone(),
            owner: self.owner.clone(),
            repository: self.repository.clone(),
        }
    }
}

impl RunArgs {
    /// 実行タイムスタンプを一度だけ決定する
    pub fn timestamp(&self) -> RunTimestamp {
        self.timestamp
            .map(RunTimestamp::new)
            .unwrap_or_else(RunTimestamp::now)
    }

    pub fn load_config(&self) -> anyhow::Result<LoadedConfig> {
        let cwd = std::env::current_dir()?;
        Ok(releaseflow_config::load(&cwd, self.config.as_deref())?)
    }
}

/// 読み込んだ設定ファイルを表示
pub fn print_loaded_config(loaded: &LoadedConfig) {
    match &loaded.source {
        Some(path) => println!("設定ファイル: {}", path.display().to_string().cyan()),
        None => println!("{}", "設定ファイルなし（デフォルト設定を使用）".dimmed()),
    }
}
