use colored::Colorize;

/// Docker接続を初期化（エラーハンドリング付き）
pub async fn init_docker_with_error_handling() -> anyhow::Result<bollard::Docker> {
    let result = match bollard::Docker::connect_with_local_defaults() {
        Ok(docker) => docker.ping().await.map(|_| docker),
        Err(e) => Err(e),
    };

    result.map_err(|e| {
        eprintln!();
        eprintln!("{}", "✗ Docker接続エラー".red().bold());
        eprintln!();
        eprintln!("{}", "原因:".yellow());
        eprintln!("  {}", e);
        eprintln!();
        eprintln!("{}", "解決方法:".yellow());
        eprintln!("  • Dockerが起動しているか確認してください");
        eprintln!("  • DOCKER_HOST の設定を確認してください");
        eprintln!("  • docker ps コマンドが正常に動作するか確認してください");
        anyhow::anyhow!("Docker接続に失敗しました")
    })
}
