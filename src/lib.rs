pub mod codes;
pub mod config;
pub mod console;
mod keyring;
pub mod presentation;
pub mod session;
pub mod util; // doctestのためpubにする
pub mod youtube;

use std::path::Path;

use env_logger::Builder;
use log::LevelFilter;

use config::AppConfig;

/// ログ初期化（stderrへ出力。RUST_LOGで上書き可能）
fn init_logging() {
    Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module("level_queue_lib", LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// アプリケーションのエントリポイント
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    log::info!("Level queue v{} starting...", env!("CARGO_PKG_VERSION"));

    // 作業ディレクトリの.env（無ければ無視）
    let config = AppConfig::load(Some(Path::new(".env")))?;
    log::info!(
        "Channel: {}, poll interval: {:?} (server hint: {})",
        config.channel_id,
        config.schedule.interval,
        if config.schedule.honor_server_hint { "honored" } else { "ignored" }
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(console::run(config))?;
    Ok(())
}
