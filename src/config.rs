// =============================================================================
// 設定モジュール
// =============================================================================
// 環境変数（および作業ディレクトリの.env）から実行時設定を読み込む
//
// 環境変数:
// - LEVEL_QUEUE_CHANNEL_ID          配信チャンネルID（必須）
// - LEVEL_QUEUE_API_KEY             YouTube Data APIキー（任意、keyring/同梱キーにフォールバック）
// - LEVEL_QUEUE_POLL_INTERVAL_SECS  ポーリング間隔（秒、デフォルト20）
// - LEVEL_QUEUE_HONOR_SERVER_INTERVAL  pollingIntervalMillisを尊重するか（デフォルトfalse）
// - LEVEL_QUEUE_API_BASE            APIベースURL（テスト・プロキシ用）
// =============================================================================

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::youtube::client::DEFAULT_API_BASE;

/// HTTPリクエストのデフォルトタイムアウト（秒）
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// チャット取得のデフォルト間隔（秒）
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 20;

/// サーバー推奨間隔を使う場合の下限（ミリ秒）
pub const MIN_SERVER_INTERVAL_MILLIS: u64 = 5000;

pub const ENV_CHANNEL_ID: &str = "LEVEL_QUEUE_CHANNEL_ID";
pub const ENV_API_KEY: &str = "LEVEL_QUEUE_API_KEY";
pub const ENV_POLL_INTERVAL_SECS: &str = "LEVEL_QUEUE_POLL_INTERVAL_SECS";
pub const ENV_HONOR_SERVER_INTERVAL: &str = "LEVEL_QUEUE_HONOR_SERVER_INTERVAL";
pub const ENV_API_BASE: &str = "LEVEL_QUEUE_API_BASE";

/// HTTPクライアント構築時に使うタイムアウト
pub fn http_timeout() -> Duration {
    Duration::from_secs(HTTP_TIMEOUT_SECS)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("Failed to read {path}: {message}")]
    EnvFile { path: String, message: String },
}

/// ポーリング間隔のポリシー
///
/// デフォルトは固定間隔。`honor_server_hint`が有効な場合のみ
/// レスポンスの`pollingIntervalMillis`を使う（下限5秒）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub honor_server_hint: bool,
}

impl PollSchedule {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            honor_server_hint: false,
        }
    }

    /// 次のポーリングまでの待機時間
    pub fn delay_for(&self, server_hint_millis: u64) -> Duration {
        if self.honor_server_hint && server_hint_millis > 0 {
            Duration::from_millis(server_hint_millis.max(MIN_SERVER_INTERVAL_MILLIS))
        } else {
            self.interval
        }
    }
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS))
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub channel_id: String,
    /// 環境変数で指定されたAPIキー（未指定ならkeyring/同梱キーを使う）
    pub api_key: Option<String>,
    pub api_base: String,
    pub schedule: PollSchedule,
}

impl AppConfig {
    /// プロセス環境変数と`.env`から設定を読み込む
    ///
    /// プロセス環境変数が`.env`より優先される。`.env`が存在しなければ無視する。
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_vars = match env_file {
            Some(path) if path.exists() => read_env_file(path)?,
            _ => HashMap::new(),
        };

        Self::from_lookup(|name| {
            std::env::var(name)
                .ok()
                .or_else(|| file_vars.get(name).cloned())
        })
    }

    /// 任意のルックアップ関数から設定を構築
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let channel_id = non_empty(ENV_CHANNEL_ID).ok_or(ConfigError::Missing(ENV_CHANNEL_ID))?;
        let api_key = non_empty(ENV_API_KEY);
        let api_base = non_empty(ENV_API_BASE)
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let interval = match non_empty(ENV_POLL_INTERVAL_SECS) {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: ENV_POLL_INTERVAL_SECS,
                        value,
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        };

        let honor_server_hint = match non_empty(ENV_HONOR_SERVER_INTERVAL) {
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                name: ENV_HONOR_SERVER_INTERVAL,
                value,
            })?,
            None => false,
        };

        Ok(Self {
            channel_id,
            api_key,
            api_base,
            schedule: PollSchedule {
                interval,
                honor_server_hint,
            },
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `.env`をプロセス環境に反映せずに読み込む
fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let to_error = |e: dotenvy::Error| ConfigError::EnvFile {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    dotenvy::from_path_iter(path)
        .map_err(to_error)?
        .map(|item| item.map_err(to_error))
        .collect()
}
