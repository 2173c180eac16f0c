//! APIキー解決モジュール
//!
//! キーの優先順位:
//! 1. 設定（環境変数 / .env）で指定されたキー
//! 2. OSのセキュアストレージ（keyring）に保存されたキー
//! 3. ビルド時に同梱されたキー（`YOUTUBE_API_KEY`）

use crate::keyring;
use crate::util::mask_api_key;

/// ビルド時に環境変数から注入される同梱キー
const BUNDLED_KEY: Option<&str> = option_env!("YOUTUBE_API_KEY");

/// 採用されたキーの取得元
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeySource {
    Config,
    Keyring,
    Bundled,
}

/// 有効なAPIキーを解決する
///
/// keyringの読み出し失敗は警告ログのみで次の候補へ進む
pub fn resolve_api_key(configured: Option<&str>) -> Option<(String, ApiKeySource)> {
    // 設定で指定済みならストレージには触れない
    let stored = match configured.filter(|k| is_usable(k)) {
        Some(_) => None,
        None => keyring::get_api_key().unwrap_or_else(|e| {
            log::warn!("Failed to read API key from secure storage: {}", e);
            None
        }),
    };

    let resolved = choose_api_key(configured, stored, BUNDLED_KEY);
    match &resolved {
        Some((key, source)) => log::info!("Using API key {} ({:?})", mask_api_key(key), source),
        None => log::warn!("No API key available"),
    }
    resolved
}

fn choose_api_key(
    configured: Option<&str>,
    stored: Option<String>,
    bundled: Option<&str>,
) -> Option<(String, ApiKeySource)> {
    if let Some(key) = configured.filter(|k| is_usable(k)) {
        return Some((key.trim().to_string(), ApiKeySource::Config));
    }
    if let Some(key) = stored.filter(|k| is_usable(k)) {
        return Some((key.trim().to_string(), ApiKeySource::Keyring));
    }
    bundled
        .filter(|k| is_usable(k))
        .map(|key| (key.trim().to_string(), ApiKeySource::Bundled))
}

fn is_usable(key: &str) -> bool {
    !key.trim().is_empty()
}
