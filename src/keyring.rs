use keyring::Entry;
use thiserror::Error;

/// サービス名
const SERVICE_NAME: &str = "level-queue";

/// APIキー用のエントリ名
const API_KEY_ENTRY: &str = "youtube_api_key";

#[derive(Debug, Error)]
pub enum KeyringError {
    #[error("Keyring error: {0}")]
    KeyringError(#[from] keyring::Error),
}

/// APIキーをOSのセキュアストレージに保存
///
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: kernel keyutils
pub fn save_api_key(api_key: &str) -> Result<(), KeyringError> {
    let entry = Entry::new(SERVICE_NAME, API_KEY_ENTRY)?;
    entry.set_password(api_key)?;
    log::info!("API key saved to secure storage");
    Ok(())
}

/// APIキーをセキュアストレージから取得（未保存ならNone）
pub fn get_api_key() -> Result<Option<String>, KeyringError> {
    let entry = Entry::new(SERVICE_NAME, API_KEY_ENTRY)?;
    stored_value(entry.get_password())
}

/// APIキーをセキュアストレージから削除
pub fn delete_api_key() -> Result<(), KeyringError> {
    let entry = Entry::new(SERVICE_NAME, API_KEY_ENTRY)?;
    match entry.delete_credential() {
        Ok(()) => {
            log::info!("API key deleted from secure storage");
            Ok(())
        }
        Err(keyring::Error::NoEntry) => {
            log::warn!("Attempted to delete non-existent API key");
            Ok(()) // 既に存在しない場合も成功扱い
        }
        Err(e) => Err(KeyringError::KeyringError(e)),
    }
}

fn stored_value(result: Result<String, keyring::Error>) -> Result<Option<String>, KeyringError> {
    match result {
        Ok(password) => {
            log::debug!("API key retrieved from secure storage");
            Ok(Some(password))
        }
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(KeyringError::KeyringError(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_entry_is_not_an_error() {
        assert!(matches!(stored_value(Err(keyring::Error::NoEntry)), Ok(None)));
    }

    #[test]
    fn test_stored_value() {
        assert_eq!(
            stored_value(Ok("AIzaStored".to_string())).unwrap(),
            Some("AIzaStored".to_string())
        );
    }

    #[test]
    fn test_other_errors_are_propagated() {
        let result = stored_value(Err(keyring::Error::TooLong("user".to_string(), 255)));
        assert!(matches!(result, Err(KeyringError::KeyringError(_))));
    }
}
