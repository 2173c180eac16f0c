//! チャット本文からレベルコード（6〜10桁の数字）を抽出し、重複を除いて通知する

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

// 前後がASCII単語境界の6〜10桁。11桁以上の連続数字は部分一致しない
// 境界はASCII基準なので、日本語などの非ASCII文字に隣接していてもコードとして扱う
static LEVEL_CODE_RE: OnceLock<Regex> = OnceLock::new();

fn level_code_regex() -> &'static Regex {
    LEVEL_CODE_RE.get_or_init(|| {
        Regex::new(r"(?-u:\b)[0-9]{6,10}(?-u:\b)").expect("Failed to compile level code regex")
    })
}

/// テキスト中のレベルコードを出現順に返す（重複を含む）
pub fn find_level_codes(text: &str) -> impl Iterator<Item = &str> + '_ {
    level_code_regex().find_iter(text).map(|m| m.as_str())
}

/// 既出コードを記憶し、初出のコードだけを返す抽出器
///
/// 既出集合は追加のみで、1回の接続の間は削除しない。
#[derive(Debug, Default)]
pub struct LevelCodeExtractor {
    seen: HashSet<String>,
}

impl LevelCodeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// メッセージ本文を走査し、初めて見たコードを出現順に返す
    pub fn ingest(&mut self, text: &str) -> Vec<String> {
        let mut fresh = Vec::new();
        for code in find_level_codes(text) {
            if self.seen.insert(code.to_string()) {
                fresh.push(code.to_string());
            }
        }
        fresh
    }

    pub fn has_seen(&self, code: &str) -> bool {
        self.seen.contains(code)
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
