//! 手動入力された動画URL/IDから動画IDを取り出す

/// 動画IDを抽出する
///
/// - `v=` を含む場合: 最初の`v=`以降、次の`&`まで
/// - `youtu.be/` を含む場合: マーカー以降、次の`?`まで
/// - どちらも無い場合: 入力をそのまま動画IDとみなす
///
/// `v=`の判定が先。両方を含む入力では`v=`側が採用される。
pub fn extract_video_id(raw: &str) -> String {
    if let Some((_, rest)) = raw.split_once("v=") {
        return rest.split('&').next().unwrap_or(rest).to_string();
    }

    if let Some((_, rest)) = raw.split_once("youtu.be/") {
        return rest.split('?').next().unwrap_or(rest).to_string();
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=AbCdEfG"),
            "AbCdEfG"
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=AbCdEfG&t=42s&list=PL1"),
            "AbCdEfG"
        );
        // クエリの途中にあってもよい
        assert_eq!(
            extract_video_id("youtube.com/watch?feature=share&v=XYZ&ab_channel=foo"),
            "XYZ"
        );
    }

    #[test]
    fn test_short_url() {
        assert_eq!(extract_video_id("https://youtu.be/AbCdEfG?feature=share"), "AbCdEfG");
        assert_eq!(extract_video_id("youtu.be/AbCdEfG"), "AbCdEfG");
    }

    #[test]
    fn test_bare_id_is_returned_unchanged() {
        assert_eq!(extract_video_id("AbCdEfG"), "AbCdEfG");
        assert_eq!(
            extract_video_id("https://www.youtube.com/live/AbCdEfG"),
            "https://www.youtube.com/live/AbCdEfG"
        );
        assert_eq!(extract_video_id(""), "");
    }

    #[test]
    fn test_watch_marker_wins_over_short_url() {
        assert_eq!(extract_video_id("https://youtu.be/Short?v=Long&x=1"), "Long");
    }

    #[test]
    fn test_empty_after_marker() {
        // 全域関数：空IDになっても失敗しない（後段の動画検索でInvalid Video IDになる）
        assert_eq!(extract_video_id("watch?v=&t=1"), "");
        assert_eq!(extract_video_id("youtu.be/"), "");
    }
}
