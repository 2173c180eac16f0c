fn main() {
    // プロジェクトルートの.envを読み込み、YOUTUBE_API_KEYをoption_env!で参照できるようにする
    let env_path = std::path::Path::new(".env");
    if env_path.exists() {
        if let Ok(iter) = dotenvy::from_path_iter(env_path) {
            for (key, value) in iter.flatten() {
                if key == "YOUTUBE_API_KEY" {
                    println!("cargo:rustc-env=YOUTUBE_API_KEY={}", value);
                }
            }
        }
        // .envが変わったら再ビルド
        println!("cargo:rerun-if-changed=.env");
    }
    println!("cargo:rerun-if-env-changed=YOUTUBE_API_KEY");
}
