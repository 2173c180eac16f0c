fn main() {
    if let Err(e) = level_queue_lib::run() {
        eprintln!("level-queue: {}", e);
        std::process::exit(1);
    }
}
