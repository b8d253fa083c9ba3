fn main() {
    if let Err(e) = zeitindex_stats_lib::run() {
        eprintln!("zeitindex-stats: {}", e);
        std::process::exit(1);
    }
}
