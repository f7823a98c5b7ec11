fn main() {
    if let Err(err) = fin_ingest::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
