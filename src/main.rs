fn main() {
    if let Err(err) = geninfo::cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
