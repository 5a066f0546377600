fn main() {
    if let Err(err) = salesboard::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
