use marea::cli;

fn main() {
    tracing_subscriber::fmt::init();
    if let Err(e) = cli::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
