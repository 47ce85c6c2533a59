fn main() {
    #[cfg(feature = "cli")]
    oxicalldata::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("oxicalldata: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
