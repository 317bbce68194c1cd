fn main() {
    #[cfg(feature = "cli")]
    voxpack::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("voxpack: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
