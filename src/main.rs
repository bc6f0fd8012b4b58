// Carinata command-line entry point: see `carinata --help`.

fn main() {
    carinata::cli::run();
}
