fn main() {
    if let Err(error) = dinoboard_lib::run() {
        eprintln!("dinoboard: {error}");
        std::process::exit(1);
    }
}
