fn main() {
    if let Err(err) = drawbot::cli::main() {
        eprintln!("❌ Error: {err}");
        std::process::exit(1);
    }
}
