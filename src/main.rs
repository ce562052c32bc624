fn main() -> Result<(), Box<dyn std::error::Error>> {
    routechat::cli::main()
}
