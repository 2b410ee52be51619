fn main() -> anyhow::Result<()> {
    quiz_cli::cli::main()
}
