fn main() -> anyhow::Result<()> {
    cadtra_lib::run()
}
