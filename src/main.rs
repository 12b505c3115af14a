fn main() -> anyhow::Result<()> {
    enviro_monitor::run()
}
