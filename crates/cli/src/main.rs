use anyhow::Result;

fn main() -> Result<()> {
    windowsill_cli::run(std::env::args_os())
}
