mod cli;
mod config;
mod filter;
mod gestures;
mod input;
mod ipc;
mod logging;
mod sample;
mod trigger;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}
