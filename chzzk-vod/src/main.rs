use chzzk_vod::{Args, Logger};
use clap::{ColorChoice, Parser};
use kdam::{term, term::Colorizer};
use requestty::symbols;
use std::{
    io::{IsTerminal, stderr},
    process,
};

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    term::init(match args.color {
        ColorChoice::Always => true,
        ColorChoice::Auto => stderr().is_terminal(),
        ColorChoice::Never => false,
    });
    Logger::init(args.verbose, args.quiet);

    ctrlc::set_handler(|| {
        eprintln!(
            "\n{}: interrupted, partially downloaded files are kept",
            "note".colorize("bold yellow")
        );
        process::exit(130);
    })?;

    args.execute().await
}

#[tokio::main]
async fn main() {
    let mut symbols = symbols::UNICODE;
    symbols.completed = '•';
    symbols.cross = 'x';
    symbols::set(symbols);

    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".colorize("bold red"), e);
        process::exit(1);
    }
}
