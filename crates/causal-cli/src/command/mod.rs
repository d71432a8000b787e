use clap::{Parser, Subcommand};

use self::{dataset::DatasetArg, dispatch::DispatchArg, learn::LearnArg};

mod dataset;
mod dispatch;
mod learn;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Take the course in the terminal
    Learn(#[clap(flatten)] LearnArg),
    /// Answer JSON actions from stdin, one per line
    Dispatch(#[clap(flatten)] DispatchArg),
    /// Dump a generated dataset as JSON
    Dataset(#[clap(flatten)] DatasetArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode.unwrap_or(Mode::Learn(LearnArg::default())) {
        Mode::Learn(arg) => learn::run(&arg)?,
        Mode::Dispatch(arg) => dispatch::run(&arg)?,
        Mode::Dataset(arg) => dataset::run(&arg)?,
    }
    Ok(())
}
