use std::path::PathBuf;

use causal_engine::course::Course;
use tracing::info;

use crate::{
    command::learn::screens::HomeScreen,
    tui::{self, ScreenStack},
    util,
};

mod keymap;
mod screens;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct LearnArg {
    /// Write logs to this file; the terminal UI owns stdout and stderr
    #[clap(long)]
    log_file: Option<PathBuf>,
}

pub(crate) fn run(arg: &LearnArg) -> anyhow::Result<()> {
    let LearnArg { log_file } = arg;
    if let Some(path) = log_file {
        util::init_tracing_to_file(path)?;
    }

    let mut course = Course::new();
    let stack = ScreenStack::new(Box::new(HomeScreen::new()));
    tui::run(stack, &mut course)?;

    let completed = course
        .summaries()
        .iter()
        .filter(|summary| summary.step.is_some() && summary.step == summary.terminal_step)
        .count();
    info!(completed, "left the course");
    Ok(())
}
