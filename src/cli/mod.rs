// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, built on the `clap`
// derive macros. All business logic is delegated to Layer 2.
//
// Two commands are supported:
//   1. `train` — builds datasets from a KB and trains the models
//   2. `ask`   — loads a generator checkpoint and answers a question

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{AskArgs, Commands, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "kbqa",
    version = "0.1.0",
    about = "Train knowledge-base question answering models, then ask questions."
)]
pub struct Cli {
    /// The subcommand to run (train or ask)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// The CLI layer only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => Self::run_train(args),
            Commands::Ask(args)   => Self::run_ask(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training from knowledge base: {}", args.kb);

        let use_case = TrainUseCase::new(args.into());
        use_case.execute()?;

        println!("Training complete. Checkpoints saved.");
        Ok(())
    }

    fn run_ask(args: AskArgs) -> Result<()> {
        use crate::application::ask_use_case::AskUseCase;

        let use_case = AskUseCase::new(&args.hparams, &args.checkpoint_dir)?;
        let answer = use_case.answer(&args.question)?;
        println!("\nAnswer: {}", answer);
        Ok(())
    }
}
