// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `ask`
// and all their configurable flags.
//
// clap's derive macros generate help text, missing-argument
// errors and string → enum/path conversion. The From impls below
// are the boundary between Layer 1 and Layer 2 — the application
// layer never sees clap types.

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::{ModelKind, TrainConfig};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train one model family (or all of them) on a knowledge base
    Train(TrainArgs),

    /// Ask a question using a trained generator checkpoint
    Ask(AskArgs),
}

/// Which model a `train` run covers, as spelled on the command line
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ModelArg {
    RelationClassifier,
    ConceptExtractorQuestion,
    ConceptExtractorAnswer,
    AnswerGenerator,
    All,
}

impl From<ModelArg> for ModelKind {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::RelationClassifier       => ModelKind::RelationClassifier,
            ModelArg::ConceptExtractorQuestion => ModelKind::ConceptExtractorQuestion,
            ModelArg::ConceptExtractorAnswer   => ModelKind::ConceptExtractorAnswer,
            ModelArg::AnswerGenerator          => ModelKind::AnswerGenerator,
            ModelArg::All                      => ModelKind::All,
        }
    }
}

/// All arguments for the `train` command
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON hyperparameter file with one section per model
    #[arg(long, default_value = "data/hparams.json")]
    pub hparams: String,

    /// Knowledge base: a JSON array of question/answer records
    #[arg(long, default_value = "data/kb.json")]
    pub kb: String,

    /// Directory for checkpoints and the metrics CSV
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Which model family to train
    #[arg(long, value_enum, default_value_t = ModelArg::All)]
    pub model: ModelArg,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            hparams_path:   a.hparams,
            kb_path:        a.kb,
            checkpoint_dir: a.checkpoint_dir,
            model:          a.model.into(),
        }
    }
}

/// All arguments for the `ask` command
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The natural language question to answer
    #[arg(long)]
    pub question: String,

    /// Hyperparameter file used when the generator was trained
    /// (needed to find the right vocabulary files)
    #[arg(long, default_value = "data/hparams.json")]
    pub hparams: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}
