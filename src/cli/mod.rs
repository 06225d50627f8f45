mod args;
mod run;
mod views;

pub use args::{Args, Command};
pub use run::run;
pub use views::{AnalysisView, Completion, CompletionReceiver, FaqView, InsightView};
