// ABOUTME: Command module aggregator for the k8tunnel CLI.
// ABOUTME: Re-exports run and check command handlers.

mod check;
mod run;

pub use check::check;
pub use run::run;
