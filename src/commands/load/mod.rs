mod games;
mod linescores;
mod locate;
mod run;
mod runners;
mod sink;
#[cfg(test)]
mod tests;

pub use run::run;
pub(crate) use run::{execute, resolve_database_url};

pub(crate) use games::*;
pub(crate) use linescores::*;
pub(crate) use locate::*;
pub(crate) use runners::*;
pub(crate) use sink::*;
