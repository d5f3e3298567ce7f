//! The `run` pipeline: live fetch, fallback resolution, snapshot merge.

pub(crate) mod report;
mod resolve;
mod runner;

#[cfg(test)]
pub(crate) mod test_support;

pub(crate) use report::{Resolution, RunReport};
pub(crate) use runner::run_update;
