pub(crate) mod commands;
pub(crate) mod config;
pub(crate) mod env;
pub(crate) mod install;
pub(crate) mod python;
pub(crate) mod runtime;
pub(crate) mod tooling;

#[cfg(test)]
pub(crate) mod testing;
