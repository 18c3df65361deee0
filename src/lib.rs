pub mod app;
pub mod browser;
pub mod cli;
pub mod config;
pub mod intake;
pub mod loader;
pub mod output;
pub mod selection;
pub mod source;

/// Rows per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 12;

#[cfg(test)]
mod tests;
