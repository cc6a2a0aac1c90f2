mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

#[cfg(test)]
mod test_support;

pub use app::{build_state, run};
