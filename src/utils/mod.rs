//! The `utils` module provides the pieces shared by every other module:
//! the error taxonomy and logging setup.

pub mod error;
pub mod logging;

#[cfg(test)]
mod tests;
