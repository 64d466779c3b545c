pub mod error {
    pub use anyhow::{Error, Result};
}

pub mod config;
pub mod style;
pub mod testing;

pub use crate::config::Config;
