pub mod batch;
pub mod lexer;
pub mod pool;
pub mod process;
pub mod shell;
pub mod stopwatch;
pub mod testcase;
pub mod verdict;

#[cfg(test)]
mod testutil;

pub use batch::*;
pub use lexer::*;
pub use pool::*;
pub use process::*;
pub use shell::*;
pub use stopwatch::*;
pub use testcase::*;
pub use verdict::*;
