pub mod cmd;
pub mod report;
pub mod util;
