pub mod init;
pub mod test;

use std::process::ExitCode;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Print info logs (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    Init(init::Args),

    #[command(alias("t"))]
    Test(test::Args),
}

/// Exit code of the process on success.
pub type SubcmdResult = anyhow::Result<ExitCode>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Init(args) => init::exec(args, self),
            Test(args) => test::exec(args, self).await,
        }
    }
}

#[cfg(test)]
mod test_args {
    use clap::{CommandFactory, Parser};

    use super::*;

    #[test]
    fn verify_cli() {
        GlobalArgs::command().debug_assert();
    }

    #[test]
    fn parses_test_flags() {
        let args = GlobalArgs::parse_from([
            "jbox", "t", "cases", "--tl-ms", "500", "-j", "2", "--prec", "3", "--no-compile",
            "--json", "-v",
        ]);
        assert!(args.verbose);
        let Subcommand::Test(t) = args.subcmd else {
            panic!("expected test subcommand")
        };
        assert_eq!(t.testcase_dir.as_deref(), Some(std::path::Path::new("cases")));
        assert_eq!(t.time_limit_ms, Some(500));
        assert_eq!(t.jobs, Some(2));
        assert_eq!(t.prec, Some(3));
        assert!(t.no_compile);
        assert!(t.json);
    }
}
