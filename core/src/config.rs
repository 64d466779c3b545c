use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::Context as _;
use rust_embed::RustEmbed;
use serde::Deserialize;

use crate::error::Result;
use crate::testing::TestCommand;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    #[serde(default)]
    pub test: TestConfig,
    /// Judge options passed to the batch as `Inputs::config` (e.g. `prec`).
    #[serde(default)]
    pub judge: HashMap<String, toml::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub shell: PathBuf,
    pub compile: Option<String>,
    pub run: String,
    /// 0 disables the time limit.
    pub time_limit_ms: u64,
    pub jobs: usize,
    pub testcase_dir: PathBuf,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            shell: "/bin/sh".into(),
            compile: None,
            run: "./a.out".into(),
            time_limit_ms: 2000,
            jobs: 4,
            testcase_dir: "./testcase".into(),
        }
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

impl Config {
    pub const FILENAME: &str = "judgebox.toml";

    pub fn example_toml() -> String {
        let file = Asset::get(Self::FILENAME).expect("example config is embedded");
        String::from_utf8_lossy(file.data.as_ref()).into_owned()
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> Result<Self> {
        let toml = std::fs::read_to_string(&filepath)
            .with_context(|| format!("Cannot read config file {:?}", filepath))?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }

    /// Loads the nearest config file, or the defaults when there is none.
    pub fn from_file_finding_in_ancestors_or_default(
        cur_dir: impl AsRef<Path>,
    ) -> Result<Self> {
        match Self::find_file_in_ancestors(cur_dir) {
            Some(path) => {
                log::info!("Using config {:?}", path);
                Self::from_toml_file(path)
            }
            None => {
                log::info!("No {} found, using defaults", Self::FILENAME);
                Ok(Self::default())
            }
        }
    }

    /// Judge options as plain strings; non-string TOML values are written in TOML syntax.
    pub fn judge_options(&self) -> HashMap<String, String> {
        self.judge
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect()
    }
}

impl TestConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    pub fn test_command(&self) -> TestCommand {
        TestCommand {
            compile: self.compile.clone(),
            run: self.run.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn example_toml_should_be_parsable() {
        let toml = Config::example_toml();
        let cfg = dbg!(Config::from_toml(&toml)).unwrap();

        let Config {
            source_config_file,
            test,
            judge: _,
        } = cfg.clone();

        assert_eq!(source_config_file, None);
        assert_eq!(test.shell, Path::new("/bin/sh"));
        assert_eq!(test.compile.as_deref(), Some("g++ -O2 -o ./a.out main.cpp"));
        assert_eq!(test.run, "./a.out");
        assert_eq!(test.time_limit(), Duration::from_secs(2));
        assert_eq!(test.jobs, 4);
        assert_eq!(test.testcase_dir, Path::new("./testcase"));
        assert_eq!(cfg.judge_options().get("prec").map(String::as_str), Some("6"));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg = Config::from_toml("[test]\nrun = 'python3 main.py'\n").unwrap();
        assert_eq!(cfg.test.run, "python3 main.py");
        assert_eq!(cfg.test.shell, TestConfig::default().shell);
        assert_eq!(cfg.test.time_limit_ms, 2000);
        assert!(cfg.judge.is_empty());

        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn judge_options_are_stringified() {
        let cfg = Config::from_toml("[judge]\nprec = 9\nmode = 'strict'\n").unwrap();
        let opts = cfg.judge_options();
        assert_eq!(opts["prec"], "9");
        assert_eq!(opts["mode"], "strict");
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(Config::from_toml("[test]\njobs = 'many'\n").is_err());
    }
}
