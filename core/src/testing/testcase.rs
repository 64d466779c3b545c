use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Test {
    pub input: String,
    pub output: String,
}

impl Test {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// Everything a batch is built from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Inputs {
    pub tests: Vec<Test>,
    pub config: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTest {
    pub name: String,
    pub test: Test,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Invalid testcase dir '{0}': {1}")]
    InvalidDir(PathBuf, #[source] glob::PatternError),

    #[error("Cannot read testcase '{0}': {1}")]
    Read(PathBuf, #[source] io::Error),

    #[error("Missing output file '{0}' for testcase '{1}'")]
    MissingOutput(PathBuf, String),

    #[error("No testcase is saved in '{0}'")]
    NoTestcase(PathBuf),
}

/// Returns tuple (input_filename, output_filename).
///
/// ```
/// use judgebox_core::testing::testcase_filename;
///
/// let (infile, outfile) = testcase_filename("sample1");
/// assert_eq!(infile, "in_sample1.txt");
/// assert_eq!(outfile, "out_sample1.txt");
/// ```
pub fn testcase_filename(name: &str) -> (String, String) {
    (format!("in_{}.txt", name), format!("out_{}.txt", name))
}

fn testcase_name(input_file: &Path) -> Option<&str> {
    input_file
        .file_name()?
        .to_str()?
        .strip_prefix("in_")?
        .strip_suffix(".txt")
        .filter(|name| !name.is_empty())
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|e| LoadError::Read(path.to_owned(), e))
}

/// Finds every `in_<name>.txt` / `out_<name>.txt` pair in `dir`, sorted by name.
pub fn enumerate(dir: impl AsRef<Path>) -> Result<Vec<NamedTest>, LoadError> {
    let dir = dir.as_ref();
    let pattern = glob::Pattern::escape(&dir.to_string_lossy()) + "/in_*.txt";
    let entries =
        glob::glob(&pattern).map_err(|e| LoadError::InvalidDir(dir.to_owned(), e))?;

    let mut res = Vec::new();
    for entry in entries {
        let input_path = match entry {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !input_path.is_file() {
            continue;
        }
        let Some(name) = testcase_name(&input_path) else {
            continue
        };
        let (_, outfile) = testcase_filename(name);
        let output_path = dir.join(outfile);
        if !output_path.is_file() {
            return Err(LoadError::MissingOutput(output_path, name.to_owned()));
        }
        res.push(NamedTest {
            name: name.to_owned(),
            test: Test::new(read_file(&input_path)?, read_file(&output_path)?),
        });
    }
    res.sort_by(|a, b| a.name.cmp(&b.name));
    log::debug!("Found {} testcases in {}", res.len(), dir.to_string_lossy());
    Ok(res)
}

/// Loads testcases of `dir` into [`Inputs`]; also returns the testcase names in test-id order.
pub fn load_inputs(
    dir: impl AsRef<Path>,
    config: HashMap<String, String>,
) -> Result<(Vec<String>, Inputs), LoadError> {
    let dir = dir.as_ref();
    let named = enumerate(dir)?;
    if named.is_empty() {
        return Err(LoadError::NoTestcase(dir.to_owned()));
    }
    let (names, tests) = named.into_iter().map(|t| (t.name, t.test)).unzip();
    Ok((names, Inputs { tests, config }))
}
