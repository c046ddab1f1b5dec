use serde::de::DeserializeOwned;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Syntax of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    Json,
    Yaml,
}

impl DocFormat {
    /// `.yaml` and `.yml` are YAML; every other file is JSON.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                DocFormat::Yaml
            }
            _ => DocFormat::Json,
        }
    }

    fn parse<T: DeserializeOwned>(self, text: &str, origin: &str) -> CliResult<T> {
        match self {
            DocFormat::Json => {
                serde_json::from_str(text).map_err(|e| format!("Bad JSON in {origin}: {e}").into())
            }
            DocFormat::Yaml => {
                serde_yaml::from_str(text).map_err(|e| format!("Bad YAML in {origin}: {e}").into())
            }
        }
    }
}

/// Read and parse a deal, quotes or config file.
pub fn load<T: DeserializeOwned>(path: &str) -> CliResult<T> {
    let p = Path::new(path);
    if !p.is_file() {
        return Err(format!("No such input file: {path}").into());
    }
    let text = fs::read_to_string(p).map_err(|e| format!("Cannot read {path}: {e}"))?;
    DocFormat::for_path(p).parse(&text, path)
}

/// JSON piped on stdin. `None` when stdin is a terminal or carries nothing.
pub fn load_piped<T: DeserializeOwned>() -> CliResult<Option<T>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    DocFormat::Json.parse(&text, "<stdin>").map(Some)
}
