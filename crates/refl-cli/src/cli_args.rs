//! Command-line surface: `reflectc <input_file> <output_file> [options]`.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "reflectc", version, about = "Reflection extractor for C++-like headers")]
pub struct Args {
    /// Source file to reflect. Ignored when `--list` is given.
    pub input_file: PathBuf,

    /// Default output path for the selected generator.
    pub output_file: PathBuf,

    /// Path to a newline-separated list of files to process instead of `input_file`.
    #[arg(long)]
    pub list: Option<PathBuf>,

    /// Comma-separated identifiers the tokenizer should treat as macro calls, e.g. `API,NOINLINE`.
    #[arg(long)]
    pub macros: Option<String>,

    /// Which generator to run.
    #[arg(long, default_value = "typedb")]
    pub generator: String,

    /// Overrides the typedb generator's output path (defaults to `output_file`).
    #[arg(long = "typedb-output")]
    pub typedb_output: Option<PathBuf>,

    /// Wrap the selected generator in a sink that traces every event.
    #[arg(long)]
    pub debug: bool,

    /// Print per-file load/parse timings.
    #[arg(long)]
    pub profile: bool,
}

impl Args {
    pub fn macro_list(&self) -> Vec<String> {
        self.macros
            .as_deref()
            .map(|list| list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_list_splits_and_trims_commas() {
        let args = Args {
            input_file: PathBuf::from("a.h"),
            output_file: PathBuf::from("a.typedb"),
            list: None,
            macros: Some("API, NOINLINE,,DEPRECATED".to_string()),
            generator: "typedb".to_string(),
            typedb_output: None,
            debug: false,
            profile: false,
        };
        assert_eq!(args.macro_list(), vec!["API", "NOINLINE", "DEPRECATED"]);
    }

    #[test]
    fn macro_list_is_empty_when_absent() {
        let args = Args {
            input_file: PathBuf::from("a.h"),
            output_file: PathBuf::from("a.typedb"),
            list: None,
            macros: None,
            generator: "typedb".to_string(),
            typedb_output: None,
            debug: false,
            profile: false,
        };
        assert!(args.macro_list().is_empty());
    }
}
