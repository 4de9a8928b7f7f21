// src/cli/args.rs

use crate::core::report::{OutputFormat, OutputTarget};
use clap::Args;
use std::path::PathBuf;

/// The mutually exclusive `--save-*` flags. Each takes an optional file name;
/// without one a timestamped default name is used.
#[derive(Args, Debug, Default, Clone)]
#[group(multiple = false)]
pub struct SaveArgs {
    /// Save output to a JSON file.
    #[arg(long, value_name = "FILE")]
    pub save_json: Option<Option<PathBuf>>,

    /// Save output to a CSV file.
    #[arg(long, value_name = "FILE")]
    pub save_csv: Option<Option<PathBuf>>,

    /// Save output to a text file.
    #[arg(long, value_name = "FILE")]
    pub save_text: Option<Option<PathBuf>>,
}

impl SaveArgs {
    /// The requested output, if any `--save-*` flag was given.
    pub fn target(&self) -> Option<OutputTarget> {
        [
            (OutputFormat::Json, &self.save_json),
            (OutputFormat::Csv, &self.save_csv),
            (OutputFormat::Text, &self.save_text),
        ]
        .into_iter()
        .find_map(|(format, flag)| {
            flag.as_ref().map(|path| OutputTarget {
                format,
                path: path.clone(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    #[command(no_binary_name = true)]
    struct SaveOnly {
        #[command(flatten)]
        save: SaveArgs,
    }

    #[test]
    fn test_flag_without_file_uses_default_name() {
        let parsed = SaveOnly::try_parse_from(["--save-csv"]).unwrap();
        assert_eq!(
            parsed.save.target(),
            Some(OutputTarget {
                format: OutputFormat::Csv,
                path: None
            })
        );
    }

    #[test]
    fn test_flag_with_file() {
        let parsed = SaveOnly::try_parse_from(["--save-json", "out.json"]).unwrap();
        assert_eq!(
            parsed.save.target(),
            Some(OutputTarget {
                format: OutputFormat::Json,
                path: Some(PathBuf::from("out.json"))
            })
        );
    }

    #[test]
    fn test_formats_are_exclusive() {
        assert!(SaveOnly::try_parse_from(["--save-json", "--save-text"]).is_err());
    }

    #[test]
    fn test_no_flag() {
        let parsed = SaveOnly::try_parse_from(Vec::<String>::new()).unwrap();
        assert_eq!(parsed.save.target(), None);
    }
}
