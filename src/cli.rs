use clap::Parser;
use std::time::Duration;

use crate::io::HttpOptions;
use crate::manifest::COMPOSER_JSON;

#[derive(Parser, Debug)]
#[command(name = "zip-manifest")]
#[command(version)]
#[command(about = "Print the root composer.json of a local or remote ZIP archive", long_about = None)]
#[command(after_help = "Examples:\n  \
  zip-manifest package.zip                      print package.zip's composer.json\n  \
  zip-manifest -f package.json bundle.zip       look for package.json instead\n  \
  zip-manifest https://example.com/pkg.zip -o composer.json\n\n\
Exit status is 1 when no manifest is found.")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Manifest file name to look for
    #[arg(short = 'f', long, value_name = "NAME", default_value = COMPOSER_JSON)]
    pub file_name: String,

    /// Write the manifest to a file instead of stdout
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// HTTP attempts per range request
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub retries: u32,

    /// More log output (-v debug, -vv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_secs(self.timeout),
            max_retry: self.retries,
        }
    }

    /// Default log filter when `RUST_LOG` is not set
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["zip-manifest", "pkg.zip"]).unwrap();
        assert_eq!(cli.file_name, "composer.json");
        assert!(cli.output.is_none());
        assert!(!cli.is_http_url());
        assert_eq!(cli.http_options(), HttpOptions::default());
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn remote_source_with_options() {
        let cli = Cli::try_parse_from([
            "zip-manifest",
            "https://example.com/pkg.zip",
            "-f",
            "package.json",
            "--timeout",
            "5",
            "--retries",
            "2",
            "-vv",
        ])
        .unwrap();
        assert!(cli.is_http_url());
        assert_eq!(cli.file_name, "package.json");
        assert_eq!(cli.http_options().timeout, Duration::from_secs(5));
        assert_eq!(cli.http_options().max_retry, 2);
        assert_eq!(cli.log_level(), "trace");
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["zip-manifest", "-q", "-v", "pkg.zip"]).is_err());
    }
}
