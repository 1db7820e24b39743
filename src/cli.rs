use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to a YAML config file. Created with defaults if missing.
    #[clap(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the link preview HTTP service
    Serve {
        /// Address to listen on, overrides `server.listen`
        #[clap(short, long)]
        listen: Option<String>,
    },

    /// Fetch metadata for a single url and print it as JSON
    Meta {
        url: String,

        /// Print per-variant attempt details
        #[clap(long, default_value = "false")]
        report: bool,

        /// Print the display card instead of the raw record
        #[clap(long, default_value = "false")]
        card: bool,
    },

    /// Show the url variants that would be tried, in order
    Variants { url: String },

    /// Build preview cards for every publication link in a CMS export
    Publications {
        /// JSON export with an `items` array
        export: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meta() {
        let args = Args::parse_from(["folio", "meta", "https://bbc.com", "--card"]);
        match args.command {
            Command::Meta { url, report, card } => {
                assert_eq!(url, "https://bbc.com");
                assert!(card);
                assert!(!report);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let args = Args::parse_from(["folio", "serve", "--config", "/tmp/folio.yaml", "-l", "127.0.0.1:9000"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/folio.yaml")));
        assert!(matches!(args.command, Command::Serve { listen: Some(ref l) } if l == "127.0.0.1:9000"));
    }
}
