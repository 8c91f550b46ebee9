use clap::Parser;

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable detailed debug logging (global)
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// Enable verbose logging (global)
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Probe every value of the range and report which ones match
    Probe(ProbeArgs),

    /// Resolve and print the Next.js build id advertised by a page
    BuildId {
        /// Page to read __NEXT_DATA__ from (defaults to the configured page)
        page: Option<String>,

        /// Load settings from a JSON file
        #[arg(long, value_name = "FILE")]
        config: Option<String>,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct ProbeArgs {
    /// Load settings from a JSON file (flags override it)
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,

    /// First value of the range (inclusive)
    #[arg(long)]
    pub start: Option<u64>,

    /// Last value of the range (inclusive)
    #[arg(long)]
    pub end: Option<u64>,

    /// Maximum requests in flight
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// URL template; {i} is the probed value, {build_id} the Next.js build id.
    /// A configured Host header naming another host is not sent.
    #[arg(short = 'u', long)]
    pub url_template: Option<String>,

    /// Literal pattern counted in each response body
    #[arg(long)]
    pub pattern: Option<String>,

    /// Text preceding the label to extract
    #[arg(long)]
    pub label_prefix: Option<String>,

    /// Text following the label to extract
    #[arg(long)]
    pub label_suffix: Option<String>,

    /// Status a response must have to be classified
    #[arg(long)]
    pub expected_status: Option<u16>,

    /// Exact pattern count that counts as a match
    #[arg(long)]
    pub expected_count: Option<usize>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Verify TLS certificates (off by default)
    #[arg(long, default_value_t = false)]
    pub verify_tls: bool,

    /// Build id to substitute for {build_id} (resolved automatically when omitted)
    #[arg(long)]
    pub build_id: Option<String>,

    /// Page used to resolve the build id
    #[arg(long)]
    pub build_id_page: Option<String>,

    /// Extra or overriding header, "Name: value" (repeatable; empty value removes)
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Disable the progress bar
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_probe_flags() {
        let cli = Cli::try_parse_from([
            "range_hunter", "probe", "--start", "3", "--end", "9", "-c", "4",
            "-H", "Accept: text/html", "-H", "Priority:", "--debug",
        ])
        .unwrap();
        assert!(cli.debug);
        let Commands::Probe(args) = cli.command else { panic!("expected probe") };
        assert_eq!(args.start, Some(3));
        assert_eq!(args.end, Some(9));
        assert_eq!(args.concurrency, Some(4));
        assert_eq!(args.headers, vec!["Accept: text/html", "Priority:"]);
    }
}
