use clap::Parser;

/// Fetch a git repository at a branch, tag, commit or pull request.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub cmd: Command,
    /// Abort the operation after this many seconds
    #[clap(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Retry a clone that failed with a network error
    #[clap(long, global = true, value_name = "N")]
    pub retries: Option<u32>,
    /// Clone straight into the destination, leaving partial clones behind on failure
    #[clap(long, global = true)]
    pub no_staging: bool,
    /// Hold a lock file next to the destination while installing
    #[clap(long, global = true)]
    pub lock: bool,
}

#[derive(Debug, Parser)]
pub enum Command {
    /// Installs a repository at the requested revision
    Install {
        url: String,
        /// Defaults to the repository name inside the install directory
        destination: Option<String>,
        /// Branch, tag, version, commit hash or PR-<number>; the default branch when omitted
        #[clap(short, long, default_value = "")]
        revision: String,
    },
    /// Prints the commit a revision resolves to, without cloning
    Resolve {
        url: String,
        #[clap(default_value = "")]
        specifier: String,
    },
}
