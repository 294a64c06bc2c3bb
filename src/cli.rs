use clap::{Parser, Subcommand};

use proximitm::ColorMode;

#[derive(Copy, Clone, PartialEq, Eq, Debug, clap::ValueEnum)]
pub(crate) enum InstallTarget {
    /// Embedded Python runtime only
    Runtime,
    /// mitmproxy package only
    Proxy,
    /// Runtime first, then the proxy package
    All,
}

#[derive(Parser, Debug)]
#[command(
    name = "proximitm",
    version,
    about = "Manage the lifecycle of a local mitmdump proxy: status, start, stop, autostart."
)]
pub(crate) struct Cli {
    /// Print detailed execution info
    #[arg(long, global = true)]
    pub(crate) verbose: bool,

    /// Colorize diagnostics: auto|always|never
    #[arg(long = "color", value_enum, global = true)]
    pub(crate) color: Option<ColorMode>,

    #[command(subcommand)]
    pub(crate) command: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Cmd {
    /// Report whether the proxy is running
    Status {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the proxy (no-op when already running)
    Start {
        /// Keep the proxy console window visible
        #[arg(long = "show-console")]
        show_console: bool,
    },
    /// Stop the proxy and any stray proxy processes (no-op when stopped)
    Stop,
    /// Manage the login-time autostart entry
    Startup {
        #[command(subcommand)]
        action: StartupCmd,
    },
    /// Download and install missing dependencies
    Install {
        /// What to install
        #[arg(value_enum, default_value = "all")]
        target: InstallTarget,
    },
    /// Run diagnostics to check environment and configuration
    Doctor,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum StartupCmd {
    /// Write the autostart entry, overwriting any previous one
    Enable {
        /// Keep the proxy console window visible at login
        #[arg(long = "show-console")]
        show_console: bool,
    },
    /// Remove the autostart entry
    Disable,
    /// Report whether the autostart entry exists
    Status,
}
