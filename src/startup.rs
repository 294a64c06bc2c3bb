//! Login-time autostart artifact for the proxy.
//!
//! One script file at a fixed per-user startup location re-invokes the proxy
//! with the same arguments `start()` uses, outside this application's
//! lifetime. Existence of the file on disk is the whole persisted state:
//! enable overwrites wholesale, disable deletes, is_enabled stats the path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::LifecycleError;
use crate::lifecycle::{build_launch_config, LaunchConfig};
use crate::locator::ProcessLocator;

/// Fixed artifact base name; the extension is platform-specific.
pub const STARTUP_ARTIFACT_BASENAME: &str = "MitmModular";

#[cfg(windows)]
const STARTUP_ARTIFACT_EXT: &str = "bat";
#[cfg(not(windows))]
const STARTUP_ARTIFACT_EXT: &str = "desktop";

#[derive(Debug, Clone)]
pub struct StartupRegistrar {
    dir: PathBuf,
    locator: ProcessLocator,
}

impl StartupRegistrar {
    /// Per-user startup location: PROXIMITM_STARTUP_DIR when set, else the
    /// Windows Startup folder, else the XDG autostart directory.
    pub fn from_env(locator: ProcessLocator) -> io::Result<Self> {
        let dir = match std::env::var_os("PROXIMITM_STARTUP_DIR") {
            Some(d) => PathBuf::from(d),
            None => platform_startup_dir()?,
        };
        Ok(Self::with_dir(dir, locator))
    }

    pub fn with_dir(dir: impl Into<PathBuf>, locator: ProcessLocator) -> Self {
        Self {
            dir: dir.into(),
            locator,
        }
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.dir
            .join(format!("{STARTUP_ARTIFACT_BASENAME}.{STARTUP_ARTIFACT_EXT}"))
    }

    /// Write the launcher script, overwriting any previous artifact. The
    /// proxy executable is validated the same way `start()` validates it.
    pub fn enable(&self, show_console: bool) -> Result<(), LifecycleError> {
        let config = build_launch_config(&self.locator, show_console)?;
        let content = render_artifact(&config);
        fs::create_dir_all(&self.dir).map_err(LifecycleError::Io)?;
        fs::write(self.artifact_path(), content).map_err(LifecycleError::Io)?;
        Ok(())
    }

    /// Delete the artifact. Returns whether it existed; a never-enabled
    /// state is not an error.
    pub fn disable(&self) -> io::Result<bool> {
        let path = self.artifact_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Pure existence check; cheap enough to poll on every UI refresh.
    pub fn is_enabled(&self) -> bool {
        self.artifact_path().is_file()
    }
}

#[cfg(windows)]
fn platform_startup_dir() -> io::Result<PathBuf> {
    let appdata = std::env::var_os("APPDATA").ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "APPDATA environment variable not set")
    })?;
    Ok(PathBuf::from(appdata)
        .join("Microsoft")
        .join("Windows")
        .join("Start Menu")
        .join("Programs")
        .join("Startup"))
}

#[cfg(not(windows))]
fn platform_startup_dir() -> io::Result<PathBuf> {
    let config = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(d) if !d.is_empty() => PathBuf::from(d),
        _ => home::home_dir()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "home directory not found"))?
            .join(".config"),
    };
    Ok(config.join("autostart"))
}

#[cfg(windows)]
fn render_artifact(config: &LaunchConfig) -> String {
    let workdir = config.working_dir.display();
    if config.show_console {
        format!(
            "@echo off\r\ncd /d \"{workdir}\"\r\nstart \"\" {}\r\nexit\r\n",
            config.invocation_line()
        )
    } else {
        // PowerShell relaunch keeps the console window fully hidden.
        let script = config.script.display();
        let exe = config.executable.display();
        format!(
            "@echo off\r\ncd /d \"{workdir}\"\r\npowershell -Command \"Start-Process '{exe}' \
             -ArgumentList '-s \\\"{script}\\\" --set block_global=false --listen-port {port}' \
             -WindowStyle Hidden\"\r\nexit\r\n",
            port = config.listen_port
        )
    }
}

#[cfg(not(windows))]
fn render_artifact(config: &LaunchConfig) -> String {
    let workdir = config.working_dir.display();
    format!(
        "[Desktop Entry]\nType=Application\nName={STARTUP_ARTIFACT_BASENAME}\n\
         Exec=sh -c 'cd \"{workdir}\" && exec {}'\nTerminal={}\n\
         X-GNOME-Autostart-enabled=true\n",
        config.invocation_line(),
        config.show_console
    )
}
