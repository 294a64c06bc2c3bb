//! One-shot acquisition of a missing runtime or proxy package.
//!
//! Sequential glue: download a fixed-version archive, extract it into the
//! app-local runtime folder, bootstrap pip when absent, install the proxy
//! package by name. Non-resumable and non-parallel; any HTTP non-success
//! status or non-zero helper exit is a hard failure. Outcomes surface as a
//! coarse success boolean plus a transcript, because the caller's only
//! recourse is a retry prompt.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use crate::errors::LifecycleError;
use crate::locator::ProcessLocator;
use crate::runtime::RuntimeAvailability;
use crate::util::exec::{ExecRequest, ExecService};
use crate::PROXY_PACKAGE;

/// Fixed runtime version; bumping it is a release.
pub const RUNTIME_VERSION: &str = "3.11.5";

/// Bootstrap installer for the package manager.
pub const GET_PIP_URL: &str = "https://bootstrap.pypa.io/get-pip.py";

const INSTALL_STEP_TIMEOUT: Duration = Duration::from_secs(600);

/// Versioned archive URL for the embeddable runtime.
pub fn runtime_download_url() -> String {
    if cfg!(windows) {
        format!(
            "https://www.python.org/ftp/python/{RUNTIME_VERSION}/python-{RUNTIME_VERSION}-embed-amd64.zip"
        )
    } else {
        format!("https://www.python.org/ftp/python/{RUNTIME_VERSION}/Python-{RUNTIME_VERSION}.tgz")
    }
}

/// Coarse installation outcome: did it work, and what happened along the way.
#[derive(Debug)]
pub struct InstallReport {
    pub success: bool,
    pub transcript: String,
}

pub struct DependencyInstaller {
    locator: ProcessLocator,
    availability: RuntimeAvailability,
    exec: ExecService,
    http: reqwest::blocking::Client,
}

impl DependencyInstaller {
    pub fn new(locator: ProcessLocator) -> Self {
        let availability = RuntimeAvailability::new(locator.clone());
        Self {
            locator,
            availability,
            exec: ExecService::new(INSTALL_STEP_TIMEOUT),
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Are both the runtime and the proxy usable right now?
    pub fn check_dependencies(&self) -> bool {
        self.availability.is_runtime_available() && self.availability.is_proxy_available()
    }

    /// Acquire the scripting runtime if missing: download the embeddable
    /// archive and extract it under `tools/runtime/`.
    pub fn ensure_runtime(&self) -> InstallReport {
        let mut transcript = String::from("=== runtime installation ===\n");
        if self.availability.is_runtime_available() {
            let _ = writeln!(transcript, "runtime already installed");
            return InstallReport {
                success: true,
                transcript,
            };
        }
        match self.install_runtime(&mut transcript) {
            Ok(()) => {
                let installed = self.availability.is_runtime_available();
                let _ = writeln!(
                    transcript,
                    "post-install runtime check: {}",
                    if installed { "available" } else { "not available" }
                );
                InstallReport {
                    success: installed,
                    transcript,
                }
            }
            Err(e) => {
                let _ = writeln!(transcript, "ERROR: {e}");
                InstallReport {
                    success: false,
                    transcript,
                }
            }
        }
    }

    /// Install the proxy package with pip, bootstrapping pip itself first
    /// when the runtime lacks it.
    pub fn ensure_proxy_package(&self) -> InstallReport {
        let mut transcript = String::from("=== proxy package installation ===\n");
        if self.availability.is_proxy_available() {
            let _ = writeln!(transcript, "{PROXY_PACKAGE} already installed");
            return InstallReport {
                success: true,
                transcript,
            };
        }
        if !self.availability.is_runtime_available() {
            let _ = writeln!(
                transcript,
                "ERROR: runtime is not available, cannot install {PROXY_PACKAGE}"
            );
            return InstallReport {
                success: false,
                transcript,
            };
        }
        match self.install_proxy_package(&mut transcript) {
            Ok(()) => {
                let installed = self.availability.is_proxy_available();
                let _ = writeln!(
                    transcript,
                    "post-install proxy check: {}",
                    if installed { "available" } else { "not available" }
                );
                InstallReport {
                    success: installed,
                    transcript,
                }
            }
            Err(e) => {
                let _ = writeln!(transcript, "ERROR: {e}");
                InstallReport {
                    success: false,
                    transcript,
                }
            }
        }
    }

    fn install_runtime(&self, transcript: &mut String) -> Result<(), LifecycleError> {
        let runtime_dir = self.locator.runtime_dir();
        let _ = writeln!(transcript, "installing runtime into {}", runtime_dir.display());
        fs::create_dir_all(&runtime_dir)?;

        let url = runtime_download_url();
        let archive = self.locator.tools_dir().join("runtime-archive.tmp");
        self.download(&url, &archive, transcript)?;

        let _ = writeln!(transcript, "extracting archive into {}", runtime_dir.display());
        let result = self.run_step(
            "tar",
            &["-xf", &archive.display().to_string()],
            &runtime_dir,
            transcript,
        );
        let _ = fs::remove_file(&archive);
        result
    }

    fn install_proxy_package(&self, transcript: &mut String) -> Result<(), LifecycleError> {
        let python = self.locator.resolve_runtime_executable();
        let python_path = python.path.display().to_string();
        let _ = writeln!(transcript, "using runtime at {python_path}");

        let pip_ok = self
            .exec
            .run(ExecRequest::new(python.path.as_os_str()).args(["-m", "pip", "--version"]))
            .map(|out| out.success())
            .unwrap_or(false);
        let _ = writeln!(transcript, "pip available: {pip_ok}");

        if !pip_ok {
            let staging = tempfile::tempdir()?;
            let get_pip = staging.path().join("get-pip.py");
            self.download(GET_PIP_URL, &get_pip, transcript)?;
            self.run_step(
                &python_path,
                &[&get_pip.display().to_string()],
                staging.path(),
                transcript,
            )?;
        }

        self.run_step(
            &python_path,
            &["-m", "pip", "install", PROXY_PACKAGE],
            self.locator.app_dir(),
            transcript,
        )
    }

    fn download(&self, url: &str, dest: &Path, transcript: &mut String) -> Result<(), LifecycleError> {
        let _ = writeln!(transcript, "downloading {url}");
        let mut response = self
            .http
            .get(url)
            .send()
            .map_err(|e| LifecycleError::Io(io::Error::other(e)))?;
        let status = response.status();
        let _ = writeln!(transcript, "response status: {status}");
        if !status.is_success() {
            return Err(LifecycleError::ExternalTool {
                tool: format!("download of {url}"),
                status: i32::from(status.as_u16()),
            });
        }
        let mut file = fs::File::create(dest)?;
        response
            .copy_to(&mut file)
            .map_err(|e| LifecycleError::Io(io::Error::other(e)))?;
        let _ = writeln!(transcript, "saved to {}", dest.display());
        Ok(())
    }

    fn run_step(
        &self,
        program: &str,
        args: &[&str],
        cwd: &Path,
        transcript: &mut String,
    ) -> Result<(), LifecycleError> {
        let _ = writeln!(transcript, "running {program} {}", args.join(" "));
        let out = self
            .exec
            .run(
                ExecRequest::new(program)
                    .args(args.iter().copied())
                    .cwd(cwd),
            )
            .map_err(|e| LifecycleError::Io(io::Error::other(e)))?;
        if !out.stdout.trim().is_empty() {
            let _ = writeln!(transcript, "{}", out.stdout.trim_end());
        }
        if !out.stderr.trim().is_empty() {
            let _ = writeln!(transcript, "{}", out.stderr.trim_end());
        }
        if !out.success() {
            return Err(LifecycleError::ExternalTool {
                tool: program.to_string(),
                status: out.exit_code(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_download_url_is_versioned() {
        let url = runtime_download_url();
        assert!(url.starts_with("https://www.python.org/ftp/python/"));
        assert!(url.contains(RUNTIME_VERSION));
    }

    #[test]
    fn test_ensure_proxy_package_without_runtime_fails_with_transcript() {
        let td = tempfile::tempdir().expect("tmpdir");
        let gone = td.path().join("nowhere").join("python");
        let locator = ProcessLocator::new(td.path())
            .with_runtime_override(&gone)
            .with_proxy_override(td.path().join("nowhere").join("mitmdump"));
        let installer = DependencyInstaller::new(locator);
        let report = installer.ensure_proxy_package();
        assert!(!report.success);
        assert!(report.transcript.contains("runtime is not available"));
    }

    #[test]
    fn test_check_dependencies_false_on_empty_app_dir() {
        let td = tempfile::tempdir().expect("tmpdir");
        let locator = ProcessLocator::new(td.path())
            .with_runtime_override(td.path().join("nowhere").join("python"))
            .with_proxy_override(td.path().join("nowhere").join("mitmdump"));
        assert!(!DependencyInstaller::new(locator).check_dependencies());
    }
}
