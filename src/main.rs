use std::process::ExitCode;

use clap::Parser;

use proximitm::{
    exit_code_for_lifecycle_error, log_error_stderr, log_info_stderr, log_warn_stderr,
    set_color_mode, AppContext, InstallReport, LifecycleError, StartupRegistrar,
};

mod cli;
mod doctor;

use cli::{Cli, Cmd, InstallTarget, StartupCmd};

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(mode) = cli.color {
        set_color_mode(mode);
    }
    let use_err = proximitm::color_enabled_stderr();

    let ctx = match AppContext::initialize() {
        Ok(ctx) => ctx,
        Err(e) => {
            log_error_stderr(use_err, &format!("proximitm: initialization failed: {e}"));
            return ExitCode::from(1);
        }
    };
    if cli.verbose && ctx.is_first_launch() {
        log_info_stderr(use_err, "proximitm: first launch, marker created");
    }

    match &cli.command {
        Cmd::Status { json } => run_status(&ctx, *json, use_err),
        Cmd::Start { show_console } => {
            if ctx.should_check_dependencies() && !ctx.installer().check_dependencies() {
                log_warn_stderr(
                    use_err,
                    "proximitm: dependencies missing; run `proximitm install` first",
                );
            }
            run_lifecycle(ctx.lifecycle().start(*show_console), "started", use_err)
        }
        Cmd::Stop => run_lifecycle(ctx.lifecycle().stop(), "stopped", use_err),
        Cmd::Startup { action } => run_startup(&ctx, action, use_err),
        Cmd::Install { target } => run_install(&ctx, *target, cli.verbose, use_err),
        Cmd::Doctor => {
            doctor::run_doctor(ctx.locator(), cli.verbose);
            ExitCode::from(0)
        }
    }
}

fn run_status(ctx: &AppContext, json: bool, use_err: bool) -> ExitCode {
    let startup_enabled = StartupRegistrar::from_env(ctx.locator().clone())
        .map(|r| r.is_enabled())
        .unwrap_or(false);
    if json {
        let report = ctx.lifecycle().status_report(startup_enabled);
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                log_error_stderr(use_err, &format!("proximitm: status serialization failed: {e}"));
                return ExitCode::from(1);
            }
        }
    } else {
        println!("{}", ctx.lifecycle().status());
    }
    ExitCode::from(0)
}

fn run_lifecycle(result: Result<(), LifecycleError>, verb: &str, use_err: bool) -> ExitCode {
    match result {
        Ok(()) => {
            log_info_stderr(use_err, &format!("proximitm: proxy {verb}"));
            ExitCode::from(0)
        }
        Err(e) => {
            log_error_stderr(use_err, &format!("proximitm: {e}"));
            ExitCode::from(exit_code_for_lifecycle_error(&e))
        }
    }
}

fn run_startup(ctx: &AppContext, action: &StartupCmd, use_err: bool) -> ExitCode {
    let registrar = match StartupRegistrar::from_env(ctx.locator().clone()) {
        Ok(r) => r,
        Err(e) => {
            log_error_stderr(use_err, &format!("proximitm: startup folder unavailable: {e}"));
            return ExitCode::from(1);
        }
    };
    match action {
        StartupCmd::Enable { show_console } => match registrar.enable(*show_console) {
            Ok(()) => {
                log_info_stderr(
                    use_err,
                    &format!(
                        "proximitm: autostart enabled at {}",
                        registrar.artifact_path().display()
                    ),
                );
                ExitCode::from(0)
            }
            Err(e) => {
                log_error_stderr(use_err, &format!("proximitm: {e}"));
                ExitCode::from(exit_code_for_lifecycle_error(&e))
            }
        },
        StartupCmd::Disable => match registrar.disable() {
            Ok(existed) => {
                if existed {
                    log_info_stderr(use_err, "proximitm: autostart disabled");
                } else {
                    log_warn_stderr(use_err, "proximitm: autostart was not enabled");
                }
                ExitCode::from(0)
            }
            Err(e) => {
                log_error_stderr(use_err, &format!("proximitm: {e}"));
                ExitCode::from(1)
            }
        },
        StartupCmd::Status => {
            println!("{}", if registrar.is_enabled() { "enabled" } else { "disabled" });
            ExitCode::from(0)
        }
    }
}

fn run_install(ctx: &AppContext, target: InstallTarget, verbose: bool, use_err: bool) -> ExitCode {
    let installer = ctx.installer();
    let reports: Vec<InstallReport> = match target {
        InstallTarget::Runtime => vec![installer.ensure_runtime()],
        InstallTarget::Proxy => vec![installer.ensure_proxy_package()],
        InstallTarget::All => vec![installer.ensure_runtime(), installer.ensure_proxy_package()],
    };
    let mut ok = true;
    for report in &reports {
        if verbose || !report.success {
            eprint!("{}", report.transcript);
        }
        ok &= report.success;
    }
    if ok {
        log_info_stderr(use_err, "proximitm: dependencies installed");
        ExitCode::from(0)
    } else {
        log_error_stderr(use_err, "proximitm: installation failed; see transcript above");
        ExitCode::from(1)
    }
}
