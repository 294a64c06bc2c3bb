use atty;

use proximitm::{
    build_launch_config, ProcessLocator, ProxyLifecycleManager, RuntimeAvailability,
    StartupRegistrar, PROXY_LISTEN_PORT,
};

fn yes_no(v: bool) -> String {
    let s = if v { "yes" } else { "no" };
    if atty::is(atty::Stream::Stderr) {
        format!("\x1b[34;1m{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

pub(crate) fn run_doctor(locator: &ProcessLocator, verbose: bool) {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("proximitm doctor");
    eprintln!();
    eprintln!("  version: v{version}");
    eprintln!(
        "  host:    {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    eprintln!();

    eprintln!("  app dir:     {}", locator.app_dir().display());
    eprintln!("  tools dir:   {}", locator.tools_dir().display());
    eprintln!("  script:      {}", locator.script_path().display());
    eprintln!("  listen port: {PROXY_LISTEN_PORT}");
    eprintln!();

    let runtime = locator.resolve_runtime_executable();
    if runtime.path_fallback {
        match which::which(&runtime.path) {
            Ok(p) => eprintln!("  runtime: {} (via PATH)", p.display()),
            Err(_) => eprintln!("  runtime: {} (not on PATH)", runtime.path.display()),
        }
    } else {
        eprintln!(
            "  runtime: {}{}",
            runtime.path.display(),
            if runtime.exists_on_disk() { "" } else { " (missing)" }
        );
    }
    let proxy = locator.resolve_proxy_executable();
    if proxy.path_fallback {
        match which::which(&proxy.path) {
            Ok(p) => eprintln!("  proxy:   {} (via PATH)", p.display()),
            Err(_) => eprintln!("  proxy:   {} (not on PATH)", proxy.path.display()),
        }
    } else {
        eprintln!(
            "  proxy:   {}{}",
            proxy.path.display(),
            if proxy.exists_on_disk() { "" } else { " (missing)" }
        );
    }
    eprintln!();

    let availability = RuntimeAvailability::new(locator.clone());
    eprintln!(
        "  runtime available: {}",
        yes_no(availability.is_runtime_available())
    );
    eprintln!(
        "  proxy available:   {}",
        yes_no(availability.is_proxy_available())
    );

    match StartupRegistrar::from_env(locator.clone()) {
        Ok(registrar) => {
            eprintln!("  startup entry:     {}", registrar.artifact_path().display());
            eprintln!("  startup enabled:   {}", yes_no(registrar.is_enabled()));
        }
        Err(e) => eprintln!("  startup entry:     unavailable ({e})"),
    }
    eprintln!();

    let manager = ProxyLifecycleManager::new(locator.clone());
    eprintln!("  proxy status: {}", manager.status());
    if verbose {
        match build_launch_config(locator, false) {
            Ok(config) => eprintln!("  launch line:  {}", config.invocation_line()),
            Err(e) => eprintln!("  launch line:  unavailable ({e})"),
        }
        for d in manager.matching_processes() {
            eprintln!(
                "  matching process: pid {} name {} cmdline {}",
                d.pid,
                d.executable_name,
                d.command_line.join(" ")
            );
        }
    }

    eprintln!();
    eprintln!("doctor: completed diagnostics.");
}
