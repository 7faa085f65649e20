//! Terminal detection and capability utilities

use is_terminal::IsTerminal;
use std::env;
use std::io::stdout;

/// Check if stdout is connected to an interactive terminal
pub fn is_interactive() -> bool {
    if !stdout().is_terminal() {
        return false;
    }

    // CI runners may allocate a TTY without anyone watching it
    if is_ci_environment() {
        return false;
    }

    env::var("DEBIAN_FRONTEND").unwrap_or_default() != "noninteractive"
}

/// Check if the terminal supports ANSI escape codes for colors
pub fn supports_ansi() -> bool {
    if env::var_os("NO_COLOR").is_some() || !is_interactive() {
        return false;
    }

    let term = env::var("TERM").unwrap_or_default();

    // Windows Terminal and ConEmu set these; plain consoles report an empty TERM
    #[cfg(windows)]
    {
        if env::var("WT_SESSION").is_ok() || env::var("ConEmuANSI").unwrap_or_default() == "ON" {
            return term != "dumb";
        }
    }

    term_supports_ansi(&term)
}

fn term_supports_ansi(term: &str) -> bool {
    !term.is_empty() && term != "dumb"
}

const CI_VARS: [&str; 7] = [
    "CI",
    "CONTINUOUS_INTEGRATION",
    "JENKINS_URL",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "TF_BUILD", // Azure DevOps
];

fn is_ci_environment() -> bool {
    ci_marker_set(|var| env::var_os(var).is_some())
}

fn ci_marker_set(is_set: impl Fn(&str) -> bool) -> bool {
    CI_VARS.iter().any(|var| is_set(var))
}
