use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Secrets are left out on purpose
    const DISPLAY_ENVS: [&str; 13] = [
        "RUST_LOG",
        "SF_HOST",
        "SF_PORT",
        "SF_DATABASE_URL",
        "SF_CURRENCY",
        "SF_COD_EARN_RATE_BPS",
        "SF_ONLINE_EARN_RATE_BPS",
        "SF_COIN_HOLD_DAYS",
        "SF_RETURN_WINDOW_HOURS",
        "SF_SETTLEMENT_INTERVAL_HOURS",
        "SF_GATEWAY_URL",
        "SF_GATEWAY_WEBHOOK_CHECKS",
        "SF_USE_X_FORWARDED_FOR",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
