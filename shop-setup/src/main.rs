use shop_setup::models::connection::DEFAULT_DB_PORT;
use shop_setup::ConnectionParameters;
use std::path::PathBuf;

const PASSWORD_ENV: &str = "SHOP_SETUP_DB_PASSWORD";

const USAGE: &str = "Usage:
  shop-setup install --host <host> [--port <port>] --user <user> [--password <pwd>] --database <name> [--settings <file>]
  shop-setup context [--settings <file>]

The password may also be given through SHOP_SETUP_DB_PASSWORD.";

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let code = match args.first().map(String::as_str) {
        Some("install") => match install_params(&args[1..]) {
            Ok(params) => shop_setup::run_install(flag_value(&args[1..], "--settings").map(PathBuf::from), params),
            Err(msg) => {
                eprintln!("{}\n\n{}", msg, USAGE);
                2
            }
        },
        Some("context") => shop_setup::run_context(flag_value(&args[1..], "--settings").map(PathBuf::from)),
        Some("--help") | Some("-h") => {
            println!("{}", USAGE);
            0
        }
        _ => {
            eprintln!("{}", USAGE);
            2
        }
    };

    std::process::exit(code);
}

/// Value of `--name value` or `--name=value`.
fn flag_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == name {
            return iter.next().cloned();
        }
        if let Some(v) = arg.strip_prefix(&prefix) {
            return Some(v.to_string());
        }
    }
    None
}

fn install_params(args: &[String]) -> Result<ConnectionParameters, String> {
    let required = |name: &str| {
        flag_value(args, name)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| format!("Missing required option {}", name))
    };

    let port = match flag_value(args, "--port") {
        Some(p) => p
            .trim()
            .parse::<u16>()
            .map_err(|_| format!("Invalid port: {}", p))?,
        None => DEFAULT_DB_PORT,
    };
    let password = flag_value(args, "--password")
        .or_else(|| std::env::var(PASSWORD_ENV).ok())
        .unwrap_or_default();

    Ok(ConnectionParameters::new(
        required("--host")?,
        port,
        required("--user")?,
        password,
        required("--database")?,
    ))
}
