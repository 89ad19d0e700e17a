//! Command line parsing for the `nsmock-coordinator` binary.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Values given on the command line that override the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Run(CliOverrides),
    Help,
    Version,
}

/// Parses arguments (without the program name).
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<CliCommand, String> {
    let mut overrides = CliOverrides::default();
    let mut iter = args.iter().map(AsRef::as_ref);

    while let Some(arg) = iter.next() {
        match arg {
            "-h" | "--help" => return Ok(CliCommand::Help),
            "-v" | "--version" => return Ok(CliCommand::Version),
            "-i" | "--ip" => {
                let value = iter.next().ok_or_else(|| format!("{} requires a value", arg))?;
                overrides.host = Some(value.to_string());
            }
            "-p" | "--port" => {
                let value = iter.next().ok_or_else(|| format!("{} requires a value", arg))?;
                let port = value
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port '{}'", value))?;
                overrides.port = Some(port);
            }
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok(CliCommand::Run(overrides))
}

pub fn print_usage(prog: &str) {
    eprintln!("NodeSet directory mock v{}", VERSION);
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {} [options]", prog);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -i, --ip <host>     Address to listen on (env NSMOCK_HOST, default 127.0.0.1)");
    eprintln!("  -p, --port <port>   Port to listen on, 0 for random (env NSMOCK_PORT, default 49537)");
    eprintln!("  -h, --help          Show this help");
    eprintln!("  -v, --version       Show version");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  NSMOCK_LOG_LEVEL    trace, debug, info, warn or error (default info)");
    eprintln!("  NSMOCK_ENV_FILE     Env file to load (default .env)");
}
