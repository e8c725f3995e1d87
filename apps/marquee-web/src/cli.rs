use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub config_path: PathBuf,
    pub host: Option<String>,
    pub port: Option<u16>,
}

enum ParseOutcome {
    Args(CliArgs),
    Help,
}

fn usage() {
    eprintln!(
        "usage:
  marquee-web [--config <path>] [--host <host>] [--port <port>]
"
    );
}

fn required_value(
    args: &mut impl Iterator<Item = String>,
    flag: &str,
) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_args_impl(mut args: impl Iterator<Item = String>) -> Result<ParseOutcome, String> {
    let mut config_path: Option<PathBuf> = None;
    let mut host: Option<String> = None;
    let mut port: Option<u16> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config_path = Some(PathBuf::from(required_value(&mut args, "--config")?));
            }
            "--host" => {
                host = Some(required_value(&mut args, "--host")?);
            }
            "--port" => {
                let value = required_value(&mut args, "--port")?;
                port = Some(
                    value
                        .parse::<u16>()
                        .map_err(|_| format!("invalid --port value `{value}`"))?,
                );
            }
            "-h" | "--help" | "help" => {
                return Ok(ParseOutcome::Help);
            }
            _ => {}
        }
    }

    Ok(ParseOutcome::Args(CliArgs {
        config_path: marquee_config::resolve_web_config_path(config_path),
        host,
        port,
    }))
}

pub fn parse_args() -> CliArgs {
    match parse_args_impl(std::env::args().skip(1)) {
        Ok(ParseOutcome::Args(args)) => args,
        Ok(ParseOutcome::Help) => {
            usage();
            std::process::exit(0);
        }
        Err(error) => {
            eprintln!("error: {error}");
            usage();
            std::process::exit(2);
        }
    }
}
