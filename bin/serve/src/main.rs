use std::time::Duration;

use perch::{HttpService, ServerConfig};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn register() -> clap::Command {
    clap::Command::new("perch")
        .about("Small local HTTP server that hunts for a free port")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            clap::Arg::new("port")
                .long("port")
                .env("PORT")
                .action(clap::ArgAction::Set)
                .value_parser(clap::value_parser!(u16))
                .default_value("0"),
        )
        .arg(
            clap::Arg::new("maxport")
                .long("maxport")
                .env("MAXPORT")
                .action(clap::ArgAction::Set)
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            clap::Arg::new("hostname")
                .long("hostname")
                .env("HOSTNAME")
                .action(clap::ArgAction::Set)
                .value_parser(clap::value_parser!(String)),
        )
        .arg(
            clap::Arg::new("address")
                .long("address")
                .env("ADDRESS")
                .action(clap::ArgAction::Set)
                .value_parser(clap::value_parser!(String))
                .default_value("0.0.0.0"),
        )
        .arg(
            clap::Arg::new("open")
                .long("open")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("dir")
                .action(clap::ArgAction::Set)
                .value_parser(clap::value_parser!(String)),
        )
}

async fn run(args: &clap::ArgMatches) -> std::result::Result<(), BoxedError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let port = *args.get_one::<u16>("port").expect("should have port");
    let maxport = args.get_one::<u16>("maxport").copied().unwrap_or(port);

    let mut config = ServerConfig::with_range(port, maxport);
    config.hostname = args.get_one::<String>("hostname").cloned();
    config.address = args
        .get_one::<String>("address")
        .expect("should have address")
        .clone();
    config.open = args.get_flag("open");

    if let Some(dir) = args.get_one::<String>("dir") {
        perch_logs::warn!("Serving a directory is not implemented; ignoring {}", dir);
    }

    let server = HttpService::new(config)?.bind().await?;
    perch_logs::info!("Serving on http://{}", server.local_addr());

    tokio::signal::ctrl_c().await?;
    perch_logs::info!("Interrupt received; shutting down");
    server.shutdown(Duration::from_secs(5)).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), BoxedError> {
    let matches = register().get_matches();
    run(&matches).await
}
