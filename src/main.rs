use clap::{Args, Parser, Subcommand};
use freight_quote::location::{Country, LocationDescriptor};
use freight_quote::pricing::EquipmentType;
use freight_quote::{AppConfig, QuoteEngine, QuoteError, QuoteRecord, QuoteRequest};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// freightq: freight quotes between North American locations.
///
/// Examples:
///   freightq quote --from-city Toronto --from-postal "M5H 2N2" --from-state ON --from-country CA \
///                  --to-city Vancouver --to-state BC --to-country CA --equipment dry_van --weight 10000
///   freightq quote --from-city Laredo --from-country US --to-city Monterrey --to-country MX --offline
///   freightq serve --port 8080
#[derive(Parser)]
#[command(name = "freightq", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Price one lane and print the quote record as JSON.
    Quote(QuoteArgs),
    /// Run the HTTP API.
    Serve {
        /// Bind address (overrides FREIGHTQ_HOST).
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides FREIGHTQ_PORT).
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct QuoteArgs {
    #[arg(long)]
    from_city: String,
    #[arg(long)]
    from_postal: Option<String>,
    #[arg(long)]
    from_state: Option<String>,
    /// US, CA or MX.
    #[arg(long, value_parser = parse_country)]
    from_country: Country,

    #[arg(long)]
    to_city: String,
    #[arg(long)]
    to_postal: Option<String>,
    #[arg(long)]
    to_state: Option<String>,
    /// US, CA or MX.
    #[arg(long, value_parser = parse_country)]
    to_country: Country,

    /// dry_van, reefer, flatbed, step_deck, hotshot or straight_truck.
    #[arg(long, short = 'e', default_value = "dry_van", value_parser = parse_equipment)]
    equipment: EquipmentType,

    /// Total shipment weight in pounds.
    #[arg(long, short = 'w')]
    weight: Option<f64>,

    /// Skip the routing provider; use great-circle distance only.
    #[arg(long)]
    offline: bool,

    /// Base rate per mile (overrides BASE_RATE_PER_MILE).
    #[arg(long)]
    base_rate: Option<f64>,

    /// Minimum quote (overrides MINIMUM_QUOTE).
    #[arg(long)]
    minimum: Option<f64>,
}

fn parse_country(s: &str) -> Result<Country, String> {
    s.parse().map_err(|e: QuoteError| e.to_string())
}

fn parse_equipment(s: &str) -> Result<EquipmentType, String> {
    s.parse().map_err(|e: QuoteError| e.to_string())
}

fn descriptor(
    city: String,
    postal: Option<String>,
    state: Option<String>,
    country: Country,
) -> LocationDescriptor {
    LocationDescriptor {
        city,
        postal_code: postal,
        state_province: state,
        country: Some(country),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("configuration error: {}", e);
            return ExitCode::from(2);
        }
    };

    let result = match cli.command {
        Command::Quote(args) => run_quote(&mut config, args).await,
        Command::Serve { host, port } => {
            if let Some(h) = host {
                config.host = h;
            }
            if let Some(p) = port {
                config.port = p;
            }
            return run_server(&config).await;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => exit_code(&e),
    }
}

fn exit_code(e: &QuoteError) -> ExitCode {
    error!("{}", e);
    if e.is_client_error() {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

async fn run_server(config: &AppConfig) -> ExitCode {
    let engine = match QuoteEngine::from_config(config, false) {
        Ok(engine) => engine,
        Err(e) => return exit_code(&e),
    };
    match freight_quote::server::start(engine, &config.host, config.port).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_quote(config: &mut AppConfig, args: QuoteArgs) -> Result<(), QuoteError> {
    if let Some(rate) = args.base_rate {
        config.pricing.base_rate_per_mile = rate;
    }
    if let Some(min) = args.minimum {
        config.pricing.minimum_quote = min;
    }
    let engine = QuoteEngine::from_config(config, args.offline)?;

    let request = QuoteRequest {
        origin: descriptor(args.from_city, args.from_postal, args.from_state, args.from_country),
        destination: descriptor(args.to_city, args.to_postal, args.to_state, args.to_country),
        equipment_type: args.equipment,
        total_weight: args.weight,
    };

    let result = engine.quote(&request).await?;
    let record = QuoteRecord::from_parts(&request, &result);

    eprintln!(
        "  {} -> {}: {:.1} mi ({}), {}, ${:.2}",
        result.origin.display_name,
        result.destination.display_name,
        result.distance.miles(),
        result.distance.method(),
        result.equipment_type,
        result.amount,
    );

    let json = serde_json::to_string_pretty(&record)
        .map_err(|e| QuoteError::Computation(format!("cannot encode quote: {}", e)))?;
    println!("{}", json);
    Ok(())
}
