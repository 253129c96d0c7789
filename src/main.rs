use std::{error::Error, path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand, ValueEnum};

use vessel_quote::app::{ask_assistant, build_quote};
use vessel_quote::domain::{
    CustomFee, EquipmentKind, HeatExchangeStyle, Material, PriceTable, Settings,
    SettingsOverrides, SurfaceFinish, VesselSpec,
};
use vessel_quote::infra::cache::DatasetStore;
use vessel_quote::setup_logger;
use vessel_quote::ui::report::{render_answer, render_prices, render_quote};
use vessel_quote::util::persistence::{load_settings, save_settings};

#[derive(Parser, Debug)]
#[command(name = "vessel-quote", author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: OverrideArgs,
    #[command(subcommand)]
    mode: Modes,
}

/// Per-run credentials and network settings. Never written back to disk.
#[derive(Args, Debug)]
struct OverrideArgs {
    #[arg(long, global = true, env = "VESSEL_QUOTE_GEMINI_KEY", hide_env_values = true)]
    gemini_key: Option<String>,
    #[arg(long, global = true, env = "VESSEL_QUOTE_DRIVE_TOKEN", hide_env_values = true)]
    drive_token: Option<String>,
    #[arg(long, global = true, env = "VESSEL_QUOTE_DRIVE_KEY", hide_env_values = true)]
    drive_key: Option<String>,
    /// Service-account JSON key for the drive.
    #[arg(long, global = true, env = "VESSEL_QUOTE_DRIVE_KEY_FILE")]
    drive_key_file: Option<PathBuf>,
    /// Route all requests through http://127.0.0.1:<PORT>.
    #[arg(long, global = true, env = "VESSEL_QUOTE_PROXY_PORT")]
    proxy_port: Option<u16>,
}

impl From<OverrideArgs> for SettingsOverrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            gemini_key: args.gemini_key,
            drive_token: args.drive_token,
            drive_key: args.drive_key,
            drive_key_file: args.drive_key_file,
            proxy_port: args.proxy_port,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Modes {
    /// Size and price a vessel, with cold-stretch comparison and agitator advice.
    Estimate(EstimateOpts),
    /// Ask the business assistant, using the latest drive spreadsheet as context.
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// Inspect or adjust the stored price defaults.
    Prices {
        #[command(subcommand)]
        command: PriceCommand,
    },
}

#[derive(Args, Debug)]
struct EstimateOpts {
    /// Nominal volume in m³.
    #[arg(long, short = 'v', default_value = "5", value_parser = parse_positive)]
    volume: f64,
    /// Grade code (S30408, S31603, Q345R, ...); other names are priced as custom.
    #[arg(long, short = 'm', default_value = "S30408")]
    material: String,
    /// Design pressure in MPa; negative for vacuum.
    #[arg(long, short = 'p', default_value = "-0.1", allow_negative_numbers = true)]
    pressure: f64,
    #[arg(long, default_value = "Glycol")]
    medium: String,
    /// half-pipe, jacket, coil or none.
    #[arg(long, default_value = "half-pipe")]
    heat: HeatExchangeStyle,
    #[arg(long, default_value_t = 8)]
    nozzles: u32,
    /// passivation, ra0.4, ra0.6 or ra0.8.
    #[arg(long, default_value = "passivation")]
    finish: SurfaceFinish,
    /// reactor, heat-exchanger, tank or column.
    #[arg(long, default_value = "reactor")]
    kind: EquipmentKind,
    /// Skip the AI recommendation and use the fallback.
    #[arg(long)]
    offline: bool,
    /// Print the quote as JSON instead of the text report.
    #[arg(long)]
    json: bool,
}

impl EstimateOpts {
    fn to_spec(&self) -> VesselSpec {
        VesselSpec {
            kind: self.kind,
            volume_m3: self.volume,
            material: Material::parse(&self.material),
            design_pressure_mpa: self.pressure,
            medium: self.medium.clone(),
            heat_exchange: self.heat,
            nozzle_count: self.nozzles,
            surface_finish: self.finish,
        }
    }
}

#[derive(Subcommand, Debug)]
enum PriceCommand {
    Show,
    /// Set the unit price (currency/kg) of a grade.
    Set {
        material: String,
        #[arg(value_parser = parse_positive)]
        price: f64,
    },
    /// Set one of the process rates.
    Rate {
        rate: RateKind,
        #[arg(value_parser = parse_non_negative)]
        value: f64,
    },
    /// Add a named lump-sum line to every quote; amount 0 removes it.
    Fee {
        name: String,
        #[arg(value_parser = parse_non_negative)]
        amount: f64,
    },
    /// Restore the default price table.
    Reset,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RateKind {
    Fabrication,
    Weld,
    Polish,
    Ndt,
    ColdStretch,
}

fn parse_positive(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|_| format!("`{raw}` is not a number"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("`{raw}` must be greater than zero"))
    }
}

fn parse_non_negative(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|_| format!("`{raw}` is not a number"))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("`{raw}` must not be negative"))
    }
}

async fn run_estimate(opts: &EstimateOpts, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let quote = build_quote(opts.to_spec(), settings, opts.offline).await;
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&quote)?);
    } else {
        print!("{}", render_quote(&quote));
    }
    Ok(())
}

async fn run_ask(query: &[String], settings: &Settings) -> Result<(), Box<dyn Error>> {
    let store = DatasetStore::default_location();
    log::debug!("[dataset-cache] using {}", store.path().display());
    let reply = ask_assistant(&query.join(" "), settings, &store).await;
    print!("{}", render_answer(&reply));
    Ok(())
}

fn run_prices(command: &PriceCommand, mut stored: Settings) -> Result<(), Box<dyn Error>> {
    let prices = &mut stored.prices;
    match command {
        PriceCommand::Show => {
            print!("{}", render_prices(prices));
            return Ok(());
        }
        PriceCommand::Set { material, price } => {
            prices.set_material_price(&Material::parse(material), *price);
        }
        PriceCommand::Rate { rate, value } => {
            let rates = &mut prices.rates;
            let slot = match rate {
                RateKind::Fabrication => &mut rates.fabrication_per_ton,
                RateKind::Weld => &mut rates.weld_per_meter,
                RateKind::Polish => &mut rates.polish_per_m2,
                RateKind::Ndt => &mut rates.ndt_per_meter,
                RateKind::ColdStretch => &mut rates.cold_stretch_per_m3,
            };
            *slot = *value;
        }
        PriceCommand::Fee { name, amount } => {
            prices.custom_fee = (*amount > 0.0).then(|| CustomFee {
                name: name.clone(),
                amount: *amount,
            });
        }
        PriceCommand::Reset => {
            *prices = PriceTable::default();
        }
    }

    let path = save_settings(&stored)?;
    print!("{}", render_prices(&stored.prices));
    println!("\nSaved to {}", path.display());
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let stored = load_settings();
    let mut settings = stored.clone();
    settings.apply_overrides(cli.overrides.into());

    match &cli.mode {
        Modes::Estimate(opts) => run_estimate(opts, &settings).await,
        Modes::Ask { query } => run_ask(query, &settings).await,
        Modes::Prices { command } => run_prices(command, stored),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_logger();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
