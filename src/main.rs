use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::error;

use timecapsule::browser::{capsule_json, print_capsule};
use timecapsule::config::{default_settings_path, Settings};
use timecapsule::utils::{setup_logging, validate_args};
use timecapsule::{init_default_rules, load_rules, recall_browser_history};
use timecapsule::{Args, Lookback, Period, SearchConfig};

fn run(args: &Args) -> Result<()> {
    let settings_path = match &args.config {
        Some(path) => path.clone(),
        None => default_settings_path()?,
    };
    let settings = Settings::load_or_init(&settings_path, Utc::now().timestamp_millis())?;

    let lookback = match (args.days, &args.period) {
        (Some(days), _) => Lookback::from_days(days),
        (None, Some(label)) => Lookback::from(Period::from_label(label)),
        (None, None) => Lookback::from(settings.default_period),
    };

    let rules = load_rules(args.rules.as_deref())?;
    let config = SearchConfig {
        max_results: settings.max_history_items,
        ..SearchConfig::default()
    };

    let capsule = recall_browser_history(args, &lookback, &rules, &config)?;

    if args.json {
        println!("{}", capsule_json(&capsule)?);
    } else {
        print_capsule(&capsule, &lookback, args, settings.enable_analytics);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    if args.init {
        return init_default_rules();
    }

    validate_args(&args)?;

    match run(&args) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
