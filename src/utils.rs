use time::macros::format_description;
use tracing_subscriber::{fmt::time::LocalTime, EnvFilter};

pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let timer = LocalTime::new(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));

    // A subscriber may already be installed when running under a test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn format_number(num: u64) -> String {
    let digits = num.to_string();
    let mut formatted = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(c);
    }
    formatted
}

pub fn redact_domain(domain: &str) -> String {
    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() <= 1 {
        return domain.to_string();
    }

    if parts[parts.len() - 2].len() <= 3 {
        return format!("???.{}", parts[parts.len() - 1]);
    }

    let redacted_parts: Vec<String> = parts[..parts.len() - 1]
        .iter()
        .map(|part| "*".repeat(part.len()))
        .collect();

    let mut result = redacted_parts.join(".");
    result.push('.');
    result.push_str(parts[parts.len() - 1]);
    result
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if args.top == 0 {
        anyhow::bail!("--top must be greater than 0");
    }

    if let Some(days) = args.days {
        if days < 0 {
            anyhow::bail!("--days must not be negative");
        }
    }

    Ok(())
}
