use anyhow::Result;
use ethers::types::Address;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::str::FromStr;

pub fn setup_logger() -> Result<()> {
    let colors = ColoredLevelConfig {
        trace: Color::Cyan,
        debug: Color::Magenta,
        info: Color::Green,
        warn: Color::Yellow,
        error: Color::BrightRed,
        ..ColoredLevelConfig::new()
    };

    let level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|l| LevelFilter::from_str(&l).ok())
        .unwrap_or(LevelFilter::Info);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}[{}] {}",
                chrono::Local::now().format("[%H:%M:%S]"),
                colors.color(record.level()),
                message
            ))
        })
        .chain(std::io::stdout())
        .level(LevelFilter::Error)
        .level_for("token_pricer", level)
        .apply()?;

    Ok(())
}

/// Lowercase `0x`-prefixed hex form used as the token list lookup key.
pub fn canonical_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

/// Canonicalize an address string from an external listing. Returns `None` for
/// anything that is not a 20-byte hex address (non-EVM platforms list other formats).
pub fn canonicalize_listed_address(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))?;
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("0x{}", digits.to_ascii_lowercase()))
}
