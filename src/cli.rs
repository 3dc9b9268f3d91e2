//! Helpers shared by the binaries: amount prompt, token units, signal handling
//! and end-of-run reporting

use crate::error::{CompounderError, CompounderResult};
use crate::workflow::GasTracker;

use ethers::types::U256;
use ethers::utils::{format_units, parse_units, ParseUnits};
use std::future::Future;
use std::io::{self, BufRead, Write};
use tokio::signal;
use tracing::{error, warn};

/// Every token handled here (CRV, crvUSD, the pool LP token) has 18 decimals
pub const TOKEN_DECIMALS: u32 = 18;

/// Parse a decimal token amount into base units.
///
/// Parsing is done on the decimal string, never through floating point.
/// Zero and negative amounts are invalid.
pub fn parse_token_amount(input: &str) -> CompounderResult<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CompounderError::InvalidAmount("no amount entered".to_string()));
    }

    let parsed = parse_units(trimmed, TOKEN_DECIMALS)
        .map_err(|e| CompounderError::InvalidAmount(format!("{:?}: {}", trimmed, e)))?;

    let amount = match parsed {
        ParseUnits::U256(amount) => amount,
        ParseUnits::I256(_) => {
            return Err(CompounderError::InvalidAmount(format!(
                "{:?} is negative",
                trimmed
            )))
        }
    };

    if amount.is_zero() {
        return Err(CompounderError::InvalidAmount(format!("{:?} is zero", trimmed)));
    }

    Ok(amount)
}

/// Render base units as a decimal token amount
pub fn format_token_amount(amount: U256) -> String {
    format_units(amount, TOKEN_DECIMALS).unwrap_or_else(|_| amount.to_string())
}

/// Ask for an amount on stdout and read one line from stdin
pub fn prompt_amount(message: &str) -> CompounderResult<U256> {
    let stdin = io::stdin();
    read_amount(message, &mut stdin.lock(), &mut io::stdout())
}

fn read_amount(
    message: &str,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> CompounderResult<U256> {
    write!(output, "{}: ", message)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    parse_token_amount(&line)
}

/// Run `task` unless Ctrl+C or SIGTERM arrives first
pub async fn until_interrupted<F, T>(task: F) -> CompounderResult<T>
where
    F: Future<Output = CompounderResult<T>>,
{
    tokio::select! {
        result = task => result,
        _ = shutdown_signal() => Err(CompounderError::Interrupted),
    }
}

/// Log the gas spent and, on failure, whether the chain may already reflect part of the run
pub fn finish<T>(result: CompounderResult<T>, gas: &GasTracker) -> CompounderResult<T> {
    gas.log_summary();

    if let Err(e) = &result {
        error!("Run failed: {}", e);
        if e.is_post_submission() {
            warn!("A submitted transaction may still land; check the wallet before re-running");
        }
    }

    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
