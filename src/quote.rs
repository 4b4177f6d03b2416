//! Best-quote venue selection and guarded execution.
//!
//! Every enabled venue's quoter is asked for a price; a failing or erroring
//! quoter yields "no quote" for that venue and is skipped — one bad venue
//! never aborts the whole call. The maximum quote wins, ties favoring the
//! lowest venue index, and the winner executes under a fixed downward
//! slippage allowance as the minimum-output guard.

use log::{debug, warn};
use serde::Serialize;

use crate::error::{Result, VaultError};
use crate::types::{AssetId, BPS_DENOM};
use crate::venue::VenueConfig;

/// The winning quote for one trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestQuote {
    pub venue_index: usize,
    pub amount_out: u128,
}

/// An executed swap, as reported back to the engine and the audit trail.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TradeExecution {
    pub venue_index: usize,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub amount_in: u128,
    pub quoted_out: u128,
    pub amount_out: u128,
}

/// Query every enabled venue and keep the best positive quote.
pub fn select_best_quote(
    venues: &[VenueConfig],
    asset_in: &AssetId,
    asset_out: &AssetId,
    amount_in: u128,
) -> Result<BestQuote> {
    let mut best: Option<BestQuote> = None;

    for (index, venue) in venues.iter().enumerate() {
        if !venue.enabled {
            continue;
        }
        // Per-venue Option<quote>: errors degrade to "no quote", never abort.
        let quote = match venue.quoter.quote(asset_in, asset_out, amount_in) {
            Ok(q) => q,
            Err(e) => {
                warn!("venue {index} quote failed for {asset_in}->{asset_out}: {e}");
                continue;
            }
        };
        if quote == 0 {
            continue;
        }
        debug!("venue {index} quotes {quote} {asset_out} for {amount_in} {asset_in}");
        // Strict > keeps the lowest index on ties.
        if best.is_none_or(|b| quote > b.amount_out) {
            best = Some(BestQuote {
                venue_index: index,
                amount_out: quote,
            });
        }
    }

    best.ok_or(VaultError::NoQuoteAvailable {
        asset_in: *asset_in,
        asset_out: *asset_out,
        amount_in,
    })
}

/// Select the best quote and execute on the winning venue, accepting at least
/// `min_out_bps` of the quoted output.
pub fn execute_best(
    venues: &[VenueConfig],
    asset_in: &AssetId,
    asset_out: &AssetId,
    amount_in: u128,
    min_out_bps: u32,
) -> Result<TradeExecution> {
    let best = select_best_quote(venues, asset_in, asset_out, amount_in)?;
    let min_out = best.amount_out * min_out_bps as u128 / BPS_DENOM;

    let amount_out = venues[best.venue_index]
        .executor
        .execute(asset_in, asset_out, amount_in, min_out)
        .map_err(|source| VaultError::Venue {
            index: best.venue_index,
            source,
        })?;

    Ok(TradeExecution {
        venue_index: best.venue_index,
        asset_in: *asset_in,
        asset_out: *asset_out,
        amount_in,
        quoted_out: best.amount_out,
        amount_out,
    })
}
