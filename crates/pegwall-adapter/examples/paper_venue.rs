/*
[INPUT]:  Paper venue balances and a couple of wall orders
[OUTPUT]: Reserved/released balances and nonce resynchronization printed to stdout
[POS]:    Examples - exchange adapter contract
[UPDATE]: When the ExchangeAdapter contract changes
*/

use std::str::FromStr;

use pegwall_adapter::*;
use rust_decimal::{Decimal, RoundingStrategy};

/// Example: drive the paper venue through the adapter contract
#[tokio::main]
async fn main() {
    println!("=== Paper Venue Example ===\n");

    let venue = PaperExchange::new("paper", "nbt").with_balances([
        ("usd", Decimal::from(1_000)),
        ("nbt", Decimal::from(500)),
    ]);
    let credentials = Credentials::new("demo-key", "demo-secret");
    let units = UnitPair::new("usd", "nbt");
    let adapter: &dyn ExchangeAdapter = &venue;
    println!("✓ venue {} quoting {}", ExchangeId::of(adapter), units);

    let bid_price = Decimal::from_str("0.998").unwrap_or(Decimal::ONE);
    let ask_price = Decimal::from_str("1.002").unwrap_or(Decimal::ONE);

    for (side, price) in [(Side::Bid, bid_price), (Side::Ask, ask_price)] {
        let unit = units.funding_unit(side);
        let balance = match adapter.get_balance(unit, &credentials).await {
            Ok(balance) => balance,
            Err(e) => {
                eprintln!("balance query failed: {e}");
                return;
            }
        };
        let size = match side {
            Side::Bid => (balance / price).round_dp_with_strategy(8, RoundingStrategy::ToZero),
            Side::Ask => balance,
        };
        match adapter
            .place_order(&units.quote_unit, side, &credentials, size, price)
            .await
        {
            Ok(()) => println!("✓ {side} {size} @ {price}"),
            Err(e) => eprintln!("✗ {side} rejected: {e}"),
        }
    }

    println!("\nOpen orders: {}", venue.open_orders("usd").len());
    println!("Free usd: {}", venue.balance("usd"));
    println!("Free nbt: {}", venue.balance("nbt"));

    // A second ask has nothing left to reserve.
    if let Err(e) = adapter
        .place_order("usd", Side::Ask, &credentials, Decimal::ONE, ask_price)
        .await
    {
        println!("\n✗ expected rejection: {e}");
        adapter.adjust(&e).await;
        println!("  nonce shift now {}", adapter.nonce_shift());
    }

    if let Err(e) = adapter.cancel_orders("usd", &credentials).await {
        eprintln!("cancel failed: {e}");
        return;
    }
    println!("\n✓ cancelled; free usd {} / nbt {}", venue.balance("usd"), venue.balance("nbt"));
}
