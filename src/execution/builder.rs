//! Order builder

use super::TradeInstruction;
use crate::orderbook::{Side, SyntheticOrderBook};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Build a buy instruction against `book` at the given price and size
pub fn build_instruction(
    book: &SyntheticOrderBook,
    price: Decimal,
    size: Decimal,
    timestamp: DateTime<Utc>,
) -> TradeInstruction {
    TradeInstruction {
        market_slug: book.market_slug.clone(),
        market_id: book.market_id.clone(),
        asset_id: book.asset_id.clone(),
        outcome_name: book.outcome_name.clone(),
        side: Side::Buy,
        price,
        size,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_build_copies_book_identity() {
        let book = SyntheticOrderBook::new("mlb-tex-bal", "512", "Rangers", "tok-a");
        let now = Utc::now();

        let instruction = build_instruction(&book, dec!(0.45), dec!(100), now);

        assert_eq!(instruction.market_slug, "mlb-tex-bal");
        assert_eq!(instruction.market_id, "512");
        assert_eq!(instruction.asset_id, "tok-a");
        assert_eq!(instruction.outcome_name, "Rangers");
        assert_eq!(instruction.side, Side::Buy);
        assert_eq!(instruction.price, dec!(0.45));
        assert_eq!(instruction.size, dec!(100));
        assert_eq!(instruction.timestamp, now);
    }
}
