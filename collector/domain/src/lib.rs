pub mod daily_price;
pub mod instrument;
pub mod numeric;
pub mod trade_date;

pub use daily_price::{DailyPriceRecord, RecordValidationError};
pub use instrument::Instrument;
pub use numeric::{clean_signed_int, NumericError};
pub use trade_date::{TradeDate, TradeDateError};
