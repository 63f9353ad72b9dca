pub mod state;
pub mod stock;
pub mod timeframe;

pub use state::{SessionState, StatusMessage};
pub use stock::{PriceBar, PriceSeries, StockInfo, UNKNOWN};
pub use timeframe::TimeFrame;
