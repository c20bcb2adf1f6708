pub mod deal_loader;
pub mod secrets;

pub use deal_loader::{load_deal_data, DealData, DealOrigin, DealSources, LoadOptions};
pub use secrets::SecretManagerService;
