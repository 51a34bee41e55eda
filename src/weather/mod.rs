pub mod cache;
pub mod weatherapi;

pub use cache::{CacheLookup, WeatherCache, WeatherKind};
pub use weatherapi::WeatherApiClient;
