pub mod remote_handler;
pub mod reqwest_fetcher;

pub use remote_handler::HttpEntityHandler;
pub use reqwest_fetcher::ReqwestFetcher;
