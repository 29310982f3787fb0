//! Service Kit - Capability Providers
//!
//! Providers that implement `agent_core::Capability` for research work.
//! Each one may fail; the registry turns failures into observations.

mod arxiv;
mod calculator;
mod critical_search;
mod ddg_search;
mod google_search;
mod python_repl;
mod weather;
mod wikipedia;
mod wolfram;

use std::time::Duration;

pub use arxiv::Arxiv;
pub use calculator::{Calculator, evaluate};
pub use critical_search::CriticalSearch;
pub use ddg_search::DdgSearch;
pub use google_search::GoogleSearch;
pub use python_repl::{PythonRepl, find_interpreter};
pub use weather::OpenWeatherMap;
pub use wikipedia::Wikipedia;
pub use wolfram::WolframAlpha;

use crate::error::Result;

const USER_AGENT: &str = concat!("research-agent/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client shared by every network-backed provider
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}
