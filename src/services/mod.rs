pub mod financial;
pub mod imagery;
pub mod llm_service;
pub mod research;

pub use imagery::{ImageryService, StaticMapImagery};
pub use llm_service::LlmService;
pub use research::{RenovationAnalysis, ResearchService};
