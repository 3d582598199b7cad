pub mod chart;
pub mod log;
pub mod procfs;
pub mod store;
pub mod telegram;

pub use chart::SvgChartRenderer;
pub use log::LogNotifier;
pub use procfs::{ProcfsConfig, ProcfsSampleSource};
pub use store::{JsonFileStorage, MemoryStorage};
pub use telegram::TelegramNotifier;
