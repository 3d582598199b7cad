pub mod chart_renderer;
pub mod notifier;
pub mod sample_source;
pub mod snapshot_storage;

pub use chart_renderer::{Chart, ChartError, ChartRenderer};
pub use notifier::{Command, NotifyError, Notifier};
pub use sample_source::{SampleError, SampleSource};
pub use snapshot_storage::{SnapshotLoad, SnapshotStorage, StoreError};
