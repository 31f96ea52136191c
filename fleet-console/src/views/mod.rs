pub mod dashboard;
pub mod overview;
pub mod system;

pub use dashboard::InstanceListView;
pub use system::SystemView;
