pub mod completions;
pub mod configure;
pub mod partitions;
pub mod policy;
pub mod rotate;

pub use completions::CompletionsCommand;
pub use configure::ConfigureCommand;
pub use partitions::PartitionsCommand;
pub use policy::PolicyCommand;
pub use rotate::{RotateCommand, RotateKind};
