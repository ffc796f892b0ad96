pub mod bracket_session;
pub(crate) mod command;
pub(crate) mod deadline;
pub mod error_channel;
pub(crate) mod machine;
pub(crate) mod persistence;

pub use command::DeliverySink;
