pub mod agent;
pub mod message;
pub mod product;
pub mod status;
pub mod workflow;

pub use agent::*;
pub use message::*;
pub use product::*;
pub use status::*;
pub use workflow::*;
