pub mod handler;
pub mod service;

pub use handler::UserHandler;
pub use service::{GreetingService, UserService};
