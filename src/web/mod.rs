pub mod api;
pub mod server;
pub mod state;
pub mod view;

pub use server::*;
pub use state::*;
pub use view::*;
