//! Terminal UI layer over the user store.
//!
//! Views are an explicit enum, the login flag lives in [`Session`], and form
//! handlers in [`actions`] return notices plus a navigation hint. Only
//! [`console`] talks to the terminal.

pub mod actions;
pub mod console;
pub mod session;
pub mod view;

pub use actions::{Level, Navigation, Notice, Outcome};
pub use session::Session;
pub use view::View;
