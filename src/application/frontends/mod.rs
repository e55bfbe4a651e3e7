//! Built-in frontends.
//!
//! A frontend serves one resource and exposes one method per filename it can
//! generate. Method names are the filename with `.` replaced by `_`; the table
//! is fixed when the frontend is built, and any other name is unknown.

mod asterisk;
mod ini;

use crate::application::handler::ResolvedHandler;

pub use asterisk::AsteriskFrontend;

pub trait Frontend: Send + Sync {
    /// Resource name this frontend answers for.
    fn name(&self) -> &str;

    /// Handler for a method name, if the frontend has one.
    fn method(&self, method: &str) -> Option<ResolvedHandler>;
}
