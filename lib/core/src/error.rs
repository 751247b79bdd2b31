//! Shared `Result` alias.
//!
//! Error enums live next to the code that raises them (`GateError` in the
//! gate crate, `StateError` in the CLI); this alias only fixes the `Report`
//! wrapper they travel in.

use rootcause::Report;

/// `Result` whose error is a rootcause `Report` over context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
