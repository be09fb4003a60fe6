//! Domain error and result types for Shroud.
//!
//! Every fallible library operation returns [`Result<T>`], an alias over
//! [`ShroudError`]. Detectors report their own failures as
//! [`DetectorFailure`] so that composite detectors can degrade instead of
//! aborting the whole request.
//!
//! ```rust
//! use shroud::domain::{Result, ShroudError};
//!
//! fn check(text: &str) -> Result<()> {
//!     if text.trim().is_empty() {
//!         return Err(ShroudError::empty_text());
//!     }
//!     Ok(())
//! }
//! # assert!(check("   ").is_err());
//! ```

pub mod errors;
pub mod result;

pub use errors::{DetectorFailure, ShroudError};
pub use result::Result;
