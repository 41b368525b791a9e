//! Request pattern model and legacy → canonical normalization.
//!
//! # Module Structure
//!
//! - `types` - Pattern building blocks (string value, multi value, URL, method)
//! - `legacy` - Legacy single-value request pattern
//! - `canonical` - Canonical multi-value request pattern
//! - `normalize` - Conversion from legacy to canonical form

mod canonical;
mod legacy;
mod normalize;
mod types;

pub use canonical::NewRequestPattern;
pub use legacy::{RequestPattern, ValuePattern};
pub use normalize::{normalize, UrlConflictPolicy};
pub use types::{MultiValuePattern, RequestMethod, StringValuePattern, UrlPattern};
