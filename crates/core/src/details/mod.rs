//! Movie details: descriptive metadata for catalogued movies.
//!
//! Movies with a TMDB id get their details from TMDB when it is configured;
//! all others are looked up in local JSON files. Loaded details are cached
//! per movie and language, and their genres and titles become search tags.

mod local;
mod service;
mod types;

pub use local::load_local_details;
pub use service::DetailsService;
pub use types::{DetailsError, MovieDetails};
