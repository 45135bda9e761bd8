//! Post URL derivation and short link resolution
//!
//! Every exported item that points at a post yields one line in the run's
//! `urls.html`: the short link as label, the resolved long URL as target.

mod derive;
mod redirect;

pub use derive::derive_post_url;
pub use redirect::{anchor_line, Resolution, ShortUrlResolver};
