//! Front end for the learnCJK.dev character lookup API.
//!
//! The lookup itself happens in a remote service; this crate fetches one
//! [`LookupResponse`] per character and turns it into pages, fragments, or
//! terminal output.

pub mod client;
pub mod lookup;
pub mod route;
pub mod view;
#[cfg(feature = "web")]
pub mod web;

pub use client::{ClientConfig, LookupClient, LookupError};
pub use lookup::{CjkLearn, Composition, Form, InputLang, LearnValue, LookupResponse, Region};
pub use route::{ViewMode, char_from_path, char_href, char_path, normalize_input};
pub use view::LookupView;
