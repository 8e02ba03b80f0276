//! # synjoint-session
//!
//! Client-side session coordination for the Synjoint marketing site: tracks
//! the signed-in user, derives a role, and mirrors the blog articles and job
//! postings collections from the content store.
//!
//! The [`coordinator::Coordinator`] is the only stateful piece; everything
//! it talks to sits behind the capability traits in [`provider`]. The
//! [`memory`] module ships in-process implementations of those traits.

pub mod config;
pub mod content;
pub mod coordinator;
pub mod identity;
pub mod memory;
pub mod provider;

pub use config::SessionConfig;
pub use coordinator::{AuthPhase, AuthState, Collaborators, Coordinator};
pub use identity::{DerivedUser, Role};
