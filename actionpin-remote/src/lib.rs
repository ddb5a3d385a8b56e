//! Remote resolvers.
//!
//! - [`GithubApiResolver`]: hosted API. Batched GraphQL with a token, REST
//!   without one.
//! - [`GitResolver`]: local `git ls-remote`, no credentials needed.

mod git;
mod github;
mod graphql;
mod http_status;
mod ls_remote;
mod tags;

pub use git::{GitConfig, GitResolver};
pub use github::{GithubApiConfig, GithubApiResolver};
pub use ls_remote::RefListing;
pub use tags::latest_version;
