//! One sender per supported platform

mod bluesky;
mod devto;
mod discord;
mod github;
mod linkedin;
mod mastodon;
mod twitter;

pub use bluesky::BlueskySender;
pub use devto::{DevToSender, MAX_TAGS};
pub use discord::DiscordSender;
pub use github::{GithubCommentSender, IssueRef};
pub use linkedin::LinkedInSender;
pub use mastodon::MastodonSender;
pub use twitter::TwitterSender;
