pub mod config;
pub mod content;
pub mod doctor;
pub mod post;
pub mod run;
