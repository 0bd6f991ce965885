pub mod config;
pub mod events;
pub mod features;
pub mod form;
pub mod new;
