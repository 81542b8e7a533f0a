pub mod align;
pub mod cache;
pub mod fetch;
