pub mod input;
pub mod link;

pub use input::parse_link_list;
pub use link::{EXAMPLE_LINK, LogId, extract};
