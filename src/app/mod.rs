//! Interactive browser hosting the navigation pane

pub mod content;
#[cfg(feature = "runtime")]
pub mod browser;

#[cfg(feature = "runtime")]
pub use browser::{App, AsyncMessage};
pub use content::ContentHistory;
