//! # indexpages-render
//!
//! HTML rendering of index pages using Askama.

pub mod renderer;
pub mod templates;
pub mod view;

pub use renderer::{HtmlRenderer, GROUPS_TEMPLATE};
pub use templates::{GroupListTemplate, IndexPageTemplate};
pub use view::{GroupEntry, ItemEntry, LinkEntry, PageView, PagerView, ViewFields};
