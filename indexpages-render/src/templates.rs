//! Askama template definitions.

use crate::view::PageView;
use askama::Template;

/// Full index page: sub-groups, member list and pager
#[derive(Template)]
#[template(path = "index-pages.html")]
pub struct IndexPageTemplate<'a> {
    pub site_title: &'a str,
    pub page: &'a PageView,
}

/// Sub-groups only, for levels whose members are listed further down
#[derive(Template)]
#[template(path = "index-pages-groups.html")]
pub struct GroupListTemplate<'a> {
    pub site_title: &'a str,
    pub page: &'a PageView,
}
