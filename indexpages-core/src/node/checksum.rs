use serde_json::{json, Value as Json};

/// What a node's content depends on besides its path
pub(crate) enum Members {
    /// Member record paths, in order
    Paths(Vec<String>),
    /// Page count of a paginated anchor whose pages are built separately
    PageCount(usize),
}

/// Checksum input: `[path, members, subindex ids?]`
pub(crate) fn checksum_data(path: &str, members: &Members, subindex_ids: Option<&[String]>) -> Json {
    let members = match members {
        Members::Paths(paths) => json!(paths),
        Members::PageCount(pages) => json!(format!("NPAGES={}", pages)),
    };
    match subindex_ids {
        Some(ids) => json!([path, members, ids]),
        None => json!([path, members]),
    }
}

pub(crate) fn digest(data: &Json) -> String {
    blake3::hash(data.to_string().as_bytes()).to_hex().to_string()
}

/// Stable global id derived from a node path
pub(crate) fn gid(path: &str) -> String {
    blake3::hash(path.as_bytes()).to_hex().to_string()
}
