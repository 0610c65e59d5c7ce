mod common;

use common::*;
use indexpages_core::{ComputationCache, IndexConfig, IndexNode, IndexSource, MemoryPad, Registry};
use indexpages_expr::Engine;
use indexpages_types::{Pad, Record, PRIMARY_ALT};
use std::sync::Arc;

#[test]
fn test_index_root_is_cached_per_record() {
    let pad = blog_pad();
    let registry = registry(&Options::default());

    let root = root(&registry, &pad);
    assert_eq!(root.path(), ROOT_PATH);
    assert!(Arc::ptr_eq(&root, &common::root(&registry, &pad)));
}

#[test]
fn test_source_is_cached_per_page() {
    let pad = blog_pad();
    let registry = registry(&Options::paginated(1));
    let root = root(&registry, &pad).to_node();

    for page_num in [None, Some(1), Some(2)] {
        let first = root.get_subgroup(&pad, "2020", page_num).unwrap();
        let again = root.get_subgroup(&pad, "2020", page_num).unwrap();
        assert_eq!(first.page_num(), page_num);
        assert!(Arc::ptr_eq(&first, &again));
    }
}

#[test]
fn test_subindex_ids_in_first_seen_order() {
    let pad = blog_pad();
    let registry = registry(&Options::default().with_months());
    let root = root(&registry, &pad);

    assert_eq!(*root.to_node().subindex_ids(&pad).unwrap(), vec!["2020", "2019"]);
    assert_eq!(ids(&root.subindexes(&pad).unwrap()), vec!["2020", "2019"]);

    let year = year(&registry, &pad, "2020");
    assert_eq!(ids(&year.subindexes(&pad).unwrap()), vec!["04", "03"]);
    assert_eq!(year.parent(), &IndexNode::Root(root));
}

#[test]
fn test_subgroup_members() {
    let pad = blog_pad();
    let registry = registry(&Options::default().with_months());

    let year = year(&registry, &pad, "2020");
    assert_eq!(year.children().paths(&pad), vec!["/blog/second-post", "/blog/first-post"]);

    let march = year.to_node().get_subgroup(&pad, "03", None).unwrap();
    assert_eq!(march.children().paths(&pad), vec!["/blog/first-post"]);

    let empty = year.to_node().get_subgroup(&pad, "12", None).unwrap();
    assert!(empty.children().paths(&pad).is_empty());
}

#[test]
fn test_subgroup_without_subindex_fails() {
    let pad = blog_pad();
    let registry = registry(&Options::default());
    let year = year(&registry, &pad, "2020");

    assert!(!year.to_node().has_subindex());
    assert!(year.to_node().get_subgroup(&pad, "03", None).is_err());
    assert!(year.to_node().subindex_ids(&pad).unwrap().is_empty());
}

#[test]
fn test_round_trip_of_key_derivation() {
    let pad = blog_pad();
    let registry = registry(&Options::default().with_months());
    let root = root(&registry, &pad).to_node();

    let year = root.resolve_virtual_path(&pad, &["2020"]).unwrap().unwrap();
    assert_eq!(year.path(), format!("{}/2020", ROOT_PATH));
    assert_eq!(year.children().paths(&pad), vec!["/blog/second-post", "/blog/first-post"]);

    let april = root.resolve_virtual_path(&pad, &["2020", "04"]).unwrap().unwrap();
    assert_eq!(april.children().paths(&pad), vec!["/blog/second-post"]);

    assert!(root.resolve_virtual_path(&pad, &["1999"]).unwrap().is_none());
}

#[test]
fn test_resolve_virtual_path() {
    // (path, expected node kind); kinds mention "month" and "page" when
    // they need the sub-index or pagination to resolve
    let cases = [
        ("", Some("root")),
        ("199", None),
        ("2020", Some("year")),
        ("2020/page", None),
        ("2020/page/1", Some("year-page")),
        ("2020/page/2", None),
        ("2020/page/01", Some("year-page")),
        ("2020/page/1/1", None),
        ("2020/3", None),
        ("2020/03", Some("month")),
        ("2019/04", None),
        ("2019/03", Some("month")),
        ("2020/04/page", None),
        ("2020/04/page/1", Some("month-page")),
        ("2020/05/page/1", None),
        ("2020/04/page/1/x", None),
    ];

    for paginated in [false, true] {
        for months in [false, true] {
            let options = Options {
                per_page: paginated.then_some(20),
                months,
                ..Options::default()
            };
            let pad = blog_pad();
            let registry = registry(&options);

            for (path, kind) in cases {
                let expected = kind
                    .filter(|kind| months || !kind.contains("month"))
                    .filter(|kind| paginated || !kind.contains("page"))
                    .map(|_| {
                        if path.is_empty() {
                            ROOT_PATH.to_string()
                        } else {
                            format!("{}/{}", ROOT_PATH, path.replace("/01", "/1"))
                        }
                    });
                assert_eq!(
                    resolve(&registry, &pad, path),
                    expected,
                    "path {:?}, paginated {}, months {}",
                    path,
                    paginated,
                    months
                );
            }
        }
    }
}

#[test]
fn test_virtual_page_bounds() {
    // 2020 has two members, one per page
    let pad = blog_pad();
    let registry = registry(&Options::paginated(1));

    let cases = [
        ("2020/page/1", true),
        ("2020/page/2", true),
        ("2020/page/0", false),
        ("2020/page/3", false),
        ("2020/page/two", false),
        ("2020/page/-1", false),
        ("2020/page/", false),
    ];
    for (path, found) in cases {
        let expected = found.then(|| format!("{}/{}", ROOT_PATH, path));
        assert_eq!(resolve(&registry, &pad, path), expected, "path {:?}", path);
    }
}

#[test]
fn test_resolve_url_path() {
    // (per_page, url, expected path below the root)
    let cases: [(Option<usize>, &str, Option<&str>); 12] = [
        (None, "", Some("")),
        (None, "x", None),
        (None, "2020", Some("/2020")),
        (Some(1), "2020", Some("/2020/page/1")),
        (Some(1), "2020/page", None),
        (Some(1), "2020/page/1", None),
        (Some(1), "2020/page/2", Some("/2020/page/2")),
        (Some(1), "2020/page/02", None),
        (Some(1), "2020/page/3", None),
        (None, "2020/04", Some("/2020/04")),
        (None, "2020/13", None),
        (Some(5), "2020/03", Some("/2020/03/page/1")),
    ];

    for months in [false, true] {
        for (per_page, url, expected) in cases {
            let options = Options {
                per_page,
                months,
                ..Options::default()
            };
            let pad = blog_pad();
            let registry = registry(&options);

            let is_month = url.split('/').count() == 2 && !url.contains("page");
            let expected = expected
                .filter(|_| months || !is_month)
                .map(|suffix| format!("{}{}", ROOT_PATH, suffix));
            assert_eq!(resolve_url(&registry, &pad, url), expected, "url {:?}, months {}", url, months);
        }
    }
}

#[test]
fn test_resolve_url_with_custom_slug() {
    let pad = blog_pad();
    let options = Options {
        slug_format: Some("'archive/' ~ this._id"),
        ..Options::default()
    };
    let registry = registry(&options);

    assert_eq!(
        resolve_url(&registry, &pad, "archive/2019"),
        Some(format!("{}/2019", ROOT_PATH))
    );
    assert_eq!(resolve_url(&registry, &pad, "2019"), None);
    assert_eq!(resolve_url(&registry, &pad, "archive"), None);
}

#[test]
fn test_punctuated_keys_get_distinct_urls() {
    let pad = MemoryPad::new()
        .with_record(Record::new("/"))
        .with_record(Record::new("/blog"))
        .with_record(Record::new("/blog/one").with_field("cat", "a&b"))
        .with_record(Record::new("/blog/two").with_field("cat", "ab"));
    let config = IndexConfig::from_str("indexes:\n  cats:\n    parent_path: /blog\n    key: item.cat\n").unwrap();
    let registry = Registry::from_config(&config, &Engine, Arc::new(ComputationCache::new())).unwrap();
    let root = registry.get_index_root(&pad, "cats", PRIMARY_ALT).unwrap().to_node();

    let urls: Vec<String> = root
        .subindexes(&pad)
        .unwrap()
        .iter()
        .map(|source| source.url_path(&pad).unwrap())
        .collect();
    assert_eq!(urls, vec!["/blog/a-b/", "/blog/ab/"]);

    let resolved = |url: &[&str]| root.resolve_url_path(&pad, url).unwrap().map(|n| n.id().to_string());
    assert_eq!(resolved(&["a-b"]).as_deref(), Some("a&b"));
    assert_eq!(resolved(&["ab"]).as_deref(), Some("ab"));
}

#[test]
fn test_registry_resolve_virtual_path() {
    let pad = blog_pad();
    let registry = registry(&Options::default().with_months());
    let blog = pad.get("/blog", PRIMARY_ALT).unwrap();
    let home = pad.get("/", PRIMARY_ALT).unwrap();

    let node = registry
        .resolve_virtual_path(&pad, &blog, &["year-index", "2020", "03"])
        .unwrap()
        .unwrap();
    assert_eq!(node.path(), format!("{}/2020/03", ROOT_PATH));

    let again = registry
        .resolve_virtual_path(&pad, &blog, &["year-index", "2020", "03"])
        .unwrap()
        .unwrap();
    let (IndexNode::Source(a), IndexNode::Source(b)) = (&node, &again) else {
        panic!("expected sources");
    };
    assert!(Arc::ptr_eq(a, b));

    let root = registry
        .resolve_virtual_path(&pad, &blog, &["year-index"])
        .unwrap()
        .unwrap();
    assert!(matches!(root, IndexNode::Root(_)));

    assert!(registry.resolve_virtual_path(&pad, &blog, &["no-such-index"]).unwrap().is_none());
    assert!(registry.resolve_virtual_path(&pad, &home, &["year-index"]).unwrap().is_none());
    assert!(registry.resolve_virtual_path(&pad, &blog, &[]).unwrap().is_none());
}

#[test]
fn test_registry_resolve_url_path() {
    let pad = blog_pad();
    let registry = registry(&Options::default());
    let blog = pad.get("/blog", PRIMARY_ALT).unwrap();
    let home = pad.get("/", PRIMARY_ALT).unwrap();

    let node = registry.resolve_url_path(&pad, &blog, &["2019"]).unwrap().unwrap();
    assert_eq!(node.path(), format!("{}/2019", ROOT_PATH));
    assert!(registry.resolve_url_path(&pad, &blog, &["1999"]).unwrap().is_none());
    assert!(registry.resolve_url_path(&pad, &home, &["2019"]).unwrap().is_none());
}

#[test]
fn test_iter_index_roots() {
    let pad = blog_pad();
    let registry = registry(&Options::default());
    let blog = pad.get("/blog", PRIMARY_ALT).unwrap();
    let home = pad.get("/", PRIMARY_ALT).unwrap();

    let roots = registry.iter_index_roots(&pad, &blog).unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].index_name(), "year-index");
    assert!(registry.iter_index_roots(&pad, &home).unwrap().is_empty());
}

#[test]
fn test_fresh_pad_reuses_grouping() {
    let pad = blog_pad();
    let registry = registry(&Options::default().with_months());

    let first = resolve(&registry, &pad, "2020/04");
    let misses = registry.cache().stats().misses;

    let fresh = pad.fresh();
    let second = resolve(&registry, &fresh, "2020/04");

    assert_eq!(first, second);
    let stats = registry.cache().stats();
    assert_eq!(stats.misses, misses);
    assert!(stats.hits > 0);

    let a: Arc<IndexSource> = year(&registry, &pad, "2020");
    let b: Arc<IndexSource> = year(&registry, &fresh, "2020");
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(a, b);
}

#[test]
fn test_clear_cache_recomputes() {
    let mut pad = blog_pad();
    let registry = registry(&Options::default());
    assert_eq!(*root(&registry, &pad).to_node().subindex_ids(&pad).unwrap(), vec!["2020", "2019"]);

    pad.insert(
        indexpages_types::Record::new("/blog/new-post")
            .with_field("pub_date", chrono::NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()),
    );
    let stale = pad.fresh();
    assert_eq!(*root(&registry, &stale).to_node().subindex_ids(&stale).unwrap(), vec!["2020", "2019"]);

    registry.cache().clear();
    let fresh = pad.fresh();
    assert_eq!(
        *root(&registry, &fresh).to_node().subindex_ids(&fresh).unwrap(),
        vec!["2021", "2020", "2019"]
    );
}
