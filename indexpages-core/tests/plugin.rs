mod common;

use common::*;
use indexpages_core::{ConfigError, ConfigSource, IndexConfig, IndexPagesPlugin};
use indexpages_expr::Engine;
use indexpages_types::{Pad, PRIMARY_ALT};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn plugin(options: &Options) -> IndexPagesPlugin {
    IndexPagesPlugin::new(Arc::new(Engine), ConfigSource::Inline(config(options)))
}

fn file_plugin(yaml: &str) -> (TempDir, IndexPagesPlugin) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index-pages.yaml");
    fs::write(&path, yaml).unwrap();
    let plugin = IndexPagesPlugin::new(Arc::new(Engine), ConfigSource::File(path));
    (dir, plugin)
}

fn site(pad: &dyn Pad) -> &dyn Pad {
    pad
}

fn config_error(yaml: &str) -> ConfigError {
    let config = IndexConfig::from_str(yaml).unwrap();
    IndexPagesPlugin::new(Arc::new(Engine), ConfigSource::Inline(config))
        .read_config()
        .unwrap_err()
}

#[test]
fn test_read_config_is_cached_until_next_build() {
    let (dir, plugin) = file_plugin(&config_yaml(&Options::default()));

    let first = plugin.read_config().unwrap();
    assert!(Arc::ptr_eq(&first, &plugin.read_config().unwrap()));
    assert_eq!(first.index_names().collect::<Vec<_>>(), vec!["year-index"]);

    let edited = config_yaml(&Options::default()).replace("year-index:", "by-year:");
    fs::write(dir.path().join("index-pages.yaml"), edited).unwrap();
    assert!(Arc::ptr_eq(&first, &plugin.read_config().unwrap()));

    plugin.before_build_all();
    let second = plugin.read_config().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.index_names().collect::<Vec<_>>(), vec!["by-year"]);
}

#[test]
fn test_config_errors_are_not_cached() {
    let (dir, plugin) = file_plugin("indexes:\n  year-index:\n    parent_path: /blog\n");
    assert!(matches!(plugin.read_config(), Err(ConfigError::MissingKey { .. })));

    fs::write(dir.path().join("index-pages.yaml"), config_yaml(&Options::default())).unwrap();
    assert!(plugin.read_config().is_ok());
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    let plugin = IndexPagesPlugin::new(
        Arc::new(Engine),
        ConfigSource::File(dir.path().join("missing.yaml")),
    );
    assert!(matches!(plugin.read_config(), Err(ConfigError::Read { .. })));
}

#[test]
fn test_missing_key() {
    let err = config_error("indexes:\n  year-index:\n    parent_path: /blog\n");
    assert_eq!(err.to_string(), "<inline config>: section [year-index]: key required");
}

#[test]
fn test_dotted_field_name() {
    let err = config_error("indexes:\n  year-index:\n    key: item._id\n    fields:\n      a.b: \"1\"\n");
    assert!(matches!(err, ConfigError::DottedFieldName { ref name, .. } if name == "a.b"));
    assert!(err.to_string().contains("[year-index.fields]"));
}

#[test]
fn test_expression_syntax_error() {
    let err = config_error("indexes:\n  year-index:\n    key: messed up\n");
    let ConfigError::ExpressionSyntax {
        section,
        name,
        expression,
        ..
    } = &err
    else {
        panic!("unexpected error: {}", err);
    };
    assert_eq!((section.as_str(), name.as_str(), expression.as_str()), ("year-index", "key", "messed up"));
    assert!(err.to_string().contains("in expression \"messed up\""));
}

#[test]
fn test_unknown_subindex() {
    let err = config_error("indexes:\n  year-index:\n    key: item._id\n    subindex: month-index\n");
    assert!(matches!(err, ConfigError::UnknownSubindex { ref subindex, .. } if subindex == "month-index"));
}

#[test]
fn test_generate() {
    let pad = blog_pad();
    let plugin = plugin(&Options::default());
    let blog = pad.get("/blog", PRIMARY_ALT).unwrap();
    let home = pad.get("/", PRIMARY_ALT).unwrap();

    let roots = plugin.generate(&pad, &blog).unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].path(), ROOT_PATH);
    assert!(plugin.generate(&pad, &home).unwrap().is_empty());
}

#[test]
fn test_skip_build_flag() {
    let pad = blog_pad();
    let mut plugin = plugin(&Options::default());
    let blog = pad.get("/blog", PRIMARY_ALT).unwrap();

    plugin.setup(&HashMap::from([("index-pages".to_string(), "foo, skip-build".to_string())]));
    assert!(plugin.skip_build());
    assert!(plugin.generate(&pad, &blog).unwrap().is_empty());

    // resolution keeps working
    let node = plugin.resolve_virtual_path(&pad, &blog, &["year-index", "2020"]).unwrap();
    assert!(node.is_some());

    plugin.setup(&HashMap::new());
    assert!(!plugin.skip_build());
    assert_eq!(plugin.generate(&pad, &blog).unwrap().len(), 1);
}

#[test]
fn test_resolve_url() {
    let pad = blog_pad();
    let plugin = plugin(&Options::default().with_months());
    let blog = pad.get("/blog", PRIMARY_ALT).unwrap();

    let node = plugin.resolve_url(&pad, &blog, &["2020", "03"]).unwrap().unwrap();
    assert_eq!(node.path(), format!("{}/2020/03", ROOT_PATH));
    assert!(plugin.resolve_url(&pad, &blog, &["2020", "05"]).unwrap().is_none());
}

#[test]
fn test_index_pages_global() {
    let pad = blog_pad();
    let plugin = plugin(&Options::default());

    let pages = plugin.index_pages(Some(site(&pad)), "year-index", None).unwrap().defined().unwrap();
    assert_eq!(pages.to_string(), "<index_pages('year-index')>");
    assert_eq!(pages.index_name(), "year-index");
    assert!(!pages.is_empty(&pad).unwrap());
    let ids: Vec<_> = pages.indexes(&pad).unwrap().iter().map(|s| s.id().to_string()).collect();
    assert_eq!(ids, vec!["2020", "2019"]);
}

#[test]
fn test_index_pages_global_with_alt() {
    let pad = blog_pad_in("xx");
    let plugin = plugin(&Options::default());

    let pages = plugin.index_pages(Some(site(&pad)), "year-index", Some("xx")).unwrap().defined().unwrap();
    assert_eq!(pages.to_string(), "<index_pages('year-index', 'xx')>");
    assert_eq!(pages.alt(), "xx");
}

#[test]
fn test_index_pages_global_undefined() {
    let pad = blog_pad();
    let plugin = plugin(&Options::default());

    let missing_index = plugin.index_pages(Some(site(&pad)), "no-such-index", None).unwrap();
    assert!(missing_index.is_undefined());

    // no record exists at /blog in this alt
    let missing_parent = plugin.index_pages(Some(site(&pad)), "year-index", Some("de")).unwrap();
    assert!(missing_parent.is_undefined());

    let no_pad = plugin.index_pages(None, "year-index", None).unwrap();
    assert!(no_pad.is_undefined());
}

#[test]
fn test_empty_index() {
    let pad = blog_pad();
    let yaml = "indexes:\n  tag-index:\n    parent_path: /blog\n    key: item.tags\n";
    let plugin = IndexPagesPlugin::new(
        Arc::new(Engine),
        ConfigSource::Inline(IndexConfig::from_str(yaml).unwrap()),
    );

    let pages = plugin.index_pages(Some(site(&pad)), "tag-index", None).unwrap().defined().unwrap();
    assert!(pages.is_empty(&pad).unwrap());
    assert!(pages.indexes(&pad).unwrap().is_empty());
}
