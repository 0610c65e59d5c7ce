use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const CONFIG: &str = r#"
indexes:
  year-index:
    parent_path: /blog
    key: "item.pub_date|dateformat('%Y')"
    subindex: month-index
    fields:
      title: "'Posts from ' ~ this._id"
    sections:
      month-index:
        key: "item.pub_date|dateformat('%m')"
"#;

fn post(title: &str, date: &str) -> String {
    format!("---\ntitle: {}\npub_date: {}\n---\nBody of {}.\n", title, date, title)
}

fn project() -> Result<TempDir, Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let blog = dir.path().join("content/blog");
    fs::create_dir_all(&blog)?;

    fs::write(blog.join("index.md"), "---\ntitle: Blog\n_order_by: -pub_date\n---\n")?;
    fs::write(blog.join("first.md"), post("First post", "2020-03-15"))?;
    fs::write(blog.join("second.md"), post("Second post", "2020-04-01"))?;
    fs::write(blog.join("old.md"), post("Old post", "2019-06-01"))?;
    fs::write(dir.path().join("index-pages.yaml"), CONFIG)?;
    Ok(dir)
}

#[allow(deprecated)]
fn indexpages(dir: &Path) -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("indexpages")?;
    cmd.current_dir(dir)
        .env_remove("INDEXPAGES_CONTENT")
        .env_remove("INDEXPAGES_CONFIG")
        .arg("--content")
        .arg(dir.join("content"))
        .arg("--config")
        .arg(dir.join("index-pages.yaml"));
    Ok(cmd)
}

fn build(dir: &Path) -> Result<assert_cmd::assert::Assert, Box<dyn std::error::Error>> {
    Ok(indexpages(dir)?
        .args(["build", "--site-title", "Test Site", "--output"])
        .arg(dir.join("public"))
        .assert()
        .success())
}

#[test]
fn build_writes_index_pages() -> Result<(), Box<dyn std::error::Error>> {
    let dir = project()?;
    build(dir.path())?.stdout(predicate::str::contains("Built 5 pages (0 unchanged, 0 removed)"));

    let public = dir.path().join("public");
    for page in ["blog/2020", "blog/2020/04", "blog/2020/03", "blog/2019", "blog/2019/06"] {
        assert!(public.join(page).join("index.html").exists(), "missing {}", page);
    }
    // the root is never built
    assert!(!public.join("blog/index.html").exists());

    let year = fs::read_to_string(public.join("blog/2020/index.html"))?;
    assert!(year.contains("<title>Posts from 2020 | Test Site</title>"));
    assert!(year.contains(r#"href="/blog/2020/04/""#));
    assert!(year.contains("Second post"));
    assert!(!year.contains("Old post"));

    assert!(public.join(".indexpages-state.json").exists());
    Ok(())
}

#[test]
fn rebuild_skips_unchanged_pages() -> Result<(), Box<dyn std::error::Error>> {
    let dir = project()?;
    build(dir.path())?;
    build(dir.path())?.stdout(predicate::str::contains("Built 0 pages (5 unchanged, 0 removed)"));

    // a title edit keeps every checksum but changes a dependency
    fs::write(
        dir.path().join("content/blog/first.md"),
        post("First post, edited", "2020-03-15"),
    )?;
    build(dir.path())?.stdout(predicate::str::contains("Built 2 pages (3 unchanged, 0 removed)"));

    let month = fs::read_to_string(dir.path().join("public/blog/2020/03/index.html"))?;
    assert!(month.contains("First post, edited"));
    Ok(())
}

#[test]
fn rebuild_removes_stale_pages() -> Result<(), Box<dyn std::error::Error>> {
    let dir = project()?;
    build(dir.path())?;

    fs::write(dir.path().join("content/blog/old.md"), post("Old post", "2021-02-01"))?;
    build(dir.path())?.stdout(predicate::str::contains("Built 2 pages (3 unchanged, 2 removed)"));

    let public = dir.path().join("public");
    assert!(public.join("blog/2021/02/index.html").exists());
    assert!(!public.join("blog/2019/index.html").exists());
    assert!(!public.join("blog/2019/06/index.html").exists());
    Ok(())
}

#[test]
fn skip_build_flag_builds_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = project()?;
    indexpages(dir.path())?
        .args(["-f", "index-pages=skip-build", "build", "--output"])
        .arg(dir.path().join("public"))
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to build"));

    assert!(!dir.path().join("public/blog/2020/index.html").exists());
    Ok(())
}

#[test]
fn resolve_virtual_path_as_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = project()?;
    let assert = indexpages(dir.path())?
        .args(["resolve", "/blog@index-pages/year-index/2020", "--json"])
        .assert()
        .success();

    let json: Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(json["key"], "2020");
    assert_eq!(json["title"], "Posts from 2020");
    assert_eq!(json["url"], "/blog/2020/");
    assert_eq!(json["groups"][0]["key"], "04");
    assert_eq!(json["items"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn resolve_url() -> Result<(), Box<dyn std::error::Error>> {
    let dir = project()?;
    indexpages(dir.path())?
        .args(["resolve", "--url", "/blog/2019/06/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path:     /blog@index-pages/year-index/2019/06"))
        .stdout(predicate::str::contains("members:  1"));
    Ok(())
}

#[test]
fn resolve_unknown_path_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = project()?;
    indexpages(dir.path())?
        .args(["resolve", "/blog@index-pages/year-index/1999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No index page found"));

    indexpages(dir.path())?
        .args(["resolve", "/blog/2020"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a virtual path"));
    Ok(())
}

#[test]
fn list_prints_tree() -> Result<(), Box<dyn std::error::Error>> {
    let dir = project()?;
    indexpages(dir.path())?
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("/blog@index-pages/year-index  /blog/  (not built)"))
        .stdout(predicate::str::contains("  /blog@index-pages/year-index/2020  /blog/2020/\n"))
        .stdout(predicate::str::contains(
            "    /blog@index-pages/year-index/2020/04  /blog/2020/04/\n",
        ));
    Ok(())
}

#[test]
fn invalid_config_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = project()?;
    fs::write(
        dir.path().join("index-pages.yaml"),
        "indexes:\n  year-index:\n    parent_path: /blog\n",
    )?;

    indexpages(dir.path())?
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid index configuration"))
        .stderr(predicate::str::contains("key required"));
    Ok(())
}

#[test]
fn missing_content_dir_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    #[allow(deprecated)]
    Command::cargo_bin("indexpages")?
        .current_dir(dir.path())
        .args(["--content", "nope", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    Ok(())
}
