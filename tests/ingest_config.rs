// tests/ingest_config.rs
use market_digest::ingest::config::{default_feeds, load_feeds, load_feeds_from};
use std::{env, fs};

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("feeds.toml");
    fs::write(
        &p_toml,
        r#"
[[feeds]]
name = "markets"
url = " https://news.example/markets.rss "

[[feeds]]
name = "again"
url = "https://news.example/markets.rss"
"#,
    )
    .unwrap();
    let v = load_feeds_from(&p_toml).unwrap();
    assert_eq!(v.len(), 1);
    assert_eq!(v[0].name, "markets");
    assert_eq!(v[0].url, "https://news.example/markets.rss");

    let p_json = dir.path().join("feeds.json");
    fs::write(
        &p_json,
        r#"[{"name":"energy","url":"https://news.example/energy.rss"},{"name":"x","url":"  "}]"#,
    )
    .unwrap();
    let vj = load_feeds_from(&p_json).unwrap();
    assert_eq!(vj.len(), 1);
    assert_eq!(vj[0].name, "energy");
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("feeds.toml");
    fs::write(&p, "this is not a feed list").unwrap();
    assert!(load_feeds_from(&p).is_err());
}

#[serial_test::serial]
#[test]
fn default_lookup_prefers_toml_then_json_then_builtin() {
    // Isolate CWD so the repo's own config/ is not read.
    let old = env::current_dir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    env::set_current_dir(dir.path()).unwrap();

    let builtin = load_feeds(None).unwrap();
    assert_eq!(builtin, default_feeds());

    fs::create_dir_all("config").unwrap();
    fs::write(
        "config/feeds.json",
        r#"[{"name":"json","url":"https://j/rss"}]"#,
    )
    .unwrap();
    assert_eq!(load_feeds(None).unwrap()[0].name, "json");

    fs::write(
        "config/feeds.toml",
        "[[feeds]]\nname = \"toml\"\nurl = \"https://t/rss\"\n",
    )
    .unwrap();
    assert_eq!(load_feeds(None).unwrap()[0].name, "toml");

    env::set_current_dir(old).unwrap();
}
