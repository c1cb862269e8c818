//! Recording helpers that persist upstream response bodies as test fixtures.
//! Compiled only when the `test-mode` feature is enabled.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub(crate) fn get_fixture_dir() -> PathBuf {
    env::var("IW_FIXDIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures"))
}

/// Writes `body` to `<fixture dir>/<endpoint>_<key>.<ext>`.
/// Keys such as window ranges may contain `:`; those become `-`.
pub(crate) fn record_fixture(
    endpoint: &str,
    key: &str,
    ext: &str,
    body: &str,
) -> Result<(), std::io::Error> {
    let dir = get_fixture_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    let path = dir.join(format!("{endpoint}_{}.{ext}", safe_key(key)));

    let mut file = fs::File::create(&path)?;
    file.write_all(body.as_bytes())?;

    if env::var("IW_DEBUG").ok().as_deref() == Some("1") {
        eprintln!("IW_RECORD: wrote fixture to {}", path.display());
    }
    Ok(())
}

fn safe_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}
