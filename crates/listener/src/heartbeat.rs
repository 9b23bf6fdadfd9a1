use std::path::Path;

use tracing::warn;

/// Touch the heartbeat file so its mtime advances. The healthcheck treats
/// the listener as alive while this file's age stays within
/// `max_age_seconds` (SPEC_FULL §4.C "Heartbeat"; §6 "empty text file whose
/// mtime is the liveness signal").
pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            warn!(error = %err, path = %path.display(), "failed to create heartbeat directory");
            return;
        }
    }
    if let Err(err) = std::fs::File::create(path) {
        warn!(error = %err, path = %path.display(), "failed to touch heartbeat file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_creates_and_refreshes_mtime() {
        let path = std::env::temp_dir().join(format!("pulse-heartbeat-test-{}", std::process::id()));
        let _ = std::fs::remove_file(&path);

        touch(&path);
        let first = std::fs::metadata(&path).unwrap().modified().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        touch(&path);
        let second = std::fs::metadata(&path).unwrap().modified().unwrap();

        assert!(second >= first);
        let _ = std::fs::remove_file(&path);
    }
}
