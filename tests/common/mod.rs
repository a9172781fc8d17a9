#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use gipy::{BoardRevision, GpioConfig};

static DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Scratch sysfs tree under the system temp dir. The kernel is not around to
/// materialize `gpio<N>/` on export, so the per-pin files are pre-created.
pub struct FakeSysfs {
    pub root: PathBuf,
}

impl FakeSysfs {
    pub fn new(pins: &[u32]) -> Self {
        let root = std::env::temp_dir().join(format!(
            "gipy-test-{}-{}",
            std::process::id(),
            DIR_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&root).expect("create fake sysfs root");
        fs::write(root.join("export"), "").expect("create export file");
        fs::write(root.join("unexport"), "").expect("create unexport file");

        for pin in pins {
            let dir = root.join(format!("gpio{pin}"));
            fs::create_dir_all(&dir).expect("create pin dir");
            fs::write(dir.join("direction"), "in").expect("create direction file");
            fs::write(dir.join("edge"), "none").expect("create edge file");
            fs::write(dir.join("value"), "0").expect("create value file");
        }

        Self { root }
    }

    pub fn config(&self, board: BoardRevision) -> GpioConfig {
        GpioConfig {
            sysfs_root: self.root.clone(),
            board,
            ..GpioConfig::default()
        }
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root.join(rel)).expect("read fake sysfs file")
    }

    pub fn write(&self, rel: &str, contents: &str) {
        fs::write(self.root.join(rel), contents).expect("write fake sysfs file")
    }
}

impl Drop for FakeSysfs {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

pub fn wait_until<F: FnMut() -> bool>(mut pred: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    pred()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
