use std::path::{Path, PathBuf};

/// Builds the well-known sysfs control-file paths for a GPIO base directory.
/// Pure formatting, no I/O.
#[derive(Debug, Clone)]
pub struct SysfsPaths {
    root: PathBuf,
}

impl SysfsPaths {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn export(&self) -> PathBuf {
        self.root.join("export")
    }

    pub fn unexport(&self) -> PathBuf {
        self.root.join("unexport")
    }

    pub fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    pub fn direction(&self, pin: u32) -> PathBuf {
        self.pin_dir(pin).join("direction")
    }

    pub fn edge(&self, pin: u32) -> PathBuf {
        self.pin_dir(pin).join("edge")
    }

    pub fn value(&self, pin: u32) -> PathBuf {
        self.pin_dir(pin).join("value")
    }
}
