// Binary locator for the local host
use std::path::{Path, PathBuf};
use tracing::debug;

use faultline_core::application::constants::OS_BIN;
use faultline_core::port::{BinaryLocator, ChannelError};

/// Resolves `<bin_dir>/chaos_os` and checks that it exists
pub struct BinDirLocator {
    bin_dir: PathBuf,
    binary_name: String,
}

impl BinDirLocator {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
            binary_name: OS_BIN.to_string(),
        }
    }

    /// Locator for the `bin/` directory next to the running executable
    pub fn beside_current_exe() -> Result<Self, ChannelError> {
        let exe = std::env::current_exe().map_err(|e| ChannelError::Io(e.to_string()))?;
        let dir = exe
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| ChannelError::BinaryNotFound(exe.display().to_string()))?;
        Ok(Self::new(dir.join("bin")))
    }

    pub fn with_binary_name(mut self, name: impl Into<String>) -> Self {
        self.binary_name = name.into();
        self
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }
}

impl BinaryLocator for BinDirLocator {
    fn locate(&self) -> Result<PathBuf, ChannelError> {
        let path = self.bin_dir.join(&self.binary_name);
        debug!(path = %path.display(), "Resolving fault-injection binary");
        if path.is_file() {
            Ok(path)
        } else {
            Err(ChannelError::BinaryNotFound(path.display().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary() {
        let locator = BinDirLocator::new("/nonexistent/faultline/bin");
        let err = locator.locate().unwrap_err();

        assert_eq!(
            err,
            ChannelError::BinaryNotFound("/nonexistent/faultline/bin/chaos_os".to_string())
        );
    }

    #[test]
    fn test_existing_binary() {
        let dir = std::env::temp_dir().join(format!("faultline-locator-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("chaos_os"), "#!/bin/sh\n").unwrap();

        let located = BinDirLocator::new(&dir).locate().unwrap();
        assert_eq!(located, dir.join("chaos_os"));

        let renamed = BinDirLocator::new(&dir).with_binary_name("chaos_other");
        assert!(renamed.locate().is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_beside_current_exe() {
        let locator = BinDirLocator::beside_current_exe().unwrap();
        assert!(locator.bin_dir().ends_with("bin"));
    }
}
