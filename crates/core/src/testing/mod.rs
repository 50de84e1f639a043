//! Testing utilities: a mock metadata provider, a mock torrent client and
//! fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use moviebox_core::testing::{fixtures::VolumeFixture, MockExternalCatalog};
//!
//! let host = VolumeFixture::new(tmp.path())?;
//! let movies = host.mount("wd640", "sda1")?;
//! std::fs::write(movies.join("movie.mkv"), b"")?;
//! let resolver = host.resolver();
//! ```

mod mock_external_catalog;
mod mock_torrent_client;

pub use mock_external_catalog::{MockExternalCatalog, RecordedCatalogQuery};
pub use mock_torrent_client::MockTorrentClient;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    use crate::catalog::VolumeResolver;
    use crate::external_catalog::TmdbMovie;

    /// Image base URL reported by [`MockExternalCatalog`](super::MockExternalCatalog).
    pub const IMAGE_BASE_URL: &str = "http://image.tmdb.test/t/p/";

    /// Create a test TMDB movie. The poster path is derived from the id.
    pub fn tmdb_movie(id: u32, title: &str, year: u32) -> TmdbMovie {
        TmdbMovie {
            id,
            title: title.to_string(),
            original_title: Some(title.to_string()),
            release_date: Some(format!("{}-06-15", year)),
            runtime_minutes: Some(120),
            overview: Some(format!("A movie about {}.", title.to_lowercase())),
            poster_path: Some(format!("/{}.jpg", id)),
            genres: vec!["Drama".to_string()],
            ..Default::default()
        }
    }

    /// A fake host layout under `root`: `disk/by-label`, `disk/by-id`, a
    /// mount table at `mtab` and mount points under `media/`.
    ///
    /// Mounting a volume links its label to a device and records the device
    /// in the mount table; unmounting drops the mount table line but keeps
    /// the files, like an unplugged drive whose mount point directory is
    /// left behind.
    #[derive(Debug, Clone)]
    pub struct VolumeFixture {
        root: PathBuf,
        mounts: Vec<(String, PathBuf)>,
    }

    impl VolumeFixture {
        pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
            let root = root.as_ref().to_path_buf();
            fs::create_dir_all(root.join("disk/by-label"))?;
            fs::create_dir_all(root.join("disk/by-id"))?;
            fs::create_dir_all(root.join("media"))?;
            let fixture = Self {
                root,
                mounts: Vec::new(),
            };
            fixture.write_mount_table()?;
            Ok(fixture)
        }

        pub fn root(&self) -> &Path {
            &self.root
        }

        pub fn device_dir(&self) -> PathBuf {
            self.root.join("disk")
        }

        pub fn mount_table(&self) -> PathBuf {
            self.root.join("mtab")
        }

        /// Mount point used for `label`.
        pub fn mount_point(&self, label: &str) -> PathBuf {
            self.root.join("media").join(label)
        }

        /// Label `device` as `label` and mount it. Returns the mount point.
        #[cfg(unix)]
        pub fn mount(&mut self, label: &str, device: &str) -> io::Result<PathBuf> {
            let link = self.device_dir().join("by-label").join(label);
            if fs::symlink_metadata(&link).is_err() {
                std::os::unix::fs::symlink(format!("../../{}", device), &link)?;
            }

            let mount_point = self.mount_point(label);
            fs::create_dir_all(&mount_point)?;
            let device_path = format!("/dev/{}", device);
            self.mounts.retain(|(d, _)| *d != device_path);
            self.mounts.push((device_path, mount_point.clone()));
            self.write_mount_table()?;
            Ok(mount_point)
        }

        /// Remove the mount table entry of `label`. Files stay in place.
        pub fn unmount(&mut self, label: &str) -> io::Result<()> {
            let mount_point = self.mount_point(label);
            self.mounts.retain(|(_, m)| *m != mount_point);
            self.write_mount_table()
        }

        pub fn resolver(&self) -> VolumeResolver {
            VolumeResolver::new(self.device_dir(), self.mount_table())
        }

        fn write_mount_table(&self) -> io::Result<()> {
            let mut table = String::from("/dev/root / ext4 rw,noatime 0 0\n");
            for (device, mount_point) in &self.mounts {
                table.push_str(&format!(
                    "{} {} vfat rw,relatime 0 0\n",
                    device,
                    mount_point.display().to_string().replace(' ', "\\040")
                ));
            }
            fs::write(self.mount_table(), table)
        }
    }
}
