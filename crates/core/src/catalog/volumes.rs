//! Storage volume resolution.
//!
//! Devices are named through the `by-label` and `by-id` link directories and
//! matched against the live mount table. Only mounted volumes are reported,
//! which is what lets the scanner tell "file deleted" from "drive unplugged".

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::{CatalogError, Volume};
use crate::config::VolumesConfig;

/// Reads host state to find mounted volumes.
#[derive(Debug, Clone)]
pub struct VolumeResolver {
    by_label_dir: PathBuf,
    by_id_dir: PathBuf,
    mount_table: PathBuf,
}

impl VolumeResolver {
    /// Create a resolver rooted at `device_dir` (normally `/dev/disk`).
    pub fn new(device_dir: impl AsRef<Path>, mount_table: impl Into<PathBuf>) -> Self {
        let device_dir = device_dir.as_ref();
        Self {
            by_label_dir: device_dir.join("by-label"),
            by_id_dir: device_dir.join("by-id"),
            mount_table: mount_table.into(),
        }
    }

    pub fn from_config(config: &VolumesConfig) -> Self {
        Self::new(&config.device_dir, config.mount_table.clone())
    }

    /// Resolve the set of currently mounted volumes.
    pub fn resolve(&self) -> Result<MountedVolumes, CatalogError> {
        // device name -> (stable name, mount point)
        let mut devices: BTreeMap<String, (String, Option<PathBuf>)> = BTreeMap::new();

        for (name, device) in read_device_links(&self.by_label_dir)? {
            devices.insert(device, (name, None));
        }
        for (name, device) in read_device_links(&self.by_id_dir)? {
            devices.entry(device).or_insert((name, None));
        }

        for (device_path, mount_point) in read_mount_table(&self.mount_table)? {
            let Some(device) = Path::new(&device_path).file_name() else {
                continue;
            };
            if let Some(entry) = devices.get_mut(device.to_string_lossy().as_ref()) {
                entry.1 = Some(mount_point);
            }
        }

        let volumes: Vec<Volume> = devices
            .into_iter()
            .filter_map(|(device, (name, mount_point))| {
                mount_point.map(|mount_point| Volume {
                    device,
                    name,
                    mount_point,
                })
            })
            .collect();

        debug!("Resolved {} mounted volume(s)", volumes.len());
        Ok(MountedVolumes { volumes })
    }
}

/// Mounted volumes, ordered by device name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountedVolumes {
    volumes: Vec<Volume>,
}

impl MountedVolumes {
    pub fn new(mut volumes: Vec<Volume>) -> Self {
        volumes.sort_by(|a, b| a.device.cmp(&b.device));
        Self { volumes }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Volume> {
        self.volumes.iter()
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Whether a volume with this stable name is mounted.
    ///
    /// An empty name never matches: records on fixed roots have no drive to verify.
    pub fn is_mounted(&self, name: &str) -> bool {
        !name.is_empty() && self.volumes.iter().any(|v| v.name == name)
    }

    /// The volume holding `path`: the one whose mount point is the longest
    /// component-wise prefix of it.
    pub fn volume_for(&self, path: &Path) -> Option<&Volume> {
        self.volumes
            .iter()
            .filter(|v| path.starts_with(&v.mount_point))
            .max_by_key(|v| v.mount_point.components().count())
    }
}

/// Read `(link name, device name)` pairs from a device link directory.
/// A missing directory yields no entries.
fn read_device_links(dir: &Path) -> Result<Vec<(String, String)>, CatalogError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Device link directory {:?} not found", dir);
            return Ok(Vec::new());
        }
        Err(e) => return Err(CatalogError::io(dir, e)),
    };

    let mut links = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CatalogError::io(dir, e))?;
        let path = entry.path();
        let target = fs::read_link(&path).map_err(|e| CatalogError::io(&path, e))?;
        if let Some(device) = target.file_name() {
            links.push((
                entry.file_name().to_string_lossy().into_owned(),
                device.to_string_lossy().into_owned(),
            ));
        }
    }
    links.sort();
    Ok(links)
}

/// Read `(device path, mount point)` pairs from a mount table.
/// A missing table means nothing is mounted.
fn read_mount_table(path: &Path) -> Result<Vec<(String, PathBuf)>, CatalogError> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Mount table {:?} not found", path);
            return Ok(Vec::new());
        }
        Err(e) => return Err(CatalogError::io(path, e)),
    };

    let mut mounts = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| CatalogError::io(path, e))?;
        let mut fields = line.split_whitespace();
        if let (Some(device), Some(mount_point)) = (fields.next(), fields.next()) {
            mounts.push((device.to_string(), PathBuf::from(unescape_mount_field(mount_point))));
        }
    }
    Ok(mounts)
}

/// Decode the octal escapes (`\040` for space, etc.) used in mount tables.
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
