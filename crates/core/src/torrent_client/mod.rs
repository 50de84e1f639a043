//! Remote torrent client control.
//!
//! Downloads land in the movie directories and are picked up by the next
//! catalog refresh like any other file.

mod qbittorrent;
mod types;

pub use qbittorrent::{QBittorrentClient, QBittorrentConfig};
pub use types::*;
