//! Background music controls.
//!
//! Playback itself belongs to an external player; this module only tracks
//! what should be playing. The catalog comes from `[[music.tracks]]` in the
//! configuration.

use serde::{Deserialize, Serialize};

use crate::storage::MusicConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub album_art: String,
    pub uri: String,
}

pub const DEFAULT_VOLUME: u8 = 80;

pub trait MusicTransport {
    fn play(&mut self);
    fn pause(&mut self);

    fn toggle(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    fn next(&mut self);
    fn previous(&mut self);

    /// Set the volume, clamped to 0..=100. Returns the applied value.
    fn set_volume(&mut self, volume: i32) -> u8;
    fn volume(&self) -> u8;

    fn current_track(&self) -> Option<&Track>;
    fn is_playing(&self) -> bool;
}

/// In-memory transport over a fixed catalog.
///
/// `next` and `previous` wrap around. With an empty catalog every
/// operation is a no-op.
#[derive(Debug, Clone)]
pub struct Playlist {
    tracks: Vec<Track>,
    index: usize,
    playing: bool,
    volume: u8,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            index: 0,
            playing: false,
            volume: DEFAULT_VOLUME,
        }
    }

    pub fn from_config(config: &MusicConfig) -> Self {
        let mut playlist = Self::new(config.tracks.clone());
        playlist.volume = config.default_volume.min(100);
        playlist
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn step(&mut self, forward: bool) {
        let len = self.tracks.len();
        if len == 0 {
            return;
        }
        self.index = if forward {
            (self.index + 1) % len
        } else {
            (self.index + len - 1) % len
        };
        tracing::debug!(track = %self.tracks[self.index].name, "track changed");
    }
}

impl MusicTransport for Playlist {
    fn play(&mut self) {
        if !self.tracks.is_empty() {
            self.playing = true;
        }
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn next(&mut self) {
        self.step(true);
    }

    fn previous(&mut self) {
        self.step(false);
    }

    fn set_volume(&mut self, volume: i32) -> u8 {
        if !self.tracks.is_empty() {
            self.volume = volume.clamp(0, 100) as u8;
        }
        self.volume
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn current_track(&self) -> Option<&Track> {
        self.tracks.get(self.index)
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}
