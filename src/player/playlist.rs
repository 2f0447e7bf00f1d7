//! Playlist navigation
//!
//! Cyclic next/previous selection over a fixed, ordered set of media items.

use crate::player::MediaReference;
use serde::{Deserialize, Serialize};

/// Source of the ordered media items
pub trait PlaylistProvider: Send + Sync {
    fn items(&self) -> &[MediaReference];
}

/// Fixed playlist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    items: Vec<MediaReference>,
}

impl Playlist {
    pub fn new(items: Vec<MediaReference>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl PlaylistProvider for Playlist {
    fn items(&self) -> &[MediaReference] {
        &self.items
    }
}

impl<S: Into<String>> FromIterator<S> for Playlist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(MediaReference::new).collect())
    }
}

/// Step direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl From<bool> for Direction {
    fn from(forward: bool) -> Self {
        if forward {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }
}

/// Computes the neighbouring item with wrap-around
pub struct PlaylistNavigator {
    provider: Box<dyn PlaylistProvider>,
}

impl PlaylistNavigator {
    pub fn new(provider: Box<dyn PlaylistProvider>) -> Self {
        Self { provider }
    }

    pub fn items(&self) -> &[MediaReference] {
        self.provider.items()
    }

    pub fn first(&self) -> Option<&MediaReference> {
        self.items().first()
    }

    /// Item next to `current` in `direction`.
    ///
    /// Without a current selection the forward step lands on index 1 and the
    /// backward step on the last index. A selection that is not in the
    /// playlist counts as index 0.
    pub fn step(&self, current: Option<&MediaReference>, direction: Direction) -> Option<MediaReference> {
        let items = self.items();
        if items.is_empty() {
            return None;
        }

        let delta: isize = match direction {
            Direction::Forward => 1,
            Direction::Backward => -1,
        };

        let mut index = match current {
            Some(media) => items.iter().position(|m| m == media).unwrap_or(0) as isize + delta,
            None => delta,
        };

        let len = items.len() as isize;
        if index < 0 {
            index = len - 1;
        } else if index >= len {
            index = 0;
        }

        items.get(index as usize).cloned()
    }
}

impl std::fmt::Debug for PlaylistNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaylistNavigator")
            .field("items", &self.items())
            .finish()
    }
}
