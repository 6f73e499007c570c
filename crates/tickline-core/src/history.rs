//! Undo history seam

use crate::song::Song;

/// Receives a copy of the song before an edit gesture changes it.
/// Storage and undo/redo application belong to the implementor.
pub trait History {
    fn push_snapshot(&mut self, song: &Song);
}

/// Plain snapshot stack
impl History for Vec<Song> {
    fn push_snapshot(&mut self, song: &Song) {
        self.push(song.clone());
    }
}
