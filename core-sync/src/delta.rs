//! Track delta merge.

use core_library::Track;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of applying a delta batch to a track list.
#[derive(Debug, Clone)]
pub struct DeltaOutcome {
    /// Merged track list, unordered
    pub tracks: Vec<Arc<Track>>,
    /// Tracks inserted or replaced
    pub upserted: usize,
    /// Cached tracks removed by deletion markers
    pub removed: usize,
}

impl DeltaOutcome {
    pub fn changed(&self) -> bool {
        self.upserted > 0 || self.removed > 0
    }
}

/// Apply `delta` to `current`.
///
/// A deleted entry removes the cached track with that id, if any. Any other
/// entry replaces the cached track with the same id or is inserted. Entries
/// are applied in batch order, so a later entry for the same id wins.
pub fn merge_track_delta(current: &[Arc<Track>], delta: Vec<Track>) -> DeltaOutcome {
    let mut by_id: HashMap<String, Arc<Track>> = current
        .iter()
        .map(|track| (track.id.clone(), track.clone()))
        .collect();
    let mut upserted = 0;
    let mut removed = 0;

    for track in delta {
        if track.deleted {
            if by_id.remove(&track.id).is_some() {
                removed += 1;
            }
        } else {
            by_id.insert(track.id.clone(), Arc::new(track));
            upserted += 1;
        }
    }

    DeltaOutcome {
        tracks: by_id.into_values().collect(),
        upserted,
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, title: &str) -> Track {
        Track {
            id: id.to_string(),
            title: title.to_string(),
            artist: "Artist".to_string(),
            album_artist: "Artist".to_string(),
            album_artist_sort: "artist".to_string(),
            album: "Album".to_string(),
            track_number: 1,
            duration_secs: 60,
            composers: vec![],
            genre: None,
            album_art_ref: None,
            deleted: false,
        }
    }

    fn deleted(id: &str) -> Track {
        Track {
            deleted: true,
            ..track(id, "")
        }
    }

    fn ids(outcome: &DeltaOutcome) -> Vec<String> {
        let mut ids: Vec<String> = outcome.tracks.iter().map(|t| t.id.clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_empty_delta_changes_nothing() {
        let current = vec![Arc::new(track("t1", "One"))];
        let outcome = merge_track_delta(&current, vec![]);

        assert!(!outcome.changed());
        assert_eq!(ids(&outcome), vec!["t1"]);
    }

    #[test]
    fn test_insert_replace_and_delete() {
        let current = vec![
            Arc::new(track("t1", "One")),
            Arc::new(track("t2", "Two")),
        ];
        let outcome = merge_track_delta(
            &current,
            vec![track("t2", "Two (Remastered)"), track("t3", "Three"), deleted("t1")],
        );

        assert!(outcome.changed());
        assert_eq!(outcome.upserted, 2);
        assert_eq!(outcome.removed, 1);
        assert_eq!(ids(&outcome), vec!["t2", "t3"]);
        let t2 = outcome.tracks.iter().find(|t| t.id == "t2").unwrap();
        assert_eq!(t2.title, "Two (Remastered)");
    }

    #[test]
    fn test_deleting_unknown_track_is_not_a_change() {
        let current = vec![Arc::new(track("t1", "One"))];
        let outcome = merge_track_delta(&current, vec![deleted("ghost")]);

        assert!(!outcome.changed());
        assert_eq!(ids(&outcome), vec!["t1"]);
    }

    #[test]
    fn test_later_entry_wins() {
        let delta = vec![track("t1", "Old"), deleted("t1"), track("t1", "New")];
        let outcome = merge_track_delta(&[], delta);

        assert_eq!(outcome.tracks.len(), 1);
        assert_eq!(outcome.tracks[0].title, "New");
    }
}
