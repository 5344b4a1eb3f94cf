use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// How many positions before the end of a capped set trigger another page
/// request.
const NEAR_END_MARGIN: usize = 3;

/// Display mounting, forwarded to the provider as a search constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "landscape" => Ok(Self::Landscape),
            "portrait" => Ok(Self::Portrait),
            other => Err(format!("unknown orientation: {other}")),
        }
    }
}

/// The (orientation, query) pair that determines which results the
/// collaborator returns. Changing either invalidates the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionCriteria {
    pub orientation: Orientation,
    pub query: String,
}

/// Photographer credit attached to a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub photographer_name: String,
    pub photographer_url: String,
}

/// One image in the sequence. Immutable once fetched; its position in the
/// catalog is the addressing key used by the cache and navigation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub id: String,
    pub url: String,
    pub color: Option<String>,
    pub attribution: Option<Attribution>,
    pub captured_at: Option<DateTime<Utc>>,
    pub location_name: Option<String>,
}

/// Append-only ordered metadata set. Indices stay stable for the lifetime
/// of a selection; only the reset path empties it.
#[derive(Debug)]
pub struct Catalog {
    images: Vec<ImageDescriptor>,
    cap: usize,
}

impl Catalog {
    pub fn new(cap: usize) -> Self {
        Self {
            images: Vec::new(),
            cap,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImageDescriptor> {
        self.images.get(index)
    }

    /// Append a page fetched from the collaborator. `start` must line up
    /// with the current length; a misaligned page is refused so existing
    /// indices never move. Returns how many entries were appended.
    pub fn absorb(&mut self, start: usize, items: Vec<ImageDescriptor>) -> usize {
        if start != self.images.len() {
            return 0;
        }
        let appended = items.len();
        self.images.extend(items);
        appended
    }

    /// Whether navigation is close enough to the end of a below-cap set to
    /// warrant requesting another page. The cap gates requesting, it never
    /// truncates a page the collaborator already returned.
    pub fn near_end(&self, current: usize) -> bool {
        !self.images.is_empty()
            && current + NEAR_END_MARGIN >= self.images.len()
            && self.images.len() < self.cap
    }

    /// Start offset for the next page request.
    pub fn next_start(&self) -> usize {
        self.images.len()
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(i: usize) -> ImageDescriptor {
        ImageDescriptor {
            id: i.to_string(),
            url: format!("/api/images/{i:02}.jpg"),
            color: None,
            attribution: None,
            captured_at: None,
            location_name: None,
        }
    }

    fn page(range: std::ops::Range<usize>) -> Vec<ImageDescriptor> {
        range.map(descriptor).collect()
    }

    #[test]
    fn absorb_appends_aligned_pages() {
        let mut catalog = Catalog::new(47);
        assert_eq!(catalog.absorb(0, page(0..30)), 30);
        assert_eq!(catalog.absorb(30, page(30..47)), 17);
        assert_eq!(catalog.len(), 47);
        assert_eq!(catalog.get(30).unwrap().id, "30");
    }

    #[test]
    fn absorb_refuses_misaligned_pages() {
        let mut catalog = Catalog::new(47);
        catalog.absorb(0, page(0..30));
        assert_eq!(catalog.absorb(10, page(10..20)), 0);
        assert_eq!(catalog.len(), 30);
    }

    #[test]
    fn near_end_triggers_within_margin_below_cap() {
        let mut catalog = Catalog::new(47);
        catalog.absorb(0, page(0..30));
        assert!(!catalog.near_end(26));
        assert!(catalog.near_end(27));
        assert!(catalog.near_end(29));
    }

    #[test]
    fn near_end_stops_at_cap() {
        let mut catalog = Catalog::new(47);
        catalog.absorb(0, page(0..47));
        assert!(!catalog.near_end(46));
    }

    #[test]
    fn near_end_is_false_when_empty() {
        let catalog = Catalog::new(47);
        assert!(!catalog.near_end(0));
    }

    #[test]
    fn clear_empties_the_set() {
        let mut catalog = Catalog::new(47);
        catalog.absorb(0, page(0..5));
        catalog.clear();
        assert!(catalog.is_empty());
        assert_eq!(catalog.next_start(), 0);
    }

    #[test]
    fn orientation_round_trips_from_str() {
        assert_eq!("portrait".parse::<Orientation>(), Ok(Orientation::Portrait));
        assert_eq!(
            " LANDSCAPE ".parse::<Orientation>(),
            Ok(Orientation::Landscape)
        );
        assert!("sideways".parse::<Orientation>().is_err());
    }
}
