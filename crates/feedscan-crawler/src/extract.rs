//! Turns rendered feed cells into post and media candidates.
//!
//! Each cell is one entry in the feed. A link of the form
//! `/<subject>/status/<id>` names the entry's post; a link of the form
//! `/<subject>/status/<id>/photo/<n>` wrapping an image contributes that
//! image as media. Links into other subjects' feeds (quoted or retweeted
//! content) are ignored, and a cell without a post link yields nothing.

use feedscan_core::source::{Candidate, Extraction, Extractor};
use url::Url;

use crate::feed::{Link, PageSnapshot};

/// Stand-in origin that relative and protocol-relative hrefs are resolved
/// against. Only the path of the result is inspected.
const FEED_ORIGIN: &str = "https://feed.invalid/";

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkExtractor;

/// Resolve `href` and return its non-empty path segments. Query and fragment
/// are dropped by the parser.
fn path_segments(href: &str) -> Vec<String> {
  let Ok(resolved) = Url::parse(FEED_ORIGIN).and_then(|base| base.join(href)) else {
    return Vec::new();
  };
  resolved
    .path_segments()
    .map(|segments| {
      segments
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
    })
    .unwrap_or_default()
}

/// Drop the image URL's trailing parameters after the first `&`, which carry
/// only rendering hints (size, format) and vary between page loads.
fn canonical_image_url(src: &str) -> &str {
  src.split('&').next().unwrap_or(src)
}

enum LinkRole {
  Post(String),
  Photo,
  Other,
}

fn classify(subject: &str, link: &Link) -> LinkRole {
  let segments = path_segments(&link.href);
  let parts: Vec<&str> = segments.iter().map(String::as_str).collect();
  match parts.as_slice() {
    [owner, "status", _id, "photo", ..] if *owner == subject => LinkRole::Photo,
    [owner, "status", id, ..] if *owner == subject => LinkRole::Post((*id).to_owned()),
    _ => LinkRole::Other,
  }
}

impl Extractor<PageSnapshot> for LinkExtractor {
  fn extract(&self, subject: &str, snapshot: &PageSnapshot) -> Extraction {
    let mut candidates = Vec::new();

    for cell in &snapshot.cells {
      let mut post_key = None;
      let mut media = Vec::new();

      for link in &cell.links {
        match classify(subject, link) {
          LinkRole::Post(id) => post_key = Some(id),
          // Photo links occasionally name a status id other than the cell's
          // own post, so media is attached to the cell rather than the id.
          LinkRole::Photo => {
            if let Some(src) = &link.image {
              media.push(canonical_image_url(src));
            }
          }
          LinkRole::Other => {}
        }
      }

      if let Some(key) = post_key {
        candidates.push(Candidate::new(key).with_media(media));
      }
    }

    Extraction { depth: snapshot.depth, candidates }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::feed::Cell;

  fn link(href: &str) -> Link { Link { href: href.into(), image: None } }

  fn photo(href: &str, src: &str) -> Link {
    Link { href: href.into(), image: Some(src.into()) }
  }

  fn snapshot(cells: Vec<Vec<Link>>) -> PageSnapshot {
    PageSnapshot {
      depth: 1500,
      cells: cells
        .into_iter()
        .enumerate()
        .map(|(i, links)| Cell { offset: 1500 + i as u64 * 100, links })
        .collect(),
    }
  }

  #[test]
  fn groups_photos_with_their_post() {
    let page = snapshot(vec![vec![
      link("https://twitter.com/alice"),
      link("https://twitter.com/alice/status/111"),
      photo(
        "https://twitter.com/alice/status/111/photo/1",
        "https://pbs.example/media/a?format=jpg&name=small",
      ),
      photo(
        "https://twitter.com/alice/status/111/photo/2",
        "https://pbs.example/media/b?format=jpg&name=small",
      ),
    ]]);

    let out = LinkExtractor.extract("alice", &page);
    assert_eq!(out.depth, 1500);
    assert_eq!(out.candidates, vec![Candidate::new("111").with_media([
      "https://pbs.example/media/a?format=jpg",
      "https://pbs.example/media/b?format=jpg",
    ])]);
  }

  #[test]
  fn text_post_has_no_media() {
    let page = snapshot(vec![vec![link("/alice/status/222?ref=feed")]]);
    let out = LinkExtractor.extract("alice", &page);
    assert_eq!(out.candidates, vec![Candidate::new("222")]);
  }

  #[test]
  fn other_subjects_and_postless_cells_are_ignored() {
    let page = snapshot(vec![
      vec![link("https://twitter.com/bob/status/333")],
      vec![photo("https://twitter.com/alice/status/444/photo/1", "https://pbs.example/x")],
      vec![link("https://twitter.com/alice/with_replies")],
    ]);
    assert!(LinkExtractor.extract("alice", &page).candidates.is_empty());
  }

  #[test]
  fn photo_without_image_is_skipped() {
    let page = snapshot(vec![vec![
      link("/alice/status/555"),
      link("/alice/status/555/photo/1"),
    ]]);
    let out = LinkExtractor.extract("alice", &page);
    assert!(out.candidates[0].media_keys.is_empty());
  }

  #[test]
  fn protocol_relative_post_link_is_found() {
    let page = snapshot(vec![vec![link("//twitter.com/alice/status/777")]]);
    let out = LinkExtractor.extract("alice", &page);
    assert_eq!(out.candidates, vec![Candidate::new("777")]);
  }

  #[test]
  fn segments_strip_host_query_and_fragment() {
    assert_eq!(path_segments("https://host/a/b?x=1#y"), ["a", "b"]);
    assert_eq!(path_segments("//host/a/b"), ["a", "b"]);
    assert_eq!(path_segments("/a//b/"), ["a", "b"]);
    assert!(path_segments("https://host").is_empty());
  }
}
