use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Comment, Post};

/// Number of posts per feed page (home, category and profile feeds alike).
pub const FEED_PAGE_SIZE: usize = 10;

/// Viewer
///
/// The identity making the current request. Every policy decision is a pure
/// function of a viewer and already-fetched row data; the policy never reaches
/// into the store or the session itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User(Uuid),
}

impl Viewer {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(*id),
        }
    }

    /// True iff this viewer is authenticated as exactly `user_id`.
    /// Comparison is on identifiers, never on whole records.
    pub fn is(&self, user_id: Uuid) -> bool {
        self.id() == Some(user_id)
    }
}

/// The general-audience visibility invariant: a post is visible to everyone
/// iff it is published, its publication instant has passed, and its category
/// (when it has one) is published too. Posts without a category only need the
/// first two conditions.
fn is_generally_visible(post: &Post, now: DateTime<Utc>) -> bool {
    post.is_published && post.pub_date <= now && post.category_is_published.unwrap_or(true)
}

/// Whether `post` may appear in a feed shown to `viewer`.
///
/// The author always sees their own posts, including unpublished, scheduled
/// and unpublished-category ones. Everyone else gets the general-audience
/// invariant.
pub fn can_list(post: &Post, viewer: &Viewer, now: DateTime<Utc>) -> bool {
    viewer.is(post.author_id) || is_generally_visible(post, now)
}

/// Whether `post` may be shown on its detail page to `viewer`.
///
/// Same predicate as [`can_list`]. Callers must translate a `false` into a
/// not-found response, never a forbidden one, so that unauthorized viewers
/// cannot probe for the existence of hidden or scheduled posts.
pub fn can_view_detail(post: &Post, viewer: &Viewer, now: DateTime<Utc>) -> bool {
    can_list(post, viewer, now)
}

/// Whether `viewer` may edit or delete `post`: authenticated and the author.
/// No role is special-cased; staff identities go through the same check.
pub fn can_mutate(post: &Post, viewer: &Viewer) -> bool {
    viewer.is(post.author_id)
}

/// Whether `viewer` may edit or delete `comment`: authenticated and its author.
pub fn can_mutate_comment(comment: &Comment, viewer: &Viewer) -> bool {
    viewer.is(comment.author_id)
}

/// Filters an ordered sequence of candidate posts down to the ones `viewer`
/// may see, preserving relative order.
///
/// `owner_context` anchors profile feeds: when the viewer *is* the profile
/// owner the sequence passes through unfiltered, so owners see all of their
/// own posts. For the home and category feeds pass `None`.
pub fn filter_feed(
    posts: Vec<Post>,
    viewer: &Viewer,
    owner_context: Option<Uuid>,
    now: DateTime<Utc>,
) -> Vec<Post> {
    if let Some(owner) = owner_context {
        if viewer.is(owner) {
            return posts;
        }
    }
    posts
        .into_iter()
        .filter(|post| can_list(post, viewer, now))
        .collect()
}

/// Sorts a feed by the defined key: descending publication instant, ties
/// broken by descending identifier. Deterministic for equal inputs.
///
/// Repository queries already order this way; the helper exists for callers
/// that assemble feeds from more than one query.
pub fn order_feed(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then_with(|| b.id.cmp(&a.id)));
}

/// Number of pages an `len`-element sequence occupies. An empty sequence still
/// has one (empty) page, matching the clamping in [`paginate`].
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    len.div_ceil(page_size).max(1)
}

/// Slices an already-filtered, already-ordered sequence into one fixed-size
/// page. Pages are 1-based; out-of-range page numbers clamp to the nearest
/// valid page instead of failing.
///
/// Filtering must always happen before pagination, never after, or a page
/// would come up short.
pub fn paginate<T>(items: &[T], page_size: usize, page_number: usize) -> &[T] {
    if page_size == 0 || items.is_empty() {
        return &[];
    }
    let page = page_number.clamp(1, page_count(items.len(), page_size));
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

/// The page number [`paginate`] actually serves for a given request, after
/// clamping. Used to report the effective page in feed responses.
pub fn effective_page(len: usize, page_size: usize, page_number: usize) -> usize {
    page_number.clamp(1, page_count(len, page_size))
}
