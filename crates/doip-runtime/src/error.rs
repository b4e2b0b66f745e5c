/// Failure from the matching/cycling pipeline. Left `#[non_exhaustive]`
/// because the catalog may grow failure modes (e.g. rate limiting) that are
/// out of scope today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum MatchError {
    #[error("no service in the catalog matched the request")]
    NoMatch,
}
