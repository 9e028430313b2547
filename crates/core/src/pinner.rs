//! The contract every pinning backend implements

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// A remote pinning service.
///
/// A backend is built once per credential set with [`Pinner::builder`]; the
/// returned API handle is immutable and can be shared across any number of
/// concurrent pin calls.
#[async_trait]
pub trait Pinner: Send + Sync {
    /// Credentials and settings accepted by [`Pinner::builder`]
    type Options: Send;

    /// Authenticated handle returned by [`Pinner::builder`]
    type Api: Send + Sync;

    /// Human-readable name, e.g. "Pinata"
    fn name(&self) -> &'static str;

    /// Identifier used in configuration files and on the command line
    fn slug(&self) -> &'static str;

    /// Validate `options` and build an API handle.
    ///
    /// Must fail with a configuration error, without touching the network,
    /// when required credentials are missing.
    async fn builder(&self, options: Self::Options) -> Result<Self::Api>;

    /// Upload every file under `path` as one bundle and pin it.
    ///
    /// Returns the content identifier of the bundle root.
    async fn pin_dir(&self, api: &Self::Api, path: &Path, tag: Option<&str>) -> Result<String>;

    /// Pin content that already exists on the network by its identifier.
    ///
    /// `cid` may be omitted; what that means is up to the backend.
    async fn pin_cid(&self, api: &Self::Api, cid: Option<&str>, tag: Option<&str>) -> Result<()>;
}

/// True for every type that exposes `builder`, `pin_dir` and `pin_cid`.
///
/// The trait bound is the check: a backend missing any of them does not
/// compile, so a non-conformant backend can never be handed to a caller.
pub fn has_right_format<P: Pinner + ?Sized>(_pinner: &P) -> bool {
    true
}

/// Compile-time conformance assertion for a backend type
pub const fn assert_pinner<P: Pinner>() {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct NullPinner;

    #[async_trait]
    impl Pinner for NullPinner {
        type Options = ();
        type Api = ();

        fn name(&self) -> &'static str {
            "Null"
        }

        fn slug(&self) -> &'static str {
            "null"
        }

        async fn builder(&self, _options: ()) -> Result<()> {
            Ok(())
        }

        async fn pin_dir(&self, _api: &(), path: &Path, _tag: Option<&str>) -> Result<String> {
            Err(Error::EmptyDirectory(path.to_path_buf()))
        }

        async fn pin_cid(&self, _api: &(), _cid: Option<&str>, _tag: Option<&str>) -> Result<()> {
            Ok(())
        }
    }

    const _: () = assert_pinner::<NullPinner>();

    #[test]
    fn test_any_pinner_has_right_format() {
        assert!(has_right_format(&NullPinner));
    }

    #[tokio::test]
    async fn test_pinners_are_interchangeable() {
        async fn run<P: Pinner<Options = ()>>(pinner: &P) -> Result<()> {
            let api = pinner.builder(()).await?;
            pinner.pin_cid(&api, None, None).await
        }

        assert!(run(&NullPinner).await.is_ok());
    }
}
