//! Resolver for a file URL whose checksum is already known.

use crate::checksum::Checksum;
use crate::http::HttpOptions;
use crate::target::DownloadTarget;

use super::{probe_size, ResolutionError, TargetResolver};

/// Skips the landing page: `location` is the file, size comes from HEAD.
pub struct DirectResolver {
    checksum: Checksum,
    http: HttpOptions,
}

impl DirectResolver {
    pub fn new(checksum: Checksum, http: HttpOptions) -> Self {
        Self { checksum, http }
    }
}

impl TargetResolver for DirectResolver {
    fn resolve(&self, location: &str) -> Result<DownloadTarget, ResolutionError> {
        let size = probe_size(location, &self.http)?;
        DownloadTarget::from_url(location, size, self.checksum.clone()).ok_or_else(|| {
            ResolutionError::NoFileName {
                url: location.to_string(),
            }
        })
    }
}
