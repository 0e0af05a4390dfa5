//! Public template path detection.
//!
//! A path is private when any of its segments starts with the trigger. The
//! control panel and console always use `_`; the public site uses the
//! configured trigger. An empty trigger makes every path public.

use crate::resolution::request::Request;

/// Trigger used outside the public site.
pub const ADMIN_PRIVATE_TRIGGER: &str = "_";

/// Decides which paths may fall through to template rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPathGate {
    site_trigger: String,
}

impl PublicPathGate {
    pub fn new(site_trigger: impl Into<String>) -> Self {
        Self {
            site_trigger: site_trigger.into(),
        }
    }

    /// Trigger in effect for `request`.
    pub fn trigger_for<'a>(&'a self, request: &Request) -> &'a str {
        if request.is_site() {
            &self.site_trigger
        } else {
            ADMIN_PRIVATE_TRIGGER
        }
    }

    pub fn is_public(&self, request: &Request) -> bool {
        is_public(request.segments(), self.trigger_for(request))
    }
}

impl Default for PublicPathGate {
    fn default() -> Self {
        Self::new(ADMIN_PRIVATE_TRIGGER)
    }
}

/// True unless a segment starts with `trigger`.
pub fn is_public<S: AsRef<str>>(segments: &[S], trigger: &str) -> bool {
    if trigger.is_empty() {
        return true;
    }
    !segments.iter().any(|s| s.as_ref().starts_with(trigger))
}
