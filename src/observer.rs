//! Diagnostic observers for call-site analysis.
//!
//! Analysis is silent by default. Passing an observer to
//! [`CallSiteAnalyzer::analyze_observed`] reports every visited call site and
//! the final result, which is how plan sizes and scope-lock decisions get
//! traced while tuning a cost table or chasing an unexpected lock.
//!
//! [`CallSiteAnalyzer::analyze_observed`]: crate::CallSiteAnalyzer::analyze_observed

use std::time::Duration;

use crate::analysis::AnalysisResult;
use crate::call_site::CallSiteKind;
use crate::key::Key;

/// Observer for analysis events.
///
/// Calls are made synchronously from inside the walk. Keep implementations
/// cheap; observers must not assume anything about the thread they run on.
///
/// # Examples
///
/// ```
/// use ferrous_callsite::*;
/// use std::sync::Mutex;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct ScopedFinder {
///     scoped: Mutex<Vec<String>>,
/// }
///
/// impl AnalysisObserver for ScopedFinder {
///     fn visiting(&self, kind: CallSiteKind, service: &Key, _depth: usize) {
///         if kind == CallSiteKind::Scoped {
///             self.scoped.lock().unwrap().push(service.short_name());
///         }
///     }
///
///     fn analyzed(&self, _root: &Key, _result: &AnalysisResult, _duration: Duration) {}
/// }
///
/// struct Session;
/// let plan = CallSite::scoped(key_of_type::<Session>(), CallSite::create_instance(key_of_type::<Session>(), "Session"));
///
/// let finder = ScopedFinder::default();
/// let result = CallSiteAnalyzer::INSTANCE.analyze_observed(&plan, &finder);
/// assert!(result.requires_scope_lock);
/// assert_eq!(*finder.scoped.lock().unwrap(), vec!["Session".to_string()]);
/// ```
pub trait AnalysisObserver: Send + Sync {
    /// Called once per call site, before its children.
    ///
    /// # Arguments
    ///
    /// * `kind` - Variant of the call site
    /// * `service` - Service the call site produces
    /// * `depth` - Distance from the root (the root is 0)
    fn visiting(&self, kind: CallSiteKind, service: &Key, depth: usize);

    /// Called once when the walk is finished.
    ///
    /// # Arguments
    ///
    /// * `root` - Service produced by the analyzed plan
    /// * `result` - The analysis result returned to the caller
    /// * `duration` - Wall time spent in the walk
    fn analyzed(&self, root: &Key, result: &AnalysisResult, duration: Duration);
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AnalysisObserver for NoopObserver {
    fn visiting(&self, _kind: CallSiteKind, _service: &Key, _depth: usize) {}

    fn analyzed(&self, _root: &Key, _result: &AnalysisResult, _duration: Duration) {}
}

/// Built-in observer that logs events to stderr.
///
/// Visits are indented by depth so the output reads as the plan tree:
///
/// ```text
/// [ferrous-callsite] Constructor Handler
/// [ferrous-callsite]   Scoped RequestContext
/// [ferrous-callsite]     Constant RequestContext
/// [ferrous-callsite] Analyzed Handler: size=74 scope_lock=true in 1.2µs
/// ```
///
/// Useful for development. For production, implement [`AnalysisObserver`]
/// on top of your own logging or tracing infrastructure.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    /// Creates a new logging observer with default prefix.
    pub fn new() -> Self {
        Self {
            prefix: "[ferrous-callsite]".to_string(),
        }
    }

    /// Creates a new logging observer with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn visit_line(&self, kind: CallSiteKind, service: &Key, depth: usize) -> String {
        format!("{} {:indent$}{} {}", self.prefix, "", kind, service.short_name(), indent = depth * 2)
    }

    pub(crate) fn result_line(&self, root: &Key, result: &AnalysisResult, duration: Duration) -> String {
        format!(
            "{} Analyzed {}: size={} scope_lock={} in {:?}",
            self.prefix,
            root.short_name(),
            result.estimated_size,
            result.requires_scope_lock,
            duration
        )
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisObserver for LoggingObserver {
    fn visiting(&self, kind: CallSiteKind, service: &Key, depth: usize) {
        eprintln!("{}", self.visit_line(kind, service, depth));
    }

    fn analyzed(&self, root: &Key, result: &AnalysisResult, duration: Duration) {
        eprintln!("{}", self.result_line(root, result, duration));
    }
}
