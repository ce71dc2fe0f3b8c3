//! Callback bundles for `load` and `ready`.
//!
//! Every callback is optional. A missing callback is replaced by a no-op, so
//! failure information is silently discarded when nobody asks for it.

use crate::resource::{ResourceKind, ResourceRequest};

pub type SuccessFn = Box<dyn FnOnce() + Send>;
pub type FailFn = Box<dyn FnOnce(Vec<String>) + Send>;
pub type BeforeFn = Box<dyn Fn(&mut ResourceRequest) + Send + Sync>;

/// Options for [`BundleLoader::load`](crate::coordinator::BundleLoader::load).
pub struct LoadOptions {
    pub(crate) success: Option<SuccessFn>,
    pub(crate) fail: Option<FailFn>,
    pub(crate) before: Option<BeforeFn>,
    pub(crate) async_load: bool,
    pub(crate) kind: Option<ResourceKind>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            success: None,
            fail: None,
            before: None,
            async_load: true,
            kind: None,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once when every path loaded.
    pub fn on_success(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.success = Some(Box::new(f));
        self
    }

    /// Called once with the failed paths, in completion order.
    pub fn on_fail(mut self, f: impl FnOnce(Vec<String>) + Send + 'static) -> Self {
        self.fail = Some(Box::new(f));
        self
    }

    /// Hook run for each path right before it is dispatched.
    pub fn before(mut self, f: impl Fn(&mut ResourceRequest) + Send + Sync + 'static) -> Self {
        self.before = Some(Box::new(f));
        self
    }

    /// Let the host execute scripts out of insertion order (default `true`).
    pub fn async_load(mut self, async_load: bool) -> Self {
        self.async_load = async_load;
        self
    }

    /// Force a resource kind for every path, bypassing prefix and suffix inference.
    pub fn kind(mut self, kind: ResourceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Invoke exactly one of the outcome callbacks.
    pub(crate) fn finish(self, failed_paths: &[String]) {
        if failed_paths.is_empty() {
            if let Some(success) = self.success {
                success();
            }
        } else if let Some(fail) = self.fail {
            fail(failed_paths.to_vec());
        }
    }
}

/// Options for [`BundleLoader::ready`](crate::coordinator::BundleLoader::ready).
#[derive(Default)]
pub struct ReadyOptions {
    pub(crate) success: Option<SuccessFn>,
    pub(crate) fail: Option<FailFn>,
}

impl ReadyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.success = Some(Box::new(f));
        self
    }

    /// Called with the bundle ids (not paths) that failed.
    pub fn on_fail(mut self, f: impl FnOnce(Vec<String>) + Send + 'static) -> Self {
        self.fail = Some(Box::new(f));
        self
    }

    pub(crate) fn finish(self, failed_ids: Vec<String>) {
        if failed_ids.is_empty() {
            if let Some(success) = self.success {
                success();
            }
        } else if let Some(fail) = self.fail {
            fail(failed_ids);
        }
    }
}
