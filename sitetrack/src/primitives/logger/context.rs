use std::cell::RefCell;

thread_local! {
    static LOG_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Scope guard that sets the logging context for the current thread and restores the
/// previous one when dropped.
///
/// ```rust
/// use sitetrack::primitives::logger::{get_context, LogContext};
///
/// {
///     let _ctx = LogContext::new("UpgradeController");
///     assert_eq!(get_context().as_deref(), Some("[UpgradeController]"));
/// }
/// assert_eq!(get_context(), None);
/// ```
pub struct LogContext {
    previous: Option<String>,
}

impl LogContext {
    /// Enters a new context named `module`.
    #[must_use]
    pub fn new(module: &str) -> Self {
        let previous = LOG_CONTEXT.with(|ctx| ctx.borrow_mut().replace(format!("[{module}]")));
        Self { previous }
    }
}

impl Drop for LogContext {
    fn drop(&mut self) {
        LOG_CONTEXT.with(|ctx| {
            (*ctx.borrow_mut()).clone_from(&self.previous);
        });
    }
}

/// The current thread's logging context, if any.
#[must_use]
pub fn get_context() -> Option<String> {
    LOG_CONTEXT.with(|ctx| ctx.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_contexts_restore_outer() {
        let _outer = LogContext::new("SettingsManager");
        {
            let _inner = LogContext::new("UpgradeController");
            assert_eq!(get_context().as_deref(), Some("[UpgradeController]"));
        }
        assert_eq!(get_context().as_deref(), Some("[SettingsManager]"));
    }
}
