//! Model loading configuration.

/// Default maximum size of a model or support file (16 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// What to do with support descriptor entries naming entities the model lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayPolicy {
    /// Skip them silently.
    Ignore,
    /// Skip them and log a warning for each.
    #[default]
    Warn,
    /// Fail the load.
    Reject,
}

/// Options controlling how a model is loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Handling of unmatched support descriptor entries.
    pub overlay_policy: OverlayPolicy,

    /// Fail when a non-abstract entity ends up without a class name.
    pub require_concrete_class_names: bool,

    /// Maximum accepted file size in bytes.
    pub max_file_size: u64,
}

impl LoadOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            overlay_policy: OverlayPolicy::default(),
            require_concrete_class_names: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Strict options: unmatched overlays and unresolved concrete classes fail.
    pub fn strict() -> Self {
        Self::new()
            .with_overlay_policy(OverlayPolicy::Reject)
            .with_required_class_names(true)
    }

    /// Set the overlay policy.
    pub fn with_overlay_policy(mut self, policy: OverlayPolicy) -> Self {
        self.overlay_policy = policy;
        self
    }

    /// Require every concrete entity to have a class name.
    pub fn with_required_class_names(mut self, required: bool) -> Self {
        self.require_concrete_class_names = required;
        self
    }

    /// Set the maximum file size.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = LoadOptions::default();
        assert_eq!(options.overlay_policy, OverlayPolicy::Warn);
        assert!(!options.require_concrete_class_names);
        assert_eq!(options.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn test_options_builder() {
        let options = LoadOptions::new()
            .with_overlay_policy(OverlayPolicy::Ignore)
            .with_max_file_size(1024);

        assert_eq!(options.overlay_policy, OverlayPolicy::Ignore);
        assert_eq!(options.max_file_size, 1024);
    }

    #[test]
    fn test_strict_options() {
        let options = LoadOptions::strict();
        assert_eq!(options.overlay_policy, OverlayPolicy::Reject);
        assert!(options.require_concrete_class_names);
    }
}
