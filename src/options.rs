//! Ambient configuration surface (SPEC_FULL.md §1.1). The canonical
//! keyword set is a build-time constant (SPEC_FULL.md §4.1.1), not
//! configurable, but a handful of documented knobs are.

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Escalate non-fatal warnings (currently: fall-off-without-return) to
    /// fatal errors. Off by default, matching the original's behavior.
    pub warnings_as_errors: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            warnings_as_errors: false,
        }
    }
}
