//! Deserializer configuration.

/// Options controlling deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeserializeOptions {
    /// Rewrite merge-annotated control flow into selection and loop regions.
    ///
    /// When disabled, block arguments are still wired up and merge
    /// annotations are dropped, leaving a plain CFG.
    pub enable_control_flow_structurization: bool,
}

impl Default for DeserializeOptions {
    fn default() -> Self {
        Self {
            enable_control_flow_structurization: true,
        }
    }
}

impl DeserializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_control_flow_structurization(mut self, enable: bool) -> Self {
        self.enable_control_flow_structurization = enable;
        self
    }
}
