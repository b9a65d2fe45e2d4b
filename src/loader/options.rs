//! Script element options.

/// Attributes applied to an inserted `<script>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptOptions {
    pub defer: bool,
    pub is_async: bool,
    /// `type="module"`
    pub module: bool,
    /// `nomodule`: skipped by module-capable runners
    pub no_module: bool,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            defer: true,
            is_async: false,
            module: false,
            no_module: false,
        }
    }
}

impl ScriptOptions {
    pub fn module() -> Self {
        Self {
            module: true,
            ..Self::default()
        }
    }

    /// Attribute pairs to set on the element.
    pub fn attributes(&self) -> Vec<(&'static str, &'static str)> {
        let mut attrs = Vec::with_capacity(3);
        if self.defer {
            attrs.push(("defer", ""));
        }
        if self.is_async {
            attrs.push(("async", ""));
        }
        if self.module {
            attrs.push(("type", "module"));
        }
        if self.no_module {
            attrs.push(("nomodule", ""));
        }
        attrs
    }
}
