// Formatted Command - positional argument line consumed by the binary

/// Ordered argument tokens: mode, target, action, flags, `uid=<id>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedCommand {
    tokens: Vec<String>,
}

impl FormattedCommand {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Single space-joined argument string
    pub fn as_arg_string(&self) -> String {
        self.tokens.join(" ")
    }

    /// Argument vector for a direct exec
    ///
    /// The argument string is split on single spaces, so a flag value that
    /// contains a space becomes several arguments. Values are never quoted.
    pub fn args(&self) -> Vec<String> {
        self.as_arg_string()
            .split(' ')
            .map(str::to_string)
            .collect()
    }
}

impl std::fmt::Display for FormattedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_arg_string())
    }
}
