use nix::unistd;

pub struct ShellPrompt {
    text: String,
}

impl ShellPrompt {
    /// Use `custom` when configured, else `# ` for root and `$ ` for everyone else.
    pub fn new(custom: Option<&str>) -> Self {
        let text = match custom {
            Some(text) => text.to_string(),
            None => Self::default_for(unistd::getuid().is_root()).to_string(),
        };
        ShellPrompt { text }
    }

    fn default_for(root: bool) -> &'static str {
        if root { "# " } else { "$ " }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}
