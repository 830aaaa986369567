use crate::core::config::data::{path_display, Config};
use std::path::Path;

impl Config {
    /// Human-readable listing of every setting, marking values that fall
    /// back to built-in defaults.
    pub fn describe(&self) -> Vec<String> {
        fn entry(key: &str, value: Option<String>, default: &str) -> String {
            match value {
                Some(value) => format!("  {key}: {value}"),
                None => format!("  {key}: {default} (default)"),
            }
        }

        vec![
            entry("model", self.default_model.clone(), self.model()),
            entry(
                "base-url",
                self.base_url.clone(),
                super::data::DEFAULT_BASE_URL,
            ),
            entry(
                "temperature",
                self.temperature.map(|t| t.to_string()),
                &self.temperature().to_string(),
            ),
            entry(
                "max-tool-iterations",
                self.max_tool_iterations.map(|n| n.to_string()),
                &self.max_tool_iterations().to_string(),
            ),
            entry("image-model", self.image_model.clone(), self.image_model()),
            entry("image-size", self.image_size.clone(), self.image_size()),
            entry(
                "system-prompt",
                self.system_prompt
                    .as_ref()
                    .map(|prompt| format!("{} chars (custom)", prompt.chars().count())),
                "built-in",
            ),
        ]
    }

    pub fn print_all(&self, path: &Path) {
        println!("Current configuration ({}):", path_display(path));
        for line in self.describe() {
            println!("{line}");
        }
    }
}
