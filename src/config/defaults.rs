use std::path::PathBuf;

use super::types::CriterionConfig;

pub fn default_version() -> u32 {
    1
}

pub fn default_concurrency() -> usize {
    6
}

pub fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

pub fn default_timeout_sec() -> u64 {
    300
}

pub fn default_launch_delay_ms() -> u64 {
    0
}

pub fn default_max_document_bytes() -> usize {
    16 * 1024 * 1024
}

pub fn default_pdftotext_binary() -> PathBuf {
    PathBuf::from("pdftotext")
}

pub fn default_claude_binary() -> PathBuf {
    // Check common install location first
    if let Some(home) = std::env::var_os("HOME") {
        let local_path = PathBuf::from(home).join(".claude/local/claude");
        if local_path.exists() {
            return local_path;
        }
    }
    // Fall back to PATH lookup
    PathBuf::from("claude")
}

pub fn default_claude_model() -> String {
    "sonnet".to_string()
}

pub fn default_codex_binary() -> PathBuf {
    PathBuf::from("codex")
}

pub fn default_codex_model() -> String {
    "gpt-4.1".to_string()
}

pub fn default_chat_base_url() -> String {
    "https://api.perplexity.ai/chat/completions".to_string()
}

pub fn default_chat_model() -> String {
    "sonar".to_string()
}

pub fn default_chat_api_key_env() -> String {
    "PERPLEXITY_API_KEY".to_string()
}

pub fn default_chat_max_tokens() -> u32 {
    2048
}

pub fn default_true() -> bool {
    true
}

pub fn default_criteria() -> Vec<CriterionConfig> {
    vec![
        CriterionConfig::builtin("language", "Language quality"),
        CriterionConfig::builtin("analysis", "Depth of analysis"),
        CriterionConfig::builtin("clarity", "Clarity of thought"),
    ]
}
