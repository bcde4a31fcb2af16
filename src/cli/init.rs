//! Init command implementation
//!
//! Scaffolds a SU_BOT deployment: `subot.toml`, the corpus and index
//! directories, a starter manifest, `.env.example` and `.gitignore`.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// subot.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// LLM provider to configure (ollama or openai)
    pub provider: String,
    /// Web search provider (duckduckgo, tavily or disabled)
    pub web_search: String,
    /// Host address for the server
    pub host: String,
    /// Port for the server
    pub port: u16,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing SU_BOT");

    let base_path = &config.path;

    let config_path = base_path.join("subot.toml");
    if config_path.exists() && !config.force {
        output.warning("subot.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    output.subheader("Creating directories");

    for dir in ["data", "data/corpus", "data/index"] {
        let dir_path = base_path.join(dir);
        if dir_path.exists() {
            output.skipped(dir, "already exists");
            continue;
        }
        if let Err(e) = fs::create_dir_all(&dir_path) {
            output.error(&format!("Failed to create {}: {}", dir, e));
            return InitResult::Error(e.to_string());
        }
        output.created_dir(dir);
    }

    output.subheader("Creating configuration files");

    let files = [
        ("config", "subot.toml", generate_subot_toml(&config), config.force),
        ("env", ".env.example", generate_env_example(), config.force),
        ("corpus", "data/corpus/manifest.json", generate_manifest(), false),
        ("file", ".gitignore", generate_gitignore(), false),
    ];

    for (kind, name, content, force) in files {
        let path = base_path.join(name);
        match write_file(&path, &content, force) {
            Ok(true) => output.created(kind, name),
            Ok(false) => output.skipped(name, "already exists"),
            Err(e) => {
                output.error(&format!("Failed to create {}: {}", name, e));
                return InitResult::Error(e.to_string());
            }
        }
    }

    output.complete("SU_BOT initialized successfully!");

    output.header("Next Steps");
    output.newline();
    output.info("1. Add documents to data/corpus/ (one .txt file per document)");
    output.info("   and map file names to source URLs in data/corpus/manifest.json");
    output.newline();
    output.info("2. Set up environment variables:");
    output.command("cp .env.example .env");
    output.newline();

    if config.provider == "ollama" {
        output.info("3. Start Ollama (if not running):");
        output.command("ollama serve");
        output.command("ollama pull llama3.2");
        output.newline();
    }

    output.info("4. Build the index and start the server:");
    output.command("subot index rebuild");
    output.command("subot serve");

    output.hint(&format!(
        "Server will be available at http://{}:{}",
        config.host, config.port
    ));

    InitResult::Success
}

/// Write `content` unless the file exists and `force` is off.
/// Returns whether the file was written.
fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    fs::write(path, content)?;
    Ok(true)
}

fn generate_subot_toml(config: &InitConfig) -> String {
    let llm_section = if config.provider == "openai" {
        r#"[llm]
type = "openai"
api_key_env = "OPENAI_API_KEY"
model = "gpt-4o-mini""#
    } else {
        r#"[llm]
type = "ollama"
base_url = "http://localhost:11434"
model = "llama3.2""#
    };

    format!(
        r#"# SU_BOT configuration
# Every field has a default; remove what you do not need to change.

[server]
host = "{host}"
port = {port}
log_level = "info"
json_logs = false

[corpus]
dir = "./data/corpus"
manifest = "manifest.json"

[chunking]
max_chars = 1000
overlap_chars = 200

[embedding]
# hash (no download), ollama, or fastembed (requires the local-embeddings feature)
backend = "hash"
model = "nomic-embed-text"
dimensions = 384
batch_size = 32
cache_capacity = 1000

[index]
data_path = "./data/index"
metric = "cosine"
rebuild_on_start = true

[retrieval]
top_k = 5
min_score = 0.1
max_snippet_chars = 1200
strip_question_words = true

[router]
high_confidence = 0.55
low_confidence = 0.25
hint_terms = [
    "scet", "sarvajanik", "surat", "vivaksha", "jariwala",
    "it department", "computer engineering", "placements", "hod", "faculty",
]
followup_max_words = 4

[web_search]
# duckduckgo, tavily or disabled
provider = "{web_search}"
max_results = 5
timeout_ms = 8000

[assembler]
budget_chars = 6000
min_item_chars = 200

[synthesizer]
timeout_secs = 60
retry_backoff_ms = 500
memory_turns = 3
assistant_name = "SU_BOT"
institution = "Sarvajanik College of Engineering and Technology (SCET)"

[memory]
max_turns = 10
max_tokens = 2000
max_sessions = 1000

{llm_section}
"#,
        host = config.host,
        port = config.port,
        web_search = config.web_search,
        llm_section = llm_section,
    )
}

fn generate_env_example() -> String {
    r#"# SU_BOT Environment Variables
# ============================
# Copy this file to .env and fill in the values.

# Optional: Logging level (trace, debug, info, warn, error)
RUST_LOG=info,subot=debug

# Optional: OpenAI API key (if using the openai provider)
# OPENAI_API_KEY=sk-...

# Optional: Tavily API key (if web_search.provider = "tavily")
# TAVILY_API_KEY=tvly-...
"#
    .to_string()
}

fn generate_manifest() -> String {
    "{}\n".to_string()
}

fn generate_gitignore() -> String {
    r#"# SU_BOT generated files
/data/index/

# Environment
.env
.env.local

# Rust
/target/

# OS
.DS_Store
Thumbs.db
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::toml_config::{LlmConfig, SubotConfig, WebSearchProviderKind};
    use tempfile::TempDir;

    fn create_test_config(temp_dir: &TempDir) -> InitConfig {
        InitConfig {
            path: temp_dir.path().to_path_buf(),
            force: false,
            provider: "ollama".to_string(),
            web_search: "duckduckgo".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }

    #[test]
    fn test_generated_toml_parses_and_validates() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let content = generate_subot_toml(&create_test_config(&temp_dir));

        let config = SubotConfig::from_toml(&content).expect("generated toml should parse");
        config.validate().expect("generated toml should validate");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.web_search.provider, WebSearchProviderKind::DuckDuckGo);
        assert!(matches!(config.llm, LlmConfig::Ollama { .. }));
    }

    #[test]
    fn test_generate_toml_openai() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut init = create_test_config(&temp_dir);
        init.provider = "openai".to_string();
        init.web_search = "disabled".to_string();
        init.port = 8080;

        let config = SubotConfig::from_toml(&generate_subot_toml(&init)).expect("parse");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.web_search.provider, WebSearchProviderKind::Disabled);
        match config.llm {
            LlmConfig::OpenAI { api_key_env, .. } => assert_eq!(api_key_env, "OPENAI_API_KEY"),
            other => panic!("expected openai, got {:?}", other),
        }
    }

    #[test]
    fn test_generate_env_example() {
        let content = generate_env_example();
        assert!(content.contains("TAVILY_API_KEY"));
        assert!(content.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_write_file_skips_existing_without_force() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("file.txt");
        fs::write(&path, "original").expect("Failed to write");

        assert!(!write_file(&path, "new content", false).expect("write_file"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "original");

        assert!(write_file(&path, "new content", true).expect("write_file"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "new content");
    }

    #[test]
    fn test_run_creates_all_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let result = run(create_test_config(&temp_dir), &Output::no_color());
        assert!(matches!(result, InitResult::Success));

        let root = temp_dir.path();
        assert!(root.join("subot.toml").exists());
        assert!(root.join(".env.example").exists());
        assert!(root.join(".gitignore").exists());
        assert!(root.join("data/corpus").is_dir());
        assert!(root.join("data/index").is_dir());
        assert_eq!(
            fs::read_to_string(root.join("data/corpus/manifest.json")).expect("read"),
            "{}\n"
        );
    }

    #[test]
    fn test_run_already_exists_without_force() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("subot.toml"), "existing").expect("Failed to write");

        let result = run(create_test_config(&temp_dir), &Output::no_color());
        assert!(matches!(result, InitResult::AlreadyExists));
    }

    #[test]
    fn test_run_force_keeps_user_manifest() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("subot.toml"), "existing").expect("Failed to write");
        fs::create_dir_all(temp_dir.path().join("data/corpus")).expect("mkdir");
        fs::write(
            temp_dir.path().join("data/corpus/manifest.json"),
            r#"{"it.txt": "https://scet.ac.in/it"}"#,
        )
        .expect("Failed to write");

        let mut init = create_test_config(&temp_dir);
        init.force = true;
        let result = run(init, &Output::no_color());
        assert!(matches!(result, InitResult::Success));

        let toml = fs::read_to_string(temp_dir.path().join("subot.toml")).expect("read");
        assert!(toml.contains("[server]"));
        let manifest =
            fs::read_to_string(temp_dir.path().join("data/corpus/manifest.json")).expect("read");
        assert!(manifest.contains("scet.ac.in/it"));
    }
}
