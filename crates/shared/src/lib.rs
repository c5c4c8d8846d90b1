pub mod error;
pub mod turn;

pub mod settings {
    use serde::{Deserialize, Serialize};

    fn default_base_url() -> String {
        "http://localhost:8000".to_string()
    }

    fn default_timeout_secs() -> u64 {
        120
    }

    fn default_preview_languages() -> Vec<String> {
        vec!["jsx".to_string(), "tsx".to_string()]
    }

    /// Where and how to reach the generation backend.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BackendSettings {
        #[serde(default = "default_base_url")]
        pub base_url: String,
        #[serde(default = "default_timeout_secs")]
        pub request_timeout_secs: u64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AppSettings {
        #[serde(default)]
        pub backend: BackendSettings,
        /// Fence language tags whose blocks are rendered in the preview pane.
        #[serde(default = "default_preview_languages")]
        pub preview_languages: Vec<String>,
    }

    impl Default for BackendSettings {
        fn default() -> Self {
            Self {
                base_url: default_base_url(),
                request_timeout_secs: default_timeout_secs(),
            }
        }
    }

    impl Default for AppSettings {
        fn default() -> Self {
            Self {
                backend: BackendSettings::default(),
                preview_languages: default_preview_languages(),
            }
        }
    }
}
