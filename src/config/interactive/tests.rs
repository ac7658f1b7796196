use super::load_existing_config as load_existing_config_impl;
use super::non_empty_model;

#[test]
fn load_existing_config() {
    let config = load_existing_config_impl().expect("config loaded successfully");
    assert!(!config.ollama.host.is_empty());
    assert!(config.ollama.port > 0);
    assert!(!config.ollama.embedding_model.is_empty());
    assert!(config.ollama.concurrency > 0);
    assert!(config.chunking.chunk_overlap < config.chunking.chunk_size);
}

#[test]
fn model_names_must_not_be_blank() {
    assert!(non_empty_model(&"llama3.2".to_string()).is_ok());
    assert!(non_empty_model(&String::new()).is_err());
    assert!(non_empty_model(&"   ".to_string()).is_err());
}
