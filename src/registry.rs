//! Static registry of the models offered in the model picker.
//!
//! Reference data only; nothing here is mutated at runtime. Selecting a model
//! that is not installed on the generation service is reported by the service
//! itself at request time.

/// Display metadata for a selectable model. `context_length` is a label
/// (e.g. "8k"), not a token count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub context_length: &'static str,
}

/// Model offered when nothing else is configured.
pub const DEFAULT_MODEL: &str = "mistral";

static MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "mistral",
        name: "Mistral",
        description: "Fast and efficient 7B base model",
        context_length: "8k",
    },
    ModelInfo {
        id: "llama2",
        name: "Llama 2",
        description: "Meta's general-purpose chat model",
        context_length: "4k",
    },
    ModelInfo {
        id: "codellama",
        name: "Code Llama",
        description: "Specialized for programming tasks",
        context_length: "16k",
    },
];

/// Return all selectable models.
pub fn available_models() -> &'static [ModelInfo] {
    MODELS
}

/// The model used for new conversations unless overridden.
pub fn default_model() -> &'static ModelInfo {
    &MODELS[0] // mistral
}

/// Look up a model by id.
pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}
