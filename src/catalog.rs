//! Model catalog and per-model defaults.
//!
//! The catalog is the list the console offers for side-by-side testing.
//! Prompt defaults are tuned per model; anything not in the catalog is
//! routed to the Hugging Face fallback by [`Provider::for_model`].

use std::fmt;

use crate::types::{ModelDefaults, ModelInfo};

/// Prompt used when neither the request nor the catalog supplies one.
pub const FALLBACK_PROMPT: &str = "Analyze: {{json}}";

/// Vendor backend a model name is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    AzureOpenAi,
    Mistral,
    Claude,
    Gemini,
    HuggingFace,
}

impl Provider {
    pub fn for_model(model: &str) -> Self {
        match model {
            "gpt-4o" | "gpt-4o-mini" | "o3-mini" => Provider::AzureOpenAi,
            "mistral-large" => Provider::Mistral,
            "claude-3-5-sonnet" => Provider::Claude,
            "gemini-1-5-flash" => Provider::Gemini,
            _ => Provider::HuggingFace,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::AzureOpenAi => "azure_openai",
            Provider::Mistral => "mistral",
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
            Provider::HuggingFace => "huggingface",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct CatalogEntry {
    name: &'static str,
    display_name: &'static str,
    description: &'static str,
    system_prompt: &'static str,
    temperature: f64,
    max_length: u32,
    top_p: f64,
    reasoning_effort: Option<&'static str>,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        name: "gpt-4o",
        display_name: "GPT-4o (Azure OpenAI)",
        description: "Beste baseline for forklaring, norsk språk og strukturert output",
        system_prompt: "Du er en ekspert på Rikstoto og hesteveddeløp. Analyser følgende bongdata og gi en detaljert forklaring på norsk:\n{{json}}\n\nForklar bongen, odds, og potensielle gevinster på en pedagogisk måte.",
        temperature: 0.7,
        max_length: 1000,
        top_p: 1.0,
        reasoning_effort: None,
    },
    CatalogEntry {
        name: "gpt-4o-mini",
        display_name: "GPT-4o-mini (Azure OpenAI)",
        description: "Raskere og rimeligere variant for skala-testing",
        system_prompt: "Analyser denne Rikstoto-bongen kort og konsist:\n{{json}}\n\nGi en rask oppsummering av: 1) Type spill, 2) Valgte hester, 3) Mulig gevinst",
        temperature: 0.5,
        max_length: 400,
        top_p: 1.0,
        reasoning_effort: None,
    },
    CatalogEntry {
        name: "o3-mini",
        display_name: "o3-mini (Azure OpenAI)",
        description: "Optimalisert for reasoning på komplekse bongscenarier",
        system_prompt: "Utfør en logisk analyse av følgende bongdata med fokus på sannsynligheter og forventet verdi:\n{{json}}\n\nBruk reasoning til å vurdere: 1) Sjanse for gevinst, 2) Expected value, 3) Risikovurdering",
        temperature: 0.3,
        max_length: 800,
        top_p: 0.95,
        reasoning_effort: Some("medium"),
    },
    CatalogEntry {
        name: "mistral-large",
        display_name: "Mistral Large (Azure AI)",
        description: "Åpen modell i enterprise-drakt - billigere og fleksibel",
        system_prompt: "Analyser veddeløpsdata strukturert:\n{{json}}\n\nPresentér: • Spilltype og struktur\n• Hestevalg med begrunnelse\n• Økonomisk analyse\n• Anbefaling",
        temperature: 0.7,
        max_length: 700,
        top_p: 0.95,
        reasoning_effort: None,
    },
    CatalogEntry {
        name: "claude-3-5-sonnet",
        display_name: "Claude 3.5 Sonnet (Azure Databricks)",
        description: "Sterk på forklaringer og ansvarlig språk",
        system_prompt: "Som en ansvarlig spilleekspert, analyser denne bongen med fokus på både muligheter og ansvarlig spilling:\n{{json}}\n\nInkluder: Teknisk analyse, sjansevurdering, og påminnelse om ansvarlige spillevaner.",
        temperature: 0.7,
        max_length: 1200,
        top_p: 1.0,
        reasoning_effort: None,
    },
    CatalogEntry {
        name: "gemini-1-5-flash",
        display_name: "Gemini 1.5 Flash (Azure API Management)",
        description: "Rask, billig og med lange kontekster",
        system_prompt: "Rask analyse av bongdata:\n{{json}}\n\nLever en effektiv oversikt med: hovedpunkter, odds-vurdering, og konklusjon. Vær kortfattet men informativ.",
        temperature: 1.0,
        max_length: 500,
        top_p: 0.94,
        reasoning_effort: None,
    },
];

fn entry(name: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.name == name)
}

/// All catalog models in display order.
pub fn available_models() -> Vec<ModelInfo> {
    CATALOG
        .iter()
        .map(|e| ModelInfo {
            name: e.name.to_string(),
            display_name: e.display_name.to_string(),
            description: e.description.to_string(),
        })
        .collect()
}

pub fn model_info(name: &str) -> Option<ModelInfo> {
    entry(name).map(|e| ModelInfo {
        name: e.name.to_string(),
        display_name: e.display_name.to_string(),
        description: e.description.to_string(),
    })
}

pub fn model_defaults(name: &str) -> Option<ModelDefaults> {
    entry(name).map(|e| ModelDefaults {
        system_prompt: e.system_prompt.to_string(),
        temperature: e.temperature,
        max_length: e.max_length,
        top_p: e.top_p,
        reasoning_effort: e.reasoning_effort.map(str::to_string),
    })
}

/// Defaults for every catalog model, in catalog order.
pub fn all_defaults() -> Vec<(String, ModelDefaults)> {
    CATALOG
        .iter()
        .filter_map(|e| model_defaults(e.name).map(|d| (e.name.to_string(), d)))
        .collect()
}
