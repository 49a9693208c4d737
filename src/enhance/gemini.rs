// Wire types for the generateContent endpoint of the generative image service.
// Only the fields this server sends or reads are modelled.

use serde::{Deserialize, Serialize};

/// Request body for `POST {base}/models/{model}:generateContent`.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub safety_settings: Vec<SafetySetting>,
    pub generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One fragment of a content message: text, inline binary data, or both absent
/// for part kinds we do not care about.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }
}

/// Base64 payload with its media type.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    HarmCategoryDangerousContent,
    HarmCategorySexuallyExplicit,
    HarmCategoryCivicIntegrity,
    HarmCategoryHarassment,
    HarmCategoryHateSpeech,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockNone,
}

#[derive(Serialize, Debug, Clone, Copy)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Every category the service lets us configure, with blocking switched off.
/// Image enhancement prompts trip the filters on harmless photos otherwise.
pub fn unblocked_safety_settings() -> Vec<SafetySetting> {
    [
        HarmCategory::HarmCategoryDangerousContent,
        HarmCategory::HarmCategorySexuallyExplicit,
        HarmCategory::HarmCategoryCivicIntegrity,
        HarmCategory::HarmCategoryHarassment,
        HarmCategory::HarmCategoryHateSpeech,
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: HarmBlockThreshold::BlockNone,
    })
    .collect()
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Text,
    Image,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<Modality>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            response_modalities: vec![Modality::Text, Modality::Image],
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GenerateContentResponse {
    /// The first inline data part of the first candidate, if any.
    /// Later candidates and later image parts are ignored.
    pub fn first_inline_image(&self) -> Option<&InlineData> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.inline_data.as_ref())
    }

    /// Text fragments of the first candidate, joined.
    pub fn first_candidate_text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text = parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        (!text.is_empty()).then_some(text)
    }
}

/// Error envelope returned with non-2xx statuses.
#[derive(Deserialize, Debug, Clone)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}
