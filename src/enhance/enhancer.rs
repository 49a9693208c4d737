// The enhancement step: staged file in, decoded image bytes out.

use super::{
    client::GeminiClient,
    error::EnhanceError,
    gemini::{Content, GenerateContentRequest, GenerationConfig, Part, unblocked_safety_settings},
};
use base64::prelude::{BASE64_STANDARD, Engine as _};
use std::path::Path;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const ENHANCE_PROMPT: &str = "Please enhance the given image by improving its details, clarity, and overall quality. \
Increase the resolution if possible, and sharpen the edges for better definition. \
Add depth and texture where needed, making colors more vibrant while maintaining a natural look. \
Adjust lighting and contrast for a more dynamic and visually appealing result.\
Focus on enhancing any specific elements that can benefit from more detail, such as textures, shadows, and highlights.";

// The service is always told the upload is JPEG, whatever it really is.
pub const INPUT_MIME_TYPE: &str = "image/jpeg";

/// Image bytes decoded from the service's first inline image part.
#[derive(Debug, Clone)]
pub struct EnhancedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

pub struct Enhancer {
    client: GeminiClient,
    prompt: String,
}

impl Enhancer {
    pub fn new(client: GeminiClient) -> Self {
        Self {
            client,
            prompt: ENHANCE_PROMPT.to_string(),
        }
    }

    pub fn build_request(&self, image_base64: String) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::text(self.prompt.clone()),
                    Part::inline(INPUT_MIME_TYPE, image_base64),
                ],
            }],
            safety_settings: unblocked_safety_settings(),
            generation_config: GenerationConfig::default(),
        }
    }

    /// Reads `input_path`, sends it to the service once, and returns the first
    /// image the service produced. Nothing is written to disk here.
    pub async fn enhance(
        &self,
        request_id: Uuid,
        input_path: &Path,
    ) -> Result<EnhancedImage, EnhanceError> {
        info!(%request_id, "Reading input image: {}", input_path.display());

        let raw = match tokio::fs::read(input_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!(%request_id, "Input file not found: {}", input_path.display());
                return Err(EnhanceError::InputMissing(input_path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let request = self.build_request(BASE64_STANDARD.encode(&raw));

        info!(
            %request_id,
            "Sending {} bytes to {} for enhancement",
            raw.len(),
            self.client.endpoint()
        );
        let response = self.client.generate_content(&request).await?;

        let Some(candidate) = response.candidates.first() else {
            error!(%request_id, "The service returned no candidates");
            return Err(EnhanceError::NoCandidates);
        };
        info!(
            %request_id,
            "Response received (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        );

        if let Some(text) = response.first_candidate_text() {
            debug!(%request_id, "Service commentary: {}", text);
        }

        let Some(inline) = response.first_inline_image() else {
            error!(%request_id, "The service returned no image");
            return Err(EnhanceError::NoImagePart);
        };

        let data = BASE64_STANDARD.decode(inline.data.trim())?;
        if data.is_empty() {
            warn!(%request_id, "The service returned an empty image part");
            return Err(EnhanceError::NoImagePart);
        }

        Ok(EnhancedImage {
            data,
            mime_type: inline.mime_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::client::GeminiClientConfig;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn enhancer_for(server: &MockServer) -> Enhancer {
        let client = GeminiClient::new(GeminiClientConfig {
            api_base: server.uri(),
            api_key: "test-key".into(),
            model: "image-model".into(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap();
        Enhancer::new(client)
    }

    fn image_response(data: &[u8]) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Enhanced." },
                    { "inlineData": { "mimeType": "image/png", "data": BASE64_STANDARD.encode(data) } }
                ] },
                "finishReason": "STOP"
            }]
        }))
    }

    #[tokio::test]
    async fn test_missing_input_fails_before_calling_service() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(image_response(b"never"))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.jpg");

        let err = enhancer_for(&server)
            .enhance(Uuid::new_v4(), &missing)
            .await
            .unwrap_err();
        assert!(matches!(err, EnhanceError::InputMissing(p) if p == missing));
    }

    #[tokio::test]
    async fn test_sends_prompt_and_base64_payload_and_decodes_first_image() {
        let server = MockServer::start().await;
        let input = b"\xFF\xD8\xFFcat-jpeg-bytes";

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "contents": [{ "parts": [
                    { "text": ENHANCE_PROMPT },
                    { "inlineData": { "mimeType": "image/jpeg", "data": BASE64_STANDARD.encode(input) } }
                ] }],
                "safetySettings": [
                    { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_NONE" },
                    { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_NONE" },
                    { "category": "HARM_CATEGORY_CIVIC_INTEGRITY", "threshold": "BLOCK_NONE" },
                    { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE" },
                    { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE" }
                ],
                "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] }
            })))
            .respond_with(image_response(b"enhanced-bytes"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("cat.jpg");
        std::fs::write(&input_path, input).unwrap();

        let image = enhancer_for(&server)
            .enhance(Uuid::new_v4(), &input_path)
            .await
            .unwrap();
        assert_eq!(image.data, b"enhanced-bytes");
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn test_prompt_joins_sentences_without_space_before_focus() {
        assert!(ENHANCE_PROMPT.contains("visually appealing result.Focus on enhancing"));
        assert!(ENHANCE_PROMPT.starts_with("Please enhance the given image"));
        assert!(ENHANCE_PROMPT.ends_with("shadows, and highlights."));
    }

    #[tokio::test]
    async fn test_empty_candidate_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("in.jpg");
        std::fs::write(&input_path, b"img").unwrap();

        let err = enhancer_for(&server)
            .enhance(Uuid::new_v4(), &input_path)
            .await
            .unwrap_err();
        assert!(matches!(err, EnhanceError::NoCandidates));
    }

    #[tokio::test]
    async fn test_text_only_response_has_no_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "I cannot do that." }] } }]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("in.jpg");
        std::fs::write(&input_path, b"img").unwrap();

        let err = enhancer_for(&server)
            .enhance(Uuid::new_v4(), &input_path)
            .await
            .unwrap_err();
        assert!(matches!(err, EnhanceError::NoImagePart));
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn test_invalid_base64_in_image_part() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": "***not base64***" } }
                ] } }]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("in.jpg");
        std::fs::write(&input_path, b"img").unwrap();

        let err = enhancer_for(&server)
            .enhance(Uuid::new_v4(), &input_path)
            .await
            .unwrap_err();
        assert!(matches!(err, EnhanceError::InvalidImageData(_)));
    }
}
