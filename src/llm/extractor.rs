use crate::error::{Result, ScompError};
use crate::llm::client::GeminiClient;
use crate::llm::prompts::PROMPT_EXTRACCION;
use crate::schema::RawExtraction;

/// Structured-extraction collaborator: turns already-extracted SCOMP text
/// into a [`RawExtraction`] through the Gemini API.
pub struct ScompExtractor {
    client: GeminiClient,
    prompt: String,
}

impl ScompExtractor {
    pub fn new(client: GeminiClient) -> Self {
        Self {
            client,
            prompt: PROMPT_EXTRACCION.to_string(),
        }
    }

    /// Replaces the default extraction prompt (e.g. for a document variant).
    /// The prompt must keep the `{TEXTO_PDF}` placeholder.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Runs one extraction. A response that cannot be parsed as the
    /// expected shape is a hard failure; missing fields inside an otherwise
    /// well-formed response are not.
    pub async fn extract(&self, texto_scomp: &str) -> Result<RawExtraction> {
        let prompt = self.prompt.replace("{TEXTO_PDF}", texto_scomp);
        let schema = serde_json::to_value(RawExtraction::generate_json_schema())?;

        let raw_json = self.client.generate_content(&prompt, Some(schema)).await?;
        let cleaned = clean_json_output(&raw_json);

        RawExtraction::from_json(cleaned).map_err(|e| {
            let preview: String = raw_json.chars().take(200).collect();
            ScompError::ExtractionFailed(format!(
                "La IA no devolvió un JSON válido ({}). Respuesta: {}...",
                e, preview
            ))
        })
    }
}

/// Strips code fences or prose around the JSON object, keeping the
/// outermost `{...}` span.
fn clean_json_output(raw: &str) -> &str {
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            return &raw[start..=end];
        }
    }
    raw.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_json_output_strips_fences() {
        let raw = "```json\n{\"header\": {}}\n```";
        assert_eq!(clean_json_output(raw), "{\"header\": {}}");
    }

    #[test]
    fn test_clean_json_output_passthrough() {
        assert_eq!(clean_json_output("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(clean_json_output("  sin json  "), "sin json");
    }

    #[test]
    fn test_cleaned_output_parses_as_extraction() {
        let raw = "```json\n{\"retiro_programado\": {\"pension_bruta\": 350000}}\n```";
        let extraction = RawExtraction::from_json(clean_json_output(raw)).unwrap();
        assert!(extraction.retiro_programado.pension_bruta.is_some());
    }
}
