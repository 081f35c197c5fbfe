use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use serde_json::Value;

use crate::llm_manager::{CompletionRequest, LLMManager};
use crate::prompts;
use crate::schema::Record;

/// Turns free text into a typed record through a schema-constrained call.
///
/// One instance serves every stage; stages differ only in the record type
/// and the task text.
pub struct Extractor<'a> {
    llm: &'a LLMManager,
    domain: String,
}

impl<'a> Extractor<'a> {
    pub fn new(llm: &'a LLMManager, domain: impl Into<String>) -> Self {
        Self {
            llm,
            domain: domain.into(),
        }
    }

    pub fn build_request<R: Record>(&self, task: &str, input: &str) -> CompletionRequest {
        CompletionRequest::new(prompts::extraction_system(&self.domain, task), input)
            .with_schema(R::NAME, R::json_schema())
    }

    /// Extract a record from `input`. Fields the model leaves out stay absent.
    pub async fn extract<R: Record>(&self, task: &str, input: &str) -> Result<R> {
        let request = self.build_request::<R>(task, input);
        let reply = self
            .llm
            .complete(&request)
            .await
            .with_context(|| format!("Extraction of {} failed", R::NAME))?;
        let record = decode_record::<R>(&reply)?;
        if record.is_empty() {
            info!("No {} information found in user input", R::NAME);
        }
        debug!("Extracted {}: {:?}", R::NAME, record);
        Ok(record)
    }
}

/// Decode a structured reply. An empty reply, `null` and `{}` all yield the
/// all-absent record.
pub fn decode_record<R: Record>(reply: &str) -> Result<R> {
    let body = strip_code_fence(reply.trim());
    if body.is_empty() {
        return Ok(R::default());
    }
    let value: Value = serde_json::from_str(body)
        .with_context(|| format!("Reply for {} is not valid JSON: {}", R::NAME, body))?;
    match value {
        Value::Null => Ok(R::default()),
        Value::Object(_) => serde_json::from_value(value)
            .with_context(|| format!("Reply does not match the {} schema", R::NAME)),
        other => Err(anyhow!(
            "Expected a JSON object for {}, got {}",
            R::NAME,
            other
        )),
    }
}

/// Unwraps a Markdown fence and its language tag (`json`, `JSON`, ...).
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let tag_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let rest = &rest[tag_len..];
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_manager::testing::{manager, rejected};
    use crate::schema::{Activity, Intake, Profile};

    #[tokio::test]
    async fn test_profile_end_to_end() {
        let (llm, provider) = manager(vec![Ok(r#"{"name":"Alice","age":30,"weight_kg":65,"height_cm":170,"goal":"perdre du poids"}"#.to_string())]);
        let extractor = Extractor::new(&llm, prompts::DOMAIN);

        let input = "Je m'appelle Alice, 30 ans, 65 kg, 170 cm, objectif perdre du poids";
        let profile: Profile = extractor.extract(prompts::PROFILE_TASK, input).await.unwrap();

        assert_eq!(
            profile,
            Profile {
                name: Some("Alice".to_string()),
                age: Some(30),
                weight_kg: Some(65),
                height_cm: Some(170),
                goal: Some("perdre du poids".to_string()),
            }
        );

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user, input);
        assert!(requests[0].system.contains("nutrition et sports"));
        let schema = requests[0].response_schema.as_ref().unwrap();
        assert_eq!(schema.name, "user_profile");
        assert_eq!(schema.schema, Profile::json_schema());
    }

    #[tokio::test]
    async fn test_irrelevant_input_yields_absent_fields() {
        let (llm, _) = manager(vec![
            Ok(r#"{"name":null,"age":null,"weight_kg":null,"height_cm":null,"goal":null}"#.to_string()),
            Ok("{}".to_string()),
            Ok(String::new()),
        ]);
        let extractor = Extractor::new(&llm, prompts::DOMAIN);

        let profile: Profile = extractor.extract(prompts::PROFILE_TASK, "il fait beau").await.unwrap();
        let intake: Intake = extractor.extract(prompts::INTAKE_TASK, "il fait beau").await.unwrap();
        let activity: Activity = extractor.extract(prompts::ACTIVITY_TASK, "il fait beau").await.unwrap();

        assert_eq!(profile, Profile::default());
        assert_eq!(intake, Intake::default());
        assert_eq!(activity, Activity::default());
        assert_eq!(intake.kcal, None);
    }

    #[tokio::test]
    async fn test_stage_task_is_appended_to_instruction() {
        let (llm, provider) = manager(vec![Ok(r#"{"kcal": 2100, "water_l": 2}"#.to_string())]);
        let extractor = Extractor::new(&llm, "nutrition et sports");

        let intake: Intake = extractor
            .extract(prompts::INTAKE_TASK, "pâtes bolognaise et deux litres d'eau")
            .await
            .unwrap();
        assert_eq!(intake.kcal, Some(2100));
        assert_eq!(intake.water_l, Some(2));
        assert_eq!(intake.protein_g, None);

        let system = &provider.requests()[0].system;
        assert!(system.ends_with(prompts::INTAKE_TASK));
    }

    #[tokio::test]
    async fn test_backend_fault_propagates() {
        let (llm, _) = manager(vec![Err(rejected())]);
        let extractor = Extractor::new(&llm, prompts::DOMAIN);
        let err = extractor
            .extract::<Activity>(prompts::ACTIVITY_TASK, "30 min de vélo")
            .await
            .unwrap_err();
        let description = format!("{err:#}");
        assert!(description.contains("Extraction of daily_activity failed"));
        assert!(description.contains("bad request"));
    }

    #[test]
    fn test_decode_record_variants() {
        let fenced: Activity = decode_record("```json\n{\"kcal\": 320}\n```").unwrap();
        assert_eq!(fenced.kcal, Some(320));

        let upper: Activity = decode_record("```JSON\n{\"kcal\": 320}\n```").unwrap();
        assert_eq!(upper.kcal, Some(320));

        let bare: Activity = decode_record("```\n{\"kcal\": 45}\n```").unwrap();
        assert_eq!(bare.kcal, Some(45));

        let null: Activity = decode_record("null").unwrap();
        assert_eq!(null, Activity::default());

        assert!(decode_record::<Activity>("not json").is_err());
        assert!(decode_record::<Activity>("[1, 2]").is_err());
    }
}
