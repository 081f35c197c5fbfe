use anyhow::{Context, Result};
use log::info;

use crate::llm_manager::{CompletionRequest, LLMManager};
use crate::prompts;
use crate::schema::{Activity, Intake, Profile, Record};

/// Produces free-text advice from the three day records.
pub struct Coach<'a> {
    llm: &'a LLMManager,
}

impl<'a> Coach<'a> {
    pub fn new(llm: &'a LLMManager) -> Self {
        Self { llm }
    }

    pub fn build_request(
        profile: &Profile,
        intake: &Intake,
        activity: &Activity,
    ) -> Result<CompletionRequest> {
        let user = prompts::coach_user(
            &profile.to_prompt_json()?,
            &intake.to_prompt_json()?,
            &activity.to_prompt_json()?,
        );
        Ok(CompletionRequest::new(prompts::COACH_SYSTEM, user))
    }

    /// One unconstrained completion call; the reply is returned as is.
    pub async fn advise(
        &self,
        profile: &Profile,
        intake: &Intake,
        activity: &Activity,
    ) -> Result<String> {
        let request = Self::build_request(profile, intake, activity)?;
        let advice = self
            .llm
            .complete(&request)
            .await
            .context("Coaching request failed")?;
        info!("Received {} characters of advice", advice.len());
        Ok(advice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_manager::testing::{manager, rejected};

    #[tokio::test]
    async fn test_advice_is_free_text() {
        let (llm, provider) = manager(vec![Ok("Bonne journée ! Demain, buvez plus d'eau.".to_string())]);
        let profile = Profile {
            name: Some("Alice".to_string()),
            ..Default::default()
        };
        let intake = Intake {
            kcal: Some(2000),
            ..Default::default()
        };
        let activity = Activity { kcal: Some(0) };

        let advice = Coach::new(&llm).advise(&profile, &intake, &activity).await.unwrap();
        assert_eq!(advice, "Bonne journée ! Demain, buvez plus d'eau.");

        let request = &provider.requests()[0];
        assert!(!request.is_structured());
        assert_eq!(request.system, prompts::COACH_SYSTEM);
        assert!(request.user.contains(r#""name":"Alice""#));
        assert!(request.user.contains(r#""goal":null"#));
        assert!(request.user.contains(r#""protein_g":null"#));
        assert!(request.user.contains(r#"- Activité: {"kcal":0}"#));
    }

    #[test]
    fn test_request_lists_every_field_name() {
        let request =
            Coach::build_request(&Profile::default(), &Intake::default(), &Activity::default())
                .unwrap();
        let fields = Profile::fields()
            .iter()
            .chain(Intake::fields())
            .chain(Activity::fields());
        for field in fields {
            assert!(
                request.user.contains(&format!("\"{}\":null", field.name)),
                "missing {}",
                field.name
            );
        }
    }

    #[tokio::test]
    async fn test_fault_propagates() {
        let (llm, _) = manager(vec![Err(rejected())]);
        let err = Coach::new(&llm)
            .advise(&Profile::default(), &Intake::default(), &Activity::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Coaching request failed"));
    }
}
