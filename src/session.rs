use std::io::{BufRead, Write};

use anyhow::Result;
use log::{error, info};

use crate::coach::Coach;
use crate::extractor::Extractor;
use crate::llm_manager::LLMManager;
use crate::prompts;
use crate::schema::{Activity, Intake, Profile};
use crate::summary::DailySummary;
use crate::ui::Console;

/// Interview stages, visited strictly in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CollectProfile,
    CollectIntake,
    CollectActivity,
    Coach,
    Done,
}

/// Everything a completed session produced.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub profile: Profile,
    pub intake: Intake,
    pub activity: Activity,
    pub advice: String,
}

#[allow(dead_code)]
#[derive(Debug)]
pub enum SessionOutcome {
    Completed(SessionReport),
    Failed { stage: Stage, description: String },
}

impl SessionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SessionOutcome::Failed { .. })
    }
}

/// Drives one interview: three extractions, the summary, then the coach.
pub struct Session<'a, R, W> {
    extractor: Extractor<'a>,
    coach: Coach<'a>,
    console: Console<R, W>,
    stage: Stage,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    pub fn new(llm: &'a LLMManager, domain: &str, console: Console<R, W>) -> Self {
        Self {
            extractor: Extractor::new(llm, domain),
            coach: Coach::new(llm),
            console,
            stage: Stage::CollectProfile,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[cfg(test)]
    pub fn into_console(self) -> Console<R, W> {
        self.console
    }

    fn enter(&mut self, stage: Stage) {
        info!("Session stage: {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    /// Run every stage, stopping at the first fault.
    pub async fn run(&mut self) -> Result<SessionReport> {
        info!("Session started");
        let answer = self.console.ask(prompts::WELCOME)?;
        let profile: Profile = self
            .extractor
            .extract(prompts::PROFILE_TASK, &answer)
            .await?;
        let name = profile
            .name
            .clone()
            .unwrap_or_else(|| prompts::ANONYMOUS.to_string());

        self.enter(Stage::CollectIntake);
        let answer = self.console.ask(&prompts::intake_question(&name))?;
        let intake: Intake = self
            .extractor
            .extract(prompts::INTAKE_TASK, &answer)
            .await?;

        self.enter(Stage::CollectActivity);
        let answer = self.console.ask(&prompts::activity_question(&name))?;
        let activity: Activity = self
            .extractor
            .extract(prompts::ACTIVITY_TASK, &answer)
            .await?;

        self.enter(Stage::Coach);
        let summary = DailySummary::new(&profile, &intake, &activity)
            .colorful(self.console.colorful())
            .to_string();
        self.console.say(&summary)?;
        self.console.say(prompts::COACH_THINKING)?;

        let spinner = self.console.start_spinner(prompts::COACH_THINKING);
        let advice = self.coach.advise(&profile, &intake, &activity).await;
        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }
        let advice = advice?;

        let rule = "-".repeat(30);
        self.console.say_emphasis(prompts::COACH_HEADER)?;
        self.console.say(&rule)?;
        self.console.say(&advice)?;
        self.console.say(&rule)?;

        self.enter(Stage::Done);
        Ok(SessionReport {
            profile,
            intake,
            activity,
            advice,
        })
    }

    /// Run the session behind the single failure boundary: any fault is
    /// printed as one line and reported, never raised.
    pub async fn run_guarded(&mut self) -> SessionOutcome {
        match self.run().await {
            Ok(report) => SessionOutcome::Completed(report),
            Err(err) => {
                let description = format!("{err:#}").replace(['\r', '\n'], " ");
                error!("Session failed during {:?}: {}", self.stage, description);
                if let Err(write_err) = self.console.say(&prompts::failure_line(&description)) {
                    error!("Could not report failure on console: {write_err:#}");
                }
                SessionOutcome::Failed {
                    stage: self.stage,
                    description,
                }
            }
        }
    }
}
