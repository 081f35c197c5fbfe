use std::fmt;

use colored::Colorize;

use crate::prompts::ANONYMOUS;
use crate::schema::{Activity, Intake, Profile};

const RULE_WIDTH: usize = 40;

/// Consumption minus expenditure, only when both sides are known and the
/// difference fits in an `i64`.
pub fn energy_balance(intake: &Intake, activity: &Activity) -> Option<i64> {
    intake.kcal?.checked_sub(activity.kcal?)
}

/// Printable recap of the day, shown before the coaching call.
pub struct DailySummary<'a> {
    profile: &'a Profile,
    intake: &'a Intake,
    activity: &'a Activity,
    colorful: bool,
}

impl<'a> DailySummary<'a> {
    pub fn new(profile: &'a Profile, intake: &'a Intake, activity: &'a Activity) -> Self {
        Self {
            profile,
            intake,
            activity,
            colorful: false,
        }
    }

    pub fn colorful(mut self, colorful: bool) -> Self {
        self.colorful = colorful;
        self
    }

    fn heading(&self, text: &str) -> String {
        if self.colorful {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }
}

impl fmt::Display for DailySummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        let rule = if self.colorful {
            rule.bright_blue().to_string()
        } else {
            rule
        };
        let p = self.profile;
        let i = self.intake;

        writeln!(f, "\n{rule}")?;
        let owner = p.name.as_deref().unwrap_or(ANONYMOUS);
        writeln!(f, "{}", self.heading(&format!("RÉSUMÉ QUOTIDIEN POUR {owner}")))?;
        writeln!(f, "{rule}")?;

        writeln!(f, "\n{}", self.heading("PROFIL :"))?;
        writeln!(f, "- Objectif : {}", p.goal.as_deref().unwrap_or("Non précisé"))?;
        writeln!(
            f,
            "- Physique : {} cm | {} kg",
            or_unknown(p.height_cm),
            or_unknown(p.weight_kg)
        )?;

        writeln!(f, "\n{}", self.heading("CONSOMMATION ESTIMÉE :"))?;
        writeln!(f, "- Énergie   : {} kcal", i.kcal.unwrap_or(0))?;
        writeln!(f, "- Protéines : {} g", i.protein_g.unwrap_or(0))?;
        writeln!(f, "- Glucides  : {} g", i.carbs_g.unwrap_or(0))?;
        writeln!(f, "- Lipides   : {} g", i.fat_g.unwrap_or(0))?;
        writeln!(f, "- Eau       : {} L", i.water_l.unwrap_or(0))?;

        writeln!(f, "\n{}", self.heading("ACTIVITÉ PHYSIQUE :"))?;
        writeln!(f, "- Calories dépensées : {} kcal", self.activity.kcal.unwrap_or(0))?;

        if let Some(balance) = energy_balance(self.intake, self.activity) {
            let line = format!("BILAN ÉNERGÉTIQUE : {balance} kcal");
            writeln!(f, "\n{}", self.heading(&line))?;
        }

        write!(f, "\n{rule}")
    }
}

fn or_unknown(value: Option<i64>) -> String {
    value.map_or_else(|| "??".to_string(), |v| v.to_string())
}
