//! Fixed French text: model instructions and console prompts.
//!
//! The instruction strings are inputs to the model. Keep the task, the
//! domain, the units and the "estimates are fine" framing when editing them.

/// Specialty named in every extraction instruction.
pub const DOMAIN: &str = "nutrition et sports";

pub const PROFILE_TASK: &str = "";

pub const INTAKE_TASK: &str = "L'utilisateur va te décrire tout ce qu'il a mangé et bu aujourd'hui. \
Ton objectif est d'estimer à partir de ses consommations la quantité de calories, de protéines, \
de glucides, de lipides et d'eau qu'il a consommée. \
Tu n'as pas besoin d'être très précis, mais plus ton estimation est juste, meilleure sera la réponse.";

pub const ACTIVITY_TASK: &str = "L'utilisateur va te décrire toutes les activités physiques qu'il a faites aujourd'hui. \
Ton objectif est d'estimer à partir de son activité la quantité de calories qu'il a dépensée. \
Tu n'as pas besoin d'être très précis, mais plus ton estimation est juste, meilleure sera la réponse.";

pub const COACH_SYSTEM: &str = "Tu es un coach expert en nutrition et sport. \
Ton rôle est d'analyser le profil, la consommation et l'activité de l'utilisateur \
pour lui donner un conseil personnalisé.";

/// System instruction for one extraction stage.
pub fn extraction_system(domain: &str, task: &str) -> String {
    let mut prompt = format!(
        "Tu es un assistant spécialisé en {domain}. \
Tu dois extraire les informations de l'utilisateur de manière précise."
    );
    if !task.is_empty() {
        prompt.push(' ');
        prompt.push_str(task);
    }
    prompt
}

/// User message for the coaching call; arguments are serialized records.
pub fn coach_user(profile: &str, intake: &str, activity: &str) -> String {
    format!(
        "Voici les données du jour :\n\
- Profil: {profile}\n\
- Consommation: {intake}\n\
- Activité: {activity}\n\n\
Donne-moi une analyse rapide (points positifs et axes d'amélioration) et un conseil concret pour demain."
    )
}

pub const WELCOME: &str = "Bonjour je suis votre assistant perso.\n\
Commencez par me décrire un peu votre profil. Donnez moi les informations suivantes:\n\
- Nom d'utilisateur\n\
- Votre age\n\
- Votre taille\n\
- Votre poids\n\
- Votre objectif (perdre du poids / prendre du muscle...)";

pub const ANSWER_PROMPT: &str = "Entrez votre réponse:";

/// Shown in place of a missing name.
pub const ANONYMOUS: &str = "Utilisateur";

pub fn intake_question(name: &str) -> String {
    format!(
        "\n\nTrès bien {name}. Maintenant décrivez moi avec précision tout ce que vous avez mangé et bu aujourd'hui."
    )
}

pub fn activity_question(name: &str) -> String {
    format!(
        "\n\nD'accord {name}. Maintenant décrivez moi avec précision toute activité physique que vous avez faite aujourd'hui."
    )
}

pub const COACH_THINKING: &str = "Le coach réfléchit...";

pub const COACH_HEADER: &str = "\nCONSEIL DE VOTRE COACH :";

pub fn failure_line(description: &str) -> String {
    format!("Une erreur est survenue : {description}")
}
