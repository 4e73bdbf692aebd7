use serde_json::json;
use shared::domain::{Language, StoryboardData};

pub(crate) const DEFAULT_CONTINUATION: &str = "Continue the story logically.";

pub(crate) fn enhance_request(original_prompt: &str, language: Language) -> String {
    format!(
        "Act as a professional creative consultant for film.\n\
         Rewrite and expand the following short story idea into a detailed, evocative paragraph that describes the plot, tone, and visual atmosphere.\n\
         The goal is to provide a rich basis for a storyboard generator.\n\n\
         User Idea: \"{original_prompt}\"\n\n\
         Output the enhanced description only, in {}.",
        language.instruction_name()
    )
}

pub(crate) fn script_system_instruction(language: Language) -> String {
    let lang = language.instruction_name();
    format!(
        "You are a world-class film director and cinematographer.\n\
         Your goal is to take a simple user idea and turn it into a compelling short film script and storyboard breakdown.\n\n\
         CRITICAL INSTRUCTION FOR REFERENCE IMAGES:\n\
         If the user provides reference images (characters, settings, etc.), you MUST analyze them.\n\
         When writing the \"Visual Prompt\" for each scene:\n\
         1. DO NOT just say \"the character from the image\".\n\
         2. YOU MUST EXPLICITLY DESCRIBE their physical appearance based on the image (e.g., \"A young woman with chopped pink hair wearing a distressed denim jacket\").\n\
         3. Ensure these visual details are consistent across all scenes where the character appears.\n\n\
         Standard Tasks:\n\
         1. Define a consistent \"Art Style\" for the visual generation (e.g., \"Cinematic lighting, Cyberpunk aesthetic, anamorphic lens, teal and orange grade\").\n\
         2. Break the story into 4-6 key scenes.\n\
         3. For each scene, provide:\n\
            - A script narrative (dialogue or action).\n\
            - A highly detailed \"Visual Prompt\" optimized for an AI image generator.\n\
            - The camera shot type (e.g., Close-up, Wide Shot, Dutch Angle).\n\n\
         LANGUAGE REQUIREMENT:\n\
         Output the JSON values (title, artStyle, narrativeScript, visualPrompt, cameraShot) strictly in {lang}.\n\
         Even for the \"Visual Prompt\", write it in {lang} so the user can understand it, but ensure it is descriptive enough for an image model."
    )
}

pub(crate) fn script_user_text(prompt: &str, has_references: bool) -> String {
    if has_references {
        format!(
            "Story Idea: {prompt}\n\nInstructions: Please analyze the attached reference images and use their visual details to ensure character consistency in the generated scene descriptions."
        )
    } else {
        prompt.to_string()
    }
}

pub(crate) fn continuation_system_instruction(
    storyboard: &StoryboardData,
    language: Language,
) -> String {
    let previous: Vec<_> = storyboard
        .scenes
        .iter()
        .map(|s| json!({ "number": s.scene_number, "script": s.narrative_script }))
        .collect();
    let previous = serde_json::Value::Array(previous).to_string();
    format!(
        "You are a world-class film director.\n\
         You are CONTINUING an existing storyboard.\n\n\
         CONTEXT:\n\
         Title: \"{title}\"\n\
         Art Style: \"{style}\"\n\
         Previous Scenes: {previous}\n\n\
         TASK:\n\
         Generate the NEXT 2-3 scenes based on the user's continuation prompt.\n\
         Ensure logic and narrative continuity with previous scenes.\n\
         Maintain the established Art Style.\n\
         Start numbering scenes from {next}.\n\n\
         LANGUAGE:\n\
         Output strictly in {lang}.",
        title = storyboard.title,
        style = storyboard.art_style,
        next = storyboard.last_scene_number() + 1,
        lang = language.instruction_name(),
    )
}

pub(crate) fn continuation_user_text(continuation_text: &str) -> String {
    let text = if continuation_text.trim().is_empty() {
        DEFAULT_CONTINUATION
    } else {
        continuation_text
    };
    format!("User Continuation Instruction: \"{text}\"")
}

pub(crate) fn image_prompt(style_guide: &str, visual_prompt: &str, has_references: bool) -> String {
    let mut text = format!("Style: {style_guide}. Scene: {visual_prompt}");
    if has_references {
        text.push_str(
            " Maintain strict character and visual consistency with the provided reference image(s).",
        );
    }
    text
}

pub(crate) fn edit_prompt(instruction: &str) -> String {
    format!("{instruction} Maintain consistency with provided reference image(s) if any.")
}
