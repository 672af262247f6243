//! Prompt Quality Evaluation — Golden Test Set.
//!
//! A curated set of turn setups with strings that must (and must not)
//! appear in the rendered prompt, so template edits cannot silently drop
//! the speaker's identity, the listener, or the conversation history.
//!
//! Run with `cargo test -p townsim-llm --test eval_golden`.

use townsim_llm::prompt::{self, PromptKind, PromptSet, PromptVars};

/// A golden test case for prompt evaluation.
struct GoldenCase {
    /// Human-readable name for the test case.
    name: &'static str,
    /// Which template to render.
    kind: PromptKind,
    /// Template variables to fill in.
    vars: PromptVars<'static>,
    /// Strings that MUST appear in the rendered prompt.
    prompt_must_contain: Vec<&'static str>,
    /// Strings that MUST NOT appear in the rendered prompt.
    prompt_must_not_contain: Vec<&'static str>,
}

fn golden_cases() -> Vec<GoldenCase> {
    vec![
        // ---------------------------------------------------------------
        // 1. Baker greets a newcomer
        // ---------------------------------------------------------------
        GoldenCase {
            name: "baker_opening",
            kind: PromptKind::Start,
            vars: PromptVars {
                speaker: "Rosa",
                identity: "Rosa runs the bakery. She is friendly and outgoing.",
                listener: "Finn",
                history: "",
            },
            prompt_must_contain: vec!["You are Rosa", "runs the bakery", "Finn", "Rosa:"],
            prompt_must_not_contain: vec!["{speaker}", "{listener}", "{identity}", "{history}"],
        },
        // ---------------------------------------------------------------
        // 2. Scholar continues a chat, history included
        // ---------------------------------------------------------------
        GoldenCase {
            name: "scholar_continue",
            kind: PromptKind::Continue,
            vars: PromptVars {
                speaker: "Tobias",
                identity: "Tobias is the town librarian, curious but shy.",
                listener: "Greta",
                history: "Greta: Have you read the new almanac?\nTobias: Only the first chapter.\nGreta: It predicts rain all week!",
            },
            prompt_must_contain: vec![
                "You are Tobias",
                "Greta: Have you read the new almanac?",
                "predicts rain",
                "Tobias:",
            ],
            prompt_must_not_contain: vec!["{history}", "{speaker}"],
        },
        // ---------------------------------------------------------------
        // 3. Merchant wraps up
        // ---------------------------------------------------------------
        GoldenCase {
            name: "merchant_leave",
            kind: PromptKind::Leave,
            vars: PromptVars {
                speaker: "Greta",
                identity: "Greta is a sociable merchant.",
                listener: "Mabel",
                history: "Mabel: I should get back to my garden.",
            },
            prompt_must_contain: vec!["goodbye", "Mabel", "Greta:"],
            prompt_must_not_contain: vec!["{listener}"],
        },
        // ---------------------------------------------------------------
        // 4. Custom NPC with an empty identity still renders cleanly
        // ---------------------------------------------------------------
        GoldenCase {
            name: "custom_npc_empty_identity",
            kind: PromptKind::Start,
            vars: PromptVars {
                speaker: "Ivy",
                identity: "",
                listener: "Player",
                history: "",
            },
            prompt_must_contain: vec!["You are Ivy", "Player"],
            prompt_must_not_contain: vec!["{identity}"],
        },
        // ---------------------------------------------------------------
        // 5. User-initiated conversation: the NPC answers the user
        // ---------------------------------------------------------------
        GoldenCase {
            name: "reply_to_user",
            kind: PromptKind::Continue,
            vars: PromptVars {
                speaker: "Finn",
                identity: "Finn is a curious explorer.",
                listener: "Player",
                history: "Player: hello",
            },
            prompt_must_contain: vec!["Player: hello", "Reply to Player"],
            prompt_must_not_contain: vec!["{"],
        },
    ]
}

#[test]
fn golden_prompts_render_correctly() {
    let set = PromptSet::builtin();
    for case in golden_cases() {
        let rendered = set.render(case.kind, &case.vars);
        for needle in &case.prompt_must_contain {
            assert!(
                rendered.contains(needle),
                "[{}] rendered prompt is missing '{needle}':\n{rendered}",
                case.name
            );
        }
        for needle in &case.prompt_must_not_contain {
            assert!(
                !rendered.contains(needle),
                "[{}] rendered prompt must not contain '{needle}':\n{rendered}",
                case.name
            );
        }
    }
}

#[test]
fn golden_set_covers_every_kind() {
    let cases = golden_cases();
    for kind in PromptKind::all() {
        assert!(
            cases.iter().any(|c| c.kind == *kind),
            "no golden case for the {kind} template"
        );
    }
}

#[test]
fn every_template_asks_for_a_single_line() {
    for template in [prompt::START_TEMPLATE, prompt::CONTINUE_TEMPLATE, prompt::LEAVE_TEMPLATE] {
        assert!(template.starts_with("You are {speaker}."));
        assert!(template.contains("spoken line only"));
        assert!(template.trim_end().ends_with("{speaker}:"));
    }
}

#[test]
fn prompt_file_overrides_load_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("prompts.toml");
    std::fs::write(
        &path,
        "[prompts]\nstart = \"{speaker} nods at {listener}.\"\n",
    )
    .expect("write");

    let set = PromptSet::from_toml_file(&path).expect("load");
    let vars = PromptVars {
        speaker: "Mabel",
        identity: "",
        listener: "Rosa",
        history: "",
    };
    assert_eq!(set.render(PromptKind::Start, &vars), "Mabel nods at Rosa.");
    assert_eq!(set.get(PromptKind::Leave), prompt::LEAVE_TEMPLATE);
}
