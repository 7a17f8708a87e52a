//! Prompt construction for judge comparison requests

use crate::types::MatchContext;

/// Default evaluation rubric sent with every comparison
const RUBRIC: &str = r#"# Evaluation Rubric

## Scoring Scale
- 4 (Excellent): Exceeds expectations, demonstrates mastery
- 3 (Very Good): Meets expectations with strong execution
- 2 (Good): Meets basic expectations, room for improvement
- 1 (Needs Improvement): Below expectations, significant gaps

## Criteria
1. Audience Alignment: research quality and targeting of the intended reader
2. Outcome Messaging: business-outcome focus and impact quantification
3. Technical Explanation: accuracy and clarity of the core explanation
4. Context Integration: connection to the surrounding ecosystem
5. Narrative Flow: structure, transitions and objection handling"#;

/// Builds comparison prompts with a configurable rubric
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    rubric: String,
    instructions: Option<String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            rubric: RUBRIC.to_string(),
            instructions: None,
        }
    }

    /// Replace the default rubric
    pub fn with_rubric(mut self, rubric: impl Into<String>) -> Self {
        self.rubric = rubric.into();
        self
    }

    /// Append caller-supplied evaluation instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Build the full comparison prompt for one match.
    ///
    /// Submissions are keyed by participant id in the reply contract so the
    /// verdict parser never has to fuzzy-match display names.
    pub fn comparison_prompt(&self, ctx: &MatchContext) -> String {
        let rubric = &self.rubric;

        let mut submissions = String::new();
        for (participant, submission) in &ctx.entries {
            submissions.push_str(&format!(
                "## Submission {id} ({name})\n{content}\n\n",
                id = participant.id,
                name = participant.name,
                content = submission.content,
            ));
        }

        let score_keys = ctx
            .entries
            .iter()
            .map(|(p, _)| format!("\"{}\": <score 1.0-4.0>", p.id))
            .collect::<Vec<_>>()
            .join(", ");

        let extra = self
            .instructions
            .as_deref()
            .map(|text| format!("\n## Additional Instructions\n{text}\n"))
            .unwrap_or_default();

        format!(
            r#"You are an expert evaluator comparing competing text submissions. Respond only with valid JSON as requested.

## Your Task
Compare the submissions below and determine which is more effective overall against the rubric. Score every submission on the rubric scale and explain what made the difference.
{extra}
## Rubric
{rubric}

{submissions}## Reply Contract
Respond ONLY with valid JSON in this exact format:
{{
  "winner": "<the id of the winning submission, or null for a tie>",
  "scores": {{{score_keys}}},
  "rationale": "specific explanation of why the winner won, with examples"
}}"#
        )
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
