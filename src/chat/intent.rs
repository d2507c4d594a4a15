use regex::{Regex, RegexBuilder};

use super::state::ConversationState;
use crate::config::ChatSection;

/// What a turn does, decided before any provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPlan {
    /// Ask the planner for a structure proposal; no HTML.
    Plan,
    /// Record approval, then generate in the same turn.
    ApproveThenGenerate,
    /// Go straight to the builder.
    Generate,
}

/// Keyword and verb matching for incoming user text.
#[derive(Debug, Clone)]
pub struct IntentMatcher {
    approve: Vec<String>,
    change: Vec<String>,
    generation: Option<Regex>,
}

impl Default for IntentMatcher {
    fn default() -> Self {
        Self::from_config(&ChatSection::default())
    }
}

impl IntentMatcher {
    pub fn from_config(section: &ChatSection) -> Self {
        let lower = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        };
        let verbs: Vec<String> = section
            .generation_verbs
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(regex::escape)
            .collect();
        let generation = if verbs.is_empty() {
            None
        } else {
            RegexBuilder::new(&format!(r"^\s*(?:{})\b", verbs.join("|")))
                .case_insensitive(true)
                .build()
                .map_err(|e| tracing::warn!(error = %e, "ignoring invalid generation verbs"))
                .ok()
        };
        Self {
            approve: lower(&section.approve_keywords),
            change: lower(&section.change_keywords),
            generation,
        }
    }

    /// Text opens with a generation verb ("gerar", "adicionar", ...).
    pub fn is_generation_intent(&self, text: &str) -> bool {
        self.generation.as_ref().is_some_and(|re| re.is_match(text))
    }

    pub fn wants_approval(&self, text: &str) -> bool {
        contains_any(text, &self.approve)
    }

    pub fn wants_change(&self, text: &str) -> bool {
        contains_any(text, &self.change)
    }

    /// Route a user message given the current phase.
    pub fn decide(&self, state: &ConversationState, text: &str) -> TurnPlan {
        if self.is_generation_intent(text) {
            return TurnPlan::Generate;
        }
        let wants_approval = self.wants_approval(text);
        let wants_change = self.wants_change(text);
        if !state.proposed || (!state.approved && (wants_change || !wants_approval)) {
            return TurnPlan::Plan;
        }
        if !state.approved && wants_approval {
            return TurnPlan::ApproveThenGenerate;
        }
        TurnPlan::Generate
    }
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    let text = text.to_lowercase();
    keywords.iter().any(|k| text.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRESH: ConversationState = ConversationState {
        proposed: false,
        approved: false,
    };
    const PROPOSED: ConversationState = ConversationState {
        proposed: true,
        approved: false,
    };
    const APPROVED: ConversationState = ConversationState {
        proposed: true,
        approved: true,
    };

    #[test]
    fn fresh_conversation_plans_first() {
        let m = IntentMatcher::default();
        assert_eq!(m.decide(&FRESH, "Quero uma landing page de academia"), TurnPlan::Plan);
        // Approval words mean nothing before a plan exists
        assert_eq!(m.decide(&FRESH, "pode gerar"), TurnPlan::Plan);
    }

    #[test]
    fn generation_verb_skips_planning() {
        let m = IntentMatcher::default();
        assert_eq!(m.decide(&FRESH, "  Adicionar uma seção de FAQ"), TurnPlan::Generate);
        assert_eq!(m.decide(&PROPOSED, "GERAR hero"), TurnPlan::Generate);
        // Verb must be a whole word at the start
        assert!(!m.is_generation_intent("gerador de leads"));
        assert!(!m.is_generation_intent("quero gerar"));
    }

    #[test]
    fn approval_after_proposal_generates() {
        let m = IntentMatcher::default();
        assert_eq!(m.decide(&PROPOSED, "pode gerar"), TurnPlan::ApproveThenGenerate);
        assert_eq!(m.decide(&PROPOSED, "Estou PRONTO!"), TurnPlan::ApproveThenGenerate);
    }

    #[test]
    fn change_request_replans_even_with_approval_words() {
        let m = IntentMatcher::default();
        assert_eq!(m.decide(&PROPOSED, "aprovado, mas quero mudar o hero"), TurnPlan::Plan);
        assert_eq!(m.decide(&PROPOSED, "e o rodapé?"), TurnPlan::Plan);
    }

    #[test]
    fn approved_conversation_generates() {
        let m = IntentMatcher::default();
        assert_eq!(m.decide(&APPROVED, "mude a cor do botão para verde"), TurnPlan::Generate);
        assert_eq!(m.decide(&APPROVED, "pode gerar"), TurnPlan::Generate);
    }

    #[test]
    fn custom_keywords_from_config() {
        let section = ChatSection {
            approve_keywords: vec!["Ship It".into()],
            change_keywords: vec![],
            generation_verbs: vec!["build".into()],
        };
        let m = IntentMatcher::from_config(&section);
        assert_eq!(m.decide(&PROPOSED, "ok, ship it"), TurnPlan::ApproveThenGenerate);
        assert_eq!(m.decide(&FRESH, "build a pricing table"), TurnPlan::Generate);
        assert_eq!(m.decide(&FRESH, "gerar hero"), TurnPlan::Plan);
    }

    #[test]
    fn empty_verb_list_disables_generation_intent() {
        let section = ChatSection {
            generation_verbs: vec![],
            ..ChatSection::default()
        };
        assert!(!IntentMatcher::from_config(&section).is_generation_intent("gerar"));
    }
}
