//! Contract with the external text-generation service that explains a run.
//!
//! The engine only builds the prompt and hands it over; the returned text is
//! treated as opaque.

use crate::error::EngineError;
use crate::simulation::SimulationResult;
use ecobee_protocol::{ExplanationRequest, SimulationStatus};
use log::warn;

pub trait ExplanationService {
    fn generate(&self, prompt: &str) -> Result<String, EngineError>;
}

const NOT_AVAILABLE: &str = "N/A";

pub fn build_explanation_prompt(request: &ExplanationRequest) -> String {
    let env = &request.environment;
    let parent = request.parent_species.as_deref().unwrap_or(NOT_AVAILABLE);
    let evolved = request
        .evolved_species_name
        .as_deref()
        .unwrap_or(NOT_AVAILABLE);

    let mut lines = vec![
        "You are an evolutionary biologist explaining honey bee adaptation.".to_string(),
        "An evolution simulation was run under the following environmental conditions:"
            .to_string(),
        format!("- Temperature: {} °C", env.temperature),
        format!("- Humidity: {} %", env.humidity),
        format!("- Flora availability: {} units", env.flowers),
        String::new(),
        format!(
            "In response to these conditions, the bee species '{parent}' was simulated to have \
             evolved into a new lineage named '{evolved}'."
        ),
    ];
    if request.mutated_genes.is_empty() {
        lines.push("No specific gene was targeted for mutation in this scenario.".to_string());
    } else {
        lines.push(format!(
            "The main genetic change observed is a mutation in the following genes: {}.",
            request.mutated_genes.join(", ")
        ));
    }
    lines.extend([
        String::new(),
        "Give a concise, easy to understand scientific explanation, without referring to yourself:"
            .to_string(),
        "1. Why is this evolutionary adaptation (including the mutated genes, if any) likely to \
         occur in response to the given environmental conditions?"
            .to_string(),
        "2. What adaptive advantage could these genetic changes give the new species in that \
         environment?"
            .to_string(),
        "Answer both questions in 3 sentences.".to_string(),
    ]);
    lines.join("\n")
}

/// Text to show for a finished run. Only a simulated evolution goes to `service`.
pub fn explain(result: &SimulationResult, service: &dyn ExplanationService) -> String {
    match result.status {
        SimulationStatus::MatchFound => format!(
            "Species {} matches the environmental conditions. No new evolution was simulated.",
            result.matching_species.as_deref().unwrap_or(NOT_AVAILABLE)
        ),
        SimulationStatus::NoTargets => {
            "The closest species has no factor under pressure. No evolution was simulated."
                .to_string()
        }
        SimulationStatus::NoGenesMutated => {
            "No targeted gene had sequence data to mutate. No evolution was simulated."
                .to_string()
        }
        SimulationStatus::ErrorUpdatingTree => result
            .message
            .clone()
            .unwrap_or_else(|| "The phylogenetic tree could not be updated.".to_string()),
        SimulationStatus::EvolutionSimulated => {
            let prompt = build_explanation_prompt(&result.explanation_request());
            service.generate(&prompt).unwrap_or_else(|e| {
                warn!("Explanation service failed: {e}");
                format!("Error getting explanation: {}", e.message)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genes::GeneType;
    use crate::phylogeny::PhyloTree;
    use ecobee_protocol::EnvironmentParameters;
    use std::cell::RefCell;

    struct Recording {
        prompts: RefCell<Vec<String>>,
        reply: Result<String, EngineError>,
    }

    impl ExplanationService for Recording {
        fn generate(&self, prompt: &str) -> Result<String, EngineError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.reply.clone()
        }
    }

    fn request(genes: &[&str]) -> ExplanationRequest {
        ExplanationRequest {
            environment: EnvironmentParameters::new(35.0, 50.0, 7.0),
            parent_species: Some("Apis_x".to_string()),
            evolved_species_name: Some("Evolved_x_4".to_string()),
            mutated_genes: genes.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn evolved_result() -> SimulationResult {
        SimulationResult {
            status: SimulationStatus::EvolutionSimulated,
            environment: EnvironmentParameters::new(35.0, 50.0, 7.0),
            matching_species: None,
            parent_species: Some("Apis_x".to_string()),
            parent_fitness: Some(0.975),
            parent_fallback: false,
            new_species_name: Some("Evolved_x_4".to_string()),
            targeted_genes: vec![GeneType::Hsp90],
            mutated_genes: vec![GeneType::Hsp90],
            new_sequences: Default::default(),
            message: None,
            tree: PhyloTree::default(),
        }
    }

    #[test]
    fn test_prompt_mentions_inputs() {
        let prompt = build_explanation_prompt(&request(&["Hsp90", "OR"]));
        assert!(prompt.contains("- Temperature: 35 °C"));
        assert!(prompt.contains("'Apis_x'"));
        assert!(prompt.contains("'Evolved_x_4'"));
        assert!(prompt.contains("genes: Hsp90, OR."));
    }

    #[test]
    fn test_prompt_without_genes() {
        let prompt = build_explanation_prompt(&request(&[]));
        assert!(prompt.contains("No specific gene was targeted"));
    }

    #[test]
    fn test_explain_forwards_prompt_and_returns_text_verbatim() {
        let service = Recording {
            prompts: RefCell::new(vec![]),
            reply: Ok("Because it is hot.".to_string()),
        };
        let text = explain(&evolved_result(), &service);
        assert_eq!(text, "Because it is hot.");
        assert_eq!(service.prompts.borrow().len(), 1);
        assert!(service.prompts.borrow()[0].contains("Hsp90"));
    }

    #[test]
    fn test_explain_service_failure_becomes_message() {
        let service = Recording {
            prompts: RefCell::new(vec![]),
            reply: Err(EngineError::internal("API key missing")),
        };
        let text = explain(&evolved_result(), &service);
        assert_eq!(text, "Error getting explanation: API key missing");
    }

    #[test]
    fn test_match_found_does_not_call_service() {
        let service = Recording {
            prompts: RefCell::new(vec![]),
            reply: Ok(String::new()),
        };
        let mut result = evolved_result();
        result.status = SimulationStatus::MatchFound;
        result.matching_species = Some("Apis_x".to_string());
        assert!(explain(&result, &service).starts_with("Species Apis_x matches"));
        assert!(service.prompts.borrow().is_empty());
    }
}
